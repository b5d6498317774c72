//! Plain-text and JSON rendering of command results.

use sauce_storage::models::{RemoteObject, UpdateOutcome, VerifyOutcome};
use serde::Serialize;

/// Prints `value` as pretty JSON, or as text produced by `render`.
pub fn emit<T: Serialize + ?Sized>(value: &T, json: bool, render: impl Fn(&T) -> String) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(e) => log::error!("Failed to serialize output: {e}"),
        }
    } else {
        println!("{}", render(value));
    }
}

/// Table of stored objects, one per line, followed by a count.
pub fn render_list(objects: &[RemoteObject]) -> String {
    if objects.is_empty() {
        return "No files stored.".to_string();
    }

    let width = objects
        .iter()
        .map(|o| o.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!("{:<width$}  {:>10}  {:<19}  MD5\n", "NAME", "SIZE", "MODIFIED");
    for object in objects {
        let md5 = object
            .fingerprint
            .as_ref()
            .map_or("-", |hash| hash.hex.as_str());
        out.push_str(&format!(
            "{:<width$}  {:>10}  {:<19}  {md5}\n",
            object.name,
            human_size(object.size),
            object.modified_at.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    out.push_str(&format!("\n{} file(s)", objects.len()));
    out
}

pub fn render_update(outcome: &UpdateOutcome) -> String {
    if outcome.skipped {
        format!("{} (unchanged, not uploaded)", outcome.url)
    } else {
        outcome.url.clone()
    }
}

pub fn render_verify(outcome: &VerifyOutcome) -> String {
    if outcome.verified {
        format!("{}: verified", outcome.name)
    } else {
        format!("{}: not verified", outcome.name)
    }
}

/// Formats a byte count with binary units, e.g. `1.5 MiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    #[allow(clippy::cast_precision_loss)] // display-only value
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
