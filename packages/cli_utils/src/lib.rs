#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for sauce-storage.
//!
//! Provides an `indicatif`-backed upload bar behind the
//! [`TransferProgress`] trait, plus [`init_logger`] which sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while the bar redraws.

use std::sync::{Arc, OnceLock};

use indicatif::{ProgressBar, ProgressStyle};
use sauce_storage::TransferProgress;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`TransferProgress`].
///
/// The bar is only added to the [`MultiProgress`] when a transfer begins,
/// so operations that end without uploading leave nothing on screen.
pub struct IndicatifProgress {
    multi: MultiProgress,
    bar: OnceLock<ProgressBar>,
    style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates a byte-transfer bar with throughput and ETA.
    #[must_use]
    pub fn transfer_bar(multi: &MultiProgress) -> Arc<dyn TransferProgress> {
        Arc::new(Self::new(multi))
    }

    fn new(multi: &MultiProgress) -> Self {
        let style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {bytes}/{total_bytes} {binary_bytes_per_sec} [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self {
            multi: multi.clone(),
            bar: OnceLock::new(),
            style,
        }
    }
}

impl TransferProgress for IndicatifProgress {
    fn begin(&self, name: &str, total: u64) {
        let bar = self.bar.get_or_init(|| {
            let bar = self.multi.add(ProgressBar::new(total));
            bar.set_style(self.style.clone());
            bar
        });
        bar.set_length(total);
        bar.set_position(0);
        bar.set_message(name.to_string());
    }

    fn restart(&self) {
        if let Some(bar) = self.bar.get() {
            bar.set_position(0);
        }
    }

    fn advance(&self, bytes: u64) {
        if let Some(bar) = self.bar.get() {
            bar.inc(bytes);
        }
    }

    fn complete(&self, name: &str) {
        if let Some(bar) = self.bar.get() {
            bar.finish_with_message(format!("uploaded {name}"));
        }
    }

    fn abandon(&self) {
        if let Some(bar) = self.bar.get() {
            bar.finish_and_clear();
        }
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// `default_filter` applies when `RUST_LOG` is unset.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger(default_filter: &str) -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.parse_filters(default_filter);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let logger = builder.build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden())
    }

    #[test]
    fn nothing_is_drawn_without_a_transfer() {
        let progress = IndicatifProgress::new(&hidden());

        progress.restart();
        progress.advance(10);
        progress.abandon();
        assert!(progress.bar.get().is_none());
    }

    #[test]
    fn bar_tracks_bytes_across_a_restart() {
        let progress = IndicatifProgress::new(&hidden());

        progress.begin("app.apk", 1000);
        progress.advance(400);
        progress.advance(100);
        let bar = progress.bar.get().unwrap();
        assert_eq!(bar.position(), 500);
        assert_eq!(bar.length(), Some(1000));

        progress.restart();
        progress.advance(250);
        assert_eq!(bar.position(), 250);

        progress.complete("app.apk");
        assert!(bar.is_finished());
        assert_eq!(bar.message(), "uploaded app.apk");
    }
}
