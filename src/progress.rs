//! Lazily-created progress reporter for long-running row operations.
//!
//! Mirrors `store.py`'s `progress_bar: Optional[tqdm]`, created on the first
//! row and dropped (here, via RAII) at the end of the call. Built on
//! `indicatif`, the ecosystem's progress-bar crate.

use indicatif::{ProgressBar, ProgressStyle};

pub struct LazyProgress {
    label: &'static str,
    bar: Option<ProgressBar>,
}

impl LazyProgress {
    pub fn new(label: &'static str) -> Self {
        Self { label, bar: None }
    }

    pub fn tick(&mut self) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({pos} rows)") {
                bar.set_style(style);
            }
            bar.set_message(self.label);
            bar
        });
        bar.inc(1);
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for LazyProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
