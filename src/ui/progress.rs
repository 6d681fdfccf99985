//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Byte-count progress bar for hashing large artifacts.
///
/// Draws an indicatif bar in interactive mode and stays silent otherwise;
/// CI logs get one line when the work finishes.
pub struct ByteProgress {
    bar: Option<ProgressBar>,
    label: String,
}

impl ByteProgress {
    pub fn new(ctx: &UiContext, label: &str, total: u64) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::new(total);
            let bar_style = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} {prefix}  {bar:24.cyan/dim} {bytes}/{total_bytes} {bytes_per_sec:.dim}  {eta:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(bar_style);
            bar.set_prefix(label.to_string());
            bar
        });
        Self {
            bar,
            label: label.to_string(),
        }
    }

    /// Record `done` of `total` bytes processed
    pub fn update(&self, done: u64, total: u64) {
        if let Some(ref bar) = self.bar {
            if bar.length() != Some(total) {
                bar.set_length(total);
            }
            bar.set_position(done);
        }
    }

    /// Position of the bar, if one is drawn
    pub fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(|bar| bar.position())
    }

    pub fn finish(&self, total: u64) {
        match self.bar {
            Some(ref bar) => bar.finish_and_clear(),
            None => println!("{} {} ({})", style("[OK]").green(), self.label, HumanBytes(total)),
        }
    }
}
