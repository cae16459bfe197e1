//! Spinner with a plain-text fallback

use super::context::UiContext;
use console::style;
use std::time::{Duration, Instant};

/// Spinner shown while a long step runs. Plain output reports how long the
/// step took instead of animating.
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    started: Option<Instant>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            started: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        self.started = Some(Instant::now());
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        let elapsed = self.elapsed();
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {} {}", style("[OK]").green(), message, elapsed),
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        let elapsed = self.elapsed();
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {} {}", style("[FAIL]").red(), message, elapsed),
        }
    }

    fn elapsed(&mut self) -> String {
        let took = self
            .started
            .take()
            .map(|start| start.elapsed())
            .unwrap_or_default();
        format_elapsed(took)
    }
}

/// `(1.2s)`, or `(340ms)` under a second
fn format_elapsed(took: Duration) -> String {
    if took.as_secs() == 0 {
        format!("({}ms)", took.as_millis())
    } else {
        format!("({:.1}s)", took.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Merging...");
        spinner.stop("Merged");
        spinner.start("Merging...");
        spinner.stop_error("Failed");
    }

    #[test]
    fn elapsed_switches_units() {
        assert_eq!(format_elapsed(Duration::from_millis(340)), "(340ms)");
        assert_eq!(format_elapsed(Duration::from_millis(1300)), "(1.3s)");
    }
}
