//! Output helpers shared by the commands

use super::context::UiContext;
use console::{style, StyledObject};

/// Outcome shown in front of a line
#[derive(Debug, Clone, Copy)]
enum Status {
    Ok,
    Warn,
    Info,
}

impl Status {
    /// Prefix used in plain output
    fn tag(self) -> StyledObject<&'static str> {
        match self {
            Self::Ok => style("[OK]").green(),
            Self::Warn => style("[WARN]").yellow(),
            Self::Info => style("[INFO]").cyan(),
        }
    }

    fn log(self, message: String) {
        let _ = match self {
            Self::Ok => cliclack::log::success(message),
            Self::Warn => cliclack::log::warning(message),
            Self::Info => cliclack::log::info(message),
        };
    }
}

fn step(ctx: &UiContext, status: Status, message: String) {
    if ctx.use_fancy_output() {
        status.log(message);
    } else {
        println!("  {} {}", status.tag(), message);
    }
}

fn outro(ctx: &UiContext, status: Status, message: &str) {
    if !ctx.use_fancy_output() {
        println!("{} {}", status.tag(), message);
        return;
    }
    let styled = match status {
        Status::Warn => style(message).yellow().bold(),
        Status::Ok | Status::Info => style(message).green().bold(),
    };
    let _ = cliclack::outro(styled);
}

/// `message (detail)`, the detail dimmed on a terminal
fn detailed(ctx: &UiContext, message: &str, detail: &str) -> String {
    if ctx.use_fancy_output() {
        format!("{} ({})", message, style(detail).dim())
    } else {
        format!("{} ({})", message, detail)
    }
}

/// Command banner
pub fn intro(ctx: &UiContext, title: &str) {
    let title = style(title).green().bold();
    if ctx.use_fancy_output() {
        let _ = cliclack::intro(title);
    } else {
        println!("{}", title);
    }
}

pub fn outro_success(ctx: &UiContext, message: &str) {
    outro(ctx, Status::Ok, message);
}

pub fn outro_warn(ctx: &UiContext, message: &str) {
    outro(ctx, Status::Warn, message);
}

/// Bold heading before a group of steps
pub fn section(ctx: &UiContext, title: &str) {
    let title = style(title).bold();
    if ctx.use_fancy_output() {
        let _ = cliclack::log::info(title);
    } else {
        println!("{}", title);
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Status::Ok, message.to_string());
}

/// Success line with a detail such as a path or a namespace list
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(ctx, Status::Ok, detailed(ctx, message, detail));
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Status::Warn, message.to_string());
}

/// Warning followed by what to do about it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    let hint = if ctx.use_fancy_output() {
        style(hint).dim().to_string()
    } else {
        hint.to_string()
    };
    step(ctx, Status::Warn, format!("{} - {}", message, hint));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Status::Info, message.to_string());
}

/// Indented `key: value` line under the previous step
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    let key = if ctx.use_fancy_output() {
        style(key).dim().to_string()
    } else {
        key.to_string()
    };
    println!("    {}: {}", key, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_plain_without_terminal() {
        let ctx = UiContext::non_interactive();
        assert_eq!(
            detailed(&ctx, "intermediate", "official, intermediary"),
            "intermediate (official, intermediary)"
        );
    }

    #[test]
    fn plain_output_does_not_panic() {
        let ctx = UiContext::non_interactive();
        intro(&ctx, "tinyforge");
        section(&ctx, "Tables");
        step_ok(&ctx, "Merged");
        step_warn(&ctx, "Legacy table");
        step_info(&ctx, "Installer found");
        step_warn_hint(&ctx, "No installer JSON", "add a loader to modCompileClasspath");
        key_value(&ctx, "root", "/tmp");
        outro_warn(&ctx, "Done with warnings");
        outro_success(&ctx, "Done");
    }
}
