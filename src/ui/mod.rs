//! Terminal output for the CLI
//!
//! Uses `cliclack` for interactive sessions and falls back to plain,
//! prefix-tagged lines (`[OK]`, `[WARN]`) in CI or when piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use tinyforge::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "tinyforge run");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Preparing mappings...");
//! spinner.stop("Mappings ready");
//!
//! ui::step_ok_detail(&ctx, "intermediate", "official, intermediary");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, section, step_info, step_ok, step_ok_detail,
    step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
pub use prompts::confirm;
pub use theme::{init_theme, ForgeTheme};
