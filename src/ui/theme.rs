//! Custom theme for cliclack prompts

use cliclack::ThemeState;
use console::Style;

/// Theme with green branding
#[derive(Debug, Clone, Default)]
pub struct ForgeTheme;

impl cliclack::Theme for ForgeTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().green(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().green(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().cyan(),
        }
    }
}

/// Install the theme globally
pub fn init_theme() {
    cliclack::set_theme(ForgeTheme);
}
