use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for CLI reports over the index
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    /// Field labels in status lines and summaries
    pub label: Style,
    /// Row ids and other secondary columns
    pub muted: Style,
    /// Node and edge kind labels
    pub kind: Style,
    /// File paths and source positions
    pub path: Style,
}

impl Theme {
    /// Colors only on a terminal, and never when `NO_COLOR` is set
    pub fn detect() -> Self {
        let colored = std::env::var_os("NO_COLOR").is_none() && console::Term::stdout().is_term();
        if colored { Self::colored() } else { Self::plain() }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            label: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            kind: Style::new().blue(),
            path: Style::new().underline(),
        }
    }

    pub fn plain() -> Self {
        let none = Style::new();
        Self {
            header: none.clone(),
            success: none.clone(),
            error: none.clone(),
            warn: none.clone(),
            label: none.clone(),
            muted: none.clone(),
            kind: none.clone(),
            path: none,
        }
    }

    /// Style for a diagnostic line
    pub fn severity(&self, fatal: bool) -> &Style {
        if fatal { &self.error } else { &self.warn }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_leaves_text_alone() {
        let theme = Theme::plain();
        assert_eq!("call".style(theme.kind.clone()).to_string(), "call");
        assert_eq!("a.cpp:3:1".style(theme.severity(true).clone()).to_string(), "a.cpp:3:1");
    }

    #[test]
    fn test_severity_picks_error_for_fatal() {
        let theme = Theme::colored();
        let fatal = "x".style(theme.severity(true).clone()).to_string();
        assert_eq!(fatal, "x".style(theme.error.clone()).to_string());
        assert_ne!(fatal, "x".style(theme.severity(false).clone()).to_string());
    }
}
