use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub background_color: Color,
    // Chat message styles
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_text_style: Style,
    pub system_text_style: Style,

    // Chrome
    pub title_style: Style,
    pub busy_indicator_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,
    pub selected_style: Style,

    // Notices
    pub info_style: Style,
    pub warning_style: Style,
    pub error_style: Style,

    // Markdown
    pub heading_style: Style,
    pub code_style: Style,
    pub quote_style: Style,

    // Input area
    pub input_text_style: Style,
    pub input_cursor_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            name: "dark",
            background_color: Color::Black,
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_text_style: Style::default().fg(Color::White),
            system_text_style: Style::default().fg(Color::DarkGray),

            title_style: Style::default().fg(Color::Gray),
            busy_indicator_style: Style::default().fg(Color::White),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),
            selected_style: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),

            info_style: Style::default().fg(Color::Green),
            warning_style: Style::default().fg(Color::Yellow),
            error_style: Style::default().fg(Color::LightRed),

            heading_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            code_style: Style::default().fg(Color::LightGreen),
            quote_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),

            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    pub fn light() -> Self {
        Theme {
            name: "light",
            background_color: Color::White,
            user_prefix_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Blue),
            assistant_text_style: Style::default().fg(Color::Black),
            system_text_style: Style::default().fg(Color::Gray),

            title_style: Style::default().fg(Color::DarkGray),
            busy_indicator_style: Style::default().fg(Color::Black),
            input_border_style: Style::default().fg(Color::Black),
            input_title_style: Style::default().fg(Color::DarkGray),
            selected_style: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),

            info_style: Style::default().fg(Color::Green),
            warning_style: Style::default().fg(Color::Rgb(0xb5, 0x89, 0x00)),
            error_style: Style::default().fg(Color::Red),

            heading_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            code_style: Style::default().fg(Color::Rgb(0x00, 0x6b, 0x3c)),
            quote_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            input_text_style: Style::default().fg(Color::Black),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    /// Unknown names fall back to the dark theme.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark_default(),
        }
    }

    pub fn is_known(name: &str) -> bool {
        matches!(
            name.to_ascii_lowercase().as_str(),
            "dark" | "default" | "light"
        )
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark_default()
    }
}
