//! Top-level screens of the terminal client.

/// Which screen is shown. The chat state machine switches to
/// [`View::Login`] when the backend rejects the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Landing screen with the feature list.
    #[default]
    Home,
    Chat,
    Login,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Chat => "Chat",
            View::Login => "Sign in",
        }
    }
}
