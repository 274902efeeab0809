//! Full-screen chat interface: terminal setup, key handling and the main
//! event loop.

mod event_loop;
mod keys;
mod lifecycle;

pub use event_loop::{build_app, run_chat, UiEvent};
pub use keys::{handle_key, handle_paste, LoopAction};
