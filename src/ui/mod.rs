//! Terminal UI layer.
//!
//! - [`chat_loop`]: terminal lifecycle, key handling and the main loop.
//! - [`app`]: input box, status line, panels and login form layered over
//!   [`crate::core::app::ChatState`].
//! - [`renderer`] and [`markdown`]: frame composition and message styling.
//! - [`theme`]: color and style policy.
//!
//! Ownership boundary: this layer presents and captures interaction state,
//! while [`crate::core`] owns session logic and backend coordination.

pub mod app;
pub mod chat_loop;
pub mod markdown;
pub mod renderer;
pub mod theme;
pub mod view;
