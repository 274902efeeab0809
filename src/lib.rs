//! chatpdf is a terminal client for a PDF-chat backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] holds the backend wire types and [`api::ApiClient`], the HTTP
//!   client that speaks the REST API.
//! - [`core`] owns the session and message state machine
//!   ([`core::app::ChatState`]), configuration, the speech-input adapter and
//!   the markdown detector. Nothing in `core` draws to the terminal.
//! - [`commands`] parses slash commands typed into the chat input.
//! - [`ui`] renders the terminal interface and runs the interactive loop.
//! - [`auth`] persists the access token and runs login/register/logout.
//!
//! The binary (`src/main.rs`) routes through [`cli::main`], which either
//! runs a one-shot subcommand or starts [`ui::chat_loop::run_chat`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
