pub mod app;
pub mod backend;
pub mod config;
pub mod markdown;
pub mod message;
pub mod speech;
