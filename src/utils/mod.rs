pub mod logging;
pub mod transcript;
pub mod url;
