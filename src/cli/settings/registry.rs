//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    auto_create_handler, backend_url_handler, default_model_handler, keyring_handler,
    markdown_handler, repoll_delay_handler, request_timeout_handler, speech_command_handler,
    startup_retries_handler, theme_handler,
};
use super::SettingHandler;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `chatpdf set` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        registry.register(Box::new(backend_url_handler()));
        registry.register(Box::new(request_timeout_handler()));
        registry.register(Box::new(default_model_handler()));
        registry.register(Box::new(theme_handler()));
        registry.register(Box::new(markdown_handler()));
        registry.register(Box::new(speech_command_handler()));
        registry.register(Box::new(repoll_delay_handler()));
        registry.register(Box::new(startup_retries_handler()));
        registry.register(Box::new(auto_create_handler()));
        registry.register(Box::new(keyring_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    pub fn keys_sorted(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.handlers.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
