use std::{collections::HashMap, sync::Arc};

use crate::{
    callbacks::DELIMITER,
    errors::Error,
    handlers::ChatHandler,
    messaging::types::BotCommandInfo,
    Result,
};

/// Immutable command / callback routing tables.
///
/// Built once at startup from an explicit list of handlers. Registration order
/// only affects the command menu order; a command name or callback identifier
/// claimed by two handlers is a configuration error.
pub struct HandlerRegistry {
    commands: HashMap<String, Arc<dyn ChatHandler>>,
    callbacks: HashMap<String, Arc<dyn ChatHandler>>,
    menu: Vec<BotCommandInfo>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn command(&self, name: &str) -> Option<&Arc<dyn ChatHandler>> {
        self.commands.get(name)
    }

    pub fn callback(&self, identifier: &str) -> Option<&Arc<dyn ChatHandler>> {
        self.callbacks.get(identifier)
    }

    /// Command menu in registration order.
    pub fn menu(&self) -> &[BotCommandInfo] {
        &self.menu
    }

    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn callback_identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: Vec<Arc<dyn ChatHandler>>,
}

impl HandlerRegistryBuilder {
    pub fn register(mut self, handler: Arc<dyn ChatHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> Result<HandlerRegistry> {
        let mut commands: HashMap<String, Arc<dyn ChatHandler>> = HashMap::new();
        let mut callbacks: HashMap<String, Arc<dyn ChatHandler>> = HashMap::new();
        let mut menu = Vec::new();

        for handler in self.handlers {
            tracing::info!(handler = handler.name(), "registering handler");

            for spec in handler.commands() {
                if let Some(owner) = commands.get(spec.name) {
                    return Err(Error::Config(format!(
                        "command {:?} registered by both {} and {}",
                        spec.name,
                        owner.name(),
                        handler.name()
                    )));
                }
                commands.insert(spec.name.to_string(), handler.clone());
                menu.push(BotCommandInfo {
                    name: spec.name.to_string(),
                    description: spec.description.to_string(),
                });
            }

            for identifier in handler.callbacks() {
                if identifier.contains(DELIMITER) {
                    return Err(Error::Config(format!(
                        "callback identifier {identifier:?} of {} contains {DELIMITER:?}",
                        handler.name()
                    )));
                }
                if let Some(owner) = callbacks.get(*identifier) {
                    return Err(Error::Config(format!(
                        "callback {identifier:?} registered by both {} and {}",
                        owner.name(),
                        handler.name()
                    )));
                }
                callbacks.insert(identifier.to_string(), handler.clone());
            }
        }

        Ok(HandlerRegistry {
            commands,
            callbacks,
            menu,
        })
    }
}
