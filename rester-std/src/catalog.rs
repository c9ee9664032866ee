//! Binding hooks listed in configuration.
//!
//! Configuration can only name callbacks, so the server first registers its
//! callbacks under stable names in a [`HookCatalog`], then binds every
//! `events` and `filters` entry through it:
//!
//! ```toml
//! events = [{ user_created = "audit" }]
//! filters = [{ response = "redact" }, { response = "stamp" }]
//! ```
//!
//! ```rust,ignore
//! let catalog = HookCatalog::new()
//!     .event("audit", AuditHook)
//!     .filter("redact", RedactHook)
//!     .filter("stamp", filter_fn(|_, body| Ok(body)));
//! let mut hooks = HookRegistry::new();
//! catalog.load_into(&settings, &mut hooks)?;
//! ```

use crate::settings::{Settings, SettingsError};
use rester_core::{Callback, Channel, EventHook, FilterHook, HookRegistry};
use std::{collections::HashMap, fmt};

/// Callbacks addressable by name from configuration.
#[derive(Default, Clone)]
pub struct HookCatalog {
    callbacks: HashMap<String, Callback>,
}

impl HookCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under `name`, replacing any previous one.
    pub fn register(mut self, name: impl Into<String>, callback: Callback) -> Self {
        self.callbacks.insert(name.into(), callback);
        self
    }

    /// Register an event hook under `name`.
    pub fn event<H: EventHook>(self, name: impl Into<String>, hook: H) -> Self {
        self.register(name, Callback::event(hook))
    }

    /// Register a filter hook under `name`.
    pub fn filter<H: FilterHook>(self, name: impl Into<String>, hook: H) -> Self {
        self.register(name, Callback::filter(hook))
    }

    /// The callback registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Callback> {
        self.callbacks.get(name)
    }

    /// Bind every configured hook into `registry`, in listed order.
    ///
    /// Nothing is bound unless every entry resolves.
    pub fn load_into(
        &self,
        settings: &Settings,
        registry: &mut HookRegistry,
    ) -> Result<(), SettingsError> {
        let mut resolved = Vec::new();
        for channel in [Channel::Event, Channel::Filter] {
            for (name, reference) in settings.hook_entries(channel) {
                let callback = self.resolve(channel, &name, &reference)?;
                resolved.push((name, callback));
            }
        }

        for (name, callback) in resolved {
            tracing::debug!(channel = %callback.channel(), %name, "binding configured hook");
            registry.bind(name, callback);
        }
        Ok(())
    }

    fn resolve(
        &self,
        channel: Channel,
        name: &str,
        reference: &str,
    ) -> Result<Callback, SettingsError> {
        let callback = self
            .callbacks
            .get(reference)
            .ok_or_else(|| SettingsError::UnknownCallback {
                channel,
                name: name.to_string(),
                callback: reference.to_string(),
            })?;
        if callback.channel() != channel {
            return Err(SettingsError::ChannelMismatch {
                expected: channel,
                actual: callback.channel(),
                name: name.to_string(),
                callback: reference.to_string(),
            });
        }
        Ok(callback.clone())
    }
}

impl fmt::Debug for HookCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.callbacks.keys().collect();
        names.sort();
        f.debug_struct("HookCatalog").field("callbacks", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rester_core::{event_fn, filter_fn};

    fn settings(toml: &str) -> Settings {
        Settings::builder().without_env().toml(toml).build().unwrap()
    }

    fn catalog() -> HookCatalog {
        HookCatalog::new()
            .event("audit", event_fn(|_| Ok(())))
            .filter("redact", filter_fn(|_, body| Ok(body)))
    }

    #[test]
    fn configured_hooks_are_bound_in_order() {
        let settings = settings(
            r#"
            events = [{ saved = "audit" }, { saved = "audit" }]
            filters = [{ response = "redact" }]
            "#,
        );
        let mut registry = HookRegistry::new();
        catalog().load_into(&settings, &mut registry).unwrap();

        let saved = registry.bindings(Channel::Event, "saved");
        assert_eq!(saved.len(), 2);
        assert!(saved[0].order < saved[1].order);
        assert_eq!(registry.bindings(Channel::Filter, "response").len(), 1);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unknown_callback_is_a_startup_error() {
        let settings = settings(r#"events = [{ saved = "missing" }]"#);
        let mut registry = HookRegistry::new();

        let err = catalog().load_into(&settings, &mut registry).unwrap_err();
        assert!(matches!(err, SettingsError::UnknownCallback { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn callback_on_the_wrong_channel_is_rejected() {
        let settings = settings(
            r#"
            events = [{ saved = "audit" }]
            filters = [{ response = "audit" }]
            "#,
        );
        let mut registry = HookRegistry::new();

        let err = catalog().load_into(&settings, &mut registry).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::ChannelMismatch {
                expected: Channel::Filter,
                actual: Channel::Event,
                ..
            }
        ));
        assert!(registry.is_empty());
    }
}
