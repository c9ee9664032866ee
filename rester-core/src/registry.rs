//! Registry of named hooks.
//!
//! The registry is append-only and is populated at startup through `&mut self`
//! binds. Once the server starts dispatching it is shared as
//! `Arc<HookRegistry>`, so binding during live traffic does not type-check.

use crate::{
    context::RequestContext,
    error::Failure,
    hook::{Callback, Channel, DynEventHook, DynFilterHook, EventHook, FilterHook},
};
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// Metadata of one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookBinding {
    /// The channel the hook was bound on.
    pub channel: Channel,
    /// The event or filter name.
    pub name: String,
    /// Global registration sequence number.
    pub order: usize,
}

struct Entry<H: ?Sized> {
    hook: Arc<H>,
    order: usize,
}

/// Named event and filter hooks, in registration order.
#[derive(Default)]
pub struct HookRegistry {
    events: HashMap<String, Vec<Entry<dyn DynEventHook>>>,
    filters: HashMap<String, Vec<Entry<dyn DynFilterHook>>>,
    next_order: usize,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback to the list for `name` on the callback's channel.
    ///
    /// There is no uniqueness check: a callback bound twice fires twice.
    pub fn bind(&mut self, name: impl Into<String>, callback: Callback) -> &mut Self {
        let name = name.into();
        let order = self.next_order;
        self.next_order += 1;
        match callback {
            Callback::Event(hook) => self
                .events
                .entry(name)
                .or_default()
                .push(Entry { hook, order }),
            Callback::Filter(hook) => self
                .filters
                .entry(name)
                .or_default()
                .push(Entry { hook, order }),
        }
        self
    }

    /// Bind an event hook.
    pub fn bind_event<H: EventHook>(&mut self, name: impl Into<String>, hook: H) -> &mut Self {
        self.bind(name, Callback::event(hook))
    }

    /// Bind a filter hook.
    pub fn bind_filter<H: FilterHook>(&mut self, name: impl Into<String>, hook: H) -> &mut Self {
        self.bind(name, Callback::filter(hook))
    }

    /// Invoke every event hook bound to `name`, in registration order.
    ///
    /// No bound hook is a no-op. The first failure stops the remaining hooks.
    pub async fn trigger_event(&self, name: &str, request: &RequestContext) -> Result<(), Failure> {
        let Some(entries) = self.events.get(name) else {
            return Ok(());
        };
        for entry in entries {
            entry.hook.on_event_dyn(request).await?;
        }
        Ok(())
    }

    /// Thread `content` through every filter hook bound to `name` as a left fold.
    ///
    /// No bound hook returns `content` unchanged.
    pub async fn apply_filter(
        &self,
        name: &str,
        content: Value,
        request: &RequestContext,
    ) -> Result<Value, Failure> {
        let Some(entries) = self.filters.get(name) else {
            return Ok(content);
        };
        let mut content = content;
        for entry in entries {
            content = entry.hook.apply_dyn(request, content).await?;
        }
        Ok(content)
    }

    /// Bindings for `name` on `channel`, in registration order.
    pub fn bindings(&self, channel: Channel, name: &str) -> Vec<HookBinding> {
        let orders: Vec<usize> = match channel {
            Channel::Event => self
                .events
                .get(name)
                .map(|e| e.iter().map(|e| e.order).collect())
                .unwrap_or_default(),
            Channel::Filter => self
                .filters
                .get(name)
                .map(|e| e.iter().map(|e| e.order).collect())
                .unwrap_or_default(),
        };
        orders
            .into_iter()
            .map(|order| HookBinding {
                channel,
                name: name.to_string(),
                order,
            })
            .collect()
    }

    /// Total number of bindings across both channels.
    pub fn len(&self) -> usize {
        self.next_order
    }

    /// Whether nothing has been bound.
    pub fn is_empty(&self) -> bool {
        self.next_order == 0
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("len", &self.next_order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hook::{event_fn, filter_fn},
        resource::{Cache, Database, Resources},
    };
    use serde_json::json;
    use std::{any::Any, sync::Mutex};

    struct NullDb;
    impl Database for NullDb {
        fn close(&self) -> Result<(), crate::BoxError> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct NullCache;
    impl Cache for NullCache {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn context(registry: HookRegistry) -> RequestContext {
        let resources = Resources::new(Arc::new(NullDb), Arc::new(NullCache));
        RequestContext::new(vec!["users".into()], resources, Arc::new(registry))
    }

    #[tokio::test]
    async fn unbound_names_are_noop_and_identity() {
        let request = context(HookRegistry::new());

        assert!(request.trigger_event("nothing").await.is_ok());
        let out = request.apply_filter("nothing", json!({"a": 1})).await.unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[tokio::test]
    async fn filters_fold_left_to_right() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut registry = HookRegistry::new();
        let first = seen.clone();
        registry.bind_filter(
            "title",
            filter_fn(move |_, content| {
                first.lock().unwrap().push(content.clone());
                Ok(json!(format!("{}-a", content.as_str().unwrap_or_default())))
            }),
        );
        let second = seen.clone();
        registry.bind_filter(
            "title",
            filter_fn(move |_, content| {
                second.lock().unwrap().push(content.clone());
                Ok(json!(format!("{}-b", content.as_str().unwrap_or_default())))
            }),
        );

        let request = context(registry);
        let out = request.apply_filter("title", json!("x")).await.unwrap();

        assert_eq!(out, json!("x-a-b"));
        assert_eq!(*seen.lock().unwrap(), vec![json!("x"), json!("x-a")]);
    }

    #[tokio::test]
    async fn same_callback_bound_twice_fires_twice() {
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();
        let callback = Callback::event(event_fn(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        }));

        let mut registry = HookRegistry::new();
        registry.bind("saved", callback.clone()).bind("saved", callback);

        assert_eq!(registry.bindings(Channel::Event, "saved").len(), 2);
        context(registry).trigger_event("saved").await.unwrap();
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn failing_event_stops_later_hooks() {
        let reached = Arc::new(Mutex::new(false));
        let flag = reached.clone();

        let mut registry = HookRegistry::new();
        registry
            .bind_event("saved", event_fn(|_| Err(Failure::invalid_argument("nope"))))
            .bind_event(
                "saved",
                event_fn(move |_| {
                    *flag.lock().unwrap() = true;
                    Ok(())
                }),
            );

        let err = context(registry).trigger_event("saved").await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn channels_are_independent() {
        let mut registry = HookRegistry::new();
        registry
            .bind_event("save", event_fn(|_| Ok(())))
            .bind_filter("save", filter_fn(|_, v| Ok(v)));

        let events = registry.bindings(Channel::Event, "save");
        let filters = registry.bindings(Channel::Filter, "save");
        assert_eq!(events.len(), 1);
        assert_eq!(filters.len(), 1);
        assert_eq!(events[0].order, 0);
        assert_eq!(filters[0].order, 1);
        assert_eq!(registry.len(), 2);
    }
}
