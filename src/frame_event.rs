//! Frame-boundary event
//!
//! The presentation side calls [`AfterFrameEvent::trigger`] once per presented
//! frame. Subscribers register a callback and keep the returned [`EventHook`];
//! dropping the hook unregisters the callback.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type FrameCallback = Box<dyn FnMut() + Send>;

struct RegisteredHook {
    id: u64,
    name: String,
    callback: FrameCallback,
}

#[derive(Default)]
struct HookRegistry {
    next_id: u64,
    hooks: Vec<RegisteredHook>,
}

/// Registry of callbacks run after every presented frame
#[derive(Clone, Default)]
pub struct AfterFrameEvent {
    registry: Arc<Mutex<HookRegistry>>,
}

impl AfterFrameEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`; it runs until the returned hook is dropped
    pub fn register(
        &self,
        name: impl Into<String>,
        callback: impl FnMut() + Send + 'static,
    ) -> EventHook {
        let name = name.into();
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.hooks.push(RegisteredHook {
            id,
            name: name.clone(),
            callback: Box::new(callback),
        });
        tracing::debug!(hook = %name, "registered after-frame hook");

        EventHook {
            id,
            name,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Run every registered callback in registration order
    ///
    /// Callbacks must not register or drop hooks of this event.
    pub fn trigger(&self) {
        let mut registry = self.registry.lock();
        for hook in registry.hooks.iter_mut() {
            (hook.callback)();
        }
    }

    pub fn hook_count(&self) -> usize {
        self.registry.lock().hooks.len()
    }

    pub fn hook_names(&self) -> Vec<String> {
        self.registry
            .lock()
            .hooks
            .iter()
            .map(|hook| hook.name.clone())
            .collect()
    }
}

/// Registration guard; unregisters its callback on drop
#[must_use = "dropping the hook unregisters the callback"]
pub struct EventHook {
    id: u64,
    name: String,
    registry: Weak<Mutex<HookRegistry>>,
}

impl EventHook {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for EventHook {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().hooks.retain(|hook| hook.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_trigger_runs_registered_hooks() {
        let event = AfterFrameEvent::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let hook = event.register("counter", move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        event.trigger();
        event.trigger();
        assert_eq!(count.load(Ordering::Relaxed), 2);
        assert_eq!(hook.name(), "counter");
        assert_eq!(event.hook_names(), vec!["counter".to_string()]);
    }

    #[test]
    fn test_dropping_hook_unregisters() {
        let event = AfterFrameEvent::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let hook = event.register("counter", move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        drop(hook);

        event.trigger();
        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(event.hook_count(), 0);
    }

    #[test]
    fn test_hook_outliving_event_is_harmless() {
        let event = AfterFrameEvent::new();
        let hook = event.register("late", || {});
        drop(event);
        drop(hook);
    }
}
