//! Event subscription primitives for scene nodes.
//!
//! Registering a handler returns a [`Subscription`] that must be handed back
//! to [`EventEmitter::off`] to release it. Subscriptions are not `Clone`, so
//! each registration is released at most once.

use eframe::egui::Vec2;
use std::rc::Rc;

/// Events emitted by maps and layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoEvent {
    /// The view moved.
    Pan,
    /// The zoom level changed.
    Zoom,
    /// The viewport changed size.
    Resize,
}

/// Payload delivered to event handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventArgs {
    pub event: GeoEvent,
    /// Requested movement in viewport pixels (zero for zoom and resize)
    pub delta: Vec2,
}

impl EventArgs {
    pub fn new(event: GeoEvent) -> Self {
        Self {
            event,
            delta: Vec2::ZERO,
        }
    }

    pub fn pan(delta: Vec2) -> Self {
        Self {
            event: GeoEvent::Pan,
            delta,
        }
    }
}

/// Shared handler callback.
pub type Handler = Rc<dyn Fn(&EventArgs)>;

/// Handle for a registered handler.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a subscription leaves its handler registered"]
pub struct Subscription {
    id: u64,
    event: GeoEvent,
}

impl Subscription {
    pub fn event(&self) -> GeoEvent {
        self.event
    }
}

/// List of handlers registered on a node.
#[derive(Default)]
pub struct EventEmitter {
    next_id: u64,
    handlers: Vec<(u64, GeoEvent, Handler)>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an event.
    pub fn on(&mut self, event: GeoEvent, handler: impl Fn(&EventArgs) + 'static) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.push((id, event, Rc::new(handler)));
        Subscription { id, event }
    }

    /// Releases a subscription. Returns false if the handler was already gone.
    pub fn off(&mut self, subscription: Subscription) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(id, _, _)| *id != subscription.id);
        self.handlers.len() != before
    }

    /// Snapshot of the handlers for an event.
    ///
    /// Dispatch iterates the snapshot so handlers may subscribe or
    /// unsubscribe while the event is being delivered.
    pub fn handlers(&self, event: GeoEvent) -> Vec<Handler> {
        self.handlers
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, h)| Rc::clone(h))
            .collect()
    }

    pub fn listener_count(&self, event: GeoEvent) -> usize {
        self.handlers.iter().filter(|(_, e, _)| *e == event).count()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("next_id", &self.next_id)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
