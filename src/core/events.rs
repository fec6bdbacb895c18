//! Engine notifications for the rendering surface
//!
//! The rendering layer subscribes once and drains a channel; the engine
//! never calls into it. The `Updated` event is coalesced by the refresh
//! tick (at most one per tick), everything else is emitted as it happens.

use std::sync::mpsc::{channel, Receiver, Sender};

/// Notifications exposed to the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Coalesced "new data is visible" signal, at most one per refresh tick.
    Updated,
    /// All model and series data was cleared.
    DataReset,
    /// The widget index map was rebuilt.
    WidgetCountChanged,
    /// The frame's licensed-features flag flipped.
    LicensedFeaturesChanged,
    /// An action was triggered or its timer toggled.
    ActionStatusChanged,
    /// The per-series point count setting changed.
    PointsChanged,
    /// The display precision setting changed.
    PrecisionChanged,
    /// The terminal widget was enabled or disabled.
    TerminalEnabledChanged,
    /// The action panel visibility flag changed.
    ShowActionPanelChanged,
}

/// Fan-out hub for [`DashboardEvent`] notifications.
///
/// Subscribers that drop their receiver are pruned on the next emit.
#[derive(Default)]
pub struct EventHub {
    subscribers: Vec<Sender<DashboardEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&mut self) -> Receiver<DashboardEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver an event to every live subscriber.
    pub fn emit(&mut self, event: DashboardEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
