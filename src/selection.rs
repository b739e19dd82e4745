use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;

use crate::directory::Entity;
use crate::roster::RosterStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("identity not present in roster: {0}")]
    LookupMiss(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    Selected(Entity),
    Cleared,
}

/// Tracks the single active entity shared between the list and detail views.
/// Subscribers hear about every successful `select`, including re-selecting
/// the current identity; downstream consumers decide whether that means
/// restarting work.
pub struct Coordinator {
    active: Option<Entity>,
    subscribers: Vec<Sender<SelectionEvent>>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            active: None,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<SelectionEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn current(&self) -> Option<&Entity> {
        self.active.as_ref()
    }

    /// Looks the identity up in the full snapshot. A miss leaves the prior
    /// selection in place and reports the miss instead of crashing.
    pub fn select(&mut self, store: &RosterStore, identity: &str) -> Result<Entity, SelectionError> {
        let Some(entity) = store.find(identity).cloned() else {
            tracing::warn!(identity, "selection lookup missed the roster");
            return Err(SelectionError::LookupMiss(identity.to_string()));
        };
        self.active = Some(entity.clone());
        self.notify(SelectionEvent::Selected(entity.clone()));
        Ok(entity)
    }

    pub fn clear(&mut self) {
        if self.active.take().is_some() {
            self.notify(SelectionEvent::Cleared);
        }
    }

    fn notify(&mut self, event: SelectionEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
