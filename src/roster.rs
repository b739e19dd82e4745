use thiserror::Error;

use crate::directory::Entity;

/// Whole-roster fetch failure. Blocking until the host asks for an explicit
/// reload; nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("roster load failed: {0}")]
pub struct RosterLoadError(pub String);

#[derive(Debug, Clone)]
pub enum RosterPhase {
    Loading,
    Ready(RosterSnapshot),
    Failed(RosterLoadError),
}

/// Immutable roster for the session plus the disclosure cursor. The order is
/// arrival order from the source; `visible_count` only grows and resets only
/// on a full re-fetch.
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    entities: Vec<Entity>,
    visible_count: usize,
}

impl RosterSnapshot {
    fn new(entities: Vec<Entity>, page_size: usize) -> Self {
        let visible_count = page_size.min(entities.len());
        Self {
            entities,
            visible_count,
        }
    }
}

pub struct RosterStore {
    page_size: usize,
    phase: RosterPhase,
}

impl RosterStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            phase: RosterPhase::Loading,
        }
    }

    pub fn phase(&self) -> &RosterPhase {
        &self.phase
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, RosterPhase::Loading)
    }

    pub fn error(&self) -> Option<&RosterLoadError> {
        match &self.phase {
            RosterPhase::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Discards any prior snapshot and enters the loading phase. Called once
    /// per re-fetch; this is the only transition that resets the cursor.
    pub fn begin_load(&mut self) {
        self.phase = RosterPhase::Loading;
    }

    pub fn apply_roster(&mut self, entities: Vec<Entity>) {
        self.phase = RosterPhase::Ready(RosterSnapshot::new(entities, self.page_size));
    }

    pub fn apply_error(&mut self, error: RosterLoadError) {
        self.phase = RosterPhase::Failed(error);
    }

    /// Raises the disclosure cursor by `by`, clamped to the roster length.
    /// A call at the clamp boundary is a no-op, not an error. Returns whether
    /// the cursor moved.
    pub fn grow_visible(&mut self, by: usize) -> bool {
        let RosterPhase::Ready(snapshot) = &mut self.phase else {
            return false;
        };
        let next = snapshot.visible_count.saturating_add(by);
        let clamped = next.min(snapshot.entities.len());
        if clamped == snapshot.visible_count {
            return false;
        }
        tracing::debug!(
            from = snapshot.visible_count,
            to = clamped,
            "roster window grown"
        );
        snapshot.visible_count = clamped;
        true
    }

    pub fn visible_slice(&self) -> &[Entity] {
        match &self.phase {
            RosterPhase::Ready(snapshot) => &snapshot.entities[..snapshot.visible_count],
            _ => &[],
        }
    }

    pub fn visible_count(&self) -> usize {
        match &self.phase {
            RosterPhase::Ready(snapshot) => snapshot.visible_count,
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        match &self.phase {
            RosterPhase::Ready(snapshot) => snapshot.entities.len(),
            _ => 0,
        }
    }

    pub fn has_more(&self) -> bool {
        self.visible_count() < self.total()
    }

    /// Lookup by identity against the full snapshot, not just the visible
    /// window.
    pub fn find(&self, identity: &str) -> Option<&Entity> {
        match &self.phase {
            RosterPhase::Ready(snapshot) => {
                snapshot.entities.iter().find(|entity| entity.id == identity)
            }
            _ => None,
        }
    }
}

/// Scroll geometry forwarded by the host list view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSignal {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollSignal {
    /// One unit of slack absorbs fractional-pixel rounding in the host.
    pub fn near_bottom(&self) -> bool {
        (self.scroll_height - self.scroll_top).ceil() <= self.client_height + 1.0
    }
}

/// Pure disclosure policy layered on the store: grow by one page per
/// qualifying scroll signal. No network access; idempotent once the whole
/// roster is visible.
#[derive(Debug, Clone, Copy)]
pub struct Disclosure {
    pub page_size: usize,
}

impl Disclosure {
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    pub fn on_scroll(&self, store: &mut RosterStore, signal: ScrollSignal) -> bool {
        if !signal.near_bottom() || !store.has_more() {
            return false;
        }
        store.grow_visible(self.page_size)
    }
}
