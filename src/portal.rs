use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::config::Config;
use crate::data::{PhotoService, RosterService};
use crate::directory::Entity;
use crate::gallery::{self, GallerySet};
use crate::roster::{Disclosure, RosterLoadError, RosterStore, ScrollSignal};
use crate::selection::{self, SelectionError, SelectionEvent};

/// Change events for the presentation layer, replacing ambient reactivity
/// with explicit notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    RosterUpdated,
    SelectionUpdated,
    GalleryUpdated,
}

pub struct Options {
    pub roster_service: Arc<dyn RosterService>,
    pub photo_service: Arc<dyn PhotoService>,
    pub config: Config,
}

/// Read model handed to the presentation layer. Everything is a clone; the
/// engine keeps exclusive ownership of the live state.
#[derive(Debug, Clone)]
pub struct PortalSnapshot {
    pub loading: bool,
    pub error: Option<String>,
    pub visible: Vec<Entity>,
    pub has_more: bool,
    pub total: usize,
    pub active: Option<Entity>,
    pub gallery: Option<GallerySet>,
}

struct PendingRoster {
    request_id: u64,
    cancel_flag: Arc<AtomicBool>,
}

struct RosterResponse {
    request_id: u64,
    result: Result<Vec<Entity>, RosterLoadError>,
}

/// Session facade the host shell drives. Owns the store, the selection
/// coordinator, and the gallery engine; all state mutation happens on the
/// host thread, in the synchronous operations below and in `poll`.
pub struct Portal {
    roster: RosterStore,
    disclosure: Disclosure,
    selection: selection::Coordinator,
    gallery: gallery::Engine,
    roster_service: Arc<dyn RosterService>,
    responses_tx: Sender<RosterResponse>,
    responses_rx: Receiver<RosterResponse>,
    pending_roster: Option<PendingRoster>,
    next_request_id: u64,
    viewport_width: u32,
    notices: Vec<Sender<Notice>>,
}

impl Portal {
    pub fn new(options: Options) -> Self {
        let (responses_tx, responses_rx) = unbounded();
        let page_size = options.config.directory.page_size;
        let gallery_config = gallery::Config {
            size: options.config.gallery.size,
            refresh_interval: options.config.gallery.refresh_interval,
        };
        Self {
            roster: RosterStore::new(page_size),
            disclosure: Disclosure::new(page_size),
            selection: selection::Coordinator::new(),
            gallery: gallery::Engine::new(options.photo_service, gallery_config),
            roster_service: options.roster_service,
            responses_tx,
            responses_rx,
            pending_roster: None,
            next_request_id: 0,
            viewport_width: options.config.gallery.default_viewport_width,
            notices: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<Notice> {
        let (tx, rx) = unbounded();
        self.notices.push(tx);
        rx
    }

    pub fn subscribe_selection(&mut self) -> Receiver<SelectionEvent> {
        self.selection.subscribe()
    }

    /// Fetches the roster: exactly one network call, no automatic retry. Any
    /// in-flight fetch is superseded, and the previous selection is cleared
    /// since it may reference entities the session no longer considers
    /// fresh.
    pub fn reload(&mut self) {
        if let Some(pending) = self.pending_roster.take() {
            pending.cancel_flag.store(true, Ordering::SeqCst);
        }
        let had_selection = self.selection.current().is_some();
        self.selection.clear();
        self.gallery.stop();
        self.roster.begin_load();

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.pending_roster = Some(PendingRoster {
            request_id,
            cancel_flag: cancel_flag.clone(),
        });

        let service = self.roster_service.clone();
        let tx = self.responses_tx.clone();
        thread::spawn(move || {
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let result = service
                .fetch_roster()
                .map_err(|err| RosterLoadError(format!("{err:#}")));
            if cancel_flag.load(Ordering::SeqCst) {
                return;
            }
            let _ = tx.send(RosterResponse { request_id, result });
        });

        self.emit(Notice::RosterUpdated);
        if had_selection {
            self.emit(Notice::SelectionUpdated);
            self.emit(Notice::GalleryUpdated);
        }
    }

    pub fn handle_scroll(&mut self, signal: ScrollSignal) -> bool {
        let grew = self.disclosure.on_scroll(&mut self.roster, signal);
        if grew {
            self.emit(Notice::RosterUpdated);
        }
        grew
    }

    pub fn select(&mut self, identity: &str) -> Result<(), SelectionError> {
        let entity = self.selection.select(&self.roster, identity)?;
        self.gallery.select(&entity.id, self.viewport_width);
        self.emit(Notice::SelectionUpdated);
        self.emit(Notice::GalleryUpdated);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if self.selection.current().is_none() {
            return;
        }
        self.selection.clear();
        self.gallery.stop();
        self.emit(Notice::SelectionUpdated);
        self.emit(Notice::GalleryUpdated);
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    /// Applies background results that have arrived since the last call and
    /// fires due gallery ticks. Returns whether anything changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(response) = self.responses_rx.try_recv() {
            changed |= self.handle_roster_response(response);
        }
        if self.gallery.poll(self.viewport_width, now) {
            self.emit(Notice::GalleryUpdated);
            changed = true;
        }
        changed
    }

    pub fn snapshot(&self) -> PortalSnapshot {
        PortalSnapshot {
            loading: self.roster.is_loading(),
            error: self.roster.error().map(|err| err.to_string()),
            visible: self.roster.visible_slice().to_vec(),
            has_more: self.roster.has_more(),
            total: self.roster.total(),
            active: self.selection.current().cloned(),
            gallery: self.gallery.gallery().cloned(),
        }
    }

    /// Tears the session down: supersedes any in-flight roster fetch and
    /// stops the gallery loop. Idempotent.
    pub fn close(&mut self) {
        if let Some(pending) = self.pending_roster.take() {
            pending.cancel_flag.store(true, Ordering::SeqCst);
        }
        self.gallery.stop();
        self.selection.clear();
    }

    fn handle_roster_response(&mut self, response: RosterResponse) -> bool {
        let Some(pending) = &self.pending_roster else {
            return false;
        };
        if pending.request_id != response.request_id
            || pending.cancel_flag.load(Ordering::SeqCst)
        {
            return false;
        }
        self.pending_roster = None;

        match response.result {
            Ok(entities) => self.roster.apply_roster(entities),
            Err(err) => {
                tracing::warn!(error = %err, "roster load failed");
                self.roster.apply_error(err);
            }
        }
        self.emit(Notice::RosterUpdated);
        true
    }

    fn emit(&mut self, notice: Notice) {
        self.notices.retain(|tx| tx.send(notice).is_ok());
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MockPhotoService, MockRosterService};
    use crate::gallery::PhotoSlot;
    use std::time::Duration;

    fn portal_with(roster: Arc<MockRosterService>, photos: Arc<MockPhotoService>) -> Portal {
        Portal::new(Options {
            roster_service: roster,
            photo_service: photos,
            config: Config::default(),
        })
    }

    fn wait_for(portal: &mut Portal, probe: impl Fn(&Portal) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            portal.poll(Instant::now());
            if probe(portal) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("portal never reached the expected state");
    }

    fn bottom_signal() -> ScrollSignal {
        ScrollSignal {
            scroll_top: 500.0,
            scroll_height: 1000.0,
            client_height: 500.0,
        }
    }

    fn gallery_loaded(portal: &Portal) -> bool {
        portal
            .snapshot()
            .gallery
            .is_some_and(|gallery| {
                gallery
                    .slots()
                    .iter()
                    .all(|slot| matches!(slot, PhotoSlot::Loaded(_)))
            })
    }

    #[test]
    fn reload_populates_first_page() {
        let roster = Arc::new(MockRosterService::sized(45));
        let mut portal = portal_with(roster.clone(), Arc::new(MockPhotoService::new()));

        portal.reload();
        assert!(portal.snapshot().loading);
        wait_for(&mut portal, |portal| !portal.snapshot().loading);

        let snapshot = portal.snapshot();
        assert_eq!(snapshot.visible.len(), 20);
        assert_eq!(snapshot.total, 45);
        assert!(snapshot.has_more);
        assert_eq!(roster.calls(), 1);
    }

    #[test]
    fn reload_failure_surfaces_blocking_error() {
        let roster = Arc::new(MockRosterService::failing("roster source down"));
        let mut portal = portal_with(roster, Arc::new(MockPhotoService::new()));

        portal.reload();
        wait_for(&mut portal, |portal| portal.snapshot().error.is_some());

        let snapshot = portal.snapshot();
        assert!(snapshot.error.unwrap().contains("roster source down"));
        assert!(snapshot.visible.is_empty());
        assert!(!snapshot.has_more);
    }

    #[test]
    fn scroll_grows_the_visible_window() {
        let mut portal = portal_with(
            Arc::new(MockRosterService::sized(45)),
            Arc::new(MockPhotoService::new()),
        );
        portal.reload();
        wait_for(&mut portal, |portal| !portal.snapshot().loading);

        assert!(portal.handle_scroll(bottom_signal()));
        assert_eq!(portal.snapshot().visible.len(), 40);
    }

    #[test]
    fn select_starts_gallery_with_placeholders() {
        let mut portal = portal_with(
            Arc::new(MockRosterService::sized(45)),
            Arc::new(MockPhotoService::new()),
        );
        portal.reload();
        wait_for(&mut portal, |portal| !portal.snapshot().loading);

        portal.select("entity-3").unwrap();
        let snapshot = portal.snapshot();
        assert_eq!(snapshot.active.unwrap().id, "entity-3");
        let gallery = snapshot.gallery.unwrap();
        assert_eq!(gallery.entity_id(), "entity-3");
        assert!(gallery
            .slots()
            .iter()
            .all(|slot| matches!(slot, PhotoSlot::Placeholder)));

        wait_for(&mut portal, gallery_loaded);
    }

    #[test]
    fn selecting_unknown_identity_is_a_warning_not_a_crash() {
        let mut portal = portal_with(
            Arc::new(MockRosterService::sized(5)),
            Arc::new(MockPhotoService::new()),
        );
        portal.reload();
        wait_for(&mut portal, |portal| !portal.snapshot().loading);

        portal.select("entity-2").unwrap();
        let err = portal.select("entity-99").unwrap_err();
        assert_eq!(err, SelectionError::LookupMiss("entity-99".into()));
        assert_eq!(portal.snapshot().active.unwrap().id, "entity-2");
    }

    #[test]
    fn reselect_issues_no_extra_fetches() {
        let photos = Arc::new(MockPhotoService::new());
        let mut portal = portal_with(Arc::new(MockRosterService::sized(5)), photos.clone());
        portal.reload();
        wait_for(&mut portal, |portal| !portal.snapshot().loading);

        portal.select("entity-1").unwrap();
        wait_for(&mut portal, gallery_loaded);
        assert_eq!(photos.request_count(), 9);

        portal.select("entity-1").unwrap();
        portal.poll(Instant::now());
        assert_eq!(photos.request_count(), 9);
        assert!(gallery_loaded(&portal));
    }

    #[test]
    fn reload_clears_selection_and_gallery() {
        let mut portal = portal_with(
            Arc::new(MockRosterService::sized(5)),
            Arc::new(MockPhotoService::new()),
        );
        portal.reload();
        wait_for(&mut portal, |portal| !portal.snapshot().loading);
        portal.select("entity-0").unwrap();
        wait_for(&mut portal, gallery_loaded);

        portal.reload();
        let snapshot = portal.snapshot();
        assert!(snapshot.active.is_none());
        assert!(snapshot.gallery.is_none());
        wait_for(&mut portal, |portal| !portal.snapshot().loading);
        assert_eq!(portal.snapshot().visible.len(), 5);
    }

    #[test]
    fn notices_reach_subscribers() {
        let mut portal = portal_with(
            Arc::new(MockRosterService::sized(45)),
            Arc::new(MockPhotoService::new()),
        );
        let notices = portal.subscribe();

        portal.reload();
        wait_for(&mut portal, |portal| !portal.snapshot().loading);
        portal.select("entity-0").unwrap();

        let seen: Vec<Notice> = notices.try_iter().collect();
        assert!(seen.contains(&Notice::RosterUpdated));
        assert!(seen.contains(&Notice::SelectionUpdated));
        assert!(seen.contains(&Notice::GalleryUpdated));
    }

    #[test]
    fn close_is_idempotent() {
        let mut portal = portal_with(
            Arc::new(MockRosterService::sized(5)),
            Arc::new(MockPhotoService::new()),
        );
        portal.reload();
        portal.close();
        portal.close();
        assert!(portal.snapshot().gallery.is_none());
    }
}
