use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rand::Rng;
use thiserror::Error;

use crate::data::PhotoService;
use crate::photos::{PhotoRequest, SizeTier, RANDOM_SEED_SPAN};

#[derive(Debug, Clone)]
pub struct Config {
    pub size: usize,
    pub refresh_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: 9,
            refresh_interval: Duration::from_secs(10),
        }
    }
}

/// One refresh tick failed. Transient: the previous gallery content stays
/// visible and the next interval retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gallery refresh failed: {0}")]
pub struct GalleryTickError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSlot {
    Placeholder,
    Loaded(String),
}

/// The fixed-size photo set owned by the live refresh loop. The presentation
/// layer only reads it; `refreshing` asks for the degraded (blurred)
/// treatment while a tick is in flight, and `error` is the soft indicator
/// layered over stale-but-valid content after a failed tick.
#[derive(Debug, Clone)]
pub struct GallerySet {
    entity_id: String,
    generation: u64,
    slots: Vec<PhotoSlot>,
    refreshing: bool,
    error: Option<GalleryTickError>,
}

impl GallerySet {
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn slots(&self) -> &[PhotoSlot] {
        &self.slots
    }

    pub fn refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn error(&self) -> Option<&GalleryTickError> {
        self.error.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Starting,
    Awaiting,
    Steady,
    Stopped,
}

struct TickResult {
    generation: u64,
    outcome: Result<Vec<String>, GalleryTickError>,
}

/// Keeps a continuously refreshing gallery for the selected entity. At most
/// one loop is live; a selection change supersedes the old loop by raising
/// its cancel flag and bumping the generation counter, so results from a
/// superseded tick can never reach the current gallery. There is no true
/// request cancellation; stale results are suppressed on arrival.
pub struct Engine {
    service: Arc<dyn PhotoService>,
    config: Config,
    generation: u64,
    state: LoopState,
    gallery: Option<GallerySet>,
    cancel: Option<Arc<AtomicBool>>,
    tick_in_flight: bool,
    next_tick_at: Option<Instant>,
    results_tx: Sender<TickResult>,
    results_rx: Receiver<TickResult>,
}

impl Engine {
    pub fn new(service: Arc<dyn PhotoService>, config: Config) -> Self {
        let (results_tx, results_rx) = unbounded();
        Self {
            service,
            config,
            generation: 0,
            state: LoopState::Idle,
            gallery: None,
            cancel: None,
            tick_in_flight: false,
            next_tick_at: None,
            results_tx,
            results_rx,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn gallery(&self) -> Option<&GallerySet> {
        self.gallery.as_ref()
    }

    fn is_live(&self) -> bool {
        matches!(
            self.state,
            LoopState::Starting | LoopState::Awaiting | LoopState::Steady
        )
    }

    /// Starts (or keeps) the loop for `identity`. Re-selecting the identity
    /// the loop already serves is a no-op: the gallery is not reset and no
    /// extra fetch is issued.
    pub fn select(&mut self, identity: &str, viewport_width: u32) {
        if self.is_live()
            && self
                .gallery
                .as_ref()
                .is_some_and(|gallery| gallery.entity_id == identity)
        {
            tracing::debug!(identity, "gallery loop already live");
            return;
        }

        self.supersede();
        self.generation += 1;
        self.cancel = Some(Arc::new(AtomicBool::new(false)));
        self.gallery = Some(GallerySet {
            entity_id: identity.to_string(),
            generation: self.generation,
            slots: vec![PhotoSlot::Placeholder; self.config.size],
            refreshing: false,
            error: None,
        });
        self.state = LoopState::Starting;
        self.tick_in_flight = false;
        self.next_tick_at = None;
        tracing::debug!(identity, generation = self.generation, "gallery loop started");

        self.spawn_tick(viewport_width);
        self.state = LoopState::Awaiting;
    }

    /// Applies settled ticks and fires the next one when due. All gallery
    /// mutation happens here, on the owning thread.
    pub fn poll(&mut self, viewport_width: u32, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(result) = self.results_rx.try_recv() {
            changed |= self.apply(result, now);
        }

        if !self.tick_in_flight && self.is_live() {
            if let Some(due) = self.next_tick_at {
                if now >= due {
                    self.spawn_tick(viewport_width);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Tears the loop down: the schedule is cancelled synchronously and the
    /// generation is bumped so any in-flight results arrive orphaned.
    pub fn stop(&mut self) {
        self.supersede();
        self.generation += 1;
        self.gallery = None;
        self.tick_in_flight = false;
        self.next_tick_at = None;
        if !matches!(self.state, LoopState::Idle) {
            self.state = LoopState::Stopped;
        }
    }

    fn supersede(&mut self) {
        if let Some(flag) = self.cancel.take() {
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// One tick: fan out one request per slot (all issued before any is
    /// joined), then deliver the whole set or the first failure. Partial
    /// results never reach the gallery.
    fn spawn_tick(&mut self, viewport_width: u32) {
        let Some(gallery) = &mut self.gallery else {
            return;
        };
        gallery.refreshing = true;
        self.tick_in_flight = true;
        self.next_tick_at = None;

        let generation = self.generation;
        let cancel = self
            .cancel
            .get_or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone();
        let service = self.service.clone();
        let tx = self.results_tx.clone();
        let count = self.config.size;
        let tier = SizeTier::for_viewport(viewport_width);

        thread::spawn(move || {
            let workers: Vec<_> = (0..count)
                .map(|_| {
                    let service = service.clone();
                    thread::spawn(move || {
                        let seed = rand::thread_rng().gen_range(0..RANDOM_SEED_SPAN);
                        service.fetch_photo(&PhotoRequest::for_tier(tier, seed))
                    })
                })
                .collect();

            let mut urls = Vec::with_capacity(count);
            let mut failure: Option<GalleryTickError> = None;
            for worker in workers {
                match worker.join() {
                    Ok(Ok(url)) => urls.push(url),
                    Ok(Err(err)) => {
                        failure.get_or_insert(GalleryTickError(err.to_string()));
                    }
                    Err(_) => {
                        failure.get_or_insert(GalleryTickError("photo worker panicked".into()));
                    }
                }
            }

            if cancel.load(Ordering::SeqCst) {
                return;
            }
            let outcome = match failure {
                Some(err) => Err(err),
                None => Ok(urls),
            };
            let _ = tx.send(TickResult {
                generation,
                outcome,
            });
        });
    }

    fn apply(&mut self, result: TickResult, now: Instant) -> bool {
        if result.generation != self.generation {
            tracing::debug!(
                stale = result.generation,
                current = self.generation,
                "discarded stale gallery tick"
            );
            return false;
        }
        let Some(gallery) = &mut self.gallery else {
            return false;
        };

        self.tick_in_flight = false;
        gallery.refreshing = false;
        match result.outcome {
            Ok(urls) => {
                gallery.slots = urls.into_iter().map(PhotoSlot::Loaded).collect();
                gallery.error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "gallery tick failed; retrying next interval");
                gallery.error = Some(err);
            }
        }
        self.state = LoopState::Steady;
        self.next_tick_at = Some(now + self.config.refresh_interval);
        true
    }
}
