use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rolodex::config::Config;
use rolodex::data::{MockPhotoService, MockRosterService};
use rolodex::gallery::PhotoSlot;
use rolodex::portal::{Options, Portal};
use rolodex::roster::ScrollSignal;

fn portal_for(total: usize) -> Portal {
    Portal::new(Options {
        roster_service: Arc::new(MockRosterService::sized(total)),
        photo_service: Arc::new(MockPhotoService::new()),
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

fn gallery_is(portal: &Portal, identity: &str, loaded: bool) -> bool {
    portal.snapshot().gallery.is_some_and(|gallery| {
        gallery.entity_id() == identity
            && gallery.slots().iter().all(|slot| match slot {
                PhotoSlot::Loaded(_) => loaded,
                PhotoSlot::Placeholder => !loaded,
            })
    })
}

#[test]
fn browse_select_and_switch() {
    let mut portal = portal_for(45);

    // Roster load: first page of 20 out of 45.
    portal.reload();
    wait_for(&mut portal, |portal| !portal.snapshot().loading);
    let snapshot = portal.snapshot();
    assert_eq!(snapshot.visible.len(), 20);
    assert_eq!(snapshot.total, 45);
    assert!(snapshot.has_more);

    // Three near-bottom signals: 40, 45, then a no-op at the end.
    assert!(portal.handle_scroll(bottom_signal()));
    assert_eq!(portal.snapshot().visible.len(), 40);
    assert!(portal.handle_scroll(bottom_signal()));
    assert_eq!(portal.snapshot().visible.len(), 45);
    assert!(!portal.handle_scroll(bottom_signal()));
    assert_eq!(portal.snapshot().visible.len(), 45);
    assert!(!portal.snapshot().has_more);

    // Select A: placeholders first, then a full set of loaded slots.
    portal.select("entity-3").unwrap();
    assert!(gallery_is(&portal, "entity-3", false));
    wait_for(&mut portal, |portal| gallery_is(portal, "entity-3", true));

    // Switch to B before the refresh interval elapses: B restarts from
    // placeholders and A's loop never writes into B's gallery.
    portal.select("entity-7").unwrap();
    assert!(gallery_is(&portal, "entity-7", false));
    wait_for(&mut portal, |portal| gallery_is(portal, "entity-7", true));
    assert_eq!(portal.snapshot().active.unwrap().id, "entity-7");
}

#[test]
fn reload_resets_the_session() {
    let mut portal = portal_for(45);

    portal.reload();
    wait_for(&mut portal, |portal| !portal.snapshot().loading);
    portal.handle_scroll(bottom_signal());
    portal.select("entity-0").unwrap();
    wait_for(&mut portal, |portal| gallery_is(portal, "entity-0", true));

    portal.reload();
    let snapshot = portal.snapshot();
    assert!(snapshot.active.is_none());
    assert!(snapshot.gallery.is_none());

    wait_for(&mut portal, |portal| !portal.snapshot().loading);
    let snapshot = portal.snapshot();
    assert_eq!(snapshot.visible.len(), 20);
    assert!(snapshot.active.is_none());
}

#[test]
fn selection_events_fan_out_to_the_detail_view() {
    let mut portal = portal_for(5);
    let selection_events = portal.subscribe_selection();

    portal.reload();
    wait_for(&mut portal, |portal| !portal.snapshot().loading);

    portal.select("entity-1").unwrap();
    portal.select("entity-1").unwrap();
    portal.clear_selection();

    assert_eq!(selection_events.len(), 3);
}
