mod helpers;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use helpers::{new_id, recorder, shim, TestClient};

use shim::{
    client::{Listener, ObjectData, ObjectId},
    host::{HostEffect, HostEvent, EMULATED_FD},
    interfaces::{WL_CALLBACK_INTERFACE, WL_REGISTRY_INTERFACE, WL_SEAT_INTERFACE},
    types::{DispatchError, MarshalError},
};

#[derive(Default)]
struct DestroyTracker {
    destroyed: Mutex<Vec<ObjectId>>,
}

impl ObjectData for DestroyTracker {
    fn destroyed(&self, object_id: ObjectId) {
        self.destroyed.lock().unwrap().push(object_id);
    }
}

#[test]
fn reconnect_invalidates_objects() {
    let client = TestClient::new();
    let old_display = client.connection.display();
    let surface = client.create_surface();

    client.connection.reconnect();
    assert!(client.connection.is_connected());
    assert!(!surface.is_alive());
    assert!(!client.registry.is_alive());
    assert!(!old_display.is_alive());
    assert_eq!(surface.send_request("commit", []), Err(MarshalError::InvalidId));

    // the new session advertises the globals again
    let registry =
        client.connection.display().send_request("get_registry", [new_id()]).unwrap().unwrap();
    let globals = recorder();
    let globals2 = globals.clone();
    registry
        .add_listener(
            Listener::new(&WL_REGISTRY_INTERFACE)
                .on("global", move |_, _, (name, interface, _): (u32, String, u32)| {
                    globals2.lock().unwrap().push((name, interface))
                })
                .unwrap(),
            None,
        )
        .unwrap();
    client.roundtrip();
    assert_eq!(*globals.lock().unwrap(), {
        let old = client.globals.lock().unwrap();
        old.iter().map(|(name, interface, _)| (*name, interface.clone())).collect::<Vec<_>>()
    });
    assert_eq!(client.host.take_effects(), vec![HostEffect::Disconnect]);
}

#[test]
fn disconnect() {
    let client = TestClient::new();
    let tracker = Arc::new(DestroyTracker::default());
    let seat = client.bind(&WL_SEAT_INTERFACE, 6);
    seat.set_user_data(tracker.clone()).unwrap();
    let callback = client.connection.display().send_request("sync", [new_id()]).unwrap().unwrap();
    callback.set_user_data(tracker.clone()).unwrap();

    client.connection.disconnect();
    client.connection.disconnect();
    assert!(!client.connection.is_connected());
    assert_eq!(client.host.take_effects(), vec![HostEffect::Disconnect]);

    let mut destroyed = tracker.destroyed.lock().unwrap().clone();
    destroyed.sort_by_key(|id| id.protocol_id());
    let mut expected = vec![seat.id(), callback.id()];
    expected.sort_by_key(|id| id.protocol_id());
    assert_eq!(destroyed, expected);

    // pending events were discarded
    assert_eq!(client.connection.pending_events(), 0);
    assert_eq!(client.connection.dispatch(), Err(DispatchError::Disconnected));
    assert_eq!(client.connection.flush(), Err(DispatchError::Disconnected));
    assert!(matches!(client.connection.prepare_read(), Err(DispatchError::Disconnected)));
    assert_eq!(
        client.connection.display().send_request("sync", [new_id()]),
        Err(MarshalError::Disconnected)
    );
}

#[test]
fn read_events() {
    let client = TestClient::new();
    assert_eq!(client.connection.get_fd(), EMULATED_FD);

    client.connection.display().send_request("sync", [new_id()]).unwrap();
    assert!(matches!(client.connection.prepare_read(), Err(DispatchError::WouldBlock)));
    assert_eq!(client.connection.dispatch_pending(), Ok(1));

    let (_surface, _xdg_surface, toplevel) = client.create_toplevel();
    let closed = Arc::new(AtomicUsize::new(0));
    let closed2 = closed.clone();
    toplevel
        .add_listener(
            Listener::new(&shim::interfaces::XDG_TOPLEVEL_INTERFACE)
                .on("close", move |_, _, ()| {
                    closed2.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap(),
            None,
        )
        .unwrap();
    client.roundtrip();

    client.host.push_event(HostEvent::CloseRequested { surface: 1 });
    let guard = client.connection.prepare_read().unwrap();
    assert_eq!(guard.connection_fd(), 0x7e00_0000);
    assert_eq!(guard.read(), Ok(1));
    assert_eq!(client.connection.pending_events(), 1);
    assert_eq!(closed.load(Ordering::SeqCst), 0);
    assert_eq!(client.connection.dispatch_pending(), Ok(1));
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn ready_callback() {
    let client = TestClient::new();
    client.connection.display().send_request("sync", [new_id()]).unwrap();

    let ready = Arc::new(AtomicUsize::new(0));
    let ready2 = ready.clone();
    client.connection.on_ready(move || {
        ready2.fetch_add(1, Ordering::SeqCst);
    });
    // an event is already pending
    assert_eq!(ready.load(Ordering::SeqCst), 1);

    client.connection.dispatch().unwrap();
    assert_eq!(ready.load(Ordering::SeqCst), 1);

    client.connection.wake();
    assert_eq!(ready.load(Ordering::SeqCst), 2);
    assert!(client.connection.is_readable());
}

#[test]
fn callbacks_can_disconnect() {
    let client = TestClient::new();
    for _ in 0..2 {
        let callback =
            client.connection.display().send_request("sync", [new_id()]).unwrap().unwrap();
        let connection = client.connection.clone();
        callback
            .add_listener(
                Listener::new(&WL_CALLBACK_INTERFACE)
                    .on("done", move |_, _, (_,): (u32,)| connection.disconnect())
                    .unwrap(),
                None,
            )
            .unwrap();
    }

    assert_eq!(client.connection.dispatch(), Ok(1));
    assert!(!client.connection.is_connected());
}
