mod helpers;

use helpers::{new_id, shim, TestClient};

use shim::{
    config::{Config, GlobalSpec},
    interfaces::{
        WL_COMPOSITOR_INTERFACE, WL_SEAT_INTERFACE, WL_SHM_INTERFACE,
        ZXDG_DECORATION_MANAGER_V1_INTERFACE,
    },
    protocol::Argument,
};

#[test]
fn default_globals() {
    let client = TestClient::new();

    assert_eq!(
        *client.globals.lock().unwrap(),
        vec![
            (1, "wl_compositor".to_owned(), 5),
            (2, "wl_shm".to_owned(), 1),
            (3, "xdg_wm_base".to_owned(), 4),
            (4, "wl_seat".to_owned(), 8),
            (5, "zxdg_decoration_manager_v1".to_owned(), 1),
        ]
    );
}

#[test]
fn bind_version() {
    let client = TestClient::new();

    let compositor = client.bind(&WL_COMPOSITOR_INTERFACE, 3);
    assert_eq!(compositor.version(), 3);

    // clamped to what this implementation supports
    let seat = client.bind(&WL_SEAT_INTERFACE, 8);
    assert_eq!(seat.version(), 6);

    // and to what the global advertises
    let compositor = client.bind(&WL_COMPOSITOR_INTERFACE, 6);
    assert_eq!(compositor.version(), 5);

    let manager = client.bind(&ZXDG_DECORATION_MANAGER_V1_INTERFACE, 1);
    assert_eq!(manager.version(), 1);
}

#[test]
fn globals_are_singletons() {
    let client = TestClient::new();

    let shm = client.bind(&WL_SHM_INTERFACE, 1);
    let shm2 = client.bind(&WL_SHM_INTERFACE, 1);
    assert_eq!(shm, shm2);
}

#[test]
fn bind_unknown_global() {
    let client = TestClient::new();

    let created = client
        .registry
        .send_request(
            "bind",
            [
                Argument::Uint(42),
                Argument::Str(Some("wl_output".into())),
                Argument::Uint(1),
                new_id(),
            ],
        )
        .unwrap();
    assert!(created.is_none());

    // the name does not match the requested interface
    let created = client
        .registry
        .marshal(
            0,
            Some(&WL_SEAT_INTERFACE),
            1,
            0,
            [
                Argument::Uint(1),
                Argument::Str(Some("wl_seat".into())),
                Argument::Uint(1),
                new_id(),
            ],
        )
        .unwrap();
    assert!(created.is_none());
}

#[test]
fn custom_globals() {
    let client = TestClient::with_config(Config {
        globals: vec![GlobalSpec::new("wl_shm", 1), GlobalSpec::new("wl_seat", 5)],
        ..Config::default()
    });

    assert_eq!(
        *client.globals.lock().unwrap(),
        vec![(1, "wl_shm".to_owned(), 1), (2, "wl_seat".to_owned(), 5)]
    );
    let seat = client.bind(&WL_SEAT_INTERFACE, 8);
    assert_eq!(seat.version(), 5);
}

#[test]
fn seat_capabilities() {
    use shim::client::Listener;

    let client = TestClient::new();
    let seat = client.bind(&WL_SEAT_INTERFACE, 5);

    let caps = helpers::recorder();
    let caps2 = caps.clone();
    seat.add_listener(
        Listener::new(&WL_SEAT_INTERFACE)
            .on("capabilities", move |_, _, (caps,): (u32,)| caps2.lock().unwrap().push(caps))
            .unwrap(),
        None,
    )
    .unwrap();
    client.roundtrip();

    assert_eq!(*caps.lock().unwrap(), vec![2, 1]);
}
