use crate::types::{CodecError, ListenerError, MarshalError};

use super::*;

// unknown opcodes do nothing
expand_test!(unknown_opcode, {
    let (connection, _host) = connect(Config::default());
    let display = connection.display();
    assert_eq!(display.marshal(42, None, 1, 0, []), Ok(None));
    assert_eq!(connection.pending_events(), 0);
    assert!(display.is_alive());
});

expand_test!(unknown_request_name_is_ignored, {
    let (connection, _host) = connect(Config::default());
    let display = connection.display();
    assert_eq!(display.send_request("frobnicate", []), Ok(None));
    assert_eq!(connection.pending_events(), 0);
});

expand_test!(bad_argument_count, {
    let (connection, _host) = connect(Config::default());
    let display = connection.display();
    assert_eq!(
        display.send_request("sync", []),
        Err(MarshalError::Codec(CodecError::ArgumentCount { expected: 1, got: 0 }))
    );
    assert_eq!(
        display.send_request("sync", [Argument::Uint(3)]),
        Err(MarshalError::Codec(CodecError::ArgumentMismatch { index: 0, expected: 'n', got: 'u' }))
    );
});

expand_test!(null_proxy, {
    let (connection, _host) = connect(Config::default());
    let proxy = Proxy::from_id(&connection, ObjectId::null());
    assert!(!proxy.is_alive());
    assert_eq!(proxy.send_request("destroy", []), Ok(None));
    assert_eq!(proxy.marshal(0, None, 1, 0, []), Err(MarshalError::InvalidId));
    assert!(proxy.set_tag("nothing").is_err());
    assert_eq!(proxy.tag(), None);
});

expand_test!(requests_after_disconnect, {
    let (connection, _host) = connect(Config::default());
    let display = connection.display();
    connection.disconnect();
    assert_eq!(display.send_request("sync", [new_id()]), Err(MarshalError::Disconnected));
    assert_eq!(connection.dispatch(), Err(crate::types::DispatchError::Disconnected));
});

expand_test!(listener_errors, {
    let (connection, _host) = connect(Config::default());
    let callback = connection.display().send_request("sync", [new_id()]).unwrap().unwrap();

    assert!(matches!(
        Listener::new(&WL_CALLBACK_INTERFACE).on("finished", |_, _, (): ()| {}),
        Err(ListenerError::Lookup(_))
    ));

    assert_eq!(
        callback.add_listener(Listener::new(&WL_SURFACE_INTERFACE), None),
        Err(ListenerError::WrongInterface { expected: "wl_callback", got: "wl_surface" })
    );

    callback.add_listener(Listener::new(&WL_CALLBACK_INTERFACE), None).unwrap();
    assert_eq!(
        callback.add_listener(Listener::new(&WL_CALLBACK_INTERFACE), None),
        Err(ListenerError::AlreadySet)
    );

    connection.roundtrip().unwrap();
    assert_eq!(
        callback.add_listener(Listener::new(&WL_CALLBACK_INTERFACE), None),
        Err(ListenerError::InvalidId)
    );
});

expand_test!(listener_set_twice_emits_nothing, {
    let (connection, _host) = connect(Config::default());
    let shm = bind(&connection, 2, &WL_SHM_INTERFACE, 1);
    connection.roundtrip().unwrap();

    let formats = recorder();
    let formats2 = formats.clone();
    shm.add_listener(
        Listener::new(&WL_SHM_INTERFACE)
            .on("format", move |_, _, (format,): (u32,)| formats2.lock().unwrap().push(format))
            .unwrap(),
        None,
    )
    .unwrap();
    assert_eq!(connection.pending_events(), 1);
    assert_eq!(
        shm.add_listener(Listener::new(&WL_SHM_INTERFACE), None),
        Err(ListenerError::AlreadySet)
    );
    assert_eq!(connection.pending_events(), 1);

    connection.roundtrip().unwrap();
    assert_eq!(*formats.lock().unwrap(), vec![wl_shm::FORMAT_ARGB8888]);
});
