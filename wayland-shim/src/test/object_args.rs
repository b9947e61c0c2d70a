use crate::types::MarshalError;

use super::*;

// object arguments must be live objects of the expected interface
expand_test!(object_args, {
    let (connection, _host) = connect(Config::default());
    let surface = create_surface(&connection);
    let other = create_surface(&connection);
    let buffer = create_buffer(&connection, 7);

    assert_eq!(
        surface.send_request(
            "attach",
            [Argument::Object(other.id()), Argument::Int(0), Argument::Int(0)]
        ),
        Err(MarshalError::ArgumentInterface {
            index: 0,
            expected: "wl_buffer",
            got: "wl_surface"
        })
    );

    assert_eq!(
        surface.send_request(
            "attach",
            [Argument::Object(buffer.id()), Argument::Int(0), Argument::Int(0)]
        ),
        Ok(None)
    );

    // attaching null detaches the buffer
    assert_eq!(
        surface.send_request(
            "attach",
            [Argument::Object(ObjectId::null()), Argument::Int(0), Argument::Int(0)]
        ),
        Ok(None)
    );
});

expand_test!(dead_object_args_are_rejected, {
    let (connection, _host) = connect(Config::default());
    let surface = create_surface(&connection);
    let buffer = create_buffer(&connection, 7);
    buffer.send_request("destroy", []).unwrap();
    assert!(!buffer.is_alive());

    assert_eq!(
        surface.send_request(
            "attach",
            [Argument::Object(buffer.id()), Argument::Int(0), Argument::Int(0)]
        ),
        Err(MarshalError::InvalidId)
    );
});

expand_test!(non_nullable_object_args, {
    let (connection, _host) = connect(Config::default());
    let wm_base = bind(&connection, 3, &XDG_WM_BASE_INTERFACE, 4);
    assert!(matches!(
        wm_base.send_request("get_xdg_surface", [new_id(), Argument::Object(ObjectId::null())]),
        Err(MarshalError::Codec(crate::types::CodecError::UnexpectedNull { index: 1 }))
    ));
});
