mod helpers;

use helpers::{recorder, shim, Recorder, TestClient};

use shim::{
    client::{Listener, Proxy},
    host::{HostEffect, HostEvent},
    interfaces::{wl_keyboard, wl_pointer, WL_KEYBOARD_INTERFACE, WL_POINTER_INTERFACE, WL_SEAT_INTERFACE},
    xkb::{ModifierState, MOD_CTRL_INDEX, MOD_SHIFT_INDEX},
};

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Enter(Proxy),
    Key(u32, u32, u32),
    Modifiers(u32),
    Button(u32, u32),
    Axis(u32, f64),
    Motion(f64, f64),
    PointerEnter(Proxy, f64, f64),
    PointerLeave(Proxy),
}

fn listen_keyboard(client: &TestClient) -> (Proxy, Recorder<Input>) {
    let seat = client.bind(&WL_SEAT_INTERFACE, 6);
    let keyboard = seat.send_request("get_keyboard", [helpers::new_id()]).unwrap().unwrap();
    let inputs = recorder();
    let (i1, i2, i3) = (inputs.clone(), inputs.clone(), inputs.clone());
    keyboard
        .add_listener(
            Listener::new(&WL_KEYBOARD_INTERFACE)
                .on("enter", move |_, _, (_serial, surface, _keys): (u32, Proxy, Vec<u8>)| {
                    i1.lock().unwrap().push(Input::Enter(surface))
                })
                .unwrap()
                .on("key", move |_, _, (_serial, time, key, state): (u32, u32, u32, u32)| {
                    i2.lock().unwrap().push(Input::Key(time, key, state))
                })
                .unwrap()
                .on(
                    "modifiers",
                    move |_, _, (_serial, depressed, _, _, _): (u32, u32, u32, u32, u32)| {
                        i3.lock().unwrap().push(Input::Modifiers(depressed))
                    },
                )
                .unwrap(),
            None,
        )
        .unwrap();
    client.roundtrip();
    (keyboard, inputs)
}

fn listen_pointer(client: &TestClient) -> (Proxy, Recorder<Input>) {
    let seat = client.bind(&WL_SEAT_INTERFACE, 6);
    let pointer = seat.send_request("get_pointer", [helpers::new_id()]).unwrap().unwrap();
    let inputs = recorder();
    let (i1, i2, i3, i4, i5) =
        (inputs.clone(), inputs.clone(), inputs.clone(), inputs.clone(), inputs.clone());
    pointer
        .add_listener(
            Listener::new(&WL_POINTER_INTERFACE)
                .on("enter", move |_, _, (_serial, surface, x, y): (u32, Proxy, f64, f64)| {
                    i1.lock().unwrap().push(Input::PointerEnter(surface, x, y))
                })
                .unwrap()
                .on("leave", move |_, _, (_serial, surface): (u32, Proxy)| {
                    i2.lock().unwrap().push(Input::PointerLeave(surface))
                })
                .unwrap()
                .on("motion", move |_, _, (_time, x, y): (u32, f64, f64)| {
                    i3.lock().unwrap().push(Input::Motion(x, y))
                })
                .unwrap()
                .on("button", move |_, _, (_serial, _time, button, state): (u32, u32, u32, u32)| {
                    i4.lock().unwrap().push(Input::Button(button, state))
                })
                .unwrap()
                .on("axis", move |_, _, (_time, axis, value): (u32, u32, f64)| {
                    i5.lock().unwrap().push(Input::Axis(axis, value))
                })
                .unwrap(),
            None,
        )
        .unwrap();
    client.roundtrip();
    (pointer, inputs)
}

#[test]
fn keyboard_input() {
    let client = TestClient::new();
    let surface = client.create_surface();
    let (_keyboard, inputs) = listen_keyboard(&client);
    assert_eq!(client.host.take_effects(), vec![HostEffect::EnableKeyboard]);

    client.host.push_event(HostEvent::KeyboardFocus { surface: 1 });
    client.host.push_event(HostEvent::Key { key: 'a' as u32, time: 10, pressed: true });
    client.host.push_event(HostEvent::Key { key: 'a' as u32, time: 20, pressed: false });
    client.connection.dispatch().unwrap();

    assert_eq!(
        *inputs.lock().unwrap(),
        vec![
            Input::Enter(surface),
            Input::Key(10, 'a' as u32, wl_keyboard::KEY_STATE_PRESSED),
            Input::Key(20, 'a' as u32, wl_keyboard::KEY_STATE_RELEASED),
        ]
    );
}

#[test]
fn keyboard_modifiers() {
    let client = TestClient::new();
    let (_keyboard, inputs) = listen_keyboard(&client);

    let mods = ModifierState::mask_of(MOD_SHIFT_INDEX) | ModifierState::mask_of(MOD_CTRL_INDEX);
    client.host.push_event(HostEvent::Modifiers { mods });
    client.connection.dispatch().unwrap();

    let Some(Input::Modifiers(depressed)) = inputs.lock().unwrap().first().cloned() else {
        panic!("No modifiers event.");
    };
    let mut state = ModifierState::default();
    state.update_mask(depressed, 0, 0);
    assert!(state.mod_index_is_active(MOD_SHIFT_INDEX));
    assert!(state.mod_index_is_active(MOD_CTRL_INDEX));
    assert!(!state.mod_index_is_active(shim::xkb::MOD_ALT_INDEX));
}

#[test]
fn pointer_input() {
    let client = TestClient::new();
    let surface = client.create_surface();
    let (_pointer, inputs) = listen_pointer(&client);
    assert_eq!(client.host.take_effects(), vec![HostEffect::EnablePointer]);

    client.host.push_event(HostEvent::PointerEnter { surface: 1, x: 4.0, y: 8.5 });
    client.host.push_event(HostEvent::Motion { x: 5.25, y: 9.0 });
    client.host.push_event(HostEvent::Button { button: 0, pressed: true });
    client.host.push_event(HostEvent::Button { button: 2, pressed: false });
    client.host.push_event(HostEvent::PointerLeave { surface: 1 });
    client.connection.dispatch().unwrap();

    assert_eq!(
        *inputs.lock().unwrap(),
        vec![
            Input::PointerEnter(surface.clone(), 4.0, 8.5),
            Input::Motion(5.25, 9.0),
            Input::Button(0x110, wl_pointer::BUTTON_STATE_PRESSED),
            Input::Button(0x112, wl_pointer::BUTTON_STATE_RELEASED),
            Input::PointerLeave(surface),
        ]
    );
}

#[test]
fn wheel_axes() {
    let client = TestClient::new();
    let (_pointer, inputs) = listen_pointer(&client);

    client.host.push_event(HostEvent::Wheel { dx: 0.0, dy: 3.0 });
    client.host.push_event(HostEvent::Wheel { dx: -1.5, dy: 0.0 });
    client.host.push_event(HostEvent::Wheel { dx: 2.0, dy: -2.0 });
    client.host.push_event(HostEvent::Wheel { dx: 0.0, dy: 0.0 });
    client.connection.dispatch().unwrap();

    let v = wl_pointer::AXIS_VERTICAL_SCROLL;
    let h = wl_pointer::AXIS_HORIZONTAL_SCROLL;
    assert_eq!(
        *inputs.lock().unwrap(),
        vec![
            Input::Axis(v, 3.0),
            Input::Axis(h, -1.5),
            Input::Axis(h, 2.0),
            Input::Axis(v, -2.0),
        ]
    );
}

#[test]
fn input_without_listener_is_dropped() {
    let client = TestClient::new();
    let seat = client.bind(&WL_SEAT_INTERFACE, 6);
    let _keyboard = seat.send_request("get_keyboard", [helpers::new_id()]).unwrap().unwrap();
    let _pointer = seat.send_request("get_pointer", [helpers::new_id()]).unwrap().unwrap();

    client.host.push_event(HostEvent::Key { key: 'x' as u32, time: 1, pressed: true });
    client.host.push_event(HostEvent::Motion { x: 1.0, y: 1.0 });
    client.host.push_event(HostEvent::Wheel { dx: 1.0, dy: 1.0 });
    assert_eq!(client.connection.dispatch().unwrap(), 0);
    assert_eq!(client.host.pending_events(), 0);
    assert!(client.host.take_effects().is_empty());
}

#[test]
fn focus_on_unknown_surface_is_ignored() {
    let client = TestClient::new();
    let (_keyboard, inputs) = listen_keyboard(&client);
    let (_pointer, pointer_inputs) = listen_pointer(&client);

    client.host.push_event(HostEvent::KeyboardFocus { surface: 3 });
    client.host.push_event(HostEvent::PointerEnter { surface: 3, x: 0.0, y: 0.0 });
    assert_eq!(client.connection.dispatch().unwrap(), 0);
    assert!(inputs.lock().unwrap().is_empty());
    assert!(pointer_inputs.lock().unwrap().is_empty());
}
