//! Translation of host notifications into protocol events

use crate::{
    codec::fixed_from_f64,
    host::HostEvent,
    interfaces::{wl_keyboard, wl_pointer},
    protocol::Argument,
    types::QueueError,
};

use super::{state::ProtocolState, ObjectId};

/// Queue the events matching a host notification
///
/// Input is only delivered to the keyboard and pointer once they have a listener. Failures are
/// logged by the queue and the notification is dropped.
pub(crate) fn translate(state: &mut ProtocolState, event: HostEvent) {
    crate::log_debug!("Host notification: {:?}", event);
    if let Err(err) = translate_inner(state, event) {
        crate::log_warn!("Host notification dropped: {err}");
    }
}

fn translate_inner(state: &mut ProtocolState, event: HostEvent) -> Result<(), QueueError> {
    let keyboard = state.singletons.keyboard.clone();
    let pointer = state.singletons.pointer.clone();
    match event {
        HostEvent::BufferReleased { shm_fd } => {
            // the host releases buffers in commit order
            let oldest = state
                .find_objects(move |obj| {
                    obj.data.role.buffer().map_or(false, |b| b.fd.0 == shm_fd && b.busy.is_some())
                })
                .filter_map(|id| {
                    let seq = state.get_object(&id).ok()?.data.role.buffer()?.busy?;
                    Some((seq, id))
                })
                .min_by_key(|(seq, _)| *seq);
            if let Some((_, buffer)) = oldest {
                // the buffer stays busy if its release cannot be queued
                state.send_event(&buffer, "release", [])?;
                let _ = state.with_role(&buffer, |role| {
                    if let Some(b) = role.buffer_mut() {
                        b.busy = None;
                    }
                });
            }
        }
        HostEvent::FrameDone { surface, time } => {
            let Some(surface) = state.surface_by_host_id(surface) else {
                return Ok(());
            };
            let callback = state
                .with_role(&surface, |role| role.surface().and_then(|s| s.frames.front().cloned()))
                .unwrap_or(None);
            if let Some(callback) = callback {
                state.send_event(&callback, "done", [Argument::Uint(time)])?;
                let _ = state.with_role(&surface, |role| {
                    if let Some(s) = role.surface_mut() {
                        s.frames.pop_front();
                    }
                });
            }
        }
        HostEvent::Key { key, time, pressed } if state.has_listener(&keyboard) => {
            let key_state =
                if pressed { wl_keyboard::KEY_STATE_PRESSED } else { wl_keyboard::KEY_STATE_RELEASED };
            let serial = state.next_input_serial();
            state.send_event(
                &keyboard,
                "key",
                [
                    Argument::Uint(serial),
                    Argument::Uint(time),
                    Argument::Uint(key),
                    Argument::Uint(key_state),
                ],
            )?;
        }
        HostEvent::Modifiers { mods } if state.has_listener(&keyboard) => {
            let serial = state.next_input_serial();
            state.send_event(
                &keyboard,
                "modifiers",
                [
                    Argument::Uint(serial),
                    Argument::Uint(mods),
                    Argument::Uint(0),
                    Argument::Uint(0),
                    Argument::Uint(0),
                ],
            )?;
        }
        HostEvent::KeyboardFocus { surface } if state.has_listener(&keyboard) => {
            let Some(surface) = state.surface_by_host_id(surface) else {
                return Ok(());
            };
            let serial = state.next_input_serial();
            state.send_event(
                &keyboard,
                "enter",
                [Argument::Uint(serial), Argument::Object(surface), Argument::Array(Box::default())],
            )?;
        }
        HostEvent::CloseRequested { surface } => {
            if let Some(toplevel) = toplevel_of(state, surface) {
                state.send_event(&toplevel, "close", [])?;
            }
        }
        HostEvent::Wheel { dx, dy } if state.has_listener(&pointer) => {
            if dx != 0.0 {
                state.send_event(
                    &pointer,
                    "axis",
                    [
                        Argument::Uint(0),
                        Argument::Uint(wl_pointer::AXIS_HORIZONTAL_SCROLL),
                        Argument::Fixed(fixed_from_f64(dx)),
                    ],
                )?;
            }
            if dy != 0.0 {
                state.send_event(
                    &pointer,
                    "axis",
                    [
                        Argument::Uint(0),
                        Argument::Uint(wl_pointer::AXIS_VERTICAL_SCROLL),
                        Argument::Fixed(fixed_from_f64(dy)),
                    ],
                )?;
            }
        }
        HostEvent::Button { button, pressed } if state.has_listener(&pointer) => {
            let button_state = if pressed {
                wl_pointer::BUTTON_STATE_PRESSED
            } else {
                wl_pointer::BUTTON_STATE_RELEASED
            };
            let serial = state.next_input_serial();
            state.send_event(
                &pointer,
                "button",
                [
                    Argument::Uint(serial),
                    Argument::Uint(0),
                    Argument::Uint(wl_pointer::BTN_LEFT.wrapping_add(button)),
                    Argument::Uint(button_state),
                ],
            )?;
        }
        HostEvent::Motion { x, y } if state.has_listener(&pointer) => {
            state.send_event(
                &pointer,
                "motion",
                [
                    Argument::Uint(0),
                    Argument::Fixed(fixed_from_f64(x)),
                    Argument::Fixed(fixed_from_f64(y)),
                ],
            )?;
        }
        HostEvent::PointerEnter { surface, x, y } if state.has_listener(&pointer) => {
            let Some(surface) = state.surface_by_host_id(surface) else {
                return Ok(());
            };
            let serial = state.next_input_serial();
            state.send_event(
                &pointer,
                "enter",
                [
                    Argument::Uint(serial),
                    Argument::Object(surface),
                    Argument::Fixed(fixed_from_f64(x)),
                    Argument::Fixed(fixed_from_f64(y)),
                ],
            )?;
        }
        HostEvent::PointerLeave { surface } if state.has_listener(&pointer) => {
            let Some(surface) = state.surface_by_host_id(surface) else {
                return Ok(());
            };
            let serial = state.next_input_serial();
            state.send_event(&pointer, "leave", [Argument::Uint(serial), Argument::Object(surface)])?;
        }
        _ => {}
    }
    Ok(())
}

/// The live toplevel of the surface the host knows under this id
fn toplevel_of(state: &ProtocolState, host_id: u32) -> Option<ObjectId> {
    let surface = state.surface_by_host_id(host_id)?;
    let xdg = state.get_object(&surface).ok()?.data.role.surface()?.xdg_surface.clone()?;
    let toplevel = state.get_object(&xdg).ok()?.data.role.xdg_surface()?.toplevel.clone()?;
    state.is_alive(&toplevel).then_some(toplevel)
}
