//! Handling of the requests sent by the application
//!
//! There is no compositor to send requests to: each known `(interface, opcode)` pair is
//! handled locally, by creating or looking up objects, queuing the events a compositor would
//! have answered with, and forwarding visible effects to the host. Unknown pairs do nothing.

use crate::{
    codec::Payload,
    config::render_decoration,
    host::HostEffect,
    interfaces::{
        self, wl_compositor, wl_display, wl_keyboard, wl_registry, wl_seat, wl_shm, wl_shm_pool,
        wl_surface, xdg_surface, xdg_toplevel, xdg_wm_base, zxdg_decoration_manager_v1,
        zxdg_toplevel_decoration_v1::{self, Mode},
        WL_BUFFER_INTERFACE, WL_CALLBACK_INTERFACE, WL_SHM_POOL_INTERFACE, WL_SURFACE_INTERFACE,
        XDG_SURFACE_INTERFACE, XDG_TOPLEVEL_INTERFACE, ZXDG_TOPLEVEL_DECORATION_V1_INTERFACE,
    },
    protocol::{Argument, Fd, Interface, WEnum},
    types::{InvalidId, MarshalError, QueueError},
};

use super::{
    roles::{
        bounded_copy, BufferState, DecorationState, Role, ShmPoolState, SurfaceState,
        ToplevelState, XdgSurfaceState, MAX_TITLE_LEN,
    },
    state::ProtocolState,
    ObjectId,
};

/// A validated request
pub(crate) struct Request<'a> {
    pub target: &'a ObjectId,
    /// Version of the target object
    pub version: u32,
    pub opcode: u16,
    pub args: &'a Payload,
    /// Interface and version requested for the created object, if given by the caller
    pub child_spec: Option<(&'static Interface, u32)>,
}

impl Request<'_> {
    fn uint(&self, idx: usize) -> u32 {
        match self.args.get(idx) {
            Some(Argument::Uint(v)) => *v,
            _ => 0,
        }
    }

    fn int(&self, idx: usize) -> i32 {
        match self.args.get(idx) {
            Some(Argument::Int(v)) | Some(Argument::Fixed(v)) => *v,
            _ => 0,
        }
    }

    fn string(&self, idx: usize) -> Option<&str> {
        match self.args.get(idx) {
            Some(Argument::Str(Some(s))) => Some(s),
            _ => None,
        }
    }

    fn object(&self, idx: usize) -> Option<&ObjectId> {
        match self.args.get(idx) {
            Some(Argument::Object(id)) if !id.is_null() => Some(id),
            _ => None,
        }
    }

    fn fd(&self, idx: usize) -> Fd {
        match self.args.get(idx) {
            Some(Argument::Fd(fd)) => *fd,
            _ => Fd(-1),
        }
    }
}

/// Carry out a request, returning the object it created or looked up, if any
pub(crate) fn handle(
    state: &mut ProtocolState,
    req: Request<'_>,
) -> Result<Option<ObjectId>, MarshalError> {
    let interface = req.target.interface();
    match (interface.name, req.opcode) {
        ("wl_display", wl_display::SYNC) => sync(state, &req),
        ("wl_display", wl_display::GET_REGISTRY) => get_registry(state),
        ("wl_registry", wl_registry::BIND) => bind(state, &req),
        ("wl_compositor", wl_compositor::CREATE_SURFACE) => create_surface(state, &req),
        ("wl_surface", wl_surface::ATTACH) => attach(state, &req).map(|()| None),
        ("wl_surface", wl_surface::DAMAGE) | ("wl_surface", wl_surface::DAMAGE_BUFFER) => {
            damage(state, &req).map(|()| None)
        }
        ("wl_surface", wl_surface::FRAME) => frame(state, &req),
        ("wl_surface", wl_surface::COMMIT) => commit(state, &req).map(|()| None),
        ("wl_shm", wl_shm::CREATE_POOL) => create_pool(state, &req),
        ("wl_shm_pool", wl_shm_pool::CREATE_BUFFER) => create_buffer(state, &req),
        ("wl_shm_pool", wl_shm_pool::RESIZE) => {
            let size = req.int(0);
            state.with_role(req.target, |role| {
                if let Some(pool) = role.shm_pool_mut() {
                    pool.size = size;
                }
            })?;
            Ok(None)
        }
        ("xdg_wm_base", xdg_wm_base::GET_XDG_SURFACE) => get_xdg_surface(state, &req),
        ("xdg_wm_base", xdg_wm_base::PONG) => Ok(None),
        ("xdg_surface", xdg_surface::GET_TOPLEVEL) => get_toplevel(state, &req),
        ("xdg_surface", xdg_surface::ACK_CONFIGURE) => {
            state.host.effect(HostEffect::ScheduleFrame);
            Ok(None)
        }
        ("xdg_toplevel", xdg_toplevel::SET_TITLE) | ("xdg_toplevel", xdg_toplevel::SET_APP_ID) => {
            let value = bounded_copy(req.string(0).unwrap_or(""), MAX_TITLE_LEN);
            let is_title = req.opcode == xdg_toplevel::SET_TITLE;
            state.with_role(req.target, |role| {
                if let Some(toplevel) = role.toplevel_mut() {
                    if is_title {
                        toplevel.title = value;
                    } else {
                        toplevel.app_id = value;
                    }
                }
            })?;
            Ok(None)
        }
        ("wl_seat", wl_seat::GET_KEYBOARD) => {
            let keyboard = state.singletons.keyboard.clone();
            state.set_version(&keyboard, req.version)?;
            Ok(Some(keyboard))
        }
        ("wl_seat", wl_seat::GET_POINTER) => {
            let pointer = state.singletons.pointer.clone();
            state.set_version(&pointer, req.version)?;
            Ok(Some(pointer))
        }
        ("zxdg_decoration_manager_v1", zxdg_decoration_manager_v1::GET_TOPLEVEL_DECORATION) => {
            get_toplevel_decoration(state, &req)
        }
        ("zxdg_toplevel_decoration_v1", zxdg_toplevel_decoration_v1::SET_MODE) => {
            set_mode(state, &req).map(|()| None)
        }
        ("zxdg_toplevel_decoration_v1", zxdg_toplevel_decoration_v1::UNSET_MODE) => {
            state.with_role(req.target, |role| {
                if let Some(decoration) = role.decoration_mut() {
                    decoration.mode = None;
                }
            })?;
            Ok(None)
        }
        (name, opcode) => {
            let request = interface.requests.get(opcode as usize).map_or("?", |desc| desc.name);
            crate::log_debug!("Unhandled request {}.{} (opcode {}), ignored", name, request, opcode);
            Ok(None)
        }
    }
}

/// Finish setting up an object created by the current request
///
/// If `setup` fails the object is removed, so that it does not hold its pool slot.
fn created<E: Into<MarshalError>>(
    state: &mut ProtocolState,
    id: ObjectId,
    setup: impl FnOnce(&mut ProtocolState, &ObjectId) -> Result<(), E>,
) -> Result<Option<ObjectId>, MarshalError> {
    match setup(state, &id) {
        Ok(()) => Ok(Some(id)),
        Err(err) => {
            state.discard(&id);
            Err(err.into())
        }
    }
}

fn sync(state: &mut ProtocolState, req: &Request<'_>) -> Result<Option<ObjectId>, MarshalError> {
    state.reserve_events(1)?;
    let callback = state.alloc(&WL_CALLBACK_INTERFACE, req.version.max(1), Role::None)?;
    let serial = state.current_input_serial();
    created(state, callback, |state, callback| {
        state.send_event(callback, "done", [Argument::Uint(serial)])
    })
}

fn get_registry(state: &mut ProtocolState) -> Result<Option<ObjectId>, MarshalError> {
    let registry = state.singletons.registry.clone();
    let globals = state.config.globals.clone();
    state.reserve_events(globals.len())?;
    for (idx, global) in globals.into_iter().enumerate() {
        state.send_event(
            &registry,
            "global",
            [
                Argument::Uint(idx as u32 + 1),
                Argument::Str(Some(global.interface.into())),
                Argument::Uint(global.version),
            ],
        )?;
    }
    Ok(Some(registry))
}

fn bind(state: &mut ProtocolState, req: &Request<'_>) -> Result<Option<ObjectId>, MarshalError> {
    let name = req.uint(0);
    let Some(global) = state.config.globals.get((name as usize).wrapping_sub(1)).cloned() else {
        crate::log_warn!("Cannot bind unknown global {name}");
        return Ok(None);
    };
    let requested = req.child_spec.map(|(iface, _)| iface);
    let Some(interface) = requested.or_else(|| interfaces::lookup(&global.interface)) else {
        crate::log_warn!("Global {} has no known interface {}", name, global.interface);
        return Ok(None);
    };
    if interface.name != global.interface {
        crate::log_warn!(
            "Global {} is a {}, cannot bind it as {}",
            name,
            global.interface,
            interface.name
        );
        return Ok(None);
    }
    let mut version = req.uint(2);
    if version == 0 {
        version = req.child_spec.map_or(1, |(_, v)| v);
    }
    let version = version.min(global.version).min(interface.version).max(1);

    let existing = state.singletons.for_interface(interface.name).cloned();
    match existing {
        Some(id) => {
            state.set_version(&id, version)?;
            Ok(Some(id))
        }
        None => state.alloc(interface, version, Role::None).map(Some),
    }
}

fn create_surface(
    state: &mut ProtocolState,
    req: &Request<'_>,
) -> Result<Option<ObjectId>, MarshalError> {
    let surface = state.alloc(
        &WL_SURFACE_INTERFACE,
        req.version,
        Role::Surface(SurfaceState {
            host_id: 0,
            buffer: None,
            frames: Default::default(),
            xdg_surface: None,
        }),
    )?;
    let host_id = state.host.create_surface();
    created(state, surface, |state, surface| {
        state.with_role(surface, |role| {
            if let Some(s) = role.surface_mut() {
                s.host_id = host_id;
            }
        })
    })
}

fn attach(state: &mut ProtocolState, req: &Request<'_>) -> Result<(), MarshalError> {
    let buffer = req.object(0).cloned();
    state.with_role(req.target, |role| {
        if let Some(surface) = role.surface_mut() {
            surface.buffer = buffer;
        }
    })?;
    Ok(())
}

fn host_surface(state: &mut ProtocolState, surface: &ObjectId) -> Result<u32, InvalidId> {
    state.with_role(surface, |role| role.surface().map(|s| s.host_id))?.ok_or(InvalidId)
}

fn damage(state: &mut ProtocolState, req: &Request<'_>) -> Result<(), MarshalError> {
    let surface = host_surface(state, req.target)?;
    state.host.effect(HostEffect::Damage {
        surface,
        x: req.int(0),
        y: req.int(1),
        width: req.int(2),
        height: req.int(3),
    });
    Ok(())
}

fn frame(state: &mut ProtocolState, req: &Request<'_>) -> Result<Option<ObjectId>, MarshalError> {
    let callback = state.alloc(
        &WL_CALLBACK_INTERFACE,
        1,
        Role::FrameCallback { surface: req.target.clone() },
    )?;
    created(state, callback, |state, callback| {
        let queued = callback.clone();
        state.with_role(req.target, move |role| {
            if let Some(surface) = role.surface_mut() {
                surface.frames.push_back(queued);
            }
        })
    })
}

fn commit(state: &mut ProtocolState, req: &Request<'_>) -> Result<(), MarshalError> {
    let surface = state
        .get_object(req.target)?
        .data
        .role
        .surface()
        .cloned()
        .ok_or(MarshalError::InvalidId)?;

    let attached = surface.buffer.as_ref().and_then(|buffer| {
        let object = state.get_object(buffer).ok()?;
        object.data.role.buffer().cloned().map(|b| (buffer.clone(), b))
    });

    if let Some((buffer, info)) = attached {
        let seq = state.next_commit();
        state.with_role(&buffer, |role| {
            if let Some(b) = role.buffer_mut() {
                b.busy = Some(seq);
            }
        })?;
        state.host.effect(HostEffect::Commit {
            surface: surface.host_id,
            shm_fd: info.fd.0,
            width: info.width,
            height: info.height,
        });
    } else if let Some(xdg) = surface.xdg_surface {
        if state.has_listener(&xdg) {
            let serial = state.next_input_serial();
            state.send_event(&xdg, "configure", [Argument::Uint(serial)])?;
        }
    }
    Ok(())
}

fn create_pool(
    state: &mut ProtocolState,
    req: &Request<'_>,
) -> Result<Option<ObjectId>, MarshalError> {
    let role = Role::ShmPool(ShmPoolState { fd: req.fd(1), size: req.int(2) });
    state.alloc(&WL_SHM_POOL_INTERFACE, req.version, role).map(Some)
}

fn create_buffer(
    state: &mut ProtocolState,
    req: &Request<'_>,
) -> Result<Option<ObjectId>, MarshalError> {
    let fd = state
        .get_object(req.target)?
        .data
        .role
        .shm_pool()
        .map(|pool| pool.fd)
        .ok_or(MarshalError::InvalidId)?;
    let role = Role::Buffer(BufferState {
        fd,
        offset: req.int(1),
        width: req.int(2),
        height: req.int(3),
        stride: req.int(4),
        format: req.uint(5),
        busy: None,
    });
    state.alloc(&WL_BUFFER_INTERFACE, 1, role).map(Some)
}

fn get_xdg_surface(
    state: &mut ProtocolState,
    req: &Request<'_>,
) -> Result<Option<ObjectId>, MarshalError> {
    let surface = req.object(1).cloned().ok_or(MarshalError::InvalidId)?;
    let existing = state
        .get_object(&surface)?
        .data
        .role
        .surface()
        .ok_or(MarshalError::InvalidId)?
        .xdg_surface
        .clone();
    if let Some(xdg) = existing.filter(|xdg| state.is_alive(xdg)) {
        return Ok(Some(xdg));
    }

    let role = Role::XdgSurface(XdgSurfaceState { surface: surface.clone(), toplevel: None });
    let xdg = state.alloc(&XDG_SURFACE_INTERFACE, req.version, role)?;
    created(state, xdg, |state, xdg| {
        let linked = xdg.clone();
        state.with_role(&surface, move |role| {
            if let Some(s) = role.surface_mut() {
                s.xdg_surface = Some(linked);
            }
        })
    })
}

fn get_toplevel(
    state: &mut ProtocolState,
    req: &Request<'_>,
) -> Result<Option<ObjectId>, MarshalError> {
    let surface = state
        .get_object(req.target)?
        .data
        .role
        .xdg_surface()
        .map(|xdg| xdg.surface.clone())
        .ok_or(MarshalError::InvalidId)?;
    let host_id = host_surface(state, &surface)?;

    let role = Role::Toplevel(ToplevelState {
        xdg_surface: req.target.clone(),
        surface,
        title: String::new(),
        app_id: String::new(),
        decoration: None,
    });
    let toplevel = state.alloc(&XDG_TOPLEVEL_INTERFACE, req.version, role)?;
    let toplevel = created(state, toplevel, |state, toplevel| {
        let linked = toplevel.clone();
        state.with_role(req.target, move |role| {
            if let Some(xdg) = role.xdg_surface_mut() {
                xdg.toplevel = Some(linked);
            }
        })
    })?;
    state.host.effect(HostEffect::CreateToplevel { surface: host_id });
    Ok(toplevel)
}

fn get_toplevel_decoration(
    state: &mut ProtocolState,
    req: &Request<'_>,
) -> Result<Option<ObjectId>, MarshalError> {
    let toplevel = req.object(1).cloned().ok_or(MarshalError::InvalidId)?;
    let existing = state
        .get_object(&toplevel)?
        .data
        .role
        .toplevel()
        .ok_or(MarshalError::InvalidId)?
        .decoration
        .clone();
    if let Some(decoration) = existing.filter(|d| state.is_alive(d)) {
        return Ok(Some(decoration));
    }

    let role = Role::Decoration(DecorationState { toplevel: toplevel.clone(), mode: None });
    let decoration = state.alloc(&ZXDG_TOPLEVEL_DECORATION_V1_INTERFACE, req.version, role)?;
    created(state, decoration, |state, decoration| {
        let linked = decoration.clone();
        state.with_role(&toplevel, move |role| {
            if let Some(t) = role.toplevel_mut() {
                t.decoration = Some(linked);
            }
        })
    })
}

fn set_mode(state: &mut ProtocolState, req: &Request<'_>) -> Result<(), MarshalError> {
    let mode = match WEnum::<Mode>::from(req.uint(0)).into_result() {
        Ok(mode) => mode,
        Err(err) => {
            crate::log_warn!("{err}, set_mode ignored for {}", req.target);
            return Ok(());
        }
    };
    let toplevel = state
        .with_role(req.target, |role| {
            role.decoration_mut().map(|decoration| {
                decoration.mode = Some(mode);
                decoration.toplevel.clone()
            })
        })?
        .ok_or(MarshalError::InvalidId)?;

    if mode == Mode::ServerSide {
        let toplevel = state
            .get_object(&toplevel)?
            .data
            .role
            .toplevel()
            .cloned()
            .ok_or(MarshalError::InvalidId)?;
        let surface = host_surface(state, &toplevel.surface)?;
        let html = render_decoration(&state.config.decoration_template, &toplevel.title);
        state.host.effect(HostEffect::Decorate { surface, title: toplevel.title, html });
    }
    state.send_event(req.target, "configure", [Argument::Uint(mode.into())])?;
    Ok(())
}

/// Queue the events an object announces itself with once it has a listener
///
/// Either every announcement is queued, or none is and the queue error is returned.
pub(crate) fn announce(state: &mut ProtocolState, id: &ObjectId) -> Result<(), QueueError> {
    let events: Vec<(&str, Vec<Argument<ObjectId>>)> = match id.interface().name {
        "wl_shm" => vec![("format", vec![Argument::Uint(wl_shm::FORMAT_ARGB8888)])],
        "xdg_toplevel" => {
            let (width, height) = state.host.output_size();
            vec![(
                "configure",
                vec![
                    Argument::Int(four_fifths(width)),
                    Argument::Int(four_fifths(height)),
                    Argument::Array(Box::default()),
                ],
            )]
        }
        "wl_seat" => vec![
            ("capabilities", vec![Argument::Uint(wl_seat::CAPABILITY_KEYBOARD)]),
            ("capabilities", vec![Argument::Uint(wl_seat::CAPABILITY_POINTER)]),
        ],
        "wl_keyboard" => vec![
            (
                "keymap",
                vec![
                    Argument::Uint(wl_keyboard::KEYMAP_FORMAT_XKB_V1),
                    Argument::Fd(state.host.keymap_fd()),
                    Argument::Uint(0),
                ],
            ),
            (
                "repeat_info",
                vec![
                    Argument::Int(state.config.repeat_rate),
                    Argument::Int(state.config.repeat_delay),
                ],
            ),
        ],
        _ => Vec::new(),
    };
    state.reserve_events(events.len())?;

    match id.interface().name {
        "wl_keyboard" => state.host.effect(HostEffect::EnableKeyboard),
        "wl_pointer" => state.host.effect(HostEffect::EnablePointer),
        _ => {}
    }
    for (name, args) in events {
        state.send_event(id, name, args)?;
    }
    Ok(())
}

/// Size suggested to new toplevels along one axis of the output
fn four_fifths(size: u32) -> i32 {
    i32::try_from(u64::from(size) * 4 / 5).unwrap_or(i32::MAX)
}
