//! Local state attached to objects depending on their interface

use std::collections::VecDeque;

use crate::interfaces::zxdg_toplevel_decoration_v1::Mode;
use crate::protocol::Fd;

use super::ObjectId;

/// Maximum length in bytes of toplevel titles and app ids
pub(crate) const MAX_TITLE_LEN: usize = 128;

#[derive(Debug, Clone, Default)]
pub(crate) enum Role {
    #[default]
    None,
    Surface(SurfaceState),
    FrameCallback {
        surface: ObjectId,
    },
    ShmPool(ShmPoolState),
    Buffer(BufferState),
    XdgSurface(XdgSurfaceState),
    Toplevel(ToplevelState),
    Decoration(DecorationState),
}

#[derive(Debug, Clone)]
pub(crate) struct SurfaceState {
    pub host_id: u32,
    pub buffer: Option<ObjectId>,
    /// Frame callbacks waiting for the next presentation, oldest first
    pub frames: VecDeque<ObjectId>,
    pub xdg_surface: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub(crate) struct ShmPoolState {
    pub fd: Fd,
    pub size: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct BufferState {
    pub fd: Fd,
    pub offset: i32,
    pub width: i32,
    pub height: i32,
    pub stride: i32,
    pub format: u32,
    /// Commit sequence number while the host holds the buffer
    pub busy: Option<u64>,
}

#[derive(Debug, Clone)]
pub(crate) struct XdgSurfaceState {
    pub surface: ObjectId,
    pub toplevel: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub(crate) struct ToplevelState {
    pub xdg_surface: ObjectId,
    pub surface: ObjectId,
    pub title: String,
    pub app_id: String,
    pub decoration: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub(crate) struct DecorationState {
    /// The toplevel this decoration belongs to
    pub toplevel: ObjectId,
    pub mode: Option<Mode>,
}

macro_rules! role_accessors {
    ($($get: ident, $get_mut: ident => $variant: ident($state: ty);)*) => {
        impl Role {
            $(
                pub(crate) fn $get(&self) -> Option<&$state> {
                    match self {
                        Role::$variant(state) => Some(state),
                        _ => None,
                    }
                }

                pub(crate) fn $get_mut(&mut self) -> Option<&mut $state> {
                    match self {
                        Role::$variant(state) => Some(state),
                        _ => None,
                    }
                }
            )*
        }
    };
}

role_accessors! {
    surface, surface_mut => Surface(SurfaceState);
    shm_pool, shm_pool_mut => ShmPool(ShmPoolState);
    buffer, buffer_mut => Buffer(BufferState);
    xdg_surface, xdg_surface_mut => XdgSurface(XdgSurfaceState);
    toplevel, toplevel_mut => Toplevel(ToplevelState);
    decoration, decoration_mut => Decoration(DecorationState);
}

/// Copy a string, truncated on a character boundary
pub(crate) fn bounded_copy(value: &str, max: usize) -> String {
    if value.len() < max {
        return value.to_owned();
    }
    let mut end = max - 1;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_owned()
}
