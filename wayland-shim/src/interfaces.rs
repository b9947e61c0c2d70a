//! Interfaces of the emulated protocol
//!
//! This module contains the static descriptions of every interface the emulation knows
//! about: the core `wl_*` objects, `xdg-shell`, the primary selection and the xdg decoration
//! protocols. The tables mirror what `wayland-scanner` would generate from the XML files,
//! and are never modified at runtime.

use crate::protocol::{Interface, MessageDesc, ANONYMOUS_INTERFACE};

macro_rules! desc {
    (@child) => { None };
    (@child $child:ident) => { Some(&$child) };
    (destructor $name:literal, $sig:literal) => {
        MessageDesc {
            name: $name,
            signature: $sig,
            is_destructor: true,
            child_interface: None,
            arg_interfaces: &[],
        }
    };
    ($name:literal, $sig:literal $(; new $child:ident)? $(; args [$($arg:ident),* $(,)?])?) => {
        MessageDesc {
            name: $name,
            signature: $sig,
            is_destructor: false,
            child_interface: desc!(@child $($child)?),
            arg_interfaces: &[$($(&$arg),*)?],
        }
    };
}

/// Interface `wl_display`
pub static WL_DISPLAY_INTERFACE: Interface = Interface {
    name: "wl_display",
    version: 1,
    requests: &[
        desc!("sync", "n"; new WL_CALLBACK_INTERFACE),
        desc!("get_registry", "n"; new WL_REGISTRY_INTERFACE),
    ],
    events: &[
        desc!("error", "ous"; args [ANONYMOUS_INTERFACE]),
        desc!("delete_id", "u"),
    ],
};

/// Interface `wl_registry`
pub static WL_REGISTRY_INTERFACE: Interface = Interface {
    name: "wl_registry",
    version: 1,
    requests: &[desc!("bind", "usun")],
    events: &[desc!("global", "usu"), desc!("global_remove", "u")],
};

/// Interface `wl_callback`
pub static WL_CALLBACK_INTERFACE: Interface = Interface {
    name: "wl_callback",
    version: 1,
    requests: &[],
    events: &[desc!(destructor "done", "u")],
};

/// Interface `wl_compositor`
pub static WL_COMPOSITOR_INTERFACE: Interface = Interface {
    name: "wl_compositor",
    version: 6,
    requests: &[
        desc!("create_surface", "n"; new WL_SURFACE_INTERFACE),
        desc!("create_region", "n"),
    ],
    events: &[],
};

/// Interface `wl_shm_pool`
pub static WL_SHM_POOL_INTERFACE: Interface = Interface {
    name: "wl_shm_pool",
    version: 1,
    requests: &[
        desc!("create_buffer", "niiiiu"; new WL_BUFFER_INTERFACE),
        desc!(destructor "destroy", ""),
        desc!("resize", "i"),
    ],
    events: &[],
};

/// Interface `wl_shm`
pub static WL_SHM_INTERFACE: Interface = Interface {
    name: "wl_shm",
    version: 1,
    requests: &[desc!("create_pool", "nhi"; new WL_SHM_POOL_INTERFACE)],
    events: &[desc!("format", "u")],
};

/// Interface `wl_surface`
pub static WL_SURFACE_INTERFACE: Interface = Interface {
    name: "wl_surface",
    version: 6,
    requests: &[
        desc!(destructor "destroy", ""),
        desc!("attach", "?oii"; args [WL_BUFFER_INTERFACE]),
        desc!("damage", "iiii"),
        desc!("frame", "n"; new WL_CALLBACK_INTERFACE),
        desc!("set_opaque_region", "?o"; args [ANONYMOUS_INTERFACE]),
        desc!("set_input_region", "?o"; args [ANONYMOUS_INTERFACE]),
        desc!("commit", ""),
        desc!("set_buffer_transform", "2i"),
        desc!("set_buffer_scale", "3i"),
        desc!("damage_buffer", "4iiii"),
        desc!("offset", "5ii"),
    ],
    events: &[
        desc!("enter", "o"; args [ANONYMOUS_INTERFACE]),
        desc!("leave", "o"; args [ANONYMOUS_INTERFACE]),
        desc!("preferred_buffer_scale", "6i"),
        desc!("preferred_buffer_transform", "6u"),
    ],
};

/// Interface `wl_buffer`
pub static WL_BUFFER_INTERFACE: Interface = Interface {
    name: "wl_buffer",
    version: 1,
    requests: &[desc!(destructor "destroy", "")],
    events: &[desc!("release", "")],
};

/// Interface `xdg_wm_base`
pub static XDG_WM_BASE_INTERFACE: Interface = Interface {
    name: "xdg_wm_base",
    version: 6,
    requests: &[
        desc!(destructor "destroy", ""),
        desc!("create_positioner", "n"),
        desc!("get_xdg_surface", "no"; new XDG_SURFACE_INTERFACE; args [WL_SURFACE_INTERFACE]),
        desc!("pong", "u"),
    ],
    events: &[desc!("ping", "u")],
};

/// Interface `xdg_surface`
pub static XDG_SURFACE_INTERFACE: Interface = Interface {
    name: "xdg_surface",
    version: 6,
    requests: &[
        desc!(destructor "destroy", ""),
        desc!("get_toplevel", "n"; new XDG_TOPLEVEL_INTERFACE),
        desc!("get_popup", "n?oo"; args [XDG_SURFACE_INTERFACE, ANONYMOUS_INTERFACE]),
        desc!("set_window_geometry", "iiii"),
        desc!("ack_configure", "u"),
    ],
    events: &[desc!("configure", "u")],
};

/// Interface `xdg_toplevel`
pub static XDG_TOPLEVEL_INTERFACE: Interface = Interface {
    name: "xdg_toplevel",
    version: 6,
    requests: &[
        desc!(destructor "destroy", ""),
        desc!("set_parent", "?o"; args [XDG_TOPLEVEL_INTERFACE]),
        desc!("set_title", "s"),
        desc!("set_app_id", "s"),
        desc!("show_window_menu", "ouii"; args [WL_SEAT_INTERFACE]),
        desc!("move", "ou"; args [WL_SEAT_INTERFACE]),
        desc!("resize", "ouu"; args [WL_SEAT_INTERFACE]),
        desc!("set_max_size", "ii"),
        desc!("set_min_size", "ii"),
        desc!("set_maximized", ""),
        desc!("unset_maximized", ""),
        desc!("set_fullscreen", "?o"; args [ANONYMOUS_INTERFACE]),
        desc!("unset_fullscreen", ""),
        desc!("set_minimized", ""),
    ],
    events: &[
        desc!("configure", "iia"),
        desc!("close", ""),
        desc!("configure_bounds", "4ii"),
        desc!("wm_capabilities", "5a"),
    ],
};

/// Interface `wl_data_offer`
pub static WL_DATA_OFFER_INTERFACE: Interface = Interface {
    name: "wl_data_offer",
    version: 3,
    requests: &[
        desc!("accept", "u?s"),
        desc!("receive", "sh"),
        desc!(destructor "destroy", ""),
        desc!("finish", "3"),
        desc!("set_actions", "3uu"),
    ],
    events: &[desc!("offer", "s"), desc!("source_actions", "3u"), desc!("action", "3u")],
};

/// Interface `wl_data_source`
pub static WL_DATA_SOURCE_INTERFACE: Interface = Interface {
    name: "wl_data_source",
    version: 3,
    requests: &[desc!("offer", "s"), desc!(destructor "destroy", ""), desc!("set_actions", "3u")],
    events: &[
        desc!("target", "?s"),
        desc!("send", "sh"),
        desc!("cancelled", ""),
        desc!("dnd_drop_performed", "3"),
        desc!("dnd_finished", "3"),
        desc!("action", "3u"),
    ],
};

/// Interface `wl_data_device`
pub static WL_DATA_DEVICE_INTERFACE: Interface = Interface {
    name: "wl_data_device",
    version: 3,
    requests: &[
        desc!("start_drag", "?oo?ou"; args [WL_DATA_SOURCE_INTERFACE, WL_SURFACE_INTERFACE, WL_SURFACE_INTERFACE]),
        desc!("set_selection", "?ou"; args [WL_DATA_SOURCE_INTERFACE]),
        desc!(destructor "release", "2"),
    ],
    events: &[
        desc!("data_offer", "n"; new WL_DATA_OFFER_INTERFACE),
        desc!("enter", "uoff?o"; args [WL_SURFACE_INTERFACE, WL_DATA_OFFER_INTERFACE]),
        desc!("leave", ""),
        desc!("motion", "uff"),
        desc!("drop", ""),
        desc!("selection", "?o"; args [WL_DATA_OFFER_INTERFACE]),
    ],
};

/// Interface `wl_data_device_manager`
pub static WL_DATA_DEVICE_MANAGER_INTERFACE: Interface = Interface {
    name: "wl_data_device_manager",
    version: 3,
    requests: &[
        desc!("create_data_source", "n"; new WL_DATA_SOURCE_INTERFACE),
        desc!("get_data_device", "no"; new WL_DATA_DEVICE_INTERFACE; args [WL_SEAT_INTERFACE]),
    ],
    events: &[],
};

/// Interface `wl_seat`
pub static WL_SEAT_INTERFACE: Interface = Interface {
    name: "wl_seat",
    version: 6,
    requests: &[
        desc!("get_pointer", "n"; new WL_POINTER_INTERFACE),
        desc!("get_keyboard", "n"; new WL_KEYBOARD_INTERFACE),
        desc!("get_touch", "n"; new WL_TOUCH_INTERFACE),
        desc!(destructor "release", "5"),
    ],
    events: &[desc!("capabilities", "u"), desc!("name", "2s")],
};

/// Interface `wl_pointer`
pub static WL_POINTER_INTERFACE: Interface = Interface {
    name: "wl_pointer",
    version: 6,
    requests: &[
        desc!("set_cursor", "u?oii"; args [WL_SURFACE_INTERFACE]),
        desc!(destructor "release", "3"),
    ],
    events: &[
        desc!("enter", "uoff"; args [WL_SURFACE_INTERFACE]),
        desc!("leave", "uo"; args [WL_SURFACE_INTERFACE]),
        desc!("motion", "uff"),
        desc!("button", "uuuu"),
        desc!("axis", "uuf"),
        desc!("frame", "5"),
        desc!("axis_source", "5u"),
        desc!("axis_stop", "5uu"),
        desc!("axis_discrete", "5ui"),
    ],
};

/// Interface `wl_keyboard`
pub static WL_KEYBOARD_INTERFACE: Interface = Interface {
    name: "wl_keyboard",
    version: 6,
    requests: &[desc!(destructor "release", "3")],
    events: &[
        desc!("keymap", "uhu"),
        desc!("enter", "uoa"; args [WL_SURFACE_INTERFACE]),
        desc!("leave", "uo"; args [WL_SURFACE_INTERFACE]),
        desc!("key", "uuuu"),
        desc!("modifiers", "uuuuu"),
        desc!("repeat_info", "4ii"),
    ],
};

/// Interface `wl_touch`
pub static WL_TOUCH_INTERFACE: Interface = Interface {
    name: "wl_touch",
    version: 6,
    requests: &[desc!(destructor "release", "3")],
    events: &[
        desc!("down", "uuoiff"; args [WL_SURFACE_INTERFACE]),
        desc!("up", "uui"),
        desc!("motion", "uiff"),
        desc!("frame", ""),
        desc!("cancel", ""),
        desc!("shape", "6iff"),
        desc!("orientation", "6if"),
    ],
};

/// Interface `zwp_primary_selection_device_manager_v1`
pub static ZWP_PRIMARY_SELECTION_DEVICE_MANAGER_V1_INTERFACE: Interface = Interface {
    name: "zwp_primary_selection_device_manager_v1",
    version: 1,
    requests: &[
        desc!("create_source", "n"; new ZWP_PRIMARY_SELECTION_SOURCE_V1_INTERFACE),
        desc!("get_device", "no"; new ZWP_PRIMARY_SELECTION_DEVICE_V1_INTERFACE; args [WL_SEAT_INTERFACE]),
        desc!(destructor "destroy", ""),
    ],
    events: &[],
};

/// Interface `zwp_primary_selection_device_v1`
pub static ZWP_PRIMARY_SELECTION_DEVICE_V1_INTERFACE: Interface = Interface {
    name: "zwp_primary_selection_device_v1",
    version: 1,
    requests: &[
        desc!("set_selection", "?ou"; args [ZWP_PRIMARY_SELECTION_SOURCE_V1_INTERFACE]),
        desc!(destructor "destroy", ""),
    ],
    events: &[
        desc!("data_offer", "n"; new ZWP_PRIMARY_SELECTION_OFFER_V1_INTERFACE),
        desc!("selection", "?o"; args [ZWP_PRIMARY_SELECTION_OFFER_V1_INTERFACE]),
    ],
};

/// Interface `zwp_primary_selection_offer_v1`
pub static ZWP_PRIMARY_SELECTION_OFFER_V1_INTERFACE: Interface = Interface {
    name: "zwp_primary_selection_offer_v1",
    version: 1,
    requests: &[desc!("receive", "sh"), desc!(destructor "destroy", "")],
    events: &[desc!("offer", "s")],
};

/// Interface `zwp_primary_selection_source_v1`
pub static ZWP_PRIMARY_SELECTION_SOURCE_V1_INTERFACE: Interface = Interface {
    name: "zwp_primary_selection_source_v1",
    version: 1,
    requests: &[desc!("offer", "s"), desc!(destructor "destroy", "")],
    events: &[desc!("send", "sh"), desc!("cancelled", "")],
};

/// Interface `zxdg_decoration_manager_v1`
pub static ZXDG_DECORATION_MANAGER_V1_INTERFACE: Interface = Interface {
    name: "zxdg_decoration_manager_v1",
    version: 1,
    requests: &[
        desc!(destructor "destroy", ""),
        desc!("get_toplevel_decoration", "no"; new ZXDG_TOPLEVEL_DECORATION_V1_INTERFACE; args [XDG_TOPLEVEL_INTERFACE]),
    ],
    events: &[],
};

/// Interface `zxdg_toplevel_decoration_v1`
pub static ZXDG_TOPLEVEL_DECORATION_V1_INTERFACE: Interface = Interface {
    name: "zxdg_toplevel_decoration_v1",
    version: 1,
    requests: &[
        desc!(destructor "destroy", ""),
        desc!("set_mode", "u"),
        desc!("unset_mode", ""),
    ],
    events: &[desc!("configure", "u")],
};

/// Every interface known to the emulation
pub static ALL_INTERFACES: &[&Interface] = &[
    &WL_DISPLAY_INTERFACE,
    &WL_REGISTRY_INTERFACE,
    &WL_CALLBACK_INTERFACE,
    &WL_COMPOSITOR_INTERFACE,
    &WL_SHM_POOL_INTERFACE,
    &WL_SHM_INTERFACE,
    &WL_SURFACE_INTERFACE,
    &WL_BUFFER_INTERFACE,
    &XDG_WM_BASE_INTERFACE,
    &XDG_SURFACE_INTERFACE,
    &XDG_TOPLEVEL_INTERFACE,
    &WL_DATA_OFFER_INTERFACE,
    &WL_DATA_SOURCE_INTERFACE,
    &WL_DATA_DEVICE_INTERFACE,
    &WL_DATA_DEVICE_MANAGER_INTERFACE,
    &WL_SEAT_INTERFACE,
    &WL_POINTER_INTERFACE,
    &WL_KEYBOARD_INTERFACE,
    &WL_TOUCH_INTERFACE,
    &ZWP_PRIMARY_SELECTION_DEVICE_MANAGER_V1_INTERFACE,
    &ZWP_PRIMARY_SELECTION_DEVICE_V1_INTERFACE,
    &ZWP_PRIMARY_SELECTION_OFFER_V1_INTERFACE,
    &ZWP_PRIMARY_SELECTION_SOURCE_V1_INTERFACE,
    &ZXDG_DECORATION_MANAGER_V1_INTERFACE,
    &ZXDG_TOPLEVEL_DECORATION_V1_INTERFACE,
];

/// Find an interface by name
pub fn lookup(name: &str) -> Option<&'static Interface> {
    ALL_INTERFACES.iter().copied().find(|iface| iface.name == name)
}

/// Opcodes and enums of `wl_display`
pub mod wl_display {
    /// `sync` request
    pub const SYNC: u16 = 0;
    /// `get_registry` request
    pub const GET_REGISTRY: u16 = 1;
}

/// Opcodes of `wl_registry`
pub mod wl_registry {
    /// `bind` request
    pub const BIND: u16 = 0;
}

/// Opcodes of `wl_compositor`
pub mod wl_compositor {
    /// `create_surface` request
    pub const CREATE_SURFACE: u16 = 0;
    /// `create_region` request
    pub const CREATE_REGION: u16 = 1;
}

/// Opcodes of `wl_shm_pool`
pub mod wl_shm_pool {
    /// `create_buffer` request
    pub const CREATE_BUFFER: u16 = 0;
    /// `destroy` request
    pub const DESTROY: u16 = 1;
    /// `resize` request
    pub const RESIZE: u16 = 2;
}

/// Opcodes and enums of `wl_shm`
pub mod wl_shm {
    /// `create_pool` request
    pub const CREATE_POOL: u16 = 0;
    /// 32-bit ARGB format, `[31:0] A:R:G:B 8:8:8:8` little endian
    pub const FORMAT_ARGB8888: u32 = 0;
    /// 32-bit RGB format, `[31:0] x:R:G:B 8:8:8:8` little endian
    pub const FORMAT_XRGB8888: u32 = 1;
}

/// Opcodes of `wl_surface`
pub mod wl_surface {
    /// `destroy` request
    pub const DESTROY: u16 = 0;
    /// `attach` request
    pub const ATTACH: u16 = 1;
    /// `damage` request
    pub const DAMAGE: u16 = 2;
    /// `frame` request
    pub const FRAME: u16 = 3;
    /// `commit` request
    pub const COMMIT: u16 = 6;
    /// `damage_buffer` request
    pub const DAMAGE_BUFFER: u16 = 9;
}

/// Opcodes of `wl_buffer`
pub mod wl_buffer {
    /// `destroy` request
    pub const DESTROY: u16 = 0;
}

/// Opcodes of `xdg_wm_base`
pub mod xdg_wm_base {
    /// `destroy` request
    pub const DESTROY: u16 = 0;
    /// `get_xdg_surface` request
    pub const GET_XDG_SURFACE: u16 = 2;
    /// `pong` request
    pub const PONG: u16 = 3;
}

/// Opcodes of `xdg_surface`
pub mod xdg_surface {
    /// `destroy` request
    pub const DESTROY: u16 = 0;
    /// `get_toplevel` request
    pub const GET_TOPLEVEL: u16 = 1;
    /// `ack_configure` request
    pub const ACK_CONFIGURE: u16 = 4;
}

/// Opcodes of `xdg_toplevel`
pub mod xdg_toplevel {
    /// `destroy` request
    pub const DESTROY: u16 = 0;
    /// `set_title` request
    pub const SET_TITLE: u16 = 2;
    /// `set_app_id` request
    pub const SET_APP_ID: u16 = 3;
}

/// Opcodes and enums of `wl_seat`
pub mod wl_seat {
    /// `get_pointer` request
    pub const GET_POINTER: u16 = 0;
    /// `get_keyboard` request
    pub const GET_KEYBOARD: u16 = 1;
    /// The seat has pointer devices
    pub const CAPABILITY_POINTER: u32 = 1;
    /// The seat has one or more keyboards
    pub const CAPABILITY_KEYBOARD: u32 = 2;
}

/// Enums of `wl_pointer`
pub mod wl_pointer {
    /// Vertical axis
    pub const AXIS_VERTICAL_SCROLL: u32 = 0;
    /// Horizontal axis
    pub const AXIS_HORIZONTAL_SCROLL: u32 = 1;
    /// The button is not pressed
    pub const BUTTON_STATE_RELEASED: u32 = 0;
    /// The button is pressed
    pub const BUTTON_STATE_PRESSED: u32 = 1;
    /// Linux evdev code of the left button, other buttons follow it
    pub const BTN_LEFT: u32 = 0x110;
}

/// Enums of `wl_keyboard`
pub mod wl_keyboard {
    /// libxkbcommon compatible keymap
    pub const KEYMAP_FORMAT_XKB_V1: u32 = 1;
    /// Key is not pressed
    pub const KEY_STATE_RELEASED: u32 = 0;
    /// Key is pressed
    pub const KEY_STATE_PRESSED: u32 = 1;
}

/// Opcodes and enums of `zxdg_decoration_manager_v1`
pub mod zxdg_decoration_manager_v1 {
    /// `destroy` request
    pub const DESTROY: u16 = 0;
    /// `get_toplevel_decoration` request
    pub const GET_TOPLEVEL_DECORATION: u16 = 1;
}

/// Opcodes and enums of `zxdg_toplevel_decoration_v1`
pub mod zxdg_toplevel_decoration_v1 {
    /// `destroy` request
    pub const DESTROY: u16 = 0;
    /// `set_mode` request
    pub const SET_MODE: u16 = 1;
    /// `unset_mode` request
    pub const UNSET_MODE: u16 = 2;

    /// Window decoration modes
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[non_exhaustive]
    pub enum Mode {
        /// no server-side window decoration
        ClientSide = 1,
        /// server-side window decoration
        ServerSide = 2,
    }

    impl TryFrom<u32> for Mode {
        type Error = ();
        fn try_from(val: u32) -> Result<Mode, ()> {
            match val {
                1 => Ok(Mode::ClientSide),
                2 => Ok(Mode::ServerSide),
                _ => Err(()),
            }
        }
    }

    impl From<Mode> for u32 {
        fn from(val: Mode) -> u32 {
            val as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_signature;

    #[test]
    fn all_signatures_parse() {
        for iface in ALL_INTERFACES {
            for desc in iface.requests.iter().chain(iface.events.iter()) {
                let sig = parse_signature(desc.signature).unwrap();
                let objects = sig.args.iter().filter(|kind| kind.code() == 'o').count();
                assert_eq!(
                    objects,
                    desc.arg_interfaces.len(),
                    "{}.{} lists the wrong number of object interfaces",
                    iface.name,
                    desc.name
                );
                assert!(sig.since <= iface.version.max(1));
            }
        }
    }

    #[test]
    fn lookup_by_name() {
        assert!(std::ptr::eq(lookup("wl_seat").unwrap(), &WL_SEAT_INTERFACE));
        assert!(lookup("wl_region").is_none());
    }
}
