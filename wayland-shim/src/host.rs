//! Boundary with the host event loop
//!
//! The emulated connection has no compositor on the other side: the host is whatever drives
//! the application (a browser page, a test harness, ...). It provides the input and frame
//! notifications through [`Host::poll_event()`], and carries out the visible side effects of
//! requests through [`Host::effect()`].
//!
//! [`HeadlessHost`] is an in-process host keeping everything in memory, controlled through a
//! [`HostController`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::protocol::Fd;

/// Descriptor returned by `get_fd` and used as the keymap token by default
pub const EMULATED_FD: i32 = 0x7e00_0000;

/// A notification produced by the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The host is done reading the shared memory identified by this descriptor
    BufferReleased {
        /// Descriptor of the shared memory pool of the buffer
        shm_fd: i32,
    },
    /// The given surface was presented
    FrameDone {
        /// Host id of the surface
        surface: u32,
        /// Presentation time, in milliseconds
        time: u32,
    },
    /// A key changed state
    Key {
        /// Linux evdev key code
        key: u32,
        /// Time of the event, in milliseconds
        time: u32,
        /// Whether the key is now pressed
        pressed: bool,
    },
    /// The depressed modifiers changed
    Modifiers {
        /// Modifier mask, see [`ModifierState`](crate::xkb::ModifierState)
        mods: u32,
    },
    /// A surface received the keyboard focus
    KeyboardFocus {
        /// Host id of the surface
        surface: u32,
    },
    /// The user asked to close a toplevel
    CloseRequested {
        /// Host id of the surface of the toplevel
        surface: u32,
    },
    /// Scroll wheel motion
    Wheel {
        /// Horizontal motion
        dx: f64,
        /// Vertical motion
        dy: f64,
    },
    /// A pointer button changed state
    Button {
        /// Button index, 0 being the left button
        button: u32,
        /// Whether the button is now pressed
        pressed: bool,
    },
    /// The pointer moved over the focused surface
    Motion {
        /// Surface-local horizontal position
        x: f64,
        /// Surface-local vertical position
        y: f64,
    },
    /// The pointer entered a surface
    PointerEnter {
        /// Host id of the surface
        surface: u32,
        /// Surface-local horizontal position
        x: f64,
        /// Surface-local vertical position
        y: f64,
    },
    /// The pointer left a surface
    PointerLeave {
        /// Host id of the surface
        surface: u32,
    },
}

/// A visible side effect of a request, carried out by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEffect {
    /// Create the window holding a surface
    CreateToplevel {
        /// Host id of the surface
        surface: u32,
    },
    /// Schedule the rendering of the next frame
    ScheduleFrame,
    /// Present the content of a buffer on a surface
    Commit {
        /// Host id of the surface
        surface: u32,
        /// Descriptor of the shared memory holding the pixels
        shm_fd: i32,
        /// Width of the buffer
        width: i32,
        /// Height of the buffer
        height: i32,
    },
    /// Part of a surface must be redrawn
    Damage {
        /// Host id of the surface
        surface: u32,
        /// Left edge of the damaged area
        x: i32,
        /// Top edge of the damaged area
        y: i32,
        /// Width of the damaged area
        width: i32,
        /// Height of the damaged area
        height: i32,
    },
    /// Draw server-side decorations around the window of a surface
    Decorate {
        /// Host id of the surface
        surface: u32,
        /// Title of the toplevel
        title: String,
        /// Rendered decoration template
        html: String,
    },
    /// Start forwarding keyboard input
    EnableKeyboard,
    /// Start forwarding pointer input
    EnablePointer,
    /// The connection was closed
    Disconnect,
}

/// The host event loop driving a connection
///
/// None of these methods may block.
pub trait Host: Send {
    /// Pull the next pending notification, if any
    fn poll_event(&mut self) -> Option<HostEvent>;

    /// Create a host surface and return its id
    ///
    /// Ids must be unique for the lifetime of the host.
    fn create_surface(&mut self) -> u32;

    /// Carry out a side effect
    fn effect(&mut self, effect: HostEffect);

    /// Size of the output windows are displayed on
    fn output_size(&self) -> (u32, u32);

    /// Descriptor of the keymap sent with `wl_keyboard.keymap`
    fn keymap_fd(&self) -> Fd {
        Fd(EMULATED_FD)
    }
}

#[derive(Debug)]
struct HeadlessState {
    events: VecDeque<HostEvent>,
    effects: Vec<HostEffect>,
    output_size: (u32, u32),
    next_surface: u32,
    clock: u32,
    auto_frames: bool,
}

impl HeadlessState {
    // a committed buffer is presented right away
    fn present(&mut self, surface: u32, shm_fd: i32) {
        self.clock = self.clock.wrapping_add(16);
        self.events.push_back(HostEvent::BufferReleased { shm_fd });
        self.events.push_back(HostEvent::FrameDone { surface, time: self.clock });
    }
}

/// A host keeping its state in memory
///
/// Committed buffers are presented immediately: every [`HostEffect::Commit`] queues a
/// [`HostEvent::BufferReleased`] and a [`HostEvent::FrameDone`], unless this was disabled
/// with [`HostController::set_auto_frames()`].
#[derive(Debug)]
pub struct HeadlessHost {
    state: Arc<Mutex<HeadlessState>>,
}

/// Handle controlling a [`HeadlessHost`] from the outside
#[derive(Debug, Clone)]
pub struct HostController {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessHost {
    /// Create a new headless host and its controller
    ///
    /// The output is 1280x720 until changed.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (HeadlessHost, HostController) {
        let state = Arc::new(Mutex::new(HeadlessState {
            events: VecDeque::new(),
            effects: Vec::new(),
            output_size: (1280, 720),
            next_surface: 1,
            clock: 0,
            auto_frames: true,
        }));
        (HeadlessHost { state: state.clone() }, HostController { state })
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap()
    }
}

impl Host for HeadlessHost {
    fn poll_event(&mut self) -> Option<HostEvent> {
        self.lock().events.pop_front()
    }

    fn create_surface(&mut self) -> u32 {
        let mut state = self.lock();
        let id = state.next_surface;
        state.next_surface += 1;
        id
    }

    fn effect(&mut self, effect: HostEffect) {
        let mut state = self.lock();
        if let HostEffect::Commit { surface, shm_fd, .. } = effect {
            if state.auto_frames {
                state.present(surface, shm_fd);
            }
        }
        state.effects.push(effect);
    }

    fn output_size(&self) -> (u32, u32) {
        self.lock().output_size
    }
}

impl HostController {
    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap()
    }

    /// Queue a notification for the connection
    ///
    /// It is picked up by the next dispatch. Use
    /// [`Connection::wake()`](crate::client::Connection::wake) to notify the readiness callback.
    pub fn push_event(&self, event: HostEvent) {
        self.lock().events.push_back(event);
    }

    /// Number of notifications not yet pulled by the connection
    pub fn pending_events(&self) -> usize {
        self.lock().events.len()
    }

    /// Take every side effect carried out so far
    pub fn take_effects(&self) -> Vec<HostEffect> {
        std::mem::take(&mut self.lock().effects)
    }

    /// Change the size of the output
    pub fn set_output_size(&self, width: u32, height: u32) {
        self.lock().output_size = (width, height);
    }

    /// Enable or disable the immediate presentation of committed buffers
    pub fn set_auto_frames(&self, enabled: bool) {
        self.lock().auto_frames = enabled;
    }
}
