//! Client-side API of the emulated protocol
//!
//! The [`Connection`] plays the role of the `wl_display`: it owns every object of the session
//! and the queue of events waiting to be delivered. Requests are sent through [`Proxy`]
//! handles and answered locally, while the [`Host`] provides the notifications (input,
//! frame presentation, buffer release) that a compositor would otherwise send.
//!
//! Events are delivered to the [`Listener`] of their target object when the application
//! dispatches the connection, never from within a request.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, Weak},
};

use crate::{
    codec::{encode, parse_signature},
    config::Config,
    host::{HeadlessHost, Host, HostController, HostEffect, EMULATED_FD},
    protocol::{
        find_request, same_interface, same_interface_or_anonymous, Argument, Interface,
        ObjectInfo, ANONYMOUS_INTERFACE,
    },
    types::{DispatchError, InvalidId, ListenerError, MarshalError},
};

mod input;
mod listener;
mod requests;
mod roles;
mod state;

pub use listener::Listener;

use state::{ConnectionState, Destroyed};

/// Flag of [`Proxy::marshal()`] destroying the proxy once the request is sent
pub const MARSHAL_FLAG_DESTROY: u32 = 1;

/// A trait representing your data associated to an object
///
/// You will only be given access to it as a `&` reference, so you
/// need to handle interior mutability by yourself.
pub trait ObjectData: downcast_rs::DowncastSync {
    /// Notification that the object has been destroyed and is no longer active
    fn destroyed(&self, _object_id: ObjectId) {}

    /// Helper for forwarding a Debug implementation of your `ObjectData` type
    ///
    /// By default will just print `ObjectData { ... }`
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectData").finish_non_exhaustive()
    }
}

impl fmt::Debug for dyn ObjectData {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug(f)
    }
}

downcast_rs::impl_downcast!(sync ObjectData);

/// An ID representing an object of the session
///
/// Protocol ids are reused once their object is destroyed, but an `ObjectId` keeps
/// referring to the object it was created for: once that object is gone every operation on
/// it fails with [`InvalidId`].
#[derive(Clone)]
pub struct ObjectId {
    pub(crate) id: u32,
    pub(crate) serial: u32,
    pub(crate) interface: &'static Interface,
}

impl ObjectId {
    /// The null ID, which never refers to a live object
    pub fn null() -> ObjectId {
        ObjectId { id: 0, serial: 0, interface: &ANONYMOUS_INTERFACE }
    }

    /// Check if this is the null ID
    #[inline]
    pub fn is_null(&self) -> bool {
        self.id == 0
    }

    /// Interface of the represented object
    #[inline]
    pub fn interface(&self) -> &'static Interface {
        self.interface
    }

    /// Return the protocol-level numerical ID of this object
    ///
    /// Protocol IDs are reused after object destruction, so this should not be used as a
    /// unique identifier.
    #[inline]
    pub fn protocol_id(&self) -> u32 {
        self.id
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.serial == other.serial
            && same_interface(self.interface, other.interface)
    }
}

impl Eq for ObjectId {}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.serial.hash(state);
    }
}

impl fmt::Display for ObjectId {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.interface.name, self.id)
    }
}

impl fmt::Debug for ObjectId {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}, {})", self, self.serial)
    }
}

/// A connection to the emulated display
///
/// This is a cheaply clonable handle, all clones refer to the same session.
#[derive(Clone, Debug)]
pub struct Connection {
    state: Arc<ConnectionState>,
}

/// A weak handle to a [`Connection`]
///
/// Held by the proxies, so that they do not keep the session alive.
#[derive(Clone, Debug)]
pub struct WeakConnection {
    state: Weak<ConnectionState>,
}

impl WeakConnection {
    /// Try to retrieve the connection, if it still exists
    pub fn upgrade(&self) -> Option<Connection> {
        self.state.upgrade().map(|state| Connection { state })
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for Connection {}

impl Connection {
    /// Open a session on the given host
    ///
    /// The display, the registry and every global are created right away.
    pub fn connect(host: impl Host + 'static, config: Config) -> Connection {
        crate::log_debug!("Connecting with {} advertised globals", config.globals.len());
        Connection { state: Arc::new(ConnectionState::new(Box::new(host), config)) }
    }

    /// Open a session on a new [`HeadlessHost`]
    pub fn connect_headless(config: Config) -> (Connection, HostController) {
        let (host, controller) = HeadlessHost::new();
        (Connection::connect(host, config), controller)
    }

    /// Get a weak handle to this connection
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection { state: Arc::downgrade(&self.state) }
    }

    /// The `wl_display` object
    pub fn display(&self) -> Proxy {
        let id = self.state.lock_protocol().display_id();
        Proxy::from_id(self, id)
    }

    /// Close the session
    ///
    /// Every object is destroyed and pending events are discarded. Does nothing if the session
    /// is already closed.
    pub fn disconnect(&self) {
        let destroyed: Destroyed = {
            let mut state = self.state.lock_protocol();
            if !state.connected {
                return;
            }
            state.host.effect(HostEffect::Disconnect);
            state.connected = false;
            let destroyed = state
                .map
                .all_objects()
                .map(|(id, obj)| {
                    (
                        ObjectId { id, serial: obj.data.serial, interface: obj.interface },
                        obj.data.user_data.clone(),
                    )
                })
                .collect();
            state.map.clear();
            state.queue.clear();
            destroyed
        };
        crate::log_info!("Disconnected, {} objects destroyed", destroyed.len());
        notify_destroyed(destroyed);
    }

    /// Start a new session, closing the current one first
    ///
    /// Ids of the previous session are invalid in the new one.
    pub fn reconnect(&self) {
        self.disconnect();
        self.state.lock_protocol().init();
    }

    /// Whether the session is open
    pub fn is_connected(&self) -> bool {
        self.state.lock_protocol().connected
    }

    /// The file descriptor of the connection
    ///
    /// There is no socket behind an emulated connection, this is a fixed placeholder value
    /// only meant to be handed to code that expects one.
    pub fn get_fd(&self) -> i32 {
        EMULATED_FD
    }

    /// Flush the outgoing requests
    ///
    /// Requests are handled as soon as they are sent, so this only checks that the session is
    /// open.
    pub fn flush(&self) -> Result<(), DispatchError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DispatchError::Disconnected)
        }
    }

    /// Pull every notification of the host and dispatch until no event is left
    ///
    /// Returns the number of events dispatched.
    pub fn roundtrip(&self) -> Result<usize, DispatchError> {
        self.pull_host_events()?;
        let mut dispatched = 0;
        while self.pending_events() > 0 {
            dispatched += self.drain()?;
        }
        Ok(dispatched)
    }

    /// Pull every notification of the host, then dispatch the queued events
    ///
    /// Events queued by the callbacks during this dispatch are left for the next one.
    pub fn dispatch(&self) -> Result<usize, DispatchError> {
        self.pull_host_events()?;
        self.drain()
    }

    /// Dispatch the queued events without polling the host
    pub fn dispatch_pending(&self) -> Result<usize, DispatchError> {
        self.drain()
    }

    /// Prepare to read notifications from the host
    ///
    /// Fails with [`DispatchError::WouldBlock`] if events are already waiting to be
    /// dispatched: they must be processed first.
    pub fn prepare_read(&self) -> Result<ReadEventsGuard, DispatchError> {
        let state = self.state.lock_protocol();
        if !state.connected {
            return Err(DispatchError::Disconnected);
        }
        if !state.queue.is_empty() {
            return Err(DispatchError::WouldBlock);
        }
        Ok(ReadEventsGuard { connection: self.clone() })
    }

    /// Set the callback invoked when the connection becomes ready to be dispatched
    ///
    /// The connection is ready when events are queued or the host signalled new
    /// notifications. The callback is invoked right away if the connection is already ready,
    /// and again after each dispatch leaving it ready. It is never invoked with internal
    /// locks held, so it may use the connection.
    pub fn on_ready<F: Fn() + Send + Sync + 'static>(&self, callback: F) {
        self.state.set_notifier(Some(Arc::new(callback)));
        {
            let mut state = self.state.lock_protocol();
            state.notify = state.readable || !state.queue.is_empty();
        }
        self.state.notify_ready();
    }

    /// Signal that the host has new notifications
    pub fn wake(&self) {
        {
            let mut state = self.state.lock_protocol();
            state.readable = true;
            state.notify = true;
        }
        self.state.notify_ready();
    }

    /// Whether the host signalled notifications that were not read yet
    pub fn is_readable(&self) -> bool {
        self.state.lock_protocol().readable
    }

    /// Number of events waiting to be dispatched
    pub fn pending_events(&self) -> usize {
        self.state.lock_protocol().queue.len()
    }

    /// Get the protocol information related to given object ID
    pub fn object_info(&self, id: &ObjectId) -> Result<ObjectInfo, InvalidId> {
        let object = self.state.lock_protocol().get_object(id)?;
        Ok(ObjectInfo { id: id.id, interface: object.interface, version: object.version })
    }

    fn pull_host_events(&self) -> Result<usize, DispatchError> {
        let mut state = self.state.lock_protocol();
        if !state.connected {
            return Err(DispatchError::Disconnected);
        }
        let mut count = 0;
        while let Some(event) = state.host.poll_event() {
            input::translate(&mut state, event);
            count += 1;
        }
        state.readable = false;
        Ok(count)
    }

    /// Deliver the events present in the queue when called
    fn drain(&self) -> Result<usize, DispatchError> {
        let count = {
            let state = self.state.lock_protocol();
            if !state.connected {
                return Err(DispatchError::Disconnected);
            }
            state.queue.len()
        };

        let mut dispatched = 0;
        for _ in 0..count {
            let mut state = self.state.lock_protocol();
            let Some(event) = state.queue.pop() else {
                // the session was closed by a callback
                break;
            };
            let Ok(object) = state.get_object(&event.target) else {
                crate::log_debug!("Discarding event for dead object {}", event.target);
                continue;
            };
            let Some(desc) = object.interface.events.get(event.opcode as usize) else {
                continue;
            };
            state.trace_dispatch(&event.target, desc.name, &event.payload);
            std::mem::drop(state);

            if let Some(ref listener) = object.data.listener {
                let proxy = Proxy::from_id(self, event.target.clone());
                listener.invoke(
                    event.opcode,
                    object.data.user_data.as_deref(),
                    &proxy,
                    event.payload,
                    self,
                );
            }
            dispatched += 1;

            if desc.is_destructor {
                let destroyed = self.state.lock_protocol().destroy(&event.target);
                notify_destroyed(destroyed);
            }
        }

        {
            let mut state = self.state.lock_protocol();
            state.notify = state.readable || !state.queue.is_empty();
        }
        self.state.notify_ready();
        Ok(dispatched)
    }
}

fn notify_destroyed(destroyed: Destroyed) {
    for (id, data) in destroyed {
        if let Some(data) = data {
            data.destroyed(id);
        }
    }
}

/// A guard over a pending read of host notifications
///
/// Obtained with [`Connection::prepare_read()`]. Dropping it cancels the read.
#[derive(Debug)]
pub struct ReadEventsGuard {
    connection: Connection,
}

impl ReadEventsGuard {
    /// Access the file descriptor of the connection
    pub fn connection_fd(&self) -> i32 {
        self.connection.get_fd()
    }

    /// Read the notifications of the host and queue the matching events
    ///
    /// Returns the number of notifications read. The events must then be delivered with
    /// [`Connection::dispatch_pending()`].
    pub fn read(self) -> Result<usize, DispatchError> {
        let count = self.connection.pull_host_events()?;
        {
            let mut state = self.connection.state.lock_protocol();
            state.notify = !state.queue.is_empty();
        }
        self.connection.state.notify_ready();
        Ok(count)
    }
}

/// A handle to an object of the session
#[derive(Clone)]
pub struct Proxy {
    id: ObjectId,
    connection: WeakConnection,
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Proxy {}

impl fmt::Debug for Proxy {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Proxy").field(&self.id).finish()
    }
}

impl fmt::Display for Proxy {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

impl Proxy {
    /// Create a handle for an object id of this connection
    ///
    /// The id is not checked, a proxy for a dead or null id is simply not alive.
    pub fn from_id(connection: &Connection, id: ObjectId) -> Proxy {
        Proxy { id, connection: connection.downgrade() }
    }

    /// The id of this object
    pub fn id(&self) -> ObjectId {
        self.id.clone()
    }

    /// Interface of this object
    pub fn interface(&self) -> &'static Interface {
        self.id.interface
    }

    /// Version of this object, or 0 if it is no longer alive
    pub fn version(&self) -> u32 {
        self.with_state(|state| state.get_object(&self.id).map(|obj| obj.version).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Whether this object is still alive
    pub fn is_alive(&self) -> bool {
        self.with_state(|state| state.is_alive(&self.id)).unwrap_or(false)
    }

    /// The connection of this object, if it still exists
    pub fn connection(&self) -> Option<Connection> {
        self.connection.upgrade()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut state::ProtocolState) -> T) -> Option<T> {
        let connection = self.connection.upgrade()?;
        let mut state = connection.state.lock_protocol();
        Some(f(&mut state))
    }

    /// Send a request by opcode
    ///
    /// If the request creates an object, `new_interface` and `version` describe it; they are
    /// only needed for requests whose created interface is not fixed (`wl_registry.bind`).
    /// Created objects are returned as a new proxy. With [`MARSHAL_FLAG_DESTROY`], this
    /// proxy is destroyed once the request is handled.
    ///
    /// New-id arguments are given as `Argument::NewId(ObjectId::null())` placeholders.
    pub fn marshal(
        &self,
        opcode: u16,
        new_interface: Option<&'static Interface>,
        version: u32,
        flags: u32,
        args: impl IntoIterator<Item = Argument<ObjectId>>,
    ) -> Result<Option<Proxy>, MarshalError> {
        let connection = self.connection.upgrade().ok_or(MarshalError::Disconnected)?;
        let (result, destroyed) = {
            let mut state = connection.state.lock_protocol();
            if !state.connected {
                return Err(MarshalError::Disconnected);
            }
            let result = marshal_locked(&mut state, &self.id, opcode, new_interface, version, args);
            let destroy = matches!(result, Ok((true, _)))
                || (result.is_ok() && flags & MARSHAL_FLAG_DESTROY != 0);
            let destroyed = if destroy { state.destroy(&self.id) } else { Destroyed::new() };
            (result.map(|(_, created)| created), destroyed)
        };
        notify_destroyed(destroyed);
        connection.state.notify_ready();
        Ok(result?.map(|id| Proxy::from_id(&connection, id)))
    }

    /// Send a request by name
    ///
    /// Requests that do not exist on the interface are logged and ignored.
    pub fn send_request(
        &self,
        name: &str,
        args: impl IntoIterator<Item = Argument<ObjectId>>,
    ) -> Result<Option<Proxy>, MarshalError> {
        let (opcode, desc) = match find_request(self.id.interface, name) {
            Ok(found) => found,
            Err(err) => {
                crate::log_warn!("{err}, request ignored");
                return Ok(None);
            }
        };
        self.marshal(opcode, desc.child_interface, self.version(), 0, args)
    }

    /// Set the listener of this object, along with its user data
    ///
    /// An object has at most one listener. Setting it may queue the events the object
    /// announces itself with, like the capabilities of a `wl_seat`. If the queue cannot hold
    /// all of them, nothing is queued, the object is left without a listener and
    /// [`ListenerError::Queue`] is returned.
    pub fn add_listener(
        &self,
        listener: Listener,
        user_data: Option<Arc<dyn ObjectData>>,
    ) -> Result<(), ListenerError> {
        if !same_interface(listener.interface(), self.id.interface) {
            return Err(ListenerError::WrongInterface {
                expected: self.id.interface.name,
                got: listener.interface().name,
            });
        }
        let connection = self.connection.upgrade().ok_or(ListenerError::InvalidId)?;
        {
            let mut state = connection.state.lock_protocol();
            let listener = Arc::new(listener);
            let previous = state.with_data(&self.id, move |data| {
                if data.listener.is_some() {
                    return Err(ListenerError::AlreadySet);
                }
                data.listener = Some(listener);
                Ok(std::mem::replace(&mut data.user_data, user_data))
            })??;
            if let Err(err) = requests::announce(&mut state, &self.id) {
                let _ = state.with_data(&self.id, move |data| {
                    data.listener = None;
                    data.user_data = previous;
                });
                return Err(ListenerError::Queue(err));
            }
        }
        connection.state.notify_ready();
        Ok(())
    }

    /// The user data of this object
    pub fn user_data(&self) -> Option<Arc<dyn ObjectData>> {
        self.with_state(|state| state.get_object(&self.id).ok().and_then(|obj| obj.data.user_data))
            .flatten()
    }

    /// Replace the user data of this object
    pub fn set_user_data(&self, data: Arc<dyn ObjectData>) -> Result<(), InvalidId> {
        self.with_state(|state| state.with_data(&self.id, |d| d.user_data = Some(data)))
            .unwrap_or(Err(InvalidId))
    }

    /// The tag of this object
    pub fn tag(&self) -> Option<&'static str> {
        self.with_state(|state| state.get_object(&self.id).ok().and_then(|obj| obj.data.tag))
            .flatten()
    }

    /// Label this object, tags are only meant for debugging
    pub fn set_tag(&self, tag: &'static str) -> Result<(), InvalidId> {
        self.with_state(|state| state.with_data(&self.id, |d| d.tag = Some(tag)))
            .unwrap_or(Err(InvalidId))
    }

    /// Destroy this object locally, without sending any request
    ///
    /// Objects owned by this one (frame callbacks of a surface, toplevel of an xdg_surface)
    /// are destroyed along with it. Does nothing if the object is already dead.
    pub fn destroy(&self) {
        if let Some(connection) = self.connection.upgrade() {
            let destroyed = connection.state.lock_protocol().destroy(&self.id);
            notify_destroyed(destroyed);
        }
    }
}

/// Validate a request and carry it out, returning whether it is a destructor
fn marshal_locked(
    state: &mut state::ProtocolState,
    target: &ObjectId,
    opcode: u16,
    new_interface: Option<&'static Interface>,
    version: u32,
    args: impl IntoIterator<Item = Argument<ObjectId>>,
) -> Result<(bool, Option<ObjectId>), MarshalError> {
    let object = match state.get_object(target) {
        Ok(object) => object,
        Err(err) => {
            if state.debug {
                let name = target.interface.requests.get(opcode as usize).map_or("?", |d| d.name);
                crate::debug::print_send_message(
                    target.interface.name,
                    target.id,
                    name,
                    &[] as &[Argument<ObjectId>],
                    true,
                );
            }
            return Err(err.into());
        }
    };
    let Some(desc) = object.interface.requests.get(opcode as usize) else {
        crate::log_debug!("Unknown opcode {} for {}, request ignored", opcode, target);
        return Ok((false, None));
    };
    let args = encode(&parse_signature(desc.signature)?, args)?;

    let mut object_args = desc.arg_interfaces.iter();
    for (index, arg) in args.iter().enumerate() {
        let Argument::Object(id) = arg else {
            continue;
        };
        let expected = object_args.next();
        if id.is_null() {
            continue;
        }
        let arg_object = state.get_object(id)?;
        if let Some(expected) = expected {
            if !same_interface_or_anonymous(expected, arg_object.interface) {
                return Err(MarshalError::ArgumentInterface {
                    index,
                    expected: expected.name,
                    got: arg_object.interface.name,
                });
            }
        }
    }

    state.trace_send(target, desc.name, &args);
    if desc.is_destructor {
        return Ok((true, None));
    }
    let created = requests::handle(
        state,
        requests::Request {
            target,
            version: object.version,
            opcode,
            args: &args,
            child_spec: new_interface.map(|iface| (iface, version)),
        },
    )?;
    Ok((false, created))
}
