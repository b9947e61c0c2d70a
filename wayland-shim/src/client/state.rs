//! State shared by every handle of a connection

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    codec::{encode, parse_signature, Payload},
    config::{Config, PoolKind},
    debug,
    host::Host,
    interfaces::{
        WL_COMPOSITOR_INTERFACE, WL_DISPLAY_INTERFACE, WL_KEYBOARD_INTERFACE,
        WL_POINTER_INTERFACE, WL_REGISTRY_INTERFACE, WL_SEAT_INTERFACE, WL_SHM_INTERFACE,
        XDG_WM_BASE_INTERFACE, ZXDG_DECORATION_MANAGER_V1_INTERFACE,
    },
    map::{Object, ObjectMap, DISPLAY_ID},
    protocol::{find_event, Argument, Interface},
    queue::EventQueue,
    types::{InvalidId, MarshalError, QueueError},
};

use super::{roles::Role, Listener, ObjectData, ObjectId};

#[derive(Debug, Clone)]
pub(crate) struct Data {
    pub serial: u32,
    pub user_data: Option<Arc<dyn ObjectData>>,
    pub listener: Option<Arc<Listener>>,
    pub tag: Option<&'static str>,
    pub role: Role,
}

impl Data {
    fn new(serial: u32, role: Role) -> Self {
        Self { serial, user_data: None, listener: None, tag: None, role }
    }
}

/// An event waiting in the queue
#[derive(Debug)]
pub(crate) struct PendingEvent {
    pub target: ObjectId,
    pub opcode: u16,
    pub payload: Payload,
}

/// Objects that exist once per connection
#[derive(Debug, Clone)]
pub(crate) struct Singletons {
    pub registry: ObjectId,
    pub compositor: ObjectId,
    pub shm: ObjectId,
    pub wm_base: ObjectId,
    pub seat: ObjectId,
    pub keyboard: ObjectId,
    pub pointer: ObjectId,
    pub decoration_manager: ObjectId,
}

impl Singletons {
    pub fn all(&self) -> [&ObjectId; 8] {
        [
            &self.registry,
            &self.compositor,
            &self.shm,
            &self.wm_base,
            &self.seat,
            &self.keyboard,
            &self.pointer,
            &self.decoration_manager,
        ]
    }

    pub fn for_interface(&self, name: &str) -> Option<&ObjectId> {
        self.all().into_iter().find(|id| id.interface().name == name)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.all().into_iter().any(|singleton| singleton == id)
    }
}

pub(crate) type Destroyed = Vec<(ObjectId, Option<Arc<dyn ObjectData>>)>;

pub(crate) struct ProtocolState {
    pub map: ObjectMap<Data>,
    pub queue: EventQueue<PendingEvent>,
    pub host: Box<dyn Host>,
    pub config: Config,
    pub singletons: Singletons,
    pub connected: bool,
    pub debug: bool,
    last_serial: u32,
    input_serial: u32,
    commit_seq: u64,
    /// The host signalled new notifications
    pub readable: bool,
    /// The readiness callback must be invoked once the lock is released
    pub notify: bool,
}

impl std::fmt::Debug for ProtocolState {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolState")
            .field("map", &self.map)
            .field("queue", &self.queue)
            .field("connected", &self.connected)
            .field("last_serial", &self.last_serial)
            .finish_non_exhaustive()
    }
}

type Notifier = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct ConnectionState {
    protocol: Mutex<ProtocolState>,
    notifier: Mutex<Option<Notifier>>,
}

impl std::fmt::Debug for ConnectionState {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionState").field("protocol", &self.protocol).finish_non_exhaustive()
    }
}

impl ConnectionState {
    pub fn new(host: Box<dyn Host>, config: Config) -> Self {
        let queue = EventQueue::new(config.queue_capacity, config.overflow);
        let debug = config.debug;
        let mut state = ProtocolState {
            map: ObjectMap::new(config.limits),
            queue,
            host,
            config,
            singletons: Singletons {
                registry: ObjectId::null(),
                compositor: ObjectId::null(),
                shm: ObjectId::null(),
                wm_base: ObjectId::null(),
                seat: ObjectId::null(),
                keyboard: ObjectId::null(),
                pointer: ObjectId::null(),
                decoration_manager: ObjectId::null(),
            },
            connected: false,
            debug,
            last_serial: 0,
            input_serial: 0,
            commit_seq: 0,
            readable: false,
            notify: false,
        };
        state.init();
        Self { protocol: Mutex::new(state), notifier: Mutex::new(None) }
    }

    pub fn lock_protocol(&self) -> MutexGuard<'_, ProtocolState> {
        self.protocol.lock().unwrap()
    }

    pub fn set_notifier(&self, notifier: Option<Notifier>) {
        *self.notifier.lock().unwrap() = notifier;
    }

    /// Invoke the readiness callback if new events became available
    ///
    /// Must be called without the protocol lock held.
    pub fn notify_ready(&self) {
        let fire = std::mem::take(&mut self.lock_protocol().notify);
        if fire {
            let notifier = self.notifier.lock().unwrap().clone();
            if let Some(notifier) = notifier {
                notifier();
            }
        }
    }
}

impl ProtocolState {
    /// Populate the object map of a fresh session
    pub fn init(&mut self) {
        self.map.clear();
        self.queue.clear();
        self.readable = false;
        self.notify = false;

        let display = self.insert_singleton(&WL_DISPLAY_INTERFACE);
        debug_assert_eq!(display.protocol_id(), DISPLAY_ID);
        self.singletons = Singletons {
            registry: self.insert_singleton(&WL_REGISTRY_INTERFACE),
            compositor: self.insert_singleton(&WL_COMPOSITOR_INTERFACE),
            shm: self.insert_singleton(&WL_SHM_INTERFACE),
            wm_base: self.insert_singleton(&XDG_WM_BASE_INTERFACE),
            seat: self.insert_singleton(&WL_SEAT_INTERFACE),
            keyboard: self.insert_singleton(&WL_KEYBOARD_INTERFACE),
            pointer: self.insert_singleton(&WL_POINTER_INTERFACE),
            decoration_manager: self.insert_singleton(&ZXDG_DECORATION_MANAGER_V1_INTERFACE),
        };
        self.connected = true;
    }

    fn insert_singleton(&mut self, interface: &'static Interface) -> ObjectId {
        let serial = self.next_serial();
        let object =
            Object { interface, version: 1, pool: None, data: Data::new(serial, Role::None) };
        // singletons are outside of any pool, this cannot fail
        let id = self.map.insert_new(object).unwrap_or(0);
        ObjectId { id, serial, interface }
    }

    pub fn display_id(&self) -> ObjectId {
        let serial = self.map.find(DISPLAY_ID).map(|obj| obj.data.serial).unwrap_or(0);
        ObjectId { id: DISPLAY_ID, serial, interface: &WL_DISPLAY_INTERFACE }
    }

    fn next_serial(&mut self) -> u32 {
        self.last_serial = self.last_serial.wrapping_add(1);
        self.last_serial
    }

    /// Serial carried by input and configure events
    pub fn next_input_serial(&mut self) -> u32 {
        self.input_serial = self.input_serial.wrapping_add(1);
        self.input_serial
    }

    pub fn current_input_serial(&self) -> u32 {
        self.input_serial
    }

    pub fn next_commit(&mut self) -> u64 {
        self.commit_seq += 1;
        self.commit_seq
    }

    pub fn get_object(&self, id: &ObjectId) -> Result<Object<Data>, InvalidId> {
        let object = self.map.find(id.id).ok_or(InvalidId)?;
        if object.data.serial != id.serial {
            return Err(InvalidId);
        }
        Ok(object)
    }

    pub fn is_alive(&self, id: &ObjectId) -> bool {
        self.get_object(id).is_ok()
    }

    pub fn has_listener(&self, id: &ObjectId) -> bool {
        self.get_object(id).map(|obj| obj.data.listener.is_some()).unwrap_or(false)
    }

    /// Mutably access the data of a live object
    pub fn with_data<T>(
        &mut self,
        id: &ObjectId,
        f: impl FnOnce(&mut Data) -> T,
    ) -> Result<T, InvalidId> {
        self.map
            .with(id.id, |obj| {
                if obj.data.serial == id.serial {
                    Ok(f(&mut obj.data))
                } else {
                    Err(InvalidId)
                }
            })
            .unwrap_or(Err(InvalidId))
    }

    pub fn with_role<T>(
        &mut self,
        id: &ObjectId,
        f: impl FnOnce(&mut Role) -> T,
    ) -> Result<T, InvalidId> {
        self.with_data(id, |data| f(&mut data.role))
    }

    pub fn set_version(&mut self, id: &ObjectId, version: u32) -> Result<(), InvalidId> {
        self.map
            .with(id.id, |obj| {
                if obj.data.serial == id.serial {
                    obj.version = version;
                    Ok(())
                } else {
                    Err(InvalidId)
                }
            })
            .unwrap_or(Err(InvalidId))
    }

    /// Allocate a new object, drawing from its pool if it has one
    pub fn alloc(
        &mut self,
        interface: &'static Interface,
        version: u32,
        role: Role,
    ) -> Result<ObjectId, MarshalError> {
        let serial = self.next_serial();
        let object = Object {
            interface,
            version,
            pool: PoolKind::for_interface(interface),
            data: Data::new(serial, role),
        };
        match self.map.insert_new(object) {
            Ok(id) => Ok(ObjectId { id, serial, interface }),
            Err(kind) => {
                crate::log_error!(
                    "Cannot create a new {}: all {} {} slots are in use",
                    interface.name,
                    self.map.limits().get(kind),
                    kind
                );
                Err(MarshalError::ResourceExhausted(kind))
            }
        }
    }

    /// Queue an event for an object
    ///
    /// Failures to resolve or encode the event are logged and the event is dropped. Only a
    /// full queue is reported.
    pub fn send_event(
        &mut self,
        target: &ObjectId,
        name: &str,
        args: impl IntoIterator<Item = Argument<ObjectId>>,
    ) -> Result<(), QueueError> {
        let interface = target.interface();
        let (opcode, desc) = match find_event(interface, name) {
            Ok(found) => found,
            Err(err) => {
                crate::log_warn!("{err}, event dropped");
                return Ok(());
            }
        };
        let payload = match parse_signature(desc.signature).and_then(|sig| encode(&sig, args)) {
            Ok(payload) => payload,
            Err(err) => {
                crate::log_warn!("Dropping event {}.{}: {}", interface.name, name, err);
                return Ok(());
            }
        };
        let was_empty = self.queue.is_empty();
        if let Err(err) = self.queue.push(PendingEvent { target: target.clone(), opcode, payload })
        {
            crate::log_error!("Dropping event {}.{} for {}: {}", interface.name, name, target, err);
            return Err(err);
        }
        if was_empty {
            self.notify = true;
        }
        Ok(())
    }

    /// Make sure `count` events can be queued before queuing any of them
    pub fn reserve_events(&mut self, count: usize) -> Result<(), QueueError> {
        self.queue.reserve(count).map_err(|err| {
            crate::log_error!("Cannot queue {} events: {}", count, err);
            err
        })
    }

    /// Remove an object created by a request that failed midway
    ///
    /// The object was never handed out, so it has no user data to notify.
    pub fn discard(&mut self, id: &ObjectId) {
        let _ = self.destroy(id);
    }

    /// Destroy an object and the objects that cannot outlive it
    ///
    /// Singletons are never removed, they only lose their listener and user data. Returns the
    /// objects that were removed along with their user data.
    pub fn destroy(&mut self, id: &ObjectId) -> Destroyed {
        let mut destroyed = Destroyed::new();
        let mut pending = vec![id.clone()];
        while let Some(id) = pending.pop() {
            if id.id == DISPLAY_ID || !self.is_alive(&id) {
                continue;
            }
            if self.singletons.contains(&id) {
                let user_data = self
                    .with_data(&id, |data| {
                        data.listener = None;
                        data.tag = None;
                        data.user_data.take()
                    })
                    .unwrap_or(None);
                destroyed.push((id, user_data));
                continue;
            }
            let Some(object) = self.map.remove(id.id) else {
                continue;
            };
            match object.data.role {
                Role::Surface(surface) => {
                    pending.extend(surface.frames);
                    pending.extend(surface.xdg_surface);
                }
                Role::FrameCallback { surface } => {
                    let _ = self.with_role(&surface, |role| {
                        if let Some(surface) = role.surface_mut() {
                            surface.frames.retain(|cb| cb != &id);
                        }
                    });
                }
                Role::XdgSurface(xdg) => {
                    let _ = self.with_role(&xdg.surface, |role| {
                        if let Some(surface) = role.surface_mut() {
                            surface.xdg_surface = None;
                        }
                    });
                    pending.extend(xdg.toplevel);
                }
                Role::Toplevel(toplevel) => {
                    let _ = self.with_role(&toplevel.xdg_surface, |role| {
                        if let Some(xdg) = role.xdg_surface_mut() {
                            xdg.toplevel = None;
                        }
                    });
                    pending.extend(toplevel.decoration);
                }
                Role::Decoration(decoration) => {
                    let _ = self.with_role(&decoration.toplevel, |role| {
                        if let Some(toplevel) = role.toplevel_mut() {
                            toplevel.decoration = None;
                        }
                    });
                }
                Role::Buffer(_) => {
                    let buffer = id.clone();
                    let surfaces: Vec<_> = self
                        .find_objects(move |obj| {
                            obj.data.role.surface().map_or(false, |s| s.buffer.as_ref() == Some(&buffer))
                        })
                        .collect();
                    for surface in surfaces {
                        let _ = self.with_role(&surface, |role| {
                            if let Some(surface) = role.surface_mut() {
                                surface.buffer = None;
                            }
                        });
                    }
                }
                Role::ShmPool(_) | Role::None => {}
            }
            destroyed.push((id, object.data.user_data));
        }
        destroyed
    }

    /// Find the live objects matching a predicate
    pub fn find_objects<'a>(
        &'a self,
        mut pred: impl FnMut(&Object<Data>) -> bool + 'a,
    ) -> impl Iterator<Item = ObjectId> + 'a {
        self.map
            .all_objects()
            .filter(move |(_, obj)| pred(obj))
            .map(|(id, obj)| ObjectId { id, serial: obj.data.serial, interface: obj.interface })
    }

    /// Find the live surface presented by the host under this id
    pub fn surface_by_host_id(&self, host_id: u32) -> Option<ObjectId> {
        self.find_objects(move |obj| obj.data.role.surface().map_or(false, |s| s.host_id == host_id))
            .next()
    }

    pub fn trace_send(&self, id: &ObjectId, name: &str, args: &[Argument<ObjectId>]) {
        if self.debug {
            debug::print_send_message(id.interface().name, id.id, name, args, false);
        }
        #[cfg(feature = "log")]
        crate::log_debug!("Sending {}.{} ({})", id, name, debug::DisplaySlice(args));
    }

    pub fn trace_dispatch(&self, id: &ObjectId, name: &str, args: &[Argument<ObjectId>]) {
        if self.debug {
            debug::print_dispatched_message(id.interface().name, id.id, name, args);
        }
        #[cfg(feature = "log")]
        crate::log_debug!("Dispatching {}.{} ({})", id, name, debug::DisplaySlice(args));
    }
}
