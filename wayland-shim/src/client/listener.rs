use std::fmt;

use crate::codec::{parse_signature, EventArgs, Payload};
use crate::protocol::{find_event, Interface};
use crate::types::ListenerError;

use super::{Connection, ObjectData, Proxy};

type Handler = Box<dyn Fn(Option<&dyn ObjectData>, &Proxy, Payload, &Connection) + Send + Sync>;

/// The table of event callbacks of an object
///
/// A listener has one slot per event of its interface. Each callback receives the user data
/// of the object, the object itself, and the arguments of the event decoded into the tuple
/// type of its third parameter. Events whose slot is empty are dropped.
///
/// ```
/// use wayland_shim::{client::Listener, interfaces::WL_SEAT_INTERFACE};
///
/// let listener = Listener::new(&WL_SEAT_INTERFACE)
///     .on("capabilities", |_, _seat, (caps,): (u32,)| println!("capabilities: {caps}"))
///     .unwrap();
/// ```
pub struct Listener {
    interface: &'static Interface,
    slots: Vec<Option<Handler>>,
}

impl Listener {
    /// Create an empty listener for the given interface
    pub fn new(interface: &'static Interface) -> Self {
        Self { interface, slots: interface.events.iter().map(|_| None).collect() }
    }

    /// Set the callback of an event
    ///
    /// Fails if the event does not exist on the interface, or if the argument tuple of the
    /// callback cannot be decoded from the event signature.
    pub fn on<A, F>(mut self, event: &str, callback: F) -> Result<Self, ListenerError>
    where
        A: EventArgs + 'static,
        F: Fn(Option<&dyn ObjectData>, &Proxy, A) + Send + Sync + 'static,
    {
        let (opcode, desc) = find_event(self.interface, event)?;
        A::check(&parse_signature(desc.signature)?)?;
        let interface = self.interface;
        self.slots[opcode as usize] = Some(Box::new(move |data, proxy, payload, conn| {
            match A::decode(payload, conn) {
                Ok(args) => callback(data, proxy, args),
                Err(err) => crate::log_warn!(
                    "Dropping event {}.{} for {}: {}",
                    interface.name,
                    desc.name,
                    proxy.id(),
                    err
                ),
            }
        }));
        Ok(self)
    }

    /// Interface this listener was built for
    pub fn interface(&self) -> &'static Interface {
        self.interface
    }

    /// Whether the event of this opcode has a callback
    pub fn handles(&self, opcode: u16) -> bool {
        matches!(self.slots.get(opcode as usize), Some(Some(_)))
    }

    pub(crate) fn invoke(
        &self,
        opcode: u16,
        data: Option<&dyn ObjectData>,
        proxy: &Proxy,
        payload: Payload,
        conn: &Connection,
    ) -> bool {
        match self.slots.get(opcode as usize) {
            Some(Some(handler)) => {
                handler(data, proxy, payload, conn);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Listener {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handled: Vec<_> = self
            .interface
            .events
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.is_some())
            .map(|(desc, _)| desc.name)
            .collect();
        f.debug_struct("Listener")
            .field("interface", &self.interface.name)
            .field("events", &handled)
            .finish()
    }
}
