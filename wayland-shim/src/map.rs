//! Emulated objects map

use crate::config::{PoolKind, PoolLimits};
use crate::protocol::Interface;

/// Protocol id of the display, the first object of every connection
pub const DISPLAY_ID: u32 = 1;

/// The representation of a protocol object
#[derive(Debug, Clone)]
pub struct Object<Data> {
    /// Interface name of this object
    pub interface: &'static Interface,
    /// Version of this object
    pub version: u32,
    /// Pool this object counts against, if any
    pub pool: Option<PoolKind>,
    /// Data associated to this object by the connection
    pub data: Data,
}

/// A holder for the object store of a connection
///
/// Keeps track of which object id is associated to which
/// interface object, and which is currently unused. Ids are
/// reused as soon as their object is removed.
#[derive(Debug)]
pub struct ObjectMap<Data> {
    objects: Vec<Option<Object<Data>>>,
    in_use: [usize; PoolKind::COUNT],
    limits: PoolLimits,
}

impl<Data: Clone> ObjectMap<Data> {
    /// Create a new empty object map
    pub fn new(limits: PoolLimits) -> Self {
        Self { objects: Vec::new(), in_use: [0; PoolKind::COUNT], limits }
    }

    /// Find an object in the store
    pub fn find(&self, id: u32) -> Option<Object<Data>> {
        if id == 0 {
            None
        } else {
            self.objects.get((id - 1) as usize).and_then(Clone::clone)
        }
    }

    /// Remove an object from the store
    ///
    /// Does nothing if the object didn't previously exist, otherwise its pool
    /// slot is returned.
    pub fn remove(&mut self, id: u32) -> Option<Object<Data>> {
        if id == 0 {
            return None;
        }
        let object = self.objects.get_mut((id - 1) as usize).and_then(Option::take)?;
        if let Some(kind) = object.pool {
            self.in_use[kind.index()] -= 1;
        }
        Some(object)
    }

    /// Allocate a new id for an object
    ///
    /// Fails with the pool kind if the pool of the object is exhausted.
    pub fn insert_new(&mut self, object: Object<Data>) -> Result<u32, PoolKind> {
        if let Some(kind) = object.pool {
            if self.in_use[kind.index()] >= self.limits.get(kind) {
                return Err(kind);
            }
            self.in_use[kind.index()] += 1;
        }
        Ok(insert_in(&mut self.objects, object) + 1)
    }

    /// Mutably access an object of the map
    pub fn with<T, F: FnOnce(&mut Object<Data>) -> T>(&mut self, id: u32, f: F) -> Result<T, ()> {
        if id == 0 {
            Err(())
        } else if let Some(&mut Some(ref mut obj)) = self.objects.get_mut((id - 1) as usize) {
            Ok(f(obj))
        } else {
            Err(())
        }
    }

    /// Number of live objects drawn from the given pool
    pub fn in_use(&self, kind: PoolKind) -> usize {
        self.in_use[kind.index()]
    }

    /// Capacity of the pools
    pub fn limits(&self) -> &PoolLimits {
        &self.limits
    }

    /// Remove every object
    pub fn clear(&mut self) {
        self.objects.clear();
        self.in_use = [0; PoolKind::COUNT];
    }

    pub fn all_objects(&self) -> impl Iterator<Item = (u32, &Object<Data>)> {
        self.objects
            .iter()
            .enumerate()
            .flat_map(|(idx, obj)| obj.as_ref().map(|obj| (idx as u32 + 1, obj)))
    }
}

// insert a new object in a store at the first free place
fn insert_in<Data>(store: &mut Vec<Option<Object<Data>>>, object: Object<Data>) -> u32 {
    match store.iter().position(Option::is_none) {
        Some(id) => {
            store[id] = Some(object);
            id as u32
        }
        None => {
            store.push(Some(object));
            (store.len() - 1) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{WL_CALLBACK_INTERFACE, WL_DISPLAY_INTERFACE, WL_SEAT_INTERFACE};

    fn callback() -> Object<()> {
        Object {
            interface: &WL_CALLBACK_INTERFACE,
            version: 1,
            pool: Some(PoolKind::Callback),
            data: (),
        }
    }

    #[test]
    fn ids_start_at_one_and_are_reused() {
        let mut map = ObjectMap::new(PoolLimits::default());
        let display =
            Object { interface: &WL_DISPLAY_INTERFACE, version: 1, pool: None, data: () };
        assert_eq!(map.insert_new(display), Ok(DISPLAY_ID));
        let a = map.insert_new(callback()).unwrap();
        let b = map.insert_new(callback()).unwrap();
        assert_eq!((a, b), (2, 3));
        assert!(map.remove(a).is_some());
        assert!(map.find(a).is_none());
        assert_eq!(map.insert_new(callback()), Ok(a));
        assert_eq!(map.all_objects().count(), 3);
    }

    #[test]
    fn pools_are_bounded() {
        let limits = PoolLimits { callbacks: 2, ..Default::default() };
        let mut map = ObjectMap::new(limits);
        let first = map.insert_new(callback()).unwrap();
        map.insert_new(callback()).unwrap();
        assert_eq!(map.insert_new(callback()), Err(PoolKind::Callback));
        // objects outside of any pool are never limited
        let seat = Object { interface: &WL_SEAT_INTERFACE, version: 1, pool: None, data: () };
        assert!(map.insert_new(seat).is_ok());

        map.remove(first);
        assert_eq!(map.in_use(PoolKind::Callback), 1);
        assert!(map.insert_new(callback()).is_ok());
        // removing twice does not free the slot twice
        assert!(map.remove(first).is_some());
        assert!(map.remove(first).is_none());
        assert_eq!(map.in_use(PoolKind::Callback), 1);
    }
}
