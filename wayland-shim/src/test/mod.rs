#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crate::{
    client::{Connection, Listener, ObjectData, ObjectId, Proxy},
    config::Config,
    host::HostController,
    interfaces::*,
    protocol::{Argument, Fd, Interface},
};

macro_rules! expand_test {
    ($test_name:ident, $test_body:tt) => {
        #[test]
        fn $test_name() {
            let _ = env_logger::builder().is_test(true).try_init();
            $test_body
        }
    };
}

mod object_args;
mod protocol_error;

/*
 * Helpers shared by the tests
 */

fn new_id() -> Argument<ObjectId> {
    Argument::NewId(ObjectId::null())
}

fn connect(config: Config) -> (Connection, HostController) {
    Connection::connect_headless(config)
}

/// Bind a global of the default configuration, by name
fn bind(connection: &Connection, name: u32, interface: &'static Interface, version: u32) -> Proxy {
    let registry = connection.display().send_request("get_registry", [new_id()]).unwrap().unwrap();
    registry
        .marshal(
            wl_registry::BIND,
            Some(interface),
            version,
            0,
            [
                Argument::Uint(name),
                Argument::Str(Some(interface.name.into())),
                Argument::Uint(version),
                new_id(),
            ],
        )
        .unwrap()
        .unwrap()
}

fn create_surface(connection: &Connection) -> Proxy {
    let compositor = bind(connection, 1, &WL_COMPOSITOR_INTERFACE, 5);
    compositor.send_request("create_surface", [new_id()]).unwrap().unwrap()
}

/// Create a 16x16 buffer in a pool backed by the given fd
fn create_buffer(connection: &Connection, fd: i32) -> Proxy {
    let shm = bind(connection, 2, &WL_SHM_INTERFACE, 1);
    let pool = shm
        .send_request("create_pool", [new_id(), Argument::Fd(Fd(fd)), Argument::Int(4096)])
        .unwrap()
        .unwrap();
    pool.send_request(
        "create_buffer",
        [
            new_id(),
            Argument::Int(0),
            Argument::Int(16),
            Argument::Int(16),
            Argument::Int(64),
            Argument::Uint(wl_shm::FORMAT_ARGB8888),
        ],
    )
    .unwrap()
    .unwrap()
}

/// A "do nothing" data as a helper
struct DoNothingData;

impl ObjectData for DoNothingData {}

/// Data recording the destruction of its object
struct DestroyedFlag(AtomicBool);

impl DestroyedFlag {
    fn new() -> Arc<Self> {
        Arc::new(DestroyedFlag(AtomicBool::new(false)))
    }

    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl ObjectData for DestroyedFlag {
    fn destroyed(&self, _: ObjectId) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Shared storage for values seen by event callbacks
fn recorder<T>() -> Arc<Mutex<Vec<T>>> {
    Arc::new(Mutex::new(Vec::new()))
}
