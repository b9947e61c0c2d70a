// This module contains helpers functions and types that
// are not test in themselves, but are used by several tests.

#![allow(dead_code)]

pub extern crate wayland_shim as shim;

use std::sync::{Arc, Mutex};

use shim::{
    client::{Connection, Listener, ObjectId, Proxy},
    config::Config,
    host::HostController,
    interfaces::{
        wl_shm, WL_COMPOSITOR_INTERFACE, WL_REGISTRY_INTERFACE, WL_SHM_INTERFACE,
        XDG_WM_BASE_INTERFACE,
    },
    protocol::{Argument, Fd, Interface},
};

pub type Recorder<T> = Arc<Mutex<Vec<T>>>;

pub fn recorder<T>() -> Recorder<T> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn new_id() -> Argument<ObjectId> {
    Argument::NewId(ObjectId::null())
}

pub struct TestClient {
    pub connection: Connection,
    pub host: HostController,
    pub registry: Proxy,
    pub globals: Recorder<(u32, String, u32)>,
}

impl TestClient {
    pub fn new() -> TestClient {
        TestClient::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> TestClient {
        let _ = env_logger::builder().is_test(true).try_init();
        let (connection, host) = Connection::connect_headless(config);
        let registry = connection
            .display()
            .send_request("get_registry", [new_id()])
            .expect("Failed to get the registry.")
            .unwrap();
        let globals = recorder();
        let globals2 = globals.clone();
        registry
            .add_listener(
                Listener::new(&WL_REGISTRY_INTERFACE)
                    .on("global", move |_, _, (name, interface, version): (u32, String, u32)| {
                        globals2.lock().unwrap().push((name, interface, version))
                    })
                    .unwrap(),
                None,
            )
            .unwrap();
        connection.roundtrip().unwrap();
        TestClient { connection, host, registry, globals }
    }

    pub fn roundtrip(&self) -> usize {
        self.connection.roundtrip().unwrap()
    }

    /// Name of the advertised global of this interface
    pub fn global_name(&self, interface: &str) -> Option<u32> {
        self.globals.lock().unwrap().iter().find(|g| g.1 == interface).map(|g| g.0)
    }

    pub fn bind(&self, interface: &'static Interface, version: u32) -> Proxy {
        let name = self.global_name(interface.name).expect("Missing global.");
        self.registry
            .send_request(
                "bind",
                [
                    Argument::Uint(name),
                    Argument::Str(Some(interface.name.into())),
                    Argument::Uint(version),
                    new_id(),
                ],
            )
            .unwrap()
            .expect("Bind did not create an object.")
    }

    pub fn create_surface(&self) -> Proxy {
        let compositor = self.bind(&WL_COMPOSITOR_INTERFACE, 5);
        compositor.send_request("create_surface", [new_id()]).unwrap().unwrap()
    }

    /// Create a surface with the toplevel role, returns the surface, its xdg_surface and
    /// its toplevel
    pub fn create_toplevel(&self) -> (Proxy, Proxy, Proxy) {
        let surface = self.create_surface();
        let wm_base = self.bind(&XDG_WM_BASE_INTERFACE, 4);
        let xdg_surface = wm_base
            .send_request("get_xdg_surface", [new_id(), Argument::Object(surface.id())])
            .unwrap()
            .unwrap();
        let toplevel = xdg_surface.send_request("get_toplevel", [new_id()]).unwrap().unwrap();
        (surface, xdg_surface, toplevel)
    }

    pub fn create_buffer(&self, fd: i32, width: i32, height: i32) -> Proxy {
        let shm = self.bind(&WL_SHM_INTERFACE, 1);
        let pool = shm
            .send_request(
                "create_pool",
                [new_id(), Argument::Fd(Fd(fd)), Argument::Int(width * height * 4)],
            )
            .unwrap()
            .unwrap();
        pool.send_request(
            "create_buffer",
            [
                new_id(),
                Argument::Int(0),
                Argument::Int(width),
                Argument::Int(height),
                Argument::Int(width * 4),
                Argument::Uint(wl_shm::FORMAT_XRGB8888),
            ],
        )
        .unwrap()
        .unwrap()
    }
}
