//! Runtime configuration of an emulated connection

use std::path::{Path, PathBuf};

use crate::protocol::Interface;

/// Placeholder replaced by the toplevel title in decoration templates
pub const TITLE_PLACEHOLDER: &str = "[TITLE]";

/// Decoration drawn around server-side decorated toplevels when no template file is found
pub const DEFAULT_DECORATION_TEMPLATE: &str = "<div id='innerDeco' style='height:25px;background-color:#ddfffb;display:flex;align-items:center'><img id='close' src='/netfs/usr/share/close_icon.png' style='width:15px;height:13px;margin-left:5px;user-select:none'></img><img id='min' src='/netfs/usr/share/min_icon.png' style='width:15px;height:15px;margin-left:5px;user-select:none'></img><span id='title' style='margin:auto; font-family:sans-serif; user-select:none'>[TITLE]</span></div>";

/// System-wide decoration template, looked up after the user ones
pub const SYSTEM_DECORATION_PATH: &str = "/etc/xdg/system/deco.html";

/// Kinds of objects drawn from bounded pools
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// `wl_surface`
    Surface,
    /// `xdg_surface`
    XdgSurface,
    /// `xdg_toplevel`
    Toplevel,
    /// `wl_callback`, both frame and sync callbacks
    Callback,
    /// `wl_shm_pool`
    ShmPool,
    /// `wl_buffer`
    Buffer,
}

impl PoolKind {
    /// Number of pool kinds
    pub const COUNT: usize = 6;

    /// The pool objects of the given interface are drawn from, if any
    pub fn for_interface(interface: &Interface) -> Option<PoolKind> {
        match interface.name {
            "wl_surface" => Some(PoolKind::Surface),
            "xdg_surface" => Some(PoolKind::XdgSurface),
            "xdg_toplevel" => Some(PoolKind::Toplevel),
            "wl_callback" => Some(PoolKind::Callback),
            "wl_shm_pool" => Some(PoolKind::ShmPool),
            "wl_buffer" => Some(PoolKind::Buffer),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for PoolKind {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PoolKind::Surface => "surface",
            PoolKind::XdgSurface => "xdg_surface",
            PoolKind::Toplevel => "toplevel",
            PoolKind::Callback => "callback",
            PoolKind::ShmPool => "shm_pool",
            PoolKind::Buffer => "buffer",
        })
    }
}

/// Capacity of each object pool
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolLimits {
    /// Maximum number of live `wl_surface`
    pub surfaces: usize,
    /// Maximum number of live `xdg_surface`
    pub xdg_surfaces: usize,
    /// Maximum number of live `xdg_toplevel`
    pub toplevels: usize,
    /// Maximum number of live `wl_callback`
    pub callbacks: usize,
    /// Maximum number of live `wl_shm_pool`
    pub shm_pools: usize,
    /// Maximum number of live `wl_buffer`
    pub buffers: usize,
}

impl PoolLimits {
    /// Capacity of the pool of the given kind
    pub fn get(&self, kind: PoolKind) -> usize {
        match kind {
            PoolKind::Surface => self.surfaces,
            PoolKind::XdgSurface => self.xdg_surfaces,
            PoolKind::Toplevel => self.toplevels,
            PoolKind::Callback => self.callbacks,
            PoolKind::ShmPool => self.shm_pools,
            PoolKind::Buffer => self.buffers,
        }
    }
}

impl Default for PoolLimits {
    fn default() -> Self {
        PoolLimits {
            surfaces: 64,
            xdg_surfaces: 64,
            toplevels: 64,
            callbacks: 64,
            shm_pools: 16,
            buffers: 16,
        }
    }
}

/// What the event queue does when an event arrives while it is full
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// The new event is refused and dropped, and the failure is reported
    #[default]
    Reject,
    /// The queue doubles its capacity, keeping every pending event in order
    Grow,
}

/// A global advertised through `wl_registry`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalSpec {
    /// Interface name of the global
    pub interface: String,
    /// Advertised version
    pub version: u32,
}

impl GlobalSpec {
    /// Create a new global description
    pub fn new(interface: impl Into<String>, version: u32) -> Self {
        GlobalSpec { interface: interface.into(), version }
    }
}

/// Configuration of an emulated connection
#[derive(Clone, Debug)]
pub struct Config {
    /// Initial capacity of the event queue
    pub queue_capacity: usize,
    /// Behavior of the queue when it is full
    pub overflow: OverflowPolicy,
    /// Capacity of the object pools
    pub limits: PoolLimits,
    /// Globals announced by the registry, their names are their 1-based position
    pub globals: Vec<GlobalSpec>,
    /// Key repeat rate, in characters per second
    pub repeat_rate: i32,
    /// Delay before key repeat starts, in milliseconds
    pub repeat_delay: i32,
    /// Template used to draw server-side decorations
    pub decoration_template: String,
    /// Print every message in the `WAYLAND_DEBUG` format
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            queue_capacity: 64,
            overflow: OverflowPolicy::Reject,
            limits: PoolLimits::default(),
            globals: default_globals(),
            repeat_rate: 20,
            repeat_delay: 500,
            decoration_template: DEFAULT_DECORATION_TEMPLATE.into(),
            debug: false,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment
    ///
    /// `WAYLAND_DEBUG` enables message tracing, and the decoration template is read from the
    /// first readable file among [`decoration_template_paths()`].
    pub fn from_env() -> Self {
        let decoration_template = decoration_template_paths()
            .iter()
            .find_map(|path| read_template(path))
            .unwrap_or_else(|| DEFAULT_DECORATION_TEMPLATE.into());
        Config {
            decoration_template,
            debug: crate::debug::has_debug_client_env(),
            ..Default::default()
        }
    }
}

fn default_globals() -> Vec<GlobalSpec> {
    vec![
        GlobalSpec::new("wl_compositor", 5),
        GlobalSpec::new("wl_shm", 1),
        GlobalSpec::new("xdg_wm_base", 4),
        GlobalSpec::new("wl_seat", 8),
        GlobalSpec::new("zxdg_decoration_manager_v1", 1),
    ]
}

/// Candidate locations of the decoration template, in lookup order
pub fn decoration_template_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        paths.push(Path::new(&config_home).join("xdg/deco.html"));
    }
    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        let path = Path::new(&home).join(".config/xdg/deco.html");
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths.push(PathBuf::from(SYSTEM_DECORATION_PATH));
    paths
}

fn read_template(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            crate::log_debug!("Using decoration template {}", path.display());
            Some(contents)
        }
        Err(_) => None,
    }
}

/// Render a decoration template for the given title
pub fn render_decoration(template: &str, title: &str) -> String {
    template.replacen(TITLE_PLACEHOLDER, title, 1).trim().to_owned()
}
