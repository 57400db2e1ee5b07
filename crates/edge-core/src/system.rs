use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::Instant,
};

use tracing::{debug, warn};

static DEVICE_ID: OnceLock<String> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize device start time.
pub fn init_uptime() {
    START_TIME.get_or_init(Instant::now);
}

/// Get device uptime in seconds.
pub fn uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_secs()
}

/// Get platform (OS family).
#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

/// Get architecture.
#[inline]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

/// Get or generate the persistent device ID.
///
/// Stored in `$HOME/.edge-runner/device-id`; when the file cannot be read or written a random id is used for this process.
pub fn device_id() -> &'static str {
    DEVICE_ID.get_or_init(|| match id_path() {
        Some(path) => load_or_create_id(&path),
        None => uuid::Uuid::new_v4().to_string(),
    })
}

/// Get OS distribution info (Linux only, best effort).
///
/// Returns OS name from `/etc/os-release` or generic platform name.
pub fn os_info() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(content) = fs::read_to_string("/etc/os-release") {
            for line in content.lines() {
                if let Some(name) = line.strip_prefix("PRETTY_NAME=") {
                    return name.trim_matches('"').to_string();
                }
            }
        }
    }

    platform().to_string()
}

/// Device description sent with every coordinator request.
pub fn device_info() -> BTreeMap<String, String> {
    let mut info = BTreeMap::new();
    info.insert("platform".to_string(), platform().to_string());
    info.insert("arch".to_string(), arch().to_string());
    info.insert("os".to_string(), os_info());
    if let Ok(name) = hostname::get()
        && let Some(name) = name.to_str()
    {
        info.insert("hostname".to_string(), name.to_string());
    }
    info
}

fn id_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").filter(|h| !h.is_empty())?;
    Some(PathBuf::from(home).join(".edge-runner").join("device-id"))
}

fn load_or_create_id(path: &Path) -> String {
    if let Ok(id) = fs::read_to_string(path) {
        let id = id.trim();
        if !id.is_empty() {
            return id.to_string();
        }
    }

    let new_id = uuid::Uuid::new_v4().to_string();
    let written = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::write(path, &new_id));
    match written {
        Ok(()) => debug!(path = %path.display(), "device id persisted"),
        Err(e) => warn!(path = %path.display(), error = %e, "cannot persist device id"),
    }
    new_id
}
