// src/modules/capability.rs
use log::debug;
use std::fmt;
use std::fs;
use std::str::FromStr;

/// A `major.minor.patch` platform release, e.g. a Linux kernel version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PlatformVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn is_at_least(&self, minimum: &PlatformVersion) -> bool {
        self >= minimum
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for PlatformVersion {
    type Err = String;

    /// Parses the leading numeric components of a release string such as
    /// `6.1.0-18-amd64`; missing components default to zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = [0u32; 3];
        let mut parsed = 0;
        for (slot, component) in parts.iter_mut().zip(s.trim().split('.')) {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                break;
            }
            *slot = digits
                .parse()
                .map_err(|e| format!("Invalid version component '{}': {}", digits, e))?;
            parsed += 1;
            if digits.len() != component.len() {
                break;
            }
        }
        if parsed == 0 {
            return Err(format!("No version number in '{}'", s));
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

/// The operating system the service runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub version: Option<PlatformVersion>,
}

impl Platform {
    pub fn new(os: &str, version: Option<PlatformVersion>) -> Self {
        Self {
            os: os.to_string(),
            version,
        }
    }

    pub fn current() -> Self {
        let os = std::env::consts::OS;
        Self::new(os, probe_version(os))
    }
}

fn probe_version(os: &str) -> Option<PlatformVersion> {
    match os {
        "linux" | "android" => {
            let release = fs::read_to_string("/proc/sys/kernel/osrelease")
                .map_err(|e| debug!("Could not read kernel release: {}", e))
                .ok()?;
            release
                .parse()
                .map_err(|e| debug!("Could not parse kernel release '{}': {}", release.trim(), e))
                .ok()
        }
        _ => None,
    }
}

/// Oldest release of `os` offering native change notification.
fn native_minimum(os: &str) -> Option<PlatformVersion> {
    match os {
        // inotify
        "linux" | "android" => Some(PlatformVersion::new(2, 6, 13)),
        "macos" | "ios" | "windows" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => {
            Some(PlatformVersion::default())
        }
        _ => None,
    }
}

/// Whether native file watching can be used, decided once per service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Native,
    Unsupported,
}

impl Capability {
    pub fn detect(platform: &Platform) -> Self {
        let Some(minimum) = native_minimum(&platform.os) else {
            return Capability::Unsupported;
        };
        match platform.version {
            Some(version) if !version.is_at_least(&minimum) => Capability::Unsupported,
            Some(_) => Capability::Native,
            None => {
                debug!(
                    "Unknown {} release; assuming native file watching is available",
                    platform.os
                );
                Capability::Native
            }
        }
    }

    pub fn supports_native_watch(&self) -> bool {
        matches!(self, Capability::Native)
    }
}
