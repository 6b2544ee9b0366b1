//! network link state, read from sysfs.
//!
//! a down link is not a remote failure: fetch.rs checks it before touching
//! the backoff controller.

use std::path::PathBuf;

pub trait Link {
    fn is_up(&self) -> bool;
}

pub struct SysfsLink {
    operstate: Option<PathBuf>,
}

impl SysfsLink {
    /// an empty interface name means "no link to watch", always up
    pub fn new(interface: &str) -> Self {
        let operstate = (!interface.is_empty())
            .then(|| PathBuf::from("/sys/class/net").join(interface).join("operstate"));
        Self { operstate }
    }

    #[cfg(test)]
    fn at(path: impl Into<PathBuf>) -> Self {
        Self { operstate: Some(path.into()) }
    }
}

impl Link for SysfsLink {
    fn is_up(&self) -> bool {
        let Some(path) = &self.operstate else {
            return true;
        };
        // some wifi drivers never leave "unknown" while associated
        std::fs::read_to_string(path)
            .map(|s| matches!(s.trim(), "up" | "unknown"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_interface_is_always_up() {
        assert!(SysfsLink::new("").is_up());
    }

    #[test]
    fn test_operstate_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operstate");
        let link = SysfsLink::at(&path);

        assert!(!link.is_up(), "missing interface is down");
        for (state, up) in [("up\n", true), ("unknown\n", true), ("down\n", false), ("dormant", false)] {
            std::fs::write(&path, state).unwrap();
            assert_eq!(link.is_up(), up, "operstate {state:?}");
        }
    }
}
