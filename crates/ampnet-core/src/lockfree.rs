//! Lock-free process-mode flag shared between the control and audio threads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Which model implementation the audio thread evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ProcessMode {
    /// Topology parsed at run time; hot-swappable.
    #[default]
    Dynamic = 0,
    /// Fixed topology chosen at compile time.
    Static = 1,
}

impl ProcessMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => ProcessMode::Static,
            _ => ProcessMode::Dynamic,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ProcessMode::Dynamic => "dynamic",
            ProcessMode::Static => "static",
        }
    }
}

impl fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamic" | "run-time" | "runtime" => Ok(ProcessMode::Dynamic),
            "static" | "compile-time" | "compiletime" => Ok(ProcessMode::Static),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown process mode '{}'",
                other
            ))),
        }
    }
}

/// Cache-line aligned atomic [`ProcessMode`].
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicMode {
    value: AtomicU8,
}

impl AtomicMode {
    pub fn new(mode: ProcessMode) -> Self {
        Self {
            value: AtomicU8::new(mode as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ProcessMode {
        ProcessMode::from_u8(self.value.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, mode: ProcessMode) {
        self.value.store(mode as u8, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, mode: ProcessMode) -> ProcessMode {
        ProcessMode::from_u8(self.value.swap(mode as u8, Ordering::AcqRel))
    }
}

impl Default for AtomicMode {
    fn default() -> Self {
        Self::new(ProcessMode::default())
    }
}

impl Clone for AtomicMode {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}
