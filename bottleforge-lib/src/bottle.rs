//! Bottle discovery for CrossOver and CXPatcher

use crate::error::{BottleForgeError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration file every bottle keeps at its root
pub const CONFIG_FILE_NAME: &str = "cxbottle.conf";

/// Which runtime a bottle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BottleRuntime {
    #[serde(rename = "crossover")]
    CrossOver,
    #[serde(rename = "cxpatcher")]
    CXPatcher,
    #[serde(rename = "custom")]
    Custom,
}

impl BottleRuntime {
    pub fn as_str(&self) -> &'static str {
        match self {
            BottleRuntime::CrossOver => "CrossOver",
            BottleRuntime::CXPatcher => "CXPatcher",
            BottleRuntime::Custom => "Custom",
        }
    }

    /// Default bottle directory relative to the home directory
    fn default_subdir(&self) -> Option<&'static str> {
        match self {
            BottleRuntime::CrossOver => Some("Library/Application Support/CrossOver/Bottles"),
            BottleRuntime::CXPatcher => Some("CXPBottles"),
            BottleRuntime::Custom => None,
        }
    }
}

/// A directory searched for bottles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottleRoot {
    pub runtime: BottleRuntime,
    pub path: PathBuf,
}

impl BottleRoot {
    pub fn new(runtime: BottleRuntime, path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            path: path.into(),
        }
    }

    /// CrossOver and CXPatcher roots under the user's home directory
    pub fn defaults() -> Result<Vec<Self>> {
        let home = dirs::home_dir()
            .ok_or_else(|| BottleForgeError::Config("Could not determine home directory".into()))?;

        Ok([BottleRuntime::CrossOver, BottleRuntime::CXPatcher]
            .into_iter()
            .filter_map(|runtime| {
                runtime
                    .default_subdir()
                    .map(|subdir| Self::new(runtime, home.join(subdir)))
            })
            .collect())
    }
}

/// A single Wine prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bottle {
    /// Directory name of the bottle
    pub name: String,

    /// Bottle directory
    pub path: PathBuf,

    /// Runtime that owns the bottle
    pub runtime: BottleRuntime,
}

impl Bottle {
    /// Bottle from an arbitrary directory picked by the user
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            path,
            runtime: BottleRuntime::Custom,
        }
    }

    /// Location of `cxbottle.conf` for this bottle
    pub fn config_path(&self) -> PathBuf {
        self.path.join(CONFIG_FILE_NAME)
    }
}

/// List bottles under each root, in root order.
///
/// Missing roots are skipped silently; unreadable ones are logged and skipped.
pub fn discover(roots: &[BottleRoot]) -> Vec<Bottle> {
    let mut bottles = Vec::new();

    for root in roots {
        if !root.path.is_dir() {
            debug!("{} folder not found: {:?}", root.runtime.as_str(), root.path);
            continue;
        }

        match read_bottle_dirs(&root.path) {
            Ok(mut dirs) => {
                dirs.sort();
                info!("Found {} bottles in {}", dirs.len(), root.runtime.as_str());
                bottles.extend(dirs.into_iter().map(|path| Bottle {
                    runtime: root.runtime,
                    ..Bottle::from_path(path)
                }));
            }
            Err(e) => {
                warn!("Failed to read {} bottles at {:?}: {}", root.runtime.as_str(), root.path, e);
            }
        }
    }

    bottles
}

fn read_bottle_dirs(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

/// Resolve a bottle by name, or by path when `name_or_path` is a directory
pub fn resolve(bottles: &[Bottle], name_or_path: &str) -> Result<Bottle> {
    if let Some(bottle) = bottles.iter().find(|b| b.name == name_or_path) {
        return Ok(bottle.clone());
    }

    let path = Path::new(name_or_path);
    if path.is_dir() {
        return Ok(Bottle::from_path(path));
    }

    Err(BottleForgeError::BottleNotFound(name_or_path.to_string()))
}
