//! Boolean toggles projected from the environment section
//!
//! An [`EnvSession`] is what a front end holds between loading
//! `cxbottle.conf` and saving it again: the list of on/off variables shown to
//! the user, plus the set of keys that were under toggle control when the
//! file was read. Saving hands both to [`crate::merge::upsert`].

use crate::env_section::{
    is_boolean_like, is_valid_key, normalize_bool, parse_key_values, DEFAULT_KEYS, NON_EDITABLE_KEYS,
    SKIP_KEYS,
};
use crate::error::{BottleForgeError, Result};
use crate::merge::upsert;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One on/off environment variable row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleEntry {
    /// Variable name
    pub key: String,

    /// Whether the variable is switched on
    pub enabled: bool,

    /// Only boolean rows are written back by the merge
    pub is_boolean: bool,
}

impl ToggleEntry {
    pub fn new(key: impl Into<String>, enabled: bool) -> Self {
        Self {
            key: key.into(),
            enabled,
            is_boolean: true,
        }
    }

    /// Value written to the file for this toggle
    pub fn value(&self) -> &'static str {
        if self.enabled {
            "1"
        } else {
            "0"
        }
    }
}

/// Quick-add suggestion for a well-known variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tip {
    pub key: &'static str,
    pub description: &'static str,
    pub default_on: bool,
}

/// Built-in quick-add suggestions
pub static TIPS: [Tip; 3] = [
    Tip {
        key: "D3DM_ENABLE_METALFX",
        description: "MetalFX upscaling (similar to DLSS/FSR). Increases FPS by rendering at \
            lower resolution and upscaling on GPU. Requires nvngx.dll and nvapi64.dll from GPTK \
            in the bottle's system32 folder.",
        default_on: true,
    },
    Tip {
        key: "ROSETTA_ADVERTISE_AVX",
        description: "Forces Rosetta 2 to report AVX support. Some x86 games only start with \
            this enabled, but it can cause crashes or glitches.",
        default_on: false,
    },
    Tip {
        key: "MTL_HUD_ENABLED",
        description: "Metal HUD - GPU-only overlay with FPS and basic GPU metrics.",
        default_on: false,
    },
];

/// Look up a tip by variable name
pub fn find_tip(key: &str) -> Option<&'static Tip> {
    TIPS.iter().find(|tip| tip.key == key)
}

/// Skip keys as an owned set, the shape [`upsert`] takes
pub fn skip_keys() -> BTreeSet<String> {
    SKIP_KEYS.iter().map(|key| key.to_string()).collect()
}

/// Editable toggle state for one bottle's `cxbottle.conf`
#[derive(Debug, Clone, Default)]
pub struct EnvSession {
    toggles: Vec<ToggleEntry>,
    existing_bool_keys: BTreeSet<String>,
    values: BTreeMap<String, String>,
    dirty: bool,
}

impl EnvSession {
    /// Build the toggle list from the current file text.
    ///
    /// Every default key gets a row (off when absent). Keys present with a
    /// non-boolean value are left out so the merge preserves them untouched.
    pub fn from_text(text: &str) -> Self {
        let values = parse_key_values(text);

        let existing_bool_keys: BTreeSet<String> = values
            .iter()
            .filter(|(key, value)| !is_skip_key(key) && is_boolean_like(value))
            .map(|(key, _)| key.clone())
            .collect();

        let mut keys: BTreeSet<&str> = DEFAULT_KEYS.iter().copied().collect();
        keys.extend(values.keys().map(String::as_str));

        let mut toggles = Vec::new();
        for key in keys {
            if is_skip_key(key) {
                continue;
            }
            let raw = match values.get(key) {
                Some(raw) if !is_boolean_like(raw) => {
                    debug!("Keeping non-boolean variable {} out of toggles", key);
                    continue;
                }
                Some(raw) => raw.as_str(),
                None => "0",
            };
            toggles.push(ToggleEntry::new(key, normalize_bool(raw)));
        }

        Self {
            toggles,
            existing_bool_keys,
            values,
            dirty: false,
        }
    }

    pub fn toggles(&self) -> &[ToggleEntry] {
        &self.toggles
    }

    /// Raw active values read from the section at load time
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether a tip's variable is already backed by a boolean line in the file
    pub fn has_existing(&self, key: &str) -> bool {
        self.existing_bool_keys.contains(key)
    }

    /// Set a toggle, adding it when missing
    pub fn set(&mut self, key: &str, enabled: bool) -> Result<()> {
        match self.toggles.iter().position(|t| t.key == key) {
            Some(index) => self.toggles[index].enabled = enabled,
            None => {
                check_key(key)?;
                self.toggles.push(ToggleEntry::new(key, enabled));
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Remove a toggle; its line is deleted on the next save
    pub fn remove(&mut self, key: &str) -> Result<()> {
        let before = self.toggles.len();
        self.toggles.retain(|t| t.key != key);
        if self.toggles.len() == before {
            return Err(BottleForgeError::VariableNotFound(key.to_string()));
        }
        self.dirty = true;
        Ok(())
    }

    /// Rename a toggle, refusing the well-known non-editable keys
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if NON_EDITABLE_KEYS.contains(&old) {
            return Err(BottleForgeError::NonEditableKey(old.to_string()));
        }
        check_key(new)?;
        let toggle = self
            .toggles
            .iter_mut()
            .find(|t| t.key == old)
            .ok_or_else(|| BottleForgeError::VariableNotFound(old.to_string()))?;
        toggle.key = new.to_string();
        self.dirty = true;
        Ok(())
    }

    /// Quick-add a tip with its default state
    pub fn add_tip(&mut self, tip: &Tip) -> Result<()> {
        self.set(tip.key, tip.default_on)?;
        self.existing_bool_keys.insert(tip.key.to_string());
        Ok(())
    }

    /// Keys the engine owned when the file was read
    pub fn managed_before(&self) -> BTreeSet<String> {
        self.existing_bool_keys
            .iter()
            .map(String::as_str)
            .chain(DEFAULT_KEYS.iter().copied())
            .filter(|key| !is_skip_key(key))
            .map(str::to_string)
            .collect()
    }

    /// Key to file value for every boolean toggle
    pub fn assignments(&self) -> BTreeMap<String, String> {
        self.toggles
            .iter()
            .filter(|t| t.is_boolean)
            .map(|t| (t.key.clone(), t.value().to_string()))
            .collect()
    }

    /// Merge the current toggles into `text`
    pub fn apply(&self, text: &str) -> String {
        upsert(text, &self.assignments(), &self.managed_before(), &skip_keys())
    }

    /// Record that the toggles now match what is on disk
    pub fn mark_saved(&mut self) {
        self.existing_bool_keys = self.toggles.iter().map(|t| t.key.clone()).collect();
        self.dirty = false;
    }
}

fn is_skip_key(key: &str) -> bool {
    SKIP_KEYS.contains(&key)
}

fn check_key(key: &str) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(BottleForgeError::InvalidKey(key.to_string()))
    }
}
