//! BottleForge Library
//!
//! Core library for editing CrossOver/CXPatcher bottle configuration.
//! Parses and regenerates the `[EnvironmentVariables]` section of
//! `cxbottle.conf` while leaving the rest of the file alone.

pub mod bottle;
pub mod config;
pub mod env_section;
pub mod error;
pub mod merge;
pub mod store;
pub mod toggle;

pub use bottle::{Bottle, BottleRoot, BottleRuntime};
pub use config::Config;
pub use env_section::{
    find_managed_section, is_boolean_like, is_valid_key, normalize_bool, parse_key_values,
};
pub use error::{BottleForgeError, Result};
pub use merge::upsert;
pub use store::{ConfigStore, SaveOutcome};
pub use toggle::{EnvSession, Tip, ToggleEntry, TIPS};
