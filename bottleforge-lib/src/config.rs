//! Configuration management for bottleforge

use crate::bottle::{discover, resolve, Bottle, BottleRoot, BottleRuntime};
use crate::error::Result;
use std::path::PathBuf;
use tracing::info;

/// Environment variable with extra bottle directories (colon separated)
pub const BOTTLES_ENV: &str = "BOTTLEFORGE_BOTTLES";

/// BottleForge configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directories searched for bottles, in order
    pub bottle_roots: Vec<BottleRoot>,

    /// Verbosity level (0-2)
    pub verbosity: u8,

    /// Print merged config instead of writing it
    pub dry_run: bool,
}

impl Config {
    /// Create a new config with the default CrossOver/CXPatcher roots.
    ///
    /// Directories listed in `BOTTLEFORGE_BOTTLES` are searched first.
    pub fn new() -> Result<Self> {
        let mut bottle_roots = Self::roots_from_env();
        bottle_roots.extend(BottleRoot::defaults()?);

        Ok(Self {
            bottle_roots,
            verbosity: 0,
            dry_run: false,
        })
    }

    fn roots_from_env() -> Vec<BottleRoot> {
        std::env::var(BOTTLES_ENV)
            .map(|value| parse_roots(&value))
            .unwrap_or_default()
    }

    /// Put extra roots ahead of the configured ones
    pub fn prepend_roots(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        let mut roots: Vec<BottleRoot> = paths
            .into_iter()
            .map(|path| BottleRoot::new(BottleRuntime::Custom, path))
            .collect();
        roots.append(&mut self.bottle_roots);
        self.bottle_roots = roots;
    }

    /// `tracing` filter directive for the configured verbosity
    pub fn log_filter(&self) -> String {
        let level = match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        format!("bottleforge={level},bottleforge_lib={level}")
    }

    /// All bottles under the configured roots
    pub fn bottles(&self) -> Vec<Bottle> {
        let bottles = discover(&self.bottle_roots);
        info!("Discovered {} bottles", bottles.len());
        bottles
    }

    /// Find a bottle by name, or accept a bottle directory path
    pub fn bottle(&self, name_or_path: &str) -> Result<Bottle> {
        resolve(&self.bottles(), name_or_path)
    }
}

fn parse_roots(value: &str) -> Vec<BottleRoot> {
    value
        .split(':')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| BottleRoot::new(BottleRuntime::Custom, part))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_colon_separated_roots() {
        let roots = parse_roots("/a/bottles: :/b/bottles:");
        assert_eq!(
            roots,
            vec![
                BottleRoot::new(BottleRuntime::Custom, "/a/bottles"),
                BottleRoot::new(BottleRuntime::Custom, "/b/bottles"),
            ]
        );
    }

    #[test]
    fn verbosity_selects_log_level() {
        let mut config = Config {
            bottle_roots: Vec::new(),
            verbosity: 0,
            dry_run: false,
        };
        assert_eq!(config.log_filter(), "bottleforge=info,bottleforge_lib=info");
        config.verbosity = 1;
        assert_eq!(config.log_filter(), "bottleforge=debug,bottleforge_lib=debug");
        config.verbosity = 5;
        assert_eq!(config.log_filter(), "bottleforge=trace,bottleforge_lib=trace");
    }

    #[test]
    fn prepended_roots_are_searched_first() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::create_dir(first.path().join("Steam")).unwrap();
        std::fs::create_dir(second.path().join("Steam")).unwrap();

        let mut config = Config {
            bottle_roots: vec![BottleRoot::new(BottleRuntime::CrossOver, second.path())],
            verbosity: 0,
            dry_run: false,
        };
        config.prepend_roots([first.path().to_path_buf()]);

        let bottle = config.bottle("Steam").unwrap();
        assert_eq!(bottle.path, first.path().join("Steam"));
        assert_eq!(bottle.runtime, BottleRuntime::Custom);
    }
}
