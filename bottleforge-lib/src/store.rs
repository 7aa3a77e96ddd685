//! Reading and writing `cxbottle.conf`
//!
//! The merge itself is pure; this module owns the file handling around it.
//! A missing file is created empty on load and treated as empty on save.
//! Before a save replaces the file, the previous content is copied to
//! `cxbottle.conf.bak` (best effort) and the new text goes through a temp
//! file in the same directory that is renamed over the target.

use crate::bottle::Bottle;
use crate::error::{BottleForgeError, Result};
use crate::toggle::EnvSession;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Backup file written next to the config before it is replaced
pub const BACKUP_FILE_NAME: &str = "cxbottle.conf.bak";

/// Result of a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Merged text matched the file byte for byte; nothing was written
    Unchanged,

    /// File replaced with new content
    Written {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
}

/// Handle on one bottle's `cxbottle.conf`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_bottle(bottle: &Bottle) -> Self {
        Self::new(bottle.config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_file_name(BACKUP_FILE_NAME)
    }

    /// Create an empty config file when none exists yet
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            info!("Creating empty {:?}", self.path);
            fs::File::create(&self.path).map_err(|source| BottleForgeError::Create {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Current file text; a missing file reads as empty
    pub fn read_text(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(BottleForgeError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Read the file and build an edit session from it
    pub fn load(&self) -> Result<EnvSession> {
        self.ensure_exists()?;
        let text = self.read_text()?;
        let session = EnvSession::from_text(&text);
        info!(
            "Loaded {} variables from {:?}",
            session.toggles().len(),
            self.path
        );
        Ok(session)
    }

    /// Text that [`ConfigStore::save`] would write, without touching the disk
    pub fn preview(&self, session: &EnvSession) -> Result<String> {
        let text = self.read_text()?;
        Ok(session.apply(&text))
    }

    /// Merge the session into the file on disk.
    ///
    /// Aborts before writing if the existing file cannot be read. On success
    /// the session is marked saved.
    pub fn save(&self, session: &mut EnvSession) -> Result<SaveOutcome> {
        let before = self.read_text()?;
        let after = session.apply(&before);

        if before == after && self.path.exists() {
            info!("No changes to write (content identical)");
            session.mark_saved();
            return Ok(SaveOutcome::Unchanged);
        }

        let backup = self.backup();
        write_atomic(&self.path, after.as_bytes())?;
        session.mark_saved();

        info!("Saved: {:?}", self.path);
        Ok(SaveOutcome::Written {
            path: self.path.clone(),
            backup,
        })
    }

    /// Copy the current file to the backup path; failures only warn
    fn backup(&self) -> Option<PathBuf> {
        if !self.path.exists() {
            return None;
        }

        let backup = self.backup_path();
        let _ = fs::remove_file(&backup);
        match fs::copy(&self.path, &backup) {
            Ok(_) => {
                debug!("Backed up {:?} to {:?}", self.path, backup);
                Some(backup)
            }
            Err(e) => {
                warn!("Failed to back up {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// [`ConfigStore::load`] on the blocking thread pool
    pub async fn load_async(&self) -> Result<EnvSession> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| BottleForgeError::Task(e.to_string()))?
    }

    /// [`ConfigStore::save`] on the blocking thread pool.
    ///
    /// Takes the session by value and hands it back with the outcome.
    pub async fn save_async(&self, mut session: EnvSession) -> Result<(EnvSession, SaveOutcome)> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || -> Result<(EnvSession, SaveOutcome)> {
            let outcome = store.save(&mut session)?;
            Ok((session, outcome))
        })
        .await
        .map_err(|e| BottleForgeError::Task(e.to_string()))?
    }
}

/// Write through a temp file in the target directory, then rename it over.
///
/// An existing target keeps its permissions.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| BottleForgeError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_section::ENV_SECTION_BANNER;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("cxbottle.conf"))
    }

    #[test]
    fn load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let session = store.load().unwrap();
        assert!(store.path().exists());
        assert_eq!(session.toggles().len(), 5);
        assert!(session.toggles().iter().all(|t| !t.enabled));
    }

    #[test]
    fn save_writes_backup_and_merged_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let original = indoc! {r#"
            [Bottle]
            "Name" = "Steam"
            [EnvironmentVariables]
            "WINEESYNC" = "0"
            "CUSTOM" = "keep me"
        "#};
        fs::write(store.path(), original).unwrap();

        let mut session = store.load().unwrap();
        session.set("WINEESYNC", true).unwrap();
        let outcome = store.save(&mut session).unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Written {
                path: store.path().to_path_buf(),
                backup: Some(store.backup_path()),
            }
        );
        assert_eq!(fs::read_to_string(store.backup_path()).unwrap(), original);

        let saved = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            saved,
            indoc! {r#"
                [Bottle]
                "Name" = "Steam"
                [EnvironmentVariables]
                "CUSTOM" = "keep me"
                "WINEESYNC" = "1"
                "WINEMSYNC" = "0"
                "D3DM_ENABLE_METALFX" = "0"
                "ROSETTA_ADVERTISE_AVX" = "0"
                "MTL_HUD_ENABLED" = "0"
            "#}
        );
        assert!(!session.is_dirty());
    }

    #[test]
    fn second_save_reports_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut session = store.load().unwrap();
        session.set("WINEESYNC", true).unwrap();
        assert!(matches!(
            store.save(&mut session).unwrap(),
            SaveOutcome::Written { .. }
        ));

        let saved = fs::read_to_string(store.path()).unwrap();
        assert!(saved.starts_with(ENV_SECTION_BANNER));

        let mut reloaded = store.load().unwrap();
        assert_eq!(store.save(&mut reloaded).unwrap(), SaveOutcome::Unchanged);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), saved);
    }

    #[test]
    fn preview_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "[Bottle]\n").unwrap();

        let mut session = store.load().unwrap();
        session.set("MTL_HUD_ENABLED", true).unwrap();
        let preview = store.preview(&session).unwrap();

        assert!(preview.contains("\"MTL_HUD_ENABLED\" = \"1\""));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[Bottle]\n");
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("gone").join("cxbottle.conf"));
        let mut session = EnvSession::from_text("");
        session.set("WINEESYNC", true).unwrap();
        assert!(store.save(&mut session).is_err());
    }

    #[test]
    fn load_reports_create_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("gone").join("cxbottle.conf"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, BottleForgeError::Create { .. }), "{err}");
        assert!(err.to_string().starts_with("Failed to create"));
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "[Bottle]\n").unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        let mut session = store.load().unwrap();
        session.set("WINEESYNC", true).unwrap();
        assert!(matches!(
            store.save(&mut session).unwrap(),
            SaveOutcome::Written { .. }
        ));

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn async_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut session = store.load_async().await.unwrap();
        session.set("ROSETTA_ADVERTISE_AVX", true).unwrap();
        let (session, outcome) = store.save_async(session).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Written { backup: Some(_), .. }));
        assert!(!session.is_dirty());

        let reloaded = store.load_async().await.unwrap();
        let avx = reloaded
            .toggles()
            .iter()
            .find(|t| t.key == "ROSETTA_ADVERTISE_AVX")
            .unwrap();
        assert!(avx.enabled);
    }
}
