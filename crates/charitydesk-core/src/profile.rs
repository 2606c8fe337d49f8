//! The signed-in operator, persisted as a small JSON file.
//!
//! The dashboard only reads it, to stamp `updatedBy` on writes. `save` and
//! `clear` exist for the command-line `whoami` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::models::CurrentUser;

/// Current-user file name in the data directory
const CURRENT_USER_FILE: &str = "current_user.json";

pub struct CurrentUserStore {
    data_dir: PathBuf,
}

impl CurrentUserStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Load the stored user, `None` if nobody is signed in
    pub fn load(&self) -> Result<Option<CurrentUser>> {
        let path = self.user_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let user: CurrentUser = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(user))
    }

    pub fn save(&self, user: &CurrentUser) -> Result<()> {
        let path = self.user_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(user)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.user_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn user_path(&self) -> PathBuf {
        self.data_dir.join(CURRENT_USER_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = CurrentUserStore::new(dir.path().to_path_buf());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CurrentUserStore::new(dir.path().join("nested"));
        let user = CurrentUser {
            uid: "u-1".to_string(),
            name: Some("Pat".to_string()),
            email: None,
            role: Some("treasurer".to_string()),
        };

        store.save(&user).unwrap();
        assert_eq!(store.load().unwrap(), Some(user));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CURRENT_USER_FILE), "{not json").unwrap();
        let store = CurrentUserStore::new(dir.path().to_path_buf());
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
