use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::modules::errors::{PersistenceError, StoreError};
use crate::modules::types::ConfigState;

/// Reads the configuration file. `Ok(None)` means the file does not exist yet.
pub async fn load_state(path: &Path) -> Result<Option<ConfigState>, StoreError> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let state: ConfigState = toml::from_str(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(state))
}

/// Writes `state` next to `path` and renames it into place, so readers of
/// `path` see either the old file or the new one. Only the write of the
/// temporary file is bounded by `limit`; the rename is a single syscall.
pub async fn save_state(
    path: &Path,
    state: &ConfigState,
    limit: Duration,
) -> Result<(), PersistenceError> {
    let text = toml::to_string_pretty(state)?;
    let temp_path = temp_path(path);

    bounded_write(&temp_path, limit, write_file(path, &temp_path, text.as_bytes())).await?;

    if let Err(source) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(PersistenceError::Io {
            action: "replace",
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

async fn bounded_write<F>(
    temp_path: &Path,
    limit: Duration,
    write: F,
) -> Result<(), PersistenceError>
where
    F: Future<Output = Result<(), PersistenceError>>,
{
    let written = match tokio::time::timeout(limit, write).await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::TimedOut(limit)),
    };
    if written.is_err() {
        let _ = fs::remove_file(temp_path).await;
    }
    written
}

async fn write_file(path: &Path, temp_path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(io_err("create directory", parent))?;
    }

    let mut file = fs::File::create(temp_path)
        .await
        .map_err(io_err("create", temp_path))?;
    file.write_all(bytes)
        .await
        .map_err(io_err("write", temp_path))?;
    file.sync_all().await.map_err(io_err("sync", temp_path))?;
    Ok(())
}

fn io_err(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> PersistenceError {
    let path = path.to_path_buf();
    move |source| PersistenceError::Io {
        action,
        path,
        source,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("config"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::types::{Recipient, Robot};

    fn sample_state() -> ConfigState {
        let mut state = ConfigState::default();
        state.settings.log.level = "debug".to_string();
        state.settings.cookies.cookies = "cdb_auth=abc; cdb_sid=xyz".to_string();
        state.robots.push(Robot {
            index: 0,
            name: "Ops Bot".to_string(),
            token: "tok123".to_string(),
            secret: "sec456".to_string(),
            enabled: true,
            receive_all: false,
            recipients: vec![Recipient {
                phone: "13800000000".to_string(),
                always_at: true,
                keywords: vec!["outage".to_string(), "4090".to_string()],
            }],
        });
        state
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_state(&dir.path().join("config.toml")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn saved_state_reads_back_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("config.toml");
        let state = sample_state();

        save_state(&path, &state, Duration::from_secs(5)).await.unwrap();

        let loaded = load_state(&path).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "robots = 12\n[[[").unwrap();

        let err = load_state(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn stalled_write_times_out_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let temp = temp_path(&path);
        std::fs::write(&temp, "half a fi").unwrap();

        let limit = Duration::from_millis(20);
        let stalled = std::future::pending::<Result<(), PersistenceError>>();
        let err = bounded_write(&temp, limit, stalled).await.unwrap_err();

        assert!(matches!(err, PersistenceError::TimedOut(d) if d == limit));
        assert!(!temp.exists());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unwritable_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = save_state(
            &blocker.join("config.toml"),
            &sample_state(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }
}
