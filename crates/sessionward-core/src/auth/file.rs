use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{TokenBackend, TokenSlot};

/// Token file name in cache directory
const TOKEN_FILE: &str = "tokens.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

impl TokenFile {
    fn slot_mut(&mut self, slot: TokenSlot) -> &mut Option<String> {
        match slot {
            TokenSlot::AccessToken => &mut self.access_token,
            TokenSlot::RefreshToken => &mut self.refresh_token,
            TokenSlot::UserData => &mut self.user,
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

/// Token backend persisting all slots to one JSON file.
///
/// Every write rewrites the whole file with owner-only permissions.
/// Other processes sharing the directory are not coordinated with.
pub struct FileBackend {
    path: PathBuf,
    io: Mutex<()>,
}

impl FileBackend {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(TOKEN_FILE),
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<TokenFile> {
        if !self.path.exists() {
            return Ok(TokenFile::default());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse token file {}", self.path.display()))
    }

    fn store(&self, file: &TokenFile) -> Result<()> {
        if file.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).with_context(|| {
                    format!("Failed to remove token file {}", self.path.display())
                })?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(file).context("Failed to serialize tokens")?;
        write_private(&self.path, &contents)
    }

    /// Load for a write. An unparseable file is replaced rather than
    /// allowed to block every later write and clear.
    fn load_for_write(&self) -> Result<TokenFile> {
        match self.load() {
            Ok(file) => Ok(file),
            Err(e) if self.path.exists() && e.downcast_ref::<serde_json::Error>().is_some() => {
                warn!(error = %e, "Discarding unreadable token file");
                Ok(TokenFile::default())
            }
            Err(e) => Err(e),
        }
    }

    fn update(&self, slot: TokenSlot, value: Option<&str>) -> Result<()> {
        let _guard = self.io.lock().map_err(|_| anyhow!("token file lock poisoned"))?;
        let mut file = self.load_for_write()?;
        *file.slot_mut(slot) = value.map(str::to_string);
        self.store(&file)
    }
}

impl TokenBackend for FileBackend {
    fn read(&self, slot: TokenSlot) -> Result<Option<String>> {
        let _guard = self.io.lock().map_err(|_| anyhow!("token file lock poisoned"))?;
        let mut file = self.load()?;
        Ok(file.slot_mut(slot).take())
    }

    fn write(&self, slot: TokenSlot, value: &str) -> Result<()> {
        self.update(slot, Some(value))
    }

    fn remove(&self, slot: TokenSlot) -> Result<()> {
        self.update(slot, None)
    }
}

/// Write through a sibling temp file and rename, so a crash never leaves a
/// half-written token file behind.
fn write_private(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    write_owner_only(&tmp_path, contents)?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!("Failed to rename {} to {}", tmp_path.display(), path.display())
    })
}

#[cfg(unix)]
fn write_owner_only(path: &Path, contents: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write to {}", path.display()))
}
