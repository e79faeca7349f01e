use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{AccessError, AddOutcome, RemoveOutcome};

/// Maximum number of identifiers retained (spec §3 "AccessList").
pub const MAX_ACCESS: usize = 256;

/// Opaque sender identifier; mirrors `relay_queue::SenderId`.
pub type SenderId = i64;

/// A sorted, file-persisted set of authorized sender identifiers, guarded by
/// a reader-writer lock (spec §4.6, §5 "Access list").
pub struct AccessList {
    path: PathBuf,
    ids: RwLock<Vec<SenderId>>,
}

impl AccessList {
    /// Loads the list from `path`, creating an empty 0600 file if missing.
    /// Non-numeric lines are skipped; entries beyond [`MAX_ACCESS`] are
    /// dropped; the result is sorted ascending (spec §4.6 "load").
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AccessError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            write_atomic(&path, "")?;
        }
        let raw = fs::read_to_string(&path)?;
        let mut ids: Vec<SenderId> = raw
            .lines()
            .filter_map(|line| line.trim().parse::<SenderId>().ok())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.truncate(MAX_ACCESS);

        Ok(Self {
            path,
            ids: RwLock::new(ids),
        })
    }

    /// Read-locked binary search (spec §4.6 "contains").
    #[must_use]
    pub fn contains(&self, id: SenderId) -> bool {
        self.ids.read().unwrap().binary_search(&id).is_ok()
    }

    /// Read-locked length.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ids.read().unwrap().len()
    }

    /// Write-locked insert preserving sort order, followed by an atomic save
    /// (spec §4.6 "add").
    pub fn add(&self, id: SenderId) -> Result<AddOutcome, AccessError> {
        let mut ids = self.ids.write().unwrap();
        match ids.binary_search(&id) {
            Ok(_) => Ok(AddOutcome::AlreadyPresent),
            Err(pos) => {
                if ids.len() >= MAX_ACCESS {
                    return Ok(AddOutcome::Full);
                }
                ids.insert(pos, id);
                self.save(&ids)?;
                Ok(AddOutcome::Inserted)
            }
        }
    }

    /// Write-locked shift-delete, followed by an atomic save (spec §4.6
    /// "remove").
    pub fn remove(&self, id: SenderId) -> Result<RemoveOutcome, AccessError> {
        let mut ids = self.ids.write().unwrap();
        match ids.binary_search(&id) {
            Ok(pos) => {
                ids.remove(pos);
                self.save(&ids)?;
                Ok(RemoveOutcome::Removed)
            }
            Err(_) => Ok(RemoveOutcome::NotPresent),
        }
    }

    fn save(&self, ids: &[SenderId]) -> Result<(), AccessError> {
        let mut body = String::with_capacity(ids.len() * 12);
        for id in ids {
            body.push_str(&id.to_string());
            body.push('\n');
        }
        write_atomic(&self.path, &body)
    }
}

/// Writes `contents` to a sibling `.tmp` file with mode 0600, then renames
/// it over `path`. Rename is atomic on POSIX-like filesystems, so readers
/// only ever observe a complete pre- or post-save file (spec §4.6 "atomic
/// save").
fn write_atomic(path: &Path, contents: &str) -> Result<(), AccessError> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    set_owner_only_mode(&tmp_path)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
