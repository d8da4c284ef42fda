use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{SessionId, SessionRecord, SessionState, SessionStore};
use crate::error::{DevauthError, Result};

const SESSION_FILE_VERSION: u32 = 1;

/// File-backed session store: one JSON file per session.
///
/// Records are written to a temporary file and renamed into place, so a
/// reader sees either the previous state or the complete new record.
///
/// # Example
/// ```no_run
/// use chrono::Utc;
/// use devauth::auth::{Token, UserProfile};
/// use devauth::session::{FileSessionStore, SessionId, SessionRecord, SessionStore};
///
/// let store = FileSessionStore::new_default();
/// let session = SessionId::from("cli");
/// let record = SessionRecord::new(Token::bearer("access"), UserProfile::default(), Utc::now());
/// store.bind(&session, record)?;
/// assert!(store.read(&session)?.is_authenticated());
/// # Ok::<(), devauth::error::DevauthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Store under `~/.devauth/sessions`.
    pub fn new_default() -> Self {
        Self::new(crate::config::default_devauth_dir().join("sessions"))
    }

    fn session_path(&self, session: &SessionId) -> Result<PathBuf> {
        let id = session.as_str();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(DevauthError::SessionStore(format!(
                "session id {id:?} is not usable as a file name"
            )));
        }
        Ok(self.base_dir.join(format!("{id}.json")))
    }
}

impl SessionStore for FileSessionStore {
    fn bind(&self, session: &SessionId, record: SessionRecord) -> Result<()> {
        let path = self.session_path(session)?;
        let file = SessionFile {
            version: SESSION_FILE_VERSION,
            session: session.clone(),
            record,
        };
        let serialized = serde_json::to_vec_pretty(&file)?;
        atomic_write(&path, &serialized)
    }

    fn read(&self, session: &SessionId) -> Result<SessionState> {
        let path = self.session_path(session)?;
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionState::Unauthenticated)
            }
            Err(err) => return Err(DevauthError::Io(err)),
        };
        let file: SessionFile = serde_json::from_str(&raw)?;
        if file.version != SESSION_FILE_VERSION {
            return Err(DevauthError::SessionStore(format!(
                "unsupported session file version {} at {}",
                file.version,
                path.display()
            )));
        }
        Ok(Some(file.record).into())
    }

    fn clear(&self, session: &SessionId) -> Result<()> {
        let path = self.session_path(session)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DevauthError::Io(err)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    session: SessionId,
    record: SessionRecord,
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path.file_name().ok_or_else(|| {
        DevauthError::SessionStore(format!("session path {} has no file name", path.display()))
    })?;
    let temp_path = path.with_file_name(format!(
        ".{}.tmp-{}-{}",
        file_name.to_string_lossy(),
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(DevauthError::Io(err));
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(DevauthError::Io(err));
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}
