//! Contact directory: user id → display name, persisted as a JSON file and
//! refreshed lazily from inbound traffic.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
    time::{Duration, Instant},
};

use tracing::{debug, error, warn};

use crate::{
    api::VoceChatClient,
    error::{Error, Result},
};

/// Minimum time between two lookups, directory-wide.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub user_id: String,
    pub display_name: String,
}

pub struct ContactDirectory {
    api: VoceChatClient,
    path: PathBuf,
    refresh_interval: Duration,
    contacts: RwLock<BTreeMap<String, String>>,
    last_refresh: Mutex<Option<Instant>>,
}

impl ContactDirectory {
    /// Load the directory from `path`. A missing or unreadable file starts
    /// empty.
    pub fn load(api: VoceChatClient, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let contacts = read_store(&path);
        debug!(path = %path.display(), count = contacts.len(), "contact directory loaded");
        Self {
            api,
            path,
            refresh_interval: REFRESH_INTERVAL,
            contacts: RwLock::new(contacts),
            last_refresh: Mutex::new(None),
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, user_id: &str) -> Option<ContactRecord> {
        let contacts = self.contacts.read().unwrap_or_else(|e| e.into_inner());
        contacts.get(user_id).map(|name| ContactRecord {
            user_id: user_id.to_string(),
            display_name: name.clone(),
        })
    }

    pub fn list(&self) -> Vec<ContactRecord> {
        let contacts = self.contacts.read().unwrap_or_else(|e| e.into_inner());
        contacts
            .iter()
            .map(|(user_id, name)| ContactRecord {
                user_id: user_id.clone(),
                display_name: name.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.contacts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look `user_id` up and store the result, at most once per refresh
    /// interval across the whole directory. Failures are logged and leave
    /// the directory unchanged.
    ///
    /// Returns `true` when a lookup succeeded and the entry was written.
    pub async fn refresh(&self, user_id: &str) -> bool {
        if !self.refresh_due() {
            debug!(user_id, "contact refresh skipped, interval not elapsed");
            return false;
        }

        let profile = match self.api.get_user(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                error!(user_id, error = %e, "contact lookup failed");
                return false;
            },
        };

        let snapshot = {
            let mut contacts = self.contacts.write().unwrap_or_else(|e| e.into_inner());
            contacts.insert(user_id.to_string(), profile.name);
            contacts.clone()
        };
        *self.last_refresh.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        if let Err(e) = write_store(&self.path, &snapshot) {
            error!(path = %self.path.display(), error = %e, "failed to save contact directory");
        }
        debug!(user_id, "contact refreshed");
        true
    }

    fn refresh_due(&self) -> bool {
        let last = self.last_refresh.lock().unwrap_or_else(|e| e.into_inner());
        last.is_none_or(|at| at.elapsed() >= self.refresh_interval)
    }
}

fn read_store(path: &Path) -> BTreeMap<String, String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read contact directory");
            return BTreeMap::new();
        },
    };
    match serde_json::from_str(&raw) {
        Ok(contacts) => contacts,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt contact directory, starting empty");
            BTreeMap::new()
        },
    }
}

fn write_store(path: &Path, contacts: &BTreeMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(contacts)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent.display(), e))?;
    }
    std::fs::write(path, json).map_err(|e| Error::io(path.display(), e))
}
