use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::domain::ApplicationId;
use super::repository::{ApplicationRecord, ApplicationRepository, RepositoryError};

/// Process-local store, used by tests and when no data file is configured.
#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl InMemoryApplicationRepository {
    fn records(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ApplicationId, ApplicationRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records()?;
        if guard.contains_key(&record.application_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records()?;
        if guard.contains_key(&record.application_id) {
            guard.insert(record.application_id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records()?;
        Ok(guard.get(id).cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records()?;
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.application_id.cmp(&b.application_id))
        });
        records.truncate(limit);
        Ok(records)
    }
}

/// Durable store keeping every application in one JSON object keyed by application id.
///
/// Each write replaces the file through a sibling temp file and a rename, so a failed write
/// leaves the previous contents in place.
pub struct JsonFileRepository {
    path: PathBuf,
    file: Mutex<()>,
}

type ApplicationMap = BTreeMap<ApplicationId, ApplicationRecord>;

impl JsonFileRepository {
    /// Open the store, creating the parent directory when needed. The file itself is created
    /// on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| unavailable(parent, err))?;
        }
        Ok(Self {
            path,
            file: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, RepositoryError> {
        self.file
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    fn read_all(&self) -> Result<ApplicationMap, RepositoryError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ApplicationMap::new()),
            Err(err) => return Err(unavailable(&self.path, err)),
        };
        if raw.trim().is_empty() {
            return Ok(ApplicationMap::new());
        }
        serde_json::from_str(&raw).map_err(|err| {
            RepositoryError::Unavailable(format!(
                "{} holds unreadable application data: {err}",
                self.path.display()
            ))
        })
    }

    fn write_all(&self, applications: &ApplicationMap) -> Result<(), RepositoryError> {
        let payload = serde_json::to_vec_pretty(applications).map_err(|err| {
            RepositoryError::Unavailable(format!("failed to serialize applications: {err}"))
        })?;

        let staging = self.path.with_extension("json.tmp");
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&staging)?;
            file.write_all(&payload)?;
            file.sync_all()?;
            fs::rename(&staging, &self.path)
        };
        write().map_err(|err| unavailable(&self.path, err))?;

        debug!(path = %self.path.display(), records = applications.len(), "application store written");
        Ok(())
    }
}

fn unavailable(path: &Path, err: io::Error) -> RepositoryError {
    RepositoryError::Unavailable(format!("{}: {err}", path.display()))
}

impl ApplicationRepository for JsonFileRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let _guard = self.lock()?;
        let mut applications = self.read_all()?;
        if applications.contains_key(&record.application_id) {
            return Err(RepositoryError::Conflict);
        }
        applications.insert(record.application_id.clone(), record.clone());
        self.write_all(&applications)?;
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        let _guard = self.lock()?;
        let mut applications = self.read_all()?;
        if !applications.contains_key(&record.application_id) {
            return Err(RepositoryError::NotFound);
        }
        applications.insert(record.application_id.clone(), record);
        self.write_all(&applications)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let _guard = self.lock()?;
        Ok(self.read_all()?.remove(id))
    }

    fn list(&self, limit: usize) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let _guard = self.lock()?;
        let mut records: Vec<_> = self.read_all()?.into_values().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.application_id.cmp(&b.application_id))
        });
        records.truncate(limit);
        Ok(records)
    }
}
