use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use craftkeep_backend::{Section, SettingsStore};

use crate::error::{SettingsError, StoreError};

/// Sections kept in one JSON document on disk.
///
/// Every `save` rewrites the document through a synced temp file and a
/// rename, then syncs the parent directory, so readers see either the old or
/// the new document and a returned `save` survives a crash.
///
/// Writes are serialized only within one process. Separate processes sharing
/// a document must hold an exclusive lock (the CLI's `ConfigLock`) around
/// their load-modify-save cycles or they lose each other's sections.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(error) => return Err(StoreError::io("failed to read", &self.path, error)),
        };
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

impl SettingsStore for JsonFileStore {
    type Error = StoreError;

    fn load(&self, section: &str) -> Result<Section, StoreError> {
        let mut document = self.read_document()?;
        match document.remove(section) {
            Some(Value::Object(map)) => Ok(map),
            Some(Value::Null) | None => Ok(Map::new()),
            Some(other) => Err(StoreError::Corrupt {
                path: self.path.clone(),
                source: serde::de::Error::custom(format!(
                    "section {section} is {other}, expected an object"
                )),
            }),
        }
    }

    fn save(&self, section: &str, data: Section) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.read_document()?;
        document.insert(section.to_string(), Value::Object(data));
        let bytes = serde_json::to_vec_pretty(&document).map_err(StoreError::Serialize)?;
        write_atomic(&self.path, &bytes)?;
        debug!("saved section {section} to {}", self.path.display());
        Ok(())
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .map_err(|error| StoreError::io("failed to create directory", parent, error))?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("settings");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)
                    .and_then(|()| file.sync_all())
                    .map_err(|error| StoreError::io("failed to write", &candidate, error))?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(StoreError::io("failed to create", &candidate, error)),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(StoreError::io(
            "failed to create unique temp file for",
            path,
            std::io::Error::from(std::io::ErrorKind::AlreadyExists),
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(StoreError::io("failed to replace", path, error));
    }

    sync_dir(parent).map_err(|error| StoreError::io("failed to sync directory", parent, error))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// In-process store, mostly for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sections: RwLock<HashMap<String, Section>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    type Error = std::convert::Infallible;

    fn load(&self, section: &str) -> Result<Section, Self::Error> {
        let sections = self.sections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sections.get(section).cloned().unwrap_or_default())
    }

    fn save(&self, section: &str, data: Section) -> Result<(), Self::Error> {
        let mut sections = self
            .sections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sections.insert(section.to_string(), data);
        Ok(())
    }
}

/// Load a typed section, falling back to `T::default()` when it is absent.
///
/// # Errors
/// Returns [`SettingsError::Store`] if the store fails and
/// [`SettingsError::StateCorrupt`] if the section has the wrong shape.
pub fn load_section<T, S>(store: &S, section: &'static str) -> Result<T, SettingsError>
where
    T: DeserializeOwned + Default,
    S: SettingsStore + ?Sized,
{
    let data = store
        .load(section)
        .map_err(|e| SettingsError::store(section, e))?;
    if data.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_value(Value::Object(data))
        .map_err(|e| SettingsError::corrupt(section, e.to_string()))
}

/// Replace a whole section with the serialized form of `value`.
///
/// # Errors
/// Returns [`SettingsError::Store`] if serialization or the store fails.
pub fn save_section<T, S>(store: &S, section: &'static str, value: &T) -> Result<(), SettingsError>
where
    T: Serialize,
    S: SettingsStore + ?Sized,
{
    let data = match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(SettingsError::corrupt(
                section,
                format!("serialized to {other}, expected an object"),
            ));
        }
        Err(e) => return Err(SettingsError::store(section, StoreError::Serialize(e))),
    };
    store
        .save(section, data)
        .map_err(|e| SettingsError::store(section, e))
}
