//! In-process object store, used by tests and offline callers.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Notify;

use super::paths::base_name;
use super::{ObjectStore, RemoteEntry, StoreError};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    sha: String,
}

/// Object store backed by a map, with failure injection for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    /// Paths passed to `put`, in call order (including failed calls).
    put_log: Mutex<Vec<String>>,
    fail_puts_matching: Mutex<HashSet<String>>,
    fail_reads_matching: Mutex<HashSet<String>>,
    fail_deletes_matching: Mutex<HashSet<String>>,
    listing_down: Mutex<bool>,
    /// Held listing: the next `list` waits on this before returning.
    listing_gate: Mutex<Option<Arc<Notify>>>,
}

fn poisoned() -> StoreError {
    StoreError::HttpClient("memory store lock poisoned".into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing failure injection and the put log.
    pub fn insert(&self, path: &str, bytes: &[u8]) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(path.to_string(), StoredObject {
                bytes: bytes.to_vec(),
                sha: object_sha(path, bytes),
            });
        }
    }

    /// Every `put` whose path contains `needle` fails with a 500.
    pub fn fail_puts_containing(&self, needle: &str) {
        if let Ok(mut set) = self.fail_puts_matching.lock() {
            set.insert(needle.to_string());
        }
    }

    /// Every `read` whose path contains `needle` fails as unreachable.
    pub fn fail_reads_containing(&self, needle: &str) {
        if let Ok(mut set) = self.fail_reads_matching.lock() {
            set.insert(needle.to_string());
        }
    }

    /// Every `delete` whose path contains `needle` fails with a 500.
    pub fn fail_deletes_containing(&self, needle: &str) {
        if let Ok(mut set) = self.fail_deletes_matching.lock() {
            set.insert(needle.to_string());
        }
    }

    /// Hold the next `list` call until the returned handle is notified.
    /// The entries it returns are captured before it waits.
    pub fn gate_next_listing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        if let Ok(mut slot) = self.listing_gate.lock() {
            *slot = Some(Arc::clone(&gate));
        }
        gate
    }

    /// Make `list` fail as if the remote were unreachable.
    pub fn set_listing_down(&self, down: bool) {
        if let Ok(mut flag) = self.listing_down.lock() {
            *flag = down;
        }
    }

    pub fn put_log(&self) -> Vec<String> {
        self.put_log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(path))
            .unwrap_or(false)
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(path).map(|o| o.bytes.clone()))
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn entry(path: &str, object: &StoredObject) -> RemoteEntry {
        RemoteEntry {
            name: base_name(path).to_string(),
            path: path.to_string(),
            sha: object.sha.clone(),
            size: object.bytes.len() as u64,
            download_url: Some(format!("memory://raw/{path}")),
            html_url: Some(format!("memory://blob/{path}")),
            kind: "file".to_string(),
        }
    }

    fn folder_entry(path: String) -> RemoteEntry {
        RemoteEntry {
            name: base_name(&path).to_string(),
            path,
            sha: String::new(),
            size: 0,
            download_url: None,
            html_url: None,
            kind: "dir".to_string(),
        }
    }
}

/// Hash over path and content so identical bytes at two paths stay distinct.
fn object_sha(path: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StoreError> {
        if *self.listing_down.lock().map_err(|_| poisoned())? {
            return Err(StoreError::RemoteUnavailable("listing disabled".into()));
        }
        let prefix = format!("{}/", path.trim_matches('/'));
        let entries = {
            let objects = self.objects.lock().map_err(|_| poisoned())?;
            let mut files = Vec::new();
            let mut folders = BTreeSet::new();
            for (p, o) in objects.iter() {
                let Some(rest) = p.strip_prefix(&prefix).filter(|r| !r.is_empty()) else {
                    continue;
                };
                match rest.split_once('/') {
                    Some((folder, _)) => {
                        folders.insert(format!("{prefix}{folder}"));
                    }
                    None => files.push(Self::entry(p, o)),
                }
            }
            folders
                .into_iter()
                .map(Self::folder_entry)
                .chain(files)
                .collect::<Vec<_>>()
        };

        let gate = self.listing_gate.lock().map_err(|_| poisoned())?.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(entries)
    }

    async fn read(&self, path: &str, _download_url: Option<&str>) -> Result<Vec<u8>, StoreError> {
        let failing = self.fail_reads_matching.lock().map_err(|_| poisoned())?;
        if failing.iter().any(|needle| path.contains(needle.as_str())) {
            return Err(StoreError::RemoteUnavailable(format!("read failed: {path}")));
        }
        drop(failing);
        self.objects
            .lock()
            .map_err(|_| poisoned())?
            .get(path)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        _message: &str,
    ) -> Result<RemoteEntry, StoreError> {
        self.put_log.lock().map_err(|_| poisoned())?.push(path.to_string());

        let failing = self.fail_puts_matching.lock().map_err(|_| poisoned())?;
        if failing.iter().any(|needle| path.contains(needle.as_str())) {
            return Err(StoreError::RemoteStatus {
                status: 500,
                body: format!("injected failure for {path}"),
            });
        }
        drop(failing);

        let mut objects = self.objects.lock().map_err(|_| poisoned())?;
        // Puts carry no sha, so like the Contents API an existing path is refused.
        if objects.contains_key(path) {
            return Err(StoreError::RemoteStatus {
                status: 422,
                body: format!("Invalid request. \"sha\" wasn't supplied. ({path})"),
            });
        }
        let object = StoredObject {
            bytes: content.to_vec(),
            sha: object_sha(path, content),
        };
        let entry = Self::entry(path, &object);
        objects.insert(path.to_string(), object);
        Ok(entry)
    }

    async fn delete(&self, path: &str, sha: &str, _message: &str) -> Result<(), StoreError> {
        let failing = self.fail_deletes_matching.lock().map_err(|_| poisoned())?;
        if failing.iter().any(|needle| path.contains(needle.as_str())) {
            return Err(StoreError::RemoteStatus {
                status: 500,
                body: format!("injected failure for {path}"),
            });
        }
        drop(failing);

        let mut objects = self.objects.lock().map_err(|_| poisoned())?;
        match objects.get(path) {
            Some(existing) if existing.sha == sha => {
                objects.remove(path);
                Ok(())
            }
            Some(_) => Err(StoreError::RemoteStatus {
                status: 409,
                body: format!("sha does not match {path}"),
            }),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }
}
