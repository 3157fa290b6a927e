use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use stegomark_logging::{stego_debug, stego_warn};

use crate::preview::{encode_data_url, is_displayable, mime_for_path};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("failed to read {path:?}: {message}")]
    Read { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileSource {
    Path(PathBuf),
    Memory(Bytes),
}

/// A user-selected binary input. Path-backed files are read lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    mime: String,
    source: FileSource,
}

impl SelectedFile {
    /// File on disk; name and MIME come from the path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self {
            name,
            mime: mime_for_path(&path).to_string(),
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            source: FileSource::Memory(bytes.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            FileSource::Path(path) => Some(path),
            FileSource::Memory(_) => None,
        }
    }

    pub fn read(&self) -> Result<Bytes, ResourceError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => {
                std::fs::read(path)
                    .map(Bytes::from)
                    .map_err(|err| ResourceError::Read {
                        path: path.clone(),
                        message: err.to_string(),
                    })
            }
        }
    }
}

/// How a preview is derived for a selected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStrategy {
    /// Read the whole file into a self-contained data URL (images).
    Inline,
    /// Register a handle that resolves to the file until released (video).
    Handle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreviewHandle(u64);

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:stegomark/{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    DataUrl(String),
    Handle(PreviewHandle),
}

impl Preview {
    /// Renderable reference: the data URL itself or the handle's `blob:` name.
    pub fn url(&self) -> String {
        match self {
            Preview::DataUrl(url) => url.clone(),
            Preview::Handle(handle) => handle.to_string(),
        }
    }
}

/// Process-wide table of live preview handles.
///
/// Handles are the scarce resource: each one pins its file until revoked.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<PreviewHandle, SelectedFile>>,
    created: AtomicU64,
    revoked: AtomicU64,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, file: &SelectedFile) -> PreviewHandle {
        let handle = PreviewHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.lock().insert(handle, file.clone());
        self.created.fetch_add(1, Ordering::Relaxed);
        handle
    }

    /// Returns false if the handle was already revoked.
    pub fn revoke(&self, handle: PreviewHandle) -> bool {
        let removed = self.lock().remove(&handle).is_some();
        if removed {
            self.revoked.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn resolve(&self, handle: PreviewHandle) -> Option<SelectedFile> {
        self.lock().get(&handle).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn revoked_count(&self) -> u64 {
        self.revoked.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PreviewHandle, SelectedFile>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receives preview failures; they never abort selection.
pub trait ResourceErrorSink: Send + Sync {
    fn report(&self, slot: &str, error: &ResourceError);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogResourceErrors;

impl ResourceErrorSink for LogResourceErrors {
    fn report(&self, slot: &str, error: &ResourceError) {
        stego_warn!("preview for {} unavailable: {}", slot, error);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedResource {
    file: SelectedFile,
    preview: Option<Preview>,
}

impl ManagedResource {
    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }
}

/// Selected inputs of one adapter, keyed by form slot.
pub struct ResourceManager {
    registry: Arc<PreviewRegistry>,
    errors: Arc<dyn ResourceErrorSink>,
    slots: BTreeMap<String, ManagedResource>,
}

impl ResourceManager {
    pub fn new(registry: Arc<PreviewRegistry>) -> Self {
        Self::with_error_sink(registry, Arc::new(LogResourceErrors))
    }

    pub fn with_error_sink(registry: Arc<PreviewRegistry>, errors: Arc<dyn ResourceErrorSink>) -> Self {
        Self {
            registry,
            errors,
            slots: BTreeMap::new(),
        }
    }

    /// Store `file` in `slot`, releasing whatever the slot held first.
    pub fn select(
        &mut self,
        slot: &str,
        file: SelectedFile,
        strategy: PreviewStrategy,
    ) -> &ManagedResource {
        self.release(slot);

        let preview = if is_displayable(file.mime()) {
            self.derive_preview(slot, &file, strategy)
        } else {
            None
        };
        stego_debug!(
            "selected {} into {} (mime={}, preview={})",
            file.name(),
            slot,
            file.mime(),
            preview.is_some()
        );

        self.slots
            .entry(slot.to_string())
            .or_insert(ManagedResource { file, preview })
    }

    /// Idempotent; empty slots and inline previews need no registry call.
    pub fn release(&mut self, slot: &str) {
        if let Some(resource) = self.slots.remove(slot) {
            self.release_resource(slot, resource);
        }
    }

    pub fn release_all(&mut self) {
        for (slot, resource) in std::mem::take(&mut self.slots) {
            self.release_resource(&slot, resource);
        }
    }

    pub fn get(&self, slot: &str) -> Option<&ManagedResource> {
        self.slots.get(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn registry(&self) -> &Arc<PreviewRegistry> {
        &self.registry
    }

    fn derive_preview(
        &self,
        slot: &str,
        file: &SelectedFile,
        strategy: PreviewStrategy,
    ) -> Option<Preview> {
        match strategy {
            PreviewStrategy::Inline => match file.read() {
                Ok(bytes) => Some(Preview::DataUrl(encode_data_url(file.mime(), &bytes))),
                Err(err) => {
                    self.errors.report(slot, &err);
                    None
                }
            },
            PreviewStrategy::Handle => Some(Preview::Handle(self.registry.create(file))),
        }
    }

    fn release_resource(&self, slot: &str, resource: ManagedResource) {
        if let Some(Preview::Handle(handle)) = resource.preview {
            if !self.registry.revoke(handle) {
                stego_warn!("preview handle {} for {} was already revoked", handle, slot);
            }
        }
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.release_all();
    }
}
