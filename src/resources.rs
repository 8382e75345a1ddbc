use crate::project::{SourceId, DESCRIPTOR_FILE_NAME};
use crate::schedule::Scheduler;
use crate::shell::EditorContext;
use anyhow::{anyhow, bail, Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

/// Payload of a completed load: content plus the checksum it was stored
/// under. `content()` re-hashes and fails on mismatch, so a corrupted
/// transfer surfaces as a load failure instead of silently feeding garbage
/// to a parser.
#[derive(Debug, Clone)]
pub struct LoadedResource {
    content: String,
    checksum: String,
}

impl LoadedResource {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let checksum = content_checksum(&content);
        Self { content, checksum }
    }

    pub fn with_checksum(content: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self { content: content.into(), checksum: checksum.into() }
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn content(&self) -> Result<&str> {
        let actual = content_checksum(&self.content);
        if actual != self.checksum {
            bail!("resource checksum mismatch (expected {}, computed {actual})", self.checksum);
        }
        Ok(&self.content)
    }
}

pub fn content_checksum(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

pub type LoadCallback = Box<dyn FnOnce(&mut EditorContext, Result<LoadedResource>)>;

/// Narrow storage seam. Completions are continuations delivered through the
/// scheduler, never invoked inline, so different loads may resolve in any
/// order relative to each other and callers must tolerate every interleaving.
pub trait ResourceStore {
    fn load(&self, id: &SourceId, on_done: LoadCallback);

    /// Deletes the storage behind a source unit. For a descriptor source this
    /// is the whole extension folder.
    fn delete_source_unit(&self, id: &SourceId) -> Result<()>;
}

/// Store backed by a project directory; loads read eagerly but complete on a
/// later tick like every other store.
pub struct DirResourceStore {
    root: PathBuf,
    scheduler: Scheduler,
}

impl DirResourceStore {
    pub fn new(root: impl Into<PathBuf>, scheduler: Scheduler) -> Self {
        Self { root: root.into(), scheduler }
    }
}

impl ResourceStore for DirResourceStore {
    fn load(&self, id: &SourceId, on_done: LoadCallback) {
        let path = self.root.join(id.as_str());
        let result = fs::read_to_string(&path)
            .map(LoadedResource::new)
            .with_context(|| format!("loading resource '{}'", path.display()));
        self.scheduler.defer(move |ctx| on_done(ctx, result));
    }

    fn delete_source_unit(&self, id: &SourceId) -> Result<()> {
        let path = self.root.join(id.as_str());
        let target = if id.file_name() == DESCRIPTOR_FILE_NAME {
            path.parent().map(PathBuf::from).ok_or_else(|| anyhow!("source unit '{id}' has no folder"))?
        } else {
            path
        };
        fs::remove_dir_all(&target)
            .with_context(|| format!("deleting source unit '{}'", target.display()))
    }
}

#[derive(Default)]
struct MemoryStoreState {
    files: HashMap<SourceId, String>,
    corrupt: Vec<SourceId>,
    pending: Vec<(SourceId, LoadCallback)>,
    deleted: Vec<SourceId>,
}

/// In-memory store that holds every load until the caller delivers it, in
/// whatever order a test wants to exercise. Clones share state.
#[derive(Clone)]
pub struct MemoryResourceStore {
    state: Rc<RefCell<MemoryStoreState>>,
    scheduler: Scheduler,
}

impl MemoryResourceStore {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { state: Rc::new(RefCell::new(MemoryStoreState::default())), scheduler }
    }

    pub fn insert(&self, id: impl Into<SourceId>, content: impl Into<String>) {
        self.state.borrow_mut().files.insert(id.into(), content.into());
    }

    /// Marks a resource so its delivery carries a bad checksum.
    pub fn mark_corrupt(&self, id: impl Into<SourceId>) {
        self.state.borrow_mut().corrupt.push(id.into());
    }

    pub fn pending_ids(&self) -> Vec<SourceId> {
        self.state.borrow().pending.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn deleted_units(&self) -> Vec<SourceId> {
        self.state.borrow().deleted.clone()
    }

    /// Schedules the completion of the first pending load for `id`.
    pub fn deliver(&self, id: impl Into<SourceId>) -> bool {
        let id = id.into();
        let entry = {
            let mut state = self.state.borrow_mut();
            match state.pending.iter().position(|(pending, _)| *pending == id) {
                Some(index) => Some(state.pending.remove(index)),
                None => None,
            }
        };
        match entry {
            Some((id, on_done)) => {
                self.schedule_completion(id, on_done);
                true
            }
            None => false,
        }
    }

    /// Schedules every pending completion in request order.
    pub fn deliver_all(&self) -> usize {
        let pending: Vec<(SourceId, LoadCallback)> = {
            let mut state = self.state.borrow_mut();
            state.pending.drain(..).collect()
        };
        let count = pending.len();
        for (id, on_done) in pending {
            self.schedule_completion(id, on_done);
        }
        count
    }

    fn schedule_completion(&self, id: SourceId, on_done: LoadCallback) {
        let result = {
            let state = self.state.borrow();
            match state.files.get(&id) {
                Some(content) if state.corrupt.contains(&id) => {
                    Ok(LoadedResource::with_checksum(content.clone(), "corrupt"))
                }
                Some(content) => Ok(LoadedResource::new(content.clone())),
                None => Err(anyhow!("resource '{id}' not found")),
            }
        };
        self.scheduler.defer(move |ctx| on_done(ctx, result));
    }
}

impl ResourceStore for MemoryResourceStore {
    fn load(&self, id: &SourceId, on_done: LoadCallback) {
        self.state.borrow_mut().pending.push((id.clone(), on_done));
    }

    fn delete_source_unit(&self, id: &SourceId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let folder = match id.as_str().rfind('/') {
            Some(pos) if id.file_name() == DESCRIPTOR_FILE_NAME => id.as_str()[..pos + 1].to_string(),
            _ => id.as_str().to_string(),
        };
        state.files.retain(|file, _| !file.as_str().starts_with(&folder));
        state.deleted.push(id.clone());
        Ok(())
    }
}
