use crate::display::DisplaySurface;
use crate::editors::RosterHandle;
use crate::events::{EditorEvent, EventBus};
use crate::extensions::ExtensionLoader;
use crate::i18n::TranslationBundle;
use crate::manager::EditorManager;
use crate::orchestrator::ProjectLoader;
use crate::pool::PropertyEditorPool;
use crate::project::{ProjectId, ProjectLayout, SourceUnit};
use crate::registry::ComponentDatabase;
use crate::report::Reporter;
use crate::resources::ResourceStore;
use crate::schedule::Scheduler;
use anyhow::{bail, Result};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Everything a scheduled continuation may touch. Tasks receive the context
/// by mutable reference from the tick loop; nothing here is shared across
/// threads and nothing needs a lock.
pub struct EditorContext {
    pub database: ComponentDatabase,
    pub surface: Box<dyn DisplaySurface>,
    pub reporter: Box<dyn Reporter>,
    pub store: Rc<dyn ResourceStore>,
    pub translations: Box<dyn TranslationBundle>,
    pub events: EventBus,
    pub manager: EditorManager,
    pub scheduler: Scheduler,
}

impl EditorContext {
    pub fn new(
        scheduler: Scheduler,
        store: Rc<dyn ResourceStore>,
        surface: Box<dyn DisplaySurface>,
        reporter: Box<dyn Reporter>,
        translations: Box<dyn TranslationBundle>,
        autosave: bool,
    ) -> Self {
        Self {
            database: ComponentDatabase::new(),
            surface,
            reporter,
            store,
            translations,
            events: EventBus::default(),
            manager: EditorManager::new(scheduler.clone(), autosave),
            scheduler,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(scheduler: Scheduler) -> Self {
        use crate::display::NullSurface;
        use crate::i18n::TranslationFlag;
        use crate::report::ConsoleReporter;
        use crate::resources::MemoryResourceStore;

        let store = MemoryResourceStore::new(scheduler.clone());
        Self::new(
            scheduler,
            Rc::new(store),
            Box::new(NullSurface),
            Box::new(ConsoleReporter),
            Box::new(TranslationFlag::loaded()),
            true,
        )
    }
}

/// One open project: its context, its load orchestration, and the pooled
/// property editors. The registry lives for exactly as long as the shell;
/// switching projects means building a new shell (the pool can be carried
/// over, it outlives projects).
pub struct ProjectShell {
    ctx: EditorContext,
    scheduler: Scheduler,
    layout: ProjectLayout,
    roster: RosterHandle,
    extensions: ExtensionLoader,
    loader: ProjectLoader,
    pool: PropertyEditorPool,
}

impl ProjectShell {
    pub fn new(layout: ProjectLayout, ctx: EditorContext) -> Self {
        Self::with_pool(layout, ctx, PropertyEditorPool::new())
    }

    pub fn with_pool(layout: ProjectLayout, ctx: EditorContext, pool: PropertyEditorPool) -> Self {
        let scheduler = ctx.scheduler.clone();
        let roster = RosterHandle::new();
        let extensions = ExtensionLoader::new(&layout, roster.clone());
        let loader = ProjectLoader::new(&layout, roster.clone(), extensions.clone());
        Self { ctx, scheduler, layout, roster, extensions, loader, pool }
    }

    pub fn project_id(&self) -> ProjectId {
        self.layout.id
    }

    pub fn project_name(&self) -> &str {
        &self.layout.name
    }

    /// Resets the registry for this project, starts the external descriptor
    /// loads, and arms the load orchestrator behind them.
    pub fn open_project(&mut self) {
        self.ctx.database.add_listener(self.roster.listener());
        self.ctx.database.reset();
        self.ctx.events.push(EditorEvent::RegistryReset);
        let descriptor_sources = self.layout.descriptor_sources();
        self.extensions.begin(&mut self.ctx, &descriptor_sources);
        self.loader.begin(&mut self.ctx);
    }

    /// One cooperative tick. Returns the number of tasks that ran.
    pub fn tick(&mut self) -> usize {
        self.scheduler.tick(&mut self.ctx)
    }

    pub fn is_loaded(&self) -> bool {
        self.loader.is_finished()
    }

    pub fn is_aborted(&self) -> bool {
        self.loader.is_aborted()
    }

    /// Drives ticks until the load cycle finishes or aborts. Only usable
    /// with stores that complete on their own; a test store that holds
    /// deliveries needs its own drive loop.
    pub fn run_until_loaded(&mut self, max_ticks: usize) -> Result<()> {
        for _ in 0..max_ticks {
            if self.loader.is_finished() || self.loader.is_aborted() {
                return Ok(());
            }
            self.tick();
        }
        if self.loader.is_finished() || self.loader.is_aborted() {
            Ok(())
        } else {
            bail!("project load did not finish within {max_ticks} ticks")
        }
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.ctx.events.drain()
    }

    pub fn ctx(&self) -> &EditorContext {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut EditorContext {
        &mut self.ctx
    }

    pub fn roster(&self) -> &RosterHandle {
        &self.roster
    }

    pub fn extensions(&self) -> &ExtensionLoader {
        &self.extensions
    }

    pub fn loader(&self) -> &ProjectLoader {
        &self.loader
    }

    pub fn pool_mut(&mut self) -> &mut PropertyEditorPool {
        &mut self.pool
    }

    /// Hands the pool back so the next project's shell can reuse the live
    /// editor instances.
    pub fn into_pool(self) -> PropertyEditorPool {
        self.pool
    }

    pub fn remove_types(&mut self, requested: &[String]) -> bool {
        let extensions = self.extensions.clone();
        extensions.remove_types(&mut self.ctx, requested)
    }

    pub fn source_added(&mut self, unit: &SourceUnit) {
        let loader = self.loader.clone();
        loader.source_added(&mut self.ctx, unit);
    }

    pub fn source_removed(&mut self, unit: &SourceUnit) {
        let loader = self.loader.clone();
        loader.source_removed(&mut self.ctx, unit);
    }

    pub fn save_project(&mut self) {
        let loader = self.loader.clone();
        loader.save_project(&mut self.ctx);
    }

    pub fn component_instances(&self, screen: &str) -> Vec<String> {
        self.roster.borrow().component_instances(screen)
    }

    pub fn unique_component_types(&self) -> BTreeSet<String> {
        self.roster.borrow().unique_component_types()
    }
}
