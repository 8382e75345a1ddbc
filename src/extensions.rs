use crate::descriptor::{package_of, DescriptorDocument};
use crate::editors::RosterHandle;
use crate::events::EditorEvent;
use crate::project::{ProjectLayout, SourceId, SourceUnit, DESCRIPTOR_FILE_NAME};
use crate::schedule::DeferredTask;
use crate::shell::EditorContext;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::mem;
use std::rc::Rc;

struct LoaderState {
    project_name: String,
    roster: RosterHandle,
    expected: usize,
    completed: usize,
    settled: bool,
    on_settled: Vec<DeferredTask>,
    /// Distinct packages contributed by external descriptors, in first-seen
    /// order. A package seen again marks an upgrade.
    external_packages: Vec<String>,
}

/// Ingests the project's external type-descriptor documents. The documents
/// arrive in no particular order; the loader merges each into the registry as
/// it resolves and declares the registry settled once every expected source
/// has completed, successfully or not.
#[derive(Clone)]
pub struct ExtensionLoader {
    state: Rc<RefCell<LoaderState>>,
}

impl ExtensionLoader {
    pub fn new(layout: &ProjectLayout, roster: RosterHandle) -> Self {
        Self {
            state: Rc::new(RefCell::new(LoaderState {
                project_name: layout.name.clone(),
                roster,
                expected: 0,
                completed: 0,
                settled: false,
                on_settled: Vec::new(),
                external_packages: Vec::new(),
            })),
        }
    }

    /// Kicks off one load per descriptor source. With nothing to load the
    /// loader settles immediately.
    pub fn begin(&self, ctx: &mut EditorContext, sources: &[SourceUnit]) {
        {
            let mut state = self.state.borrow_mut();
            state.expected = sources.len();
            state.completed = 0;
            state.settled = false;
        }
        if sources.is_empty() {
            self.settle(ctx);
            return;
        }
        for unit in sources {
            self.request(ctx, unit.id.clone());
        }
    }

    /// Registers one more descriptor source after the initial cycle, e.g. an
    /// extension imported into an already-open project.
    pub fn add_descriptor_source(&self, ctx: &mut EditorContext, unit: &SourceUnit) {
        self.state.borrow_mut().expected += 1;
        self.request(ctx, unit.id.clone());
    }

    pub fn settled(&self) -> bool {
        self.state.borrow().settled
    }

    pub fn expected(&self) -> usize {
        self.state.borrow().expected
    }

    pub fn completed(&self) -> usize {
        self.state.borrow().completed
    }

    pub fn external_packages(&self) -> Vec<String> {
        self.state.borrow().external_packages.clone()
    }

    /// Runs `callback` once the loader settles; immediately if it already
    /// has.
    pub fn on_settled(&self, ctx: &mut EditorContext, callback: impl FnOnce(&mut EditorContext) + 'static) {
        let settled = self.state.borrow().settled;
        if settled {
            callback(ctx);
        } else {
            self.state.borrow_mut().on_settled.push(Box::new(callback));
        }
    }

    /// Removes `requested` type names together with every source-unit
    /// sibling, unless any registry listener vetoes. Returns whether the
    /// removal committed.
    pub fn remove_types(&self, ctx: &mut EditorContext, requested: &[String]) -> bool {
        let expanded = ctx.database.expand_removal(requested);
        if expanded.is_empty() {
            return false;
        }
        if !ctx.database.before_types_removed(&expanded) {
            ctx.reporter
                .warning(&format!("removal of {} was vetoed; registry unchanged", expanded.join(", ")));
            return false;
        }
        let removed = ctx.database.commit_removal(&expanded);
        if removed.is_empty() {
            return false;
        }
        {
            let mut state = self.state.borrow_mut();
            state.external_packages.retain(|package| ctx.database.package_members(package).is_some());
        }
        let units: BTreeSet<SourceId> = removed.values().cloned().collect();
        for unit in &units {
            if let Err(err) = ctx.store.delete_source_unit(unit) {
                ctx.reporter.warning(&format!("failed to delete source unit '{unit}': {err:#}"));
            }
        }
        ctx.database.notify_types_removed(&removed);
        ctx.events.push(EditorEvent::TypesRemoved { removed });
        true
    }

    fn request(&self, ctx: &mut EditorContext, id: SourceId) {
        let loader = self.clone();
        let completion_id = id.clone();
        ctx.store.load(
            &id,
            Box::new(move |ctx, result| {
                match result.and_then(|resource| resource.content().map(str::to_string)) {
                    Ok(text) => match DescriptorDocument::parse(&text) {
                        Ok(document) => loader.merge_document(ctx, &completion_id, document),
                        Err(_) => loader.report_corrupt(ctx, &completion_id),
                    },
                    Err(err) => {
                        let project = loader.state.borrow().project_name.clone();
                        ctx.reporter.error(&format!(
                            "failed to load extension descriptor '{completion_id}' in project '{project}': {err:#}"
                        ));
                    }
                }
                loader.complete_one(ctx);
            }),
        );
    }

    fn merge_document(&self, ctx: &mut EditorContext, id: &SourceId, document: DescriptorDocument) {
        let descriptors = document.into_descriptors();
        if descriptors.is_empty() {
            return;
        }
        let packages: Vec<String> =
            descriptors.iter().map(|descriptor| package_of(&descriptor.type_name).to_string()).collect();
        let added = ctx.database.register(id, descriptors);
        ctx.events.push(EditorEvent::TypesAdded { names: added });

        let mut upgraded = false;
        {
            let mut state = self.state.borrow_mut();
            for package in packages {
                if state.external_packages.contains(&package) {
                    upgraded = true;
                } else {
                    state.external_packages.push(package);
                }
            }
        }
        if upgraded {
            // A re-registered package means descriptor versions moved; force a
            // save so the bump is persisted.
            self.force_save(ctx);
        }
    }

    fn force_save(&self, ctx: &mut EditorContext) {
        let roster = self.state.borrow().roster.clone();
        let sources = roster.borrow().open_sources();
        for source in sources {
            ctx.manager.schedule_auto_save(source);
        }
    }

    fn report_corrupt(&self, ctx: &mut EditorContext, id: &SourceId) {
        let project = self.state.borrow().project_name.clone();
        let segments: Vec<&str> = id.segments().collect();
        if segments.len() >= 4 && id.file_name() == DESCRIPTOR_FILE_NAME {
            ctx.reporter.error(&format!(
                "descriptor for extension package '{}' in project '{project}' is corrupted",
                segments[2]
            ));
        } else {
            ctx.reporter
                .error(&format!("project '{project}' contains an invalid component descriptor"));
        }
    }

    fn complete_one(&self, ctx: &mut EditorContext) {
        let reached = {
            let mut state = self.state.borrow_mut();
            state.completed += 1;
            !state.settled && state.completed >= state.expected
        };
        if reached {
            self.settle(ctx);
        }
    }

    fn settle(&self, ctx: &mut EditorContext) {
        let (callbacks, expected) = {
            let mut state = self.state.borrow_mut();
            if state.settled {
                return;
            }
            state.settled = true;
            (mem::take(&mut state.on_settled), state.expected)
        };
        ctx.events.push(EditorEvent::RegistrySettled { expected });
        for callback in callbacks {
            callback(ctx);
        }
    }
}
