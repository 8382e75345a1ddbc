use crate::display::ScreenView;
use crate::editors::{DesignEditor, LogicEditor, RosterHandle};
use crate::events::EditorEvent;
use crate::extensions::ExtensionLoader;
use crate::latch::Latch;
use crate::project::{ProjectId, ProjectLayout, SourceId, SourceKind, SourceUnit, PRIMARY_SCREEN_NAME};
use crate::resources::LoadedResource;
use crate::shell::EditorContext;
use crate::time::Time;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

const LATCH_DESIGN: &str = "design";
const LATCH_LOGIC: &str = "logic";
const LATCH_REGISTERED: &str = "registered";

struct LoadState {
    project: ProjectId,
    project_name: String,
    sources: Vec<SourceUnit>,
    roster: RosterHandle,
    extensions: ExtensionLoader,
    /// Showable gate for the primary screen. Its design load, logic load,
    /// and surface registration complete in any order; the display switch
    /// happens exactly once, when the last of them lands.
    primary: Latch,
    /// Screens with an in-flight design or logic load, front being the one
    /// the progress message names.
    loading: VecDeque<String>,
    /// Non-primary screens still waiting for their turn in the deferred
    /// loop.
    remaining: VecDeque<String>,
    counter: usize,
    total: usize,
    time: Time,
    aborted: bool,
    finished: bool,
}

/// Sequences a project's screens online: prerequisites, scan, the primary
/// screen, then every other screen one per cooperative tick.
#[derive(Clone)]
pub struct ProjectLoader {
    state: Rc<RefCell<LoadState>>,
}

impl ProjectLoader {
    pub fn new(layout: &ProjectLayout, roster: RosterHandle, extensions: ExtensionLoader) -> Self {
        Self {
            state: Rc::new(RefCell::new(LoadState {
                project: layout.id,
                project_name: layout.name.clone(),
                sources: layout.sources.clone(),
                roster,
                extensions,
                primary: Latch::new(&[LATCH_DESIGN, LATCH_LOGIC, LATCH_REGISTERED]),
                loading: VecDeque::new(),
                remaining: VecDeque::new(),
                counter: 0,
                total: 0,
                time: Time::new(),
                aborted: false,
                finished: false,
            })),
        }
    }

    /// Waits for both prerequisites, then loads. Registry settlement arrives
    /// through the extension loader's once-callback; translation readiness
    /// is poll-only, so it is checked on each tick until it holds. Neither
    /// gate has a retry bound.
    pub fn begin(&self, ctx: &mut EditorContext) {
        let extensions = self.state.borrow().extensions.clone();
        let loader = self.clone();
        extensions.on_settled(ctx, move |ctx| loader.await_translations(ctx));
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    pub fn is_aborted(&self) -> bool {
        self.state.borrow().aborted
    }

    pub fn progress(&self) -> (usize, usize) {
        let state = self.state.borrow();
        (state.counter, state.total)
    }

    pub fn primary_showable(&self) -> bool {
        self.state.borrow().primary.fired()
    }

    /// A source discovered after the load cycle, e.g. a screen added to the
    /// open project.
    pub fn source_added(&self, ctx: &mut EditorContext, unit: &SourceUnit) {
        match unit.kind {
            SourceKind::Design => {
                let Some(screen) = unit.screen_name().map(str::to_string) else {
                    return;
                };
                let roster = self.roster();
                let already_open = {
                    let mut roster = roster.borrow_mut();
                    let set = roster.get_or_create(&screen);
                    let open = set.design.is_some();
                    if !open {
                        set.design_source = Some(unit.clone());
                    }
                    open
                };
                if !already_open {
                    self.add_design_editor(ctx, &screen, unit.id.clone());
                    self.register_if_paired(ctx, &screen);
                }
            }
            SourceKind::Logic => {
                let Some(screen) = unit.screen_name().map(str::to_string) else {
                    return;
                };
                let roster = self.roster();
                let added = {
                    let mut roster = roster.borrow_mut();
                    let set = roster.get_or_create(&screen);
                    if set.logic.is_some() {
                        false
                    } else {
                        set.logic_source = Some(unit.clone());
                        set.logic = Some(LogicEditor::new(&screen, unit.id.clone()));
                        true
                    }
                };
                if added {
                    self.register_if_paired(ctx, &screen);
                }
            }
            SourceKind::Descriptor => {
                let extensions = self.state.borrow().extensions.clone();
                extensions.add_descriptor_source(ctx, unit);
            }
            SourceKind::Other => {}
        }
    }

    /// A source removed from the open project. Dropping one half of a pair
    /// leaves a partial record; the surface-side removal is a no-op the
    /// second time around.
    pub fn source_removed(&self, ctx: &mut EditorContext, unit: &SourceUnit) {
        let Some(screen) = unit.screen_name().map(str::to_string) else {
            return;
        };
        let project = self.state.borrow().project;
        let roster = self.roster();
        match unit.kind {
            SourceKind::Design => roster.borrow_mut().remove_design(&screen),
            SourceKind::Logic => roster.borrow_mut().remove_logic(&screen),
            _ => return,
        }
        ctx.surface.remove_screen(project, &screen);
    }

    /// Conservatively schedules an auto-save for every open editor.
    pub fn save_project(&self, ctx: &mut EditorContext) {
        let sources = self.roster().borrow().open_sources();
        for source in sources {
            ctx.manager.schedule_auto_save(source);
        }
    }

    fn roster(&self) -> RosterHandle {
        self.state.borrow().roster.clone()
    }

    fn await_translations(&self, ctx: &mut EditorContext) {
        if ctx.translations.is_loaded() {
            self.load_project(ctx);
        } else {
            let loader = self.clone();
            ctx.scheduler.repeat(move |ctx| {
                if ctx.translations.is_loaded() {
                    loader.load_project(ctx);
                    false
                } else {
                    true
                }
            });
        }
    }

    fn load_project(&self, ctx: &mut EditorContext) {
        let (project, project_name, sources) = {
            let state = self.state.borrow();
            (state.project, state.project_name.clone(), state.sources.clone())
        };
        let roster = self.roster();

        let mut primary_design: Option<SourceUnit> = None;
        let mut primary_logic: Option<SourceUnit> = None;
        {
            let mut roster = roster.borrow_mut();
            for unit in &sources {
                match unit.kind {
                    SourceKind::Design => {
                        if let Some(screen) = unit.screen_name().map(str::to_string) {
                            if unit.is_primary() {
                                primary_design = Some(unit.clone());
                            }
                            roster.get_or_create(&screen).design_source = Some(unit.clone());
                        }
                    }
                    SourceKind::Logic => {
                        if let Some(screen) = unit.screen_name().map(str::to_string) {
                            if unit.is_primary() {
                                primary_logic = Some(unit.clone());
                            }
                            roster.get_or_create(&screen).logic_source = Some(unit.clone());
                        }
                    }
                    _ => {}
                }
            }
        }

        let (Some(primary_design), Some(primary_logic)) = (primary_design, primary_logic) else {
            ctx.reporter.error(&format!(
                "project '{project_name}' is missing the design or logic source for its primary screen '{PRIMARY_SCREEN_NAME}'"
            ));
            self.state.borrow_mut().aborted = true;
            return;
        };

        {
            let mut state = self.state.borrow_mut();
            state.time = Time::new();
            state.total = roster.borrow().screen_count();
            state.remaining = roster
                .borrow()
                .screen_names()
                .into_iter()
                .filter(|screen| screen != PRIMARY_SCREEN_NAME)
                .collect();
            let switch_screen = PRIMARY_SCREEN_NAME.to_string();
            state.primary.on_all_set(move |ctx| {
                ctx.surface.switch_to_screen(project, &switch_screen, ScreenView::Design);
            });
        }
        ctx.surface.set_progress(0, &format!("Loading project '{project_name}'"));

        self.add_design_editor(ctx, PRIMARY_SCREEN_NAME, primary_design.id);
        {
            let mut roster = roster.borrow_mut();
            roster.get_or_create(PRIMARY_SCREEN_NAME).logic =
                Some(LogicEditor::new(PRIMARY_SCREEN_NAME, primary_logic.id));
        }
        ctx.surface.register_screen(project, PRIMARY_SCREEN_NAME);
        ctx.events.push(EditorEvent::ScreenRegistered { screen: PRIMARY_SCREEN_NAME.to_string() });
        self.state.borrow_mut().primary.set(LATCH_REGISTERED, ctx);

        let loader = self.clone();
        ctx.scheduler.repeat(move |ctx| loader.secondary_tick(ctx));
    }

    /// One turn of the deferred loop. Pops nothing until the primary design
    /// resource is in; after that, exactly one screen per tick, which keeps
    /// the surface responsive and serializes ordered-list inserts.
    fn secondary_tick(&self, ctx: &mut EditorContext) -> bool {
        {
            let state = self.state.borrow();
            if state.aborted {
                return false;
            }
            if !state.primary.is_set(LATCH_DESIGN) {
                return true;
            }
        }
        let Some(screen) = self.state.borrow_mut().remaining.pop_front() else {
            return false;
        };

        let (project, project_name) = {
            let state = self.state.borrow();
            (state.project, state.project_name.clone())
        };
        let (design_source, logic_source) = {
            let roster = self.roster();
            let roster = roster.borrow();
            match roster.get(&screen) {
                Some(set) => (set.design_source.clone(), set.logic_source.clone()),
                None => (None, None),
            }
        };
        match (design_source, logic_source) {
            (Some(design), Some(logic)) => {
                self.add_design_editor(ctx, &screen, design.id);
                {
                    let roster = self.roster();
                    let mut roster = roster.borrow_mut();
                    roster.get_or_create(&screen).logic = Some(LogicEditor::new(&screen, logic.id));
                }
                ctx.surface.register_screen(project, &screen);
                ctx.events.push(EditorEvent::ScreenRegistered { screen });
            }
            (None, _) => {
                ctx.reporter.warning(&format!(
                    "screen '{screen}' in project '{project_name}' has no design source; skipping it"
                ));
                self.completion(ctx);
            }
            (_, None) => {
                ctx.reporter.warning(&format!(
                    "screen '{screen}' in project '{project_name}' has no logic source; skipping it"
                ));
                self.completion(ctx);
            }
        }
        true
    }

    /// Creates the design editor and issues its load. The paired logic load
    /// is chained behind the design success: block content needs the
    /// component vocabulary the design resource establishes, so the logic
    /// resource is never requested first.
    fn add_design_editor(&self, ctx: &mut EditorContext, screen: &str, source: SourceId) {
        {
            let roster = self.roster();
            let mut roster = roster.borrow_mut();
            roster.get_or_create(screen).design = Some(DesignEditor::new(screen, source.clone()));
        }
        self.state.borrow_mut().loading.push_back(screen.to_string());
        let loader = self.clone();
        let completion_screen = screen.to_string();
        ctx.store.load(
            &source,
            Box::new(move |ctx, result| match result {
                Ok(resource) => loader.design_loaded(ctx, completion_screen, &resource),
                Err(err) => {
                    ctx.reporter.warning(&format!(
                        "failed to load design source for screen '{completion_screen}': {err:#}"
                    ));
                    loader.finish_screen(ctx, &completion_screen);
                }
            }),
        );
    }

    fn design_loaded(&self, ctx: &mut EditorContext, screen: String, resource: &LoadedResource) {
        let roster = self.roster();
        let applied = {
            let mut roster = roster.borrow_mut();
            roster
                .get_mut(&screen)
                .and_then(|set| set.design.as_mut())
                .map(|editor| editor.apply_loaded(resource))
        };
        match applied {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                ctx.reporter.warning(&format!("design source for screen '{screen}' is unreadable: {err:#}"));
                self.finish_screen(ctx, &screen);
                return;
            }
            None => {
                // The screen was removed while its load was in flight.
                self.finish_screen(ctx, &screen);
                return;
            }
        }

        let design_source = {
            let roster = roster.borrow();
            roster.get(&screen).and_then(|set| set.design.as_ref()).map(|editor| editor.source().clone())
        };
        if let Some(source) = design_source {
            roster.borrow_mut().insert_ordered(source);
        }
        if screen == PRIMARY_SCREEN_NAME {
            self.state.borrow_mut().primary.set(LATCH_DESIGN, ctx);
        }

        let logic_source = {
            let roster = roster.borrow();
            roster.get(&screen).and_then(|set| set.logic.as_ref()).map(|editor| editor.source().clone())
        };
        match logic_source {
            Some(source) => {
                let loader = self.clone();
                let completion_screen = screen.clone();
                ctx.store.load(
                    &source,
                    Box::new(move |ctx, result| match result {
                        Ok(resource) => loader.logic_loaded(ctx, completion_screen, &resource),
                        Err(err) => {
                            ctx.reporter.warning(&format!(
                                "failed to load logic source for screen '{completion_screen}': {err:#}"
                            ));
                            loader.finish_screen(ctx, &completion_screen);
                        }
                    }),
                );
            }
            None => self.finish_screen(ctx, &screen),
        }
    }

    fn logic_loaded(&self, ctx: &mut EditorContext, screen: String, resource: &LoadedResource) {
        let roster = self.roster();
        let applied = {
            let mut roster = roster.borrow_mut();
            roster
                .get_mut(&screen)
                .and_then(|set| set.logic.as_mut())
                .map(|editor| editor.apply_loaded(resource))
        };
        match applied {
            Some(Ok(())) => {
                let logic_source = {
                    let roster = roster.borrow();
                    roster
                        .get(&screen)
                        .and_then(|set| set.logic.as_ref())
                        .map(|editor| editor.source().clone())
                };
                if let Some(source) = logic_source {
                    roster.borrow_mut().insert_ordered(source);
                }
                if screen == PRIMARY_SCREEN_NAME {
                    self.state.borrow_mut().primary.set(LATCH_LOGIC, ctx);
                }
                ctx.events.push(EditorEvent::ScreenLoaded { screen: screen.clone() });
            }
            Some(Err(err)) => {
                ctx.reporter
                    .warning(&format!("logic source for screen '{screen}' is unreadable: {err:#}"));
            }
            None => {}
        }
        self.finish_screen(ctx, &screen);
    }

    fn finish_screen(&self, ctx: &mut EditorContext, screen: &str) {
        {
            let mut state = self.state.borrow_mut();
            if let Some(position) = state.loading.iter().position(|loading| loading == screen) {
                state.loading.remove(position);
            }
        }
        self.completion(ctx);
    }

    /// Shared completion callback: progress while screens remain, the
    /// project-loaded wrap-up once every pair has reported and nothing is
    /// mid-flight.
    fn completion(&self, ctx: &mut EditorContext) {
        let mut state = self.state.borrow_mut();
        if state.finished || state.aborted {
            return;
        }
        state.counter += 1;
        if state.loading.is_empty() && state.counter >= state.total {
            state.finished = true;
            let project = state.project;
            let screens = state.total;
            let elapsed_ms = state.time.elapsed_ms();
            drop(state);
            ctx.surface.hide_progress();
            ctx.surface.sort_screens(project);
            ctx.events.push(EditorEvent::ProjectLoaded { screens, elapsed_ms });
        } else {
            let pct = (100 * state.counter / state.total).min(100) as u32;
            let elapsed = state.time.elapsed().as_secs_f64();
            let remaining =
                elapsed / state.counter as f64 * (state.total - state.counter.min(state.total)) as f64;
            let head = state
                .loading
                .front()
                .cloned()
                .or_else(|| state.remaining.front().cloned())
                .unwrap_or_default();
            drop(state);
            let message = format!("Loading {head} ({remaining:.0}s remaining)");
            ctx.surface.set_progress(pct, &message);
            ctx.events.push(EditorEvent::LoadProgress { pct, message });
        }
    }

    fn register_if_paired(&self, ctx: &mut EditorContext, screen: &str) {
        let (project, paired) = {
            let state = self.state.borrow();
            let roster = state.roster.borrow();
            let paired = roster
                .get(screen)
                .map(|set| set.design.is_some() && set.logic.is_some())
                .unwrap_or(false);
            (state.project, paired)
        };
        if paired {
            ctx.surface.register_screen(project, screen);
            ctx.events.push(EditorEvent::ScreenRegistered { screen: screen.to_string() });
        }
    }
}
