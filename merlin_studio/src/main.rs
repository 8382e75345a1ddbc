use anyhow::{anyhow, Context, Result};
use merlin_editor::cli::CliArgs;
use merlin_editor::config::ShellConfig;
use merlin_editor::display::{DisplaySurface, ScreenView};
use merlin_editor::i18n::TranslationFlag;
use merlin_editor::project::{ProjectId, ProjectLayout};
use merlin_editor::report::ConsoleReporter;
use merlin_editor::resources::DirResourceStore;
use merlin_editor::schedule::Scheduler;
use merlin_editor::{EditorContext, ProjectShell};
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

fn main() {
    let args = match CliArgs::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(args) {
        eprintln!("Studio error: {err:?}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let project_root = resolve_project_root(&args)?;
    let mut config = ShellConfig::load_or_default("config/editor.json");
    config.apply_overrides(&args.into_config_overrides());

    let layout = ProjectLayout::scan_dir(&project_root)
        .with_context(|| format!("scanning project '{}'", project_root.display()))?;
    println!("[project] Opening {} ({} sources)", layout.name, layout.sources.len());

    let scheduler = Scheduler::new();
    let store = DirResourceStore::new(&project_root, scheduler.clone());
    let ctx = EditorContext::new(
        scheduler,
        Rc::new(store),
        Box::new(ConsoleSurface::default()),
        Box::new(ConsoleReporter),
        Box::new(TranslationFlag::loaded()),
        config.autosave.enabled,
    );
    let mut shell = ProjectShell::new(layout, ctx);
    shell.open_project();

    let mut ticks = 0usize;
    while !shell.is_loaded() && !shell.is_aborted() {
        if ticks >= config.load.max_ticks {
            return Err(anyhow!("project load stalled after {ticks} ticks"));
        }
        shell.tick();
        for event in shell.drain_events() {
            println!("[event] {event}");
        }
        ticks += 1;
        thread::sleep(Duration::from_millis(config.load.tick_interval_ms));
    }
    for event in shell.drain_events() {
        println!("[event] {event}");
    }

    if shell.is_aborted() {
        return Err(anyhow!("project '{}' failed to load", shell.project_name()));
    }
    let order = shell.roster().borrow().open_order().to_vec();
    println!("[project] Loaded {} editors:", order.len());
    for id in order {
        println!("  {id}");
    }
    let types = shell.unique_component_types();
    if !types.is_empty() {
        println!("[project] Component types in use: {}", types.len());
    }
    Ok(())
}

fn resolve_project_root(args: &CliArgs) -> Result<PathBuf> {
    if let Some(path) = args.project() {
        return Ok(path.clone());
    }
    if let Ok(env_path) = env::var("MERLIN_PROJECT") {
        return Ok(PathBuf::from(env_path));
    }
    Err(anyhow!("No project given. Pass --project <dir> or set MERLIN_PROJECT."))
}

/// Terminal stand-in for the design surface: screen bookkeeping becomes log
/// lines, progress becomes a status line.
#[derive(Default)]
struct ConsoleSurface {
    screens: Vec<String>,
}

impl DisplaySurface for ConsoleSurface {
    fn register_screen(&mut self, _project: ProjectId, screen: &str) {
        if !self.screens.iter().any(|known| known == screen) {
            self.screens.push(screen.to_string());
        }
        println!("[surface] screen registered: {screen}");
    }

    fn switch_to_screen(&mut self, _project: ProjectId, screen: &str, view: ScreenView) {
        println!("[surface] switched to {screen} ({view:?} view)");
    }

    fn remove_screen(&mut self, _project: ProjectId, screen: &str) {
        self.screens.retain(|known| known != screen);
        println!("[surface] screen removed: {screen}");
    }

    fn sort_screens(&mut self, _project: ProjectId) {
        self.screens.sort();
    }

    fn set_progress(&mut self, pct: u32, message: &str) {
        println!("[progress] {pct:>3}% {message}");
    }

    fn hide_progress(&mut self) {
        println!("[progress] done");
    }
}
