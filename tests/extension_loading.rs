use merlin_editor::display::RecordingSurface;
use merlin_editor::events::EditorEvent;
use merlin_editor::i18n::TranslationFlag;
use merlin_editor::project::{ProjectLayout, SourceUnit};
use merlin_editor::report::RecordingReporter;
use merlin_editor::resources::MemoryResourceStore;
use merlin_editor::schedule::Scheduler;
use merlin_editor::{EditorContext, ProjectShell};
use std::rc::Rc;

struct Harness {
    shell: ProjectShell,
    store: MemoryResourceStore,
    reporter: RecordingReporter,
}

fn design_doc(screen: &str) -> String {
    format!(r#"{{ "screen": "{screen}", "components": [] }}"#)
}

fn descriptor_id(unit: &str) -> String {
    format!("assets/extensions/{unit}/components.json")
}

fn widgets_descriptor() -> &'static str {
    r#"[
        { "type": "com.acme.widgets.Gauge", "name": "Gauge", "version": 1 },
        { "type": "com.acme.widgets.Dial", "name": "Dial", "version": 1 }
    ]"#
}

fn open_shell(extension_units: &[&str], seed: impl FnOnce(&MemoryResourceStore)) -> Harness {
    let mut ids = vec!["src/Main.design".to_string(), "src/Main.logic".to_string()];
    for unit in extension_units {
        ids.push(descriptor_id(unit));
    }
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let layout = ProjectLayout::with_sources("demo", &refs);

    let scheduler = Scheduler::new();
    let store = MemoryResourceStore::new(scheduler.clone());
    store.insert("src/Main.design", design_doc("Main"));
    store.insert("src/Main.logic", "blocks for Main");
    seed(&store);
    let reporter = RecordingReporter::new();
    let ctx = EditorContext::new(
        scheduler,
        Rc::new(store.clone()),
        Box::new(RecordingSurface::new()),
        Box::new(reporter.clone()),
        Box::new(TranslationFlag::loaded()),
        true,
    );
    let mut shell = ProjectShell::new(layout, ctx);
    shell.open_project();
    Harness { shell, store, reporter }
}

fn drive(harness: &mut Harness, max_rounds: usize) {
    for _ in 0..max_rounds {
        harness.shell.tick();
        harness.store.deliver_all();
        if harness.shell.is_loaded() || harness.shell.is_aborted() {
            harness.shell.tick();
            harness.shell.tick();
            return;
        }
    }
    panic!("load did not settle within {max_rounds} rounds");
}

fn settled_events(events: &[EditorEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            EditorEvent::RegistrySettled { expected } => Some(*expected),
            _ => None,
        })
        .collect()
}

#[test]
fn zero_descriptor_sources_settle_vacuously() {
    let mut harness = open_shell(&[], |_store| {});
    assert!(harness.shell.extensions().settled(), "nothing expected means settled immediately");
    assert_eq!(harness.shell.extensions().expected(), 0);
    let events = harness.shell.drain_events();
    assert_eq!(settled_events(&events), vec![0]);
    drive(&mut harness, 30);
    assert!(harness.shell.is_loaded());
}

#[test]
fn descriptor_documents_merge_into_the_registry() {
    let mut harness = open_shell(&["com.acme.widgets", "com.solo.beacon"], |store| {
        store.insert(descriptor_id("com.acme.widgets").as_str(), widgets_descriptor());
        // A document describing a single type rather than a list.
        store.insert(
            descriptor_id("com.solo.beacon").as_str(),
            r#"{ "type": "com.solo.beacon.Beacon", "name": "Beacon", "version": 4 }"#,
        );
    });
    drive(&mut harness, 30);

    let database = &harness.shell.ctx().database;
    assert_eq!(database.type_count(), 3);
    assert!(database.has_type("com.acme.widgets.Gauge"));
    assert!(database.has_type("com.solo.beacon.Beacon"));
    assert_eq!(
        database.package_members("com.acme.widgets").map(|members| members.len()),
        Some(2),
        "types group by the package before their final separator"
    );
    assert_eq!(
        harness.shell.extensions().external_packages(),
        vec!["com.acme.widgets".to_string(), "com.solo.beacon".to_string()]
    );
    assert_eq!(harness.shell.extensions().completed(), 2);
    assert!(harness.shell.extensions().settled());
}

#[test]
fn corrupt_descriptor_counts_toward_settlement_in_any_order() {
    for corrupt_first in [true, false] {
        let mut harness = open_shell(
            &["com.acme.widgets", "com.broken.pack", "com.solo.beacon"],
            |store| {
                store.insert(descriptor_id("com.acme.widgets").as_str(), widgets_descriptor());
                store.insert(descriptor_id("com.broken.pack").as_str(), "{ not json at all");
                store.insert(
                    descriptor_id("com.solo.beacon").as_str(),
                    r#"{ "type": "com.solo.beacon.Beacon", "name": "Beacon" }"#,
                );
            },
        );

        harness.shell.tick();
        let broken = descriptor_id("com.broken.pack");
        if corrupt_first {
            harness.store.deliver(broken.as_str());
        }
        drive(&mut harness, 30);

        assert!(harness.shell.extensions().settled(), "corrupt descriptor must not block settlement");
        assert_eq!(harness.shell.extensions().completed(), 3);
        assert_eq!(harness.shell.ctx().database.type_count(), 3, "good descriptors still contribute");
        let errors = harness.reporter.errors();
        assert!(
            errors.iter().any(|error| error.contains("com.broken.pack") && error.contains("corrupted")),
            "error should name the corrupted package (corrupt_first={corrupt_first}): {errors:?}"
        );
        assert!(harness.shell.is_loaded(), "project still loads");
    }
}

#[test]
fn project_level_descriptor_gets_the_generic_message() {
    // Two segments only, so the package-scoped wording does not apply.
    let layout = ProjectLayout::with_sources(
        "demo",
        &["src/Main.design", "src/Main.logic", "assets/components.json"],
    );
    let scheduler = Scheduler::new();
    let store = MemoryResourceStore::new(scheduler.clone());
    store.insert("src/Main.design", design_doc("Main"));
    store.insert("src/Main.logic", "blocks for Main");
    store.insert("assets/components.json", "broken");
    let reporter = RecordingReporter::new();
    let ctx = EditorContext::new(
        scheduler,
        Rc::new(store.clone()),
        Box::new(RecordingSurface::new()),
        Box::new(reporter.clone()),
        Box::new(TranslationFlag::loaded()),
        true,
    );
    let mut shell = ProjectShell::new(layout, ctx);
    shell.open_project();
    let mut harness = Harness { shell, store, reporter };
    drive(&mut harness, 30);

    let errors = harness.reporter.errors();
    assert!(
        errors.iter().any(|error| error.contains("invalid component descriptor")),
        "generic wording expected for project-level descriptors: {errors:?}"
    );
    assert!(harness.shell.extensions().settled());
}

#[test]
fn checksum_failure_is_reported_and_still_counts() {
    let mut harness = open_shell(&["com.acme.widgets"], |store| {
        store.insert(descriptor_id("com.acme.widgets").as_str(), widgets_descriptor());
        store.mark_corrupt(descriptor_id("com.acme.widgets").as_str());
    });
    drive(&mut harness, 30);

    assert!(harness.shell.extensions().settled());
    assert_eq!(harness.shell.ctx().database.type_count(), 0, "corrupted payload contributes no types");
    let errors = harness.reporter.errors();
    assert!(
        errors.iter().any(|error| error.contains("failed to load extension descriptor")),
        "transport corruption is user-visible: {errors:?}"
    );
    assert!(harness.shell.is_loaded());
}

#[test]
fn settlement_fires_exactly_once() {
    let mut harness = open_shell(&["com.acme.widgets", "com.solo.beacon"], |store| {
        store.insert(descriptor_id("com.acme.widgets").as_str(), widgets_descriptor());
        store.insert(
            descriptor_id("com.solo.beacon").as_str(),
            r#"{ "type": "com.solo.beacon.Beacon", "name": "Beacon" }"#,
        );
    });
    let mut events = harness.shell.drain_events();
    drive(&mut harness, 30);
    events.extend(harness.shell.drain_events());
    assert_eq!(settled_events(&events), vec![2], "one settlement per load cycle");
}

#[test]
fn reimporting_a_package_is_an_upgrade_that_forces_a_save() {
    let mut harness = open_shell(&["com.acme.widgets"], |store| {
        store.insert(descriptor_id("com.acme.widgets").as_str(), widgets_descriptor());
    });
    drive(&mut harness, 30);
    assert!(harness.shell.is_loaded());
    harness.shell.drain_events();

    // The same package arrives again from a fresh import, with bumped
    // descriptor versions.
    let reimport = descriptor_id("com.acme.widgets.v2");
    harness.store.insert(
        reimport.as_str(),
        r#"[ { "type": "com.acme.widgets.Gauge", "name": "Gauge", "version": 2 } ]"#,
    );
    let unit = SourceUnit::classify(reimport.as_str());
    harness.shell.source_added(&unit);
    harness.store.deliver_all();
    harness.shell.tick();
    harness.shell.tick();

    let database = &harness.shell.ctx().database;
    assert_eq!(
        database.descriptor("com.acme.widgets.Gauge").map(|descriptor| descriptor.version),
        Some(2),
        "second registration upgrades the descriptor"
    );
    assert_eq!(database.type_count(), 2, "upgrade adds no duplicate type");

    let events = harness.shell.drain_events();
    let saved = events.iter().find_map(|event| match event {
        EditorEvent::SaveRequested { sources } => Some(sources.clone()),
        _ => None,
    });
    let saved = saved.expect("upgrade must force a project save");
    assert!(
        saved.iter().any(|id| id.as_str() == "src/Main.design"),
        "every open editor is scheduled conservatively: {saved:?}"
    );
}
