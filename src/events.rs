use crate::project::SourceId;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone)]
pub enum EditorEvent {
    TypesAdded { names: Vec<String> },
    TypesRemoved { removed: BTreeMap<String, SourceId> },
    RegistryReset,
    RegistrySettled { expected: usize },
    ScreenRegistered { screen: String },
    ScreenLoaded { screen: String },
    LoadProgress { pct: u32, message: String },
    ProjectLoaded { screens: usize, elapsed_ms: u128 },
    SaveRequested { sources: Vec<SourceId> },
}

impl fmt::Display for EditorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorEvent::TypesAdded { names } => {
                write!(f, "TypesAdded count={} names={}", names.len(), names.join(","))
            }
            EditorEvent::TypesRemoved { removed } => {
                let names: Vec<&str> = removed.keys().map(String::as_str).collect();
                write!(f, "TypesRemoved count={} names={}", removed.len(), names.join(","))
            }
            EditorEvent::RegistryReset => write!(f, "RegistryReset"),
            EditorEvent::RegistrySettled { expected } => {
                write!(f, "RegistrySettled expected={expected}")
            }
            EditorEvent::ScreenRegistered { screen } => write!(f, "ScreenRegistered screen={screen}"),
            EditorEvent::ScreenLoaded { screen } => write!(f, "ScreenLoaded screen={screen}"),
            EditorEvent::LoadProgress { pct, message } => {
                write!(f, "LoadProgress pct={pct} message={message}")
            }
            EditorEvent::ProjectLoaded { screens, elapsed_ms } => {
                write!(f, "ProjectLoaded screens={screens} elapsed_ms={elapsed_ms}")
            }
            EditorEvent::SaveRequested { sources } => {
                let ids: Vec<&str> = sources.iter().map(SourceId::as_str).collect();
                write!(f, "SaveRequested sources={}", ids.join(","))
            }
        }
    }
}

#[derive(Default)]
pub struct EventBus {
    events: Vec<EditorEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<EditorEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
