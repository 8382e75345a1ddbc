use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// The screen that must be loaded before any other and that the display
/// surface switches to once it is showable.
pub const PRIMARY_SCREEN_NAME: &str = "Main";

pub const DESIGN_SUFFIX: &str = ".design";
pub const LOGIC_SUFFIX: &str = ".logic";
pub const SCREENS_FOLDER: &str = "src";
pub const EXTENSIONS_FOLDER: &str = "assets/extensions";
pub const DESCRIPTOR_FILE_NAME: &str = "components.json";

pub type ProjectId = Uuid;

/// Project-relative path of a source unit, e.g. `src/Main.design` or
/// `assets/extensions/com.acme.widgets/components.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The id with its file-type suffix stripped, used for ordering ties.
    pub fn without_suffix(&self) -> &str {
        match self.0.rfind('.') {
            Some(pos) if pos > self.0.rfind('/').map_or(0, |s| s + 1) => &self.0[..pos],
            _ => &self.0,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Discriminant tag assigned when a project is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Design,
    Logic,
    Descriptor,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub id: SourceId,
    pub kind: SourceKind,
}

impl SourceUnit {
    pub fn classify(id: impl Into<SourceId>) -> Self {
        let id = id.into();
        let kind = if id.as_str().ends_with(DESIGN_SUFFIX) {
            SourceKind::Design
        } else if id.as_str().ends_with(LOGIC_SUFFIX) {
            SourceKind::Logic
        } else if id.file_name() == DESCRIPTOR_FILE_NAME {
            SourceKind::Descriptor
        } else {
            SourceKind::Other
        };
        Self { id, kind }
    }

    /// Screen name for design and logic sources: the file stem.
    pub fn screen_name(&self) -> Option<&str> {
        match self.kind {
            SourceKind::Design => self.id.file_name().strip_suffix(DESIGN_SUFFIX),
            SourceKind::Logic => self.id.file_name().strip_suffix(LOGIC_SUFFIX),
            _ => None,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.screen_name() == Some(PRIMARY_SCREEN_NAME)
    }
}

pub fn design_source_id(screen: &str) -> SourceId {
    SourceId::new(format!("{SCREENS_FOLDER}/{screen}{DESIGN_SUFFIX}"))
}

pub fn logic_source_id(screen: &str) -> SourceId {
    SourceId::new(format!("{SCREENS_FOLDER}/{screen}{LOGIC_SUFFIX}"))
}

fn screen_of(id: &SourceId) -> &str {
    let name = id.file_name();
    name.strip_suffix(DESIGN_SUFFIX)
        .or_else(|| name.strip_suffix(LOGIC_SUFFIX))
        .unwrap_or(name)
}

fn is_primary_id(id: &SourceId) -> bool {
    screen_of(id) == PRIMARY_SCREEN_NAME
}

/// Ordering for the shared open-editor list. The primary screen's sources
/// sort first; on an is-primary tie the design source precedes the logic
/// source; otherwise ids compare lexicographically with their file-type
/// suffix stripped, with design-before-logic breaking exact ties.
pub fn source_order(a: &SourceId, b: &SourceId) -> Ordering {
    let a_design = a.as_str().ends_with(DESIGN_SUFFIX);
    let b_design = b.as_str().ends_with(DESIGN_SUFFIX);
    let design_first = || match (a_design, b_design) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    };
    match (is_primary_id(a), is_primary_id(b)) {
        (true, true) => design_first(),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => match a.without_suffix().cmp(b.without_suffix()) {
            Ordering::Equal => design_first(),
            other => other,
        },
    }
}

/// Enumeration of a project's source units, built by the host (or scanned
/// from a directory) before the load orchestrator runs.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub id: ProjectId,
    pub name: String,
    pub sources: Vec<SourceUnit>,
}

impl ProjectLayout {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), sources: Vec::new() }
    }

    pub fn with_sources(name: impl Into<String>, ids: &[&str]) -> Self {
        let mut layout = Self::new(name);
        for id in ids {
            layout.sources.push(SourceUnit::classify(*id));
        }
        layout
    }

    pub fn push(&mut self, id: impl Into<SourceId>) {
        self.sources.push(SourceUnit::classify(id.into()));
    }

    pub fn descriptor_sources(&self) -> Vec<SourceUnit> {
        self.sources.iter().filter(|unit| unit.kind == SourceKind::Descriptor).cloned().collect()
    }

    /// Walks `src/` and `assets/extensions/` under `root` and classifies
    /// everything found there.
    pub fn scan_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());
        let mut layout = Self::new(name);

        let screens_dir = root.join(SCREENS_FOLDER);
        let entries = fs::read_dir(&screens_dir)
            .with_context(|| format!("reading project sources in '{}'", screens_dir.display()))?;
        let mut screen_ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                screen_ids.push(format!("{SCREENS_FOLDER}/{}", entry.file_name().to_string_lossy()));
            }
        }
        screen_ids.sort();
        for id in screen_ids {
            layout.push(id.as_str());
        }

        let extensions_dir = root.join(EXTENSIONS_FOLDER);
        if extensions_dir.is_dir() {
            let mut unit_dirs = Vec::new();
            for entry in fs::read_dir(&extensions_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    unit_dirs.push(entry.file_name().to_string_lossy().to_string());
                }
            }
            unit_dirs.sort();
            for unit in unit_dirs {
                let descriptor = extensions_dir.join(&unit).join(DESCRIPTOR_FILE_NAME);
                if descriptor.is_file() {
                    layout.push(format!("{EXTENSIONS_FOLDER}/{unit}/{DESCRIPTOR_FILE_NAME}").as_str());
                }
            }
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SourceId {
        SourceId::new(s)
    }

    #[test]
    fn classifies_sources_by_suffix() {
        assert_eq!(SourceUnit::classify("src/Main.design").kind, SourceKind::Design);
        assert_eq!(SourceUnit::classify("src/Main.logic").kind, SourceKind::Logic);
        assert_eq!(
            SourceUnit::classify("assets/extensions/com.acme.widgets/components.json").kind,
            SourceKind::Descriptor
        );
        assert_eq!(SourceUnit::classify("assets/images/logo.png").kind, SourceKind::Other);
    }

    #[test]
    fn screen_name_is_the_file_stem() {
        let unit = SourceUnit::classify("src/Checkout.design");
        assert_eq!(unit.screen_name(), Some("Checkout"));
        assert!(!unit.is_primary());
        assert!(SourceUnit::classify("src/Main.logic").is_primary());
    }

    #[test]
    fn primary_screen_sorts_first() {
        assert_eq!(source_order(&id("src/Main.design"), &id("src/Alpha.design")), Ordering::Less);
        assert_eq!(source_order(&id("src/Alpha.logic"), &id("src/Main.logic")), Ordering::Greater);
    }

    #[test]
    fn design_precedes_logic_within_a_screen() {
        assert_eq!(source_order(&id("src/Main.design"), &id("src/Main.logic")), Ordering::Less);
        assert_eq!(source_order(&id("src/Beta.logic"), &id("src/Beta.design")), Ordering::Greater);
        assert_eq!(source_order(&id("src/Beta.logic"), &id("src/Beta.logic")), Ordering::Equal);
    }

    #[test]
    fn non_primary_screens_compare_without_suffix() {
        assert_eq!(source_order(&id("src/Alpha.logic"), &id("src/Beta.design")), Ordering::Less);
        assert_eq!(source_order(&id("src/Beta.design"), &id("src/Alpha.logic")), Ordering::Greater);
    }

    #[test]
    fn full_project_sorts_into_pair_order() {
        let mut ids = vec![
            id("src/Beta.logic"),
            id("src/Main.logic"),
            id("src/Alpha.design"),
            id("src/Beta.design"),
            id("src/Main.design"),
            id("src/Alpha.logic"),
        ];
        ids.sort_by(source_order);
        let order: Vec<&str> = ids.iter().map(SourceId::as_str).collect();
        assert_eq!(
            order,
            vec![
                "src/Main.design",
                "src/Main.logic",
                "src/Alpha.design",
                "src/Alpha.logic",
                "src/Beta.design",
                "src/Beta.logic",
            ]
        );
    }
}
