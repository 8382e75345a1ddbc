use crate::project::{source_order, SourceId, SourceUnit};
use crate::registry::{ComponentDatabase, ComponentDatabaseListener, ListenerHandle};
use crate::resources::LoadedResource;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// One placed component in a design document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInstance {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub children: Vec<ComponentInstance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    pub screen: String,
    #[serde(default)]
    pub components: Vec<ComponentInstance>,
}

/// Controller for a screen's design resource. Owns the parsed instance tree
/// once loaded; the design surface renders from it elsewhere.
pub struct DesignEditor {
    source: SourceId,
    screen: String,
    document: Option<DesignDocument>,
    dirty: bool,
}

impl DesignEditor {
    pub fn new(screen: impl Into<String>, source: SourceId) -> Self {
        Self { source, screen: screen.into(), document: None, dirty: false }
    }

    pub fn screen(&self) -> &str {
        &self.screen
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn apply_loaded(&mut self, resource: &LoadedResource) -> Result<()> {
        let content = resource.content()?;
        let document: DesignDocument = serde_json::from_str(content)
            .with_context(|| format!("parsing design document '{}'", self.source))?;
        self.document = Some(document);
        self.dirty = false;
        Ok(())
    }

    pub fn component_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(document) = &self.document {
            collect_instances(&document.components, &mut |instance| names.push(instance.name.clone()));
        }
        names
    }

    pub fn component_types(&self) -> BTreeSet<String> {
        let mut types = BTreeSet::new();
        if let Some(document) = &self.document {
            collect_instances(&document.components, &mut |instance| {
                types.insert(instance.type_name.clone());
            });
        }
        types
    }

    /// Drops every instance whose type was removed from the registry.
    /// Returns how many instances were pruned; pruning dirties the editor.
    pub fn drop_removed_types(&mut self, removed: &BTreeSet<&str>) -> usize {
        let Some(document) = self.document.as_mut() else {
            return 0;
        };
        let dropped = prune_instances(&mut document.components, removed);
        if dropped > 0 {
            self.dirty = true;
        }
        dropped
    }
}

fn collect_instances(instances: &[ComponentInstance], visit: &mut impl FnMut(&ComponentInstance)) {
    for instance in instances {
        visit(instance);
        collect_instances(&instance.children, visit);
    }
}

fn prune_instances(instances: &mut Vec<ComponentInstance>, removed: &BTreeSet<&str>) -> usize {
    let before = instances.len();
    instances.retain(|instance| !removed.contains(instance.type_name.as_str()));
    let mut dropped = before - instances.len();
    for instance in instances {
        dropped += prune_instances(&mut instance.children, removed);
    }
    dropped
}

/// Controller for a screen's logic resource. Block content stays opaque to
/// the shell; it is only loaded after the paired design editor resolved,
/// because block metadata depends on the registry state the design load
/// establishes.
pub struct LogicEditor {
    source: SourceId,
    screen: String,
    content: Option<String>,
    dirty: bool,
}

impl LogicEditor {
    pub fn new(screen: impl Into<String>, source: SourceId) -> Self {
        Self { source, screen: screen.into(), content: None, dirty: false }
    }

    pub fn screen(&self) -> &str {
        &self.screen
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn apply_loaded(&mut self, resource: &LoadedResource) -> Result<()> {
        self.content = Some(resource.content()?.to_string());
        self.dirty = false;
        Ok(())
    }
}

/// The paired editors of one screen. A pair may be partial: discovering or
/// removing sources updates one side at a time.
#[derive(Default)]
pub struct EditorSet {
    pub design: Option<DesignEditor>,
    pub logic: Option<LogicEditor>,
    pub design_source: Option<SourceUnit>,
    pub logic_source: Option<SourceUnit>,
}

impl EditorSet {
    pub fn has_both_sources(&self) -> bool {
        self.design_source.is_some() && self.logic_source.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.design.is_none()
            && self.logic.is_none()
            && self.design_source.is_none()
            && self.logic_source.is_none()
    }
}

/// Per-project record of screens and the shared ordered list of open
/// editors. Screen names iterate in lexicographic order, which keeps the
/// deferred secondary load deterministic.
#[derive(Default)]
pub struct EditorRoster {
    screens: BTreeMap<String, EditorSet>,
    open_order: Vec<SourceId>,
}

impl EditorRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, screen: &str) -> &mut EditorSet {
        self.screens.entry(screen.to_string()).or_default()
    }

    pub fn get(&self, screen: &str) -> Option<&EditorSet> {
        self.screens.get(screen)
    }

    pub fn get_mut(&mut self, screen: &str) -> Option<&mut EditorSet> {
        self.screens.get_mut(screen)
    }

    pub fn screen_names(&self) -> Vec<String> {
        self.screens.keys().cloned().collect()
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EditorSet)> {
        self.screens.iter()
    }

    /// Inserts an editor's source id into the shared ordered list at its
    /// comparator position.
    pub fn insert_ordered(&mut self, id: SourceId) {
        if let Err(position) = self.open_order.binary_search_by(|probe| source_order(probe, &id)) {
            self.open_order.insert(position, id);
        }
    }

    pub fn open_order(&self) -> &[SourceId] {
        &self.open_order
    }

    /// Drops a screen's design editor. The record only disappears once the
    /// logic side is gone too; until then the pair degrades to partial.
    pub fn remove_design(&mut self, screen: &str) {
        if let Some(set) = self.screens.get_mut(screen) {
            if let Some(editor) = set.design.take() {
                self.open_order.retain(|id| id != editor.source());
            }
            set.design_source = None;
            if set.is_empty() {
                self.screens.remove(screen);
            }
        }
    }

    pub fn remove_logic(&mut self, screen: &str) {
        if let Some(set) = self.screens.get_mut(screen) {
            if let Some(editor) = set.logic.take() {
                self.open_order.retain(|id| id != editor.source());
            }
            set.logic_source = None;
            if set.is_empty() {
                self.screens.remove(screen);
            }
        }
    }

    pub fn component_instances(&self, screen: &str) -> Vec<String> {
        self.screens
            .get(screen)
            .and_then(|set| set.design.as_ref())
            .map(DesignEditor::component_names)
            .unwrap_or_default()
    }

    pub fn all_component_instances(&self) -> Vec<String> {
        let mut names = Vec::new();
        for set in self.screens.values() {
            if let Some(design) = &set.design {
                names.extend(design.component_names());
            }
        }
        names
    }

    pub fn component_types(&self, screen: &str) -> BTreeSet<String> {
        self.screens
            .get(screen)
            .and_then(|set| set.design.as_ref())
            .map(DesignEditor::component_types)
            .unwrap_or_default()
    }

    pub fn unique_component_types(&self) -> BTreeSet<String> {
        let mut types = BTreeSet::new();
        for set in self.screens.values() {
            if let Some(design) = &set.design {
                types.extend(design.component_types());
            }
        }
        types
    }

    pub fn dirty_sources(&self) -> Vec<SourceId> {
        let mut sources = Vec::new();
        for set in self.screens.values() {
            if let Some(design) = &set.design {
                if design.is_dirty() {
                    sources.push(design.source().clone());
                }
            }
            if let Some(logic) = &set.logic {
                if logic.is_dirty() {
                    sources.push(logic.source().clone());
                }
            }
        }
        sources
    }

    pub fn open_sources(&self) -> Vec<SourceId> {
        let mut sources = Vec::new();
        for set in self.screens.values() {
            if let Some(design) = &set.design {
                sources.push(design.source().clone());
            }
            if let Some(logic) = &set.logic {
                sources.push(logic.source().clone());
            }
        }
        sources
    }
}

impl ComponentDatabaseListener for EditorRoster {
    fn on_types_removed(
        &mut self,
        _database: &ComponentDatabase,
        removed: &BTreeMap<String, SourceId>,
    ) {
        let removed_types: BTreeSet<&str> = removed.keys().map(String::as_str).collect();
        for set in self.screens.values_mut() {
            if let Some(design) = set.design.as_mut() {
                design.drop_removed_types(&removed_types);
            }
        }
    }
}

/// Cloneable handle to the roster so load continuations, the registry
/// listener fanout, and the orchestrator can share one record.
#[derive(Clone, Default)]
pub struct RosterHandle {
    inner: Rc<RefCell<EditorRoster>>,
}

impl RosterHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borrow(&self) -> Ref<'_, EditorRoster> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, EditorRoster> {
        self.inner.borrow_mut()
    }

    /// The roster as a registry listener.
    pub fn listener(&self) -> ListenerHandle {
        self.inner.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(content: &str) -> LoadedResource {
        LoadedResource::new(content)
    }

    #[test]
    fn design_editor_parses_instances_recursively() {
        let mut editor = DesignEditor::new("Main", SourceId::new("src/Main.design"));
        editor
            .apply_loaded(&loaded(
                r#"{
                    "screen": "Main",
                    "components": [
                        {
                            "name": "Panel1",
                            "type": "com.acme.base.Panel",
                            "children": [
                                { "name": "Gauge1", "type": "com.acme.widgets.Gauge" }
                            ]
                        }
                    ]
                }"#,
            ))
            .expect("design document parses");
        assert_eq!(editor.component_names(), vec!["Panel1", "Gauge1"]);
        assert!(editor.component_types().contains("com.acme.widgets.Gauge"));
    }

    #[test]
    fn pruning_removed_types_marks_the_editor_dirty() {
        let mut editor = DesignEditor::new("Main", SourceId::new("src/Main.design"));
        editor
            .apply_loaded(&loaded(
                r#"{
                    "screen": "Main",
                    "components": [
                        { "name": "Gauge1", "type": "com.acme.widgets.Gauge" },
                        { "name": "Label1", "type": "com.acme.base.Label" }
                    ]
                }"#,
            ))
            .expect("design document parses");
        let removed: BTreeSet<&str> = ["com.acme.widgets.Gauge"].into();
        assert_eq!(editor.drop_removed_types(&removed), 1);
        assert!(editor.is_dirty());
        assert_eq!(editor.component_names(), vec!["Label1"]);
    }

    #[test]
    fn partial_pairs_degrade_before_they_disappear() {
        let mut roster = EditorRoster::new();
        {
            let set = roster.get_or_create("Alpha");
            set.design = Some(DesignEditor::new("Alpha", SourceId::new("src/Alpha.design")));
            set.logic = Some(LogicEditor::new("Alpha", SourceId::new("src/Alpha.logic")));
        }
        roster.insert_ordered(SourceId::new("src/Alpha.design"));
        roster.insert_ordered(SourceId::new("src/Alpha.logic"));

        roster.remove_design("Alpha");
        let set = roster.get("Alpha").expect("partial pair survives");
        assert!(set.design.is_none());
        assert!(set.logic.is_some());
        assert_eq!(roster.open_order().len(), 1);

        roster.remove_logic("Alpha");
        assert!(roster.get("Alpha").is_none(), "record disappears once both sides are gone");
        assert!(roster.open_order().is_empty());
    }

    #[test]
    fn ordered_insert_respects_the_comparator() {
        let mut roster = EditorRoster::new();
        for id in ["src/Beta.design", "src/Main.logic", "src/Alpha.design", "src/Main.design"] {
            roster.insert_ordered(SourceId::new(id));
        }
        let order: Vec<&str> = roster.open_order().iter().map(SourceId::as_str).collect();
        assert_eq!(order, vec!["src/Main.design", "src/Main.logic", "src/Alpha.design", "src/Beta.design"]);
    }
}
