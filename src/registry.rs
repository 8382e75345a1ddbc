use crate::descriptor::{package_of, ComponentDescriptor};
use crate::project::SourceId;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

/// Subscriber to registry changes. Listeners receive the database itself so
/// they can read package and source-unit membership while reacting; the
/// database therefore finishes every index update before notifying.
pub trait ComponentDatabaseListener {
    fn on_types_added(&mut self, _database: &ComponentDatabase, _names: &[String]) {}

    /// Pre-removal veto hook. Returning false drops the whole removal.
    fn before_types_removed(&mut self, _database: &ComponentDatabase, _names: &[String]) -> bool {
        true
    }

    fn on_types_removed(
        &mut self,
        _database: &ComponentDatabase,
        _removed: &BTreeMap<String, SourceId>,
    ) {
    }

    fn on_registry_reset(&mut self, _database: &ComponentDatabase) {}
}

pub type ListenerHandle = Rc<RefCell<dyn ComponentDatabaseListener>>;

/// Shared vocabulary of component types for one open project. Explicitly
/// constructed and reset on project switch; never an ambient static.
#[derive(Default)]
pub struct ComponentDatabase {
    descriptors: HashMap<String, ComponentDescriptor>,
    packages: HashMap<String, BTreeSet<String>>,
    unit_types: HashMap<SourceId, BTreeSet<String>>,
    type_units: HashMap<String, SourceId>,
    listeners: Vec<ListenerHandle>,
}

impl ComponentDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: ListenerHandle) {
        if !self.listeners.iter().any(|existing| Rc::ptr_eq(existing, &listener)) {
            self.listeners.push(listener);
        }
    }

    pub fn remove_listener(&mut self, listener: &ListenerHandle) {
        self.listeners.retain(|existing| !Rc::ptr_eq(existing, listener));
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&ComponentDescriptor> {
        self.descriptors.get(type_name)
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.descriptors.contains_key(type_name)
    }

    pub fn type_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    pub fn package_members(&self, package: &str) -> Option<&BTreeSet<String>> {
        self.packages.get(package)
    }

    pub fn source_unit_of(&self, type_name: &str) -> Option<&SourceId> {
        self.type_units.get(type_name)
    }

    pub fn unit_members(&self, unit: &SourceId) -> Option<&BTreeSet<String>> {
        self.unit_types.get(unit)
    }

    /// Merges descriptors declared by `unit` and notifies listeners once with
    /// every affected type name. Re-registering an existing type name is an
    /// upgrade: the descriptor is replaced and the type moves to `unit`.
    pub fn register(&mut self, unit: &SourceId, descriptors: Vec<ComponentDescriptor>) -> Vec<String> {
        let mut touched = Vec::new();
        for descriptor in descriptors {
            let name = descriptor.type_name.clone();
            if let Some(previous_unit) = self.type_units.get(&name).cloned() {
                if previous_unit != *unit {
                    self.drop_from_unit_index(&previous_unit, &name);
                }
            }
            self.packages.entry(package_of(&name).to_string()).or_default().insert(name.clone());
            self.unit_types.entry(unit.clone()).or_default().insert(name.clone());
            self.type_units.insert(name.clone(), unit.clone());
            self.descriptors.insert(name.clone(), descriptor);
            touched.push(name);
        }
        if !touched.is_empty() {
            self.notify_types_added(&touched);
        }
        touched
    }

    /// Removal set aggregation: the union of the requested names with every
    /// type sharing a source unit with any of them, so a source unit is never
    /// left half-removed.
    pub fn expand_removal(&self, requested: &[String]) -> Vec<String> {
        let mut expanded: BTreeSet<String> = requested.iter().cloned().collect();
        for name in requested {
            if let Some(unit) = self.type_units.get(name) {
                if let Some(siblings) = self.unit_types.get(unit) {
                    expanded.extend(siblings.iter().cloned());
                }
            }
        }
        expanded.into_iter().collect()
    }

    /// Polls every listener's veto hook; a single false vetoes the removal.
    /// All listeners are consulted even after a veto.
    pub fn before_types_removed(&self, names: &[String]) -> bool {
        let mut allowed = true;
        for listener in self.listeners.clone() {
            allowed &= listener.borrow_mut().before_types_removed(self, names);
        }
        allowed
    }

    /// Deletes `names` from every index without notifying anyone. Returns the
    /// removed name to source-unit mapping for the aggregated event.
    pub fn commit_removal(&mut self, names: &[String]) -> BTreeMap<String, SourceId> {
        let mut removed = BTreeMap::new();
        for name in names {
            if self.descriptors.remove(name).is_none() {
                continue;
            }
            let package = package_of(name).to_string();
            if let Some(members) = self.packages.get_mut(&package) {
                members.remove(name);
                if members.is_empty() {
                    self.packages.remove(&package);
                }
            }
            if let Some(unit) = self.type_units.remove(name) {
                self.drop_from_unit_index(&unit, name);
                removed.insert(name.clone(), unit);
            }
        }
        removed
    }

    pub fn notify_types_removed(&self, removed: &BTreeMap<String, SourceId>) {
        for listener in self.listeners.clone() {
            listener.borrow_mut().on_types_removed(self, removed);
        }
    }

    /// Clears every type and index and tells listeners to drop their views.
    /// Listener registrations survive the reset.
    pub fn reset(&mut self) {
        self.descriptors.clear();
        self.packages.clear();
        self.unit_types.clear();
        self.type_units.clear();
        for listener in self.listeners.clone() {
            listener.borrow_mut().on_registry_reset(self);
        }
    }

    fn notify_types_added(&self, names: &[String]) {
        for listener in self.listeners.clone() {
            listener.borrow_mut().on_types_added(self, names);
        }
    }

    fn drop_from_unit_index(&mut self, unit: &SourceId, name: &str) {
        if let Some(members) = self.unit_types.get_mut(unit) {
            members.remove(name);
            if members.is_empty() {
                self.unit_types.remove(unit);
            }
        }
    }
}
