use crate::schedule::DeferredTask;
use crate::shell::EditorContext;

/// A monotonic set of named flags with a callback that fires exactly once,
/// when the last flag is raised. The paired design/logic/registration events
/// of a screen can complete in any order; the latch replaces per-call-site
/// readiness checks with a single registration.
pub struct Latch {
    flags: Vec<(&'static str, bool)>,
    on_all_set: Option<DeferredTask>,
    fired: bool,
}

impl Latch {
    pub fn new(names: &[&'static str]) -> Self {
        Self {
            flags: names.iter().map(|name| (*name, false)).collect(),
            on_all_set: None,
            fired: false,
        }
    }

    pub fn on_all_set(&mut self, callback: impl FnOnce(&mut EditorContext) + 'static) {
        self.on_all_set = Some(Box::new(callback));
    }

    /// Raises `name`. Raising an already-set flag is a no-op; flags never
    /// reset within a session.
    pub fn set(&mut self, name: &str, ctx: &mut EditorContext) {
        let flag = self
            .flags
            .iter_mut()
            .find(|(flag, _)| *flag == name)
            .unwrap_or_else(|| panic!("unknown latch flag '{name}'"));
        flag.1 = true;
        if self.all_set() && !self.fired {
            self.fired = true;
            if let Some(callback) = self.on_all_set.take() {
                callback(ctx);
            }
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.flags.iter().any(|(flag, set)| *flag == name && *set)
    }

    pub fn all_set(&self) -> bool {
        self.flags.iter().all(|(_, set)| *set)
    }

    pub fn fired(&self) -> bool {
        self.fired
    }
}
