use std::cell::Cell;
use std::rc::Rc;

/// One of the two project-load prerequisites. The bundle's content is
/// external; the orchestrator only polls readiness.
pub trait TranslationBundle {
    fn is_loaded(&self) -> bool;
}

/// Shared readiness flag; clones observe the same state, so a host can keep
/// a handle and flip it while the editor context owns the bundle.
#[derive(Clone)]
pub struct TranslationFlag {
    loaded: Rc<Cell<bool>>,
}

impl TranslationFlag {
    pub fn loaded() -> Self {
        Self { loaded: Rc::new(Cell::new(true)) }
    }

    pub fn pending() -> Self {
        Self { loaded: Rc::new(Cell::new(false)) }
    }

    pub fn mark_loaded(&self) {
        self.loaded.set(true);
    }
}

impl TranslationBundle for TranslationFlag {
    fn is_loaded(&self) -> bool {
        self.loaded.get()
    }
}
