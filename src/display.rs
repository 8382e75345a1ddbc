use crate::project::ProjectId;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenView {
    Design,
    Logic,
}

/// The screen toolbar / progress indicator seam. The editor core never
/// composes UI; it drives whatever surface the host registered.
pub trait DisplaySurface {
    fn register_screen(&mut self, project: ProjectId, screen: &str);
    fn switch_to_screen(&mut self, project: ProjectId, screen: &str, view: ScreenView);
    fn remove_screen(&mut self, project: ProjectId, screen: &str);
    fn sort_screens(&mut self, project: ProjectId);
    fn set_progress(&mut self, pct: u32, message: &str);
    fn hide_progress(&mut self);
}

pub struct NullSurface;

impl DisplaySurface for NullSurface {
    fn register_screen(&mut self, _project: ProjectId, _screen: &str) {}
    fn switch_to_screen(&mut self, _project: ProjectId, _screen: &str, _view: ScreenView) {}
    fn remove_screen(&mut self, _project: ProjectId, _screen: &str) {}
    fn sort_screens(&mut self, _project: ProjectId) {}
    fn set_progress(&mut self, _pct: u32, _message: &str) {}
    fn hide_progress(&mut self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceAction {
    Registered(String),
    SwitchedTo(String, ScreenView),
    Removed(String),
    Sorted,
    Progress(u32, String),
    ProgressHidden,
}

/// Surface that records every call; clones share the action log.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    actions: Rc<RefCell<Vec<SurfaceAction>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<SurfaceAction> {
        self.actions.borrow().clone()
    }

    pub fn switches(&self) -> Vec<(String, ScreenView)> {
        self.actions
            .borrow()
            .iter()
            .filter_map(|action| match action {
                SurfaceAction::SwitchedTo(screen, view) => Some((screen.clone(), *view)),
                _ => None,
            })
            .collect()
    }

    pub fn registered_screens(&self) -> Vec<String> {
        self.actions
            .borrow()
            .iter()
            .filter_map(|action| match action {
                SurfaceAction::Registered(screen) => Some(screen.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySurface for RecordingSurface {
    fn register_screen(&mut self, _project: ProjectId, screen: &str) {
        self.actions.borrow_mut().push(SurfaceAction::Registered(screen.to_string()));
    }

    fn switch_to_screen(&mut self, _project: ProjectId, screen: &str, view: ScreenView) {
        self.actions.borrow_mut().push(SurfaceAction::SwitchedTo(screen.to_string(), view));
    }

    fn remove_screen(&mut self, _project: ProjectId, screen: &str) {
        self.actions.borrow_mut().push(SurfaceAction::Removed(screen.to_string()));
    }

    fn sort_screens(&mut self, _project: ProjectId) {
        self.actions.borrow_mut().push(SurfaceAction::Sorted);
    }

    fn set_progress(&mut self, pct: u32, message: &str) {
        self.actions.borrow_mut().push(SurfaceAction::Progress(pct, message.to_string()));
    }

    fn hide_progress(&mut self) {
        self.actions.borrow_mut().push(SurfaceAction::ProgressHidden);
    }
}
