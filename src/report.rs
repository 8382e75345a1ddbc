use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// User-facing failure surface. Load failures, corrupt descriptors, and
/// vetoed removals all land here rather than being swallowed.
pub trait Reporter {
    fn error(&mut self, message: &str);
    fn warning(&mut self, message: &str);
}

pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn error(&mut self, message: &str) {
        eprintln!("[editor] error: {message}");
    }

    fn warning(&mut self, message: &str) {
        eprintln!("[editor] warning: {message}");
    }
}

#[derive(Debug, Default)]
pub struct ReportLog {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Reporter that records everything it is handed; clones share one log so a
/// test can keep a handle while the editor context owns the reporter.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    log: Rc<RefCell<ReportLog>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Ref<'_, ReportLog> {
        self.log.borrow()
    }

    pub fn errors(&self) -> Vec<String> {
        self.log.borrow().errors.clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.log.borrow().warnings.clone()
    }
}

impl Reporter for RecordingReporter {
    fn error(&mut self, message: &str) {
        self.log.borrow_mut().errors.push(message.to_string());
    }

    fn warning(&mut self, message: &str) {
        self.log.borrow_mut().warnings.push(message.to_string());
    }
}
