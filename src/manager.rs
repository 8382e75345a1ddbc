use crate::events::EditorEvent;
use crate::project::SourceId;
use crate::schedule::Scheduler;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Auto-save batching. Sources scheduled within one tick are flushed as one
/// deferred save request; persistence itself happens behind the emitted
/// event, outside the editor core.
#[derive(Clone)]
pub struct EditorManager {
    scheduler: Scheduler,
    enabled: bool,
    pending: Rc<RefCell<BTreeSet<SourceId>>>,
    flush_scheduled: Rc<Cell<bool>>,
}

impl EditorManager {
    pub fn new(scheduler: Scheduler, enabled: bool) -> Self {
        Self {
            scheduler,
            enabled,
            pending: Rc::new(RefCell::new(BTreeSet::new())),
            flush_scheduled: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn schedule_auto_save(&self, source: SourceId) {
        if !self.enabled {
            return;
        }
        self.pending.borrow_mut().insert(source);
        if self.flush_scheduled.get() {
            return;
        }
        self.flush_scheduled.set(true);
        let pending = self.pending.clone();
        let flush_scheduled = self.flush_scheduled.clone();
        self.scheduler.defer(move |ctx| {
            flush_scheduled.set(false);
            let sources: Vec<SourceId> = {
                let mut pending = pending.borrow_mut();
                let drained = pending.iter().cloned().collect();
                pending.clear();
                drained
            };
            if !sources.is_empty() {
                ctx.events.push(EditorEvent::SaveRequested { sources });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::EditorContext;

    #[test]
    fn batches_one_save_request_per_tick() {
        let scheduler = Scheduler::new();
        let mut ctx = EditorContext::for_tests(scheduler.clone());
        let manager = EditorManager::new(scheduler.clone(), true);
        manager.schedule_auto_save(SourceId::new("src/Main.design"));
        manager.schedule_auto_save(SourceId::new("src/Main.logic"));
        manager.schedule_auto_save(SourceId::new("src/Main.design"));
        scheduler.tick(&mut ctx);
        let events = ctx.events.drain();
        assert_eq!(events.len(), 1, "one batched request expected");
        match &events[0] {
            EditorEvent::SaveRequested { sources } => {
                assert_eq!(
                    sources,
                    &vec![SourceId::new("src/Main.design"), SourceId::new("src/Main.logic")]
                );
            }
            other => panic!("expected SaveRequested, got {other}"),
        }
    }

    #[test]
    fn disabled_manager_schedules_nothing() {
        let scheduler = Scheduler::new();
        let mut ctx = EditorContext::for_tests(scheduler.clone());
        let manager = EditorManager::new(scheduler.clone(), false);
        manager.schedule_auto_save(SourceId::new("src/Main.design"));
        scheduler.tick(&mut ctx);
        assert!(ctx.events.drain().is_empty());
        assert_eq!(manager.pending_count(), 0);
    }
}
