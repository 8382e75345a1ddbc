use crate::shell::EditorContext;
use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::rc::Rc;

pub type DeferredTask = Box<dyn FnOnce(&mut EditorContext)>;
pub type RepeatingTask = Box<dyn FnMut(&mut EditorContext) -> bool>;

#[derive(Default)]
struct TaskQueue {
    deferred: VecDeque<DeferredTask>,
    repeating: Vec<RepeatingTask>,
}

/// Single-threaded cooperative task queue. All asynchrony in the editor core
/// is continuations scheduled here; one tick is one pass of the event loop.
///
/// Deferred tasks queued before a tick run during it; tasks queued while a
/// tick is running wait for the next one. Repeating tasks run once per tick
/// until they return false.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<TaskQueue>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&self, task: impl FnOnce(&mut EditorContext) + 'static) {
        self.queue.borrow_mut().deferred.push_back(Box::new(task));
    }

    pub fn repeat(&self, task: impl FnMut(&mut EditorContext) -> bool + 'static) {
        self.queue.borrow_mut().repeating.push(Box::new(task));
    }

    pub fn is_idle(&self) -> bool {
        let queue = self.queue.borrow();
        queue.deferred.is_empty() && queue.repeating.is_empty()
    }

    /// Runs one cooperative tick. Returns the number of tasks executed.
    pub fn tick(&self, ctx: &mut EditorContext) -> usize {
        let mut ran = 0;

        let deferred: Vec<DeferredTask> = {
            let mut queue = self.queue.borrow_mut();
            queue.deferred.drain(..).collect()
        };
        for task in deferred {
            task(ctx);
            ran += 1;
        }

        let repeating = {
            let mut queue = self.queue.borrow_mut();
            mem::take(&mut queue.repeating)
        };
        let mut kept = Vec::with_capacity(repeating.len());
        for mut task in repeating {
            if task(ctx) {
                kept.push(task);
            }
            ran += 1;
        }
        {
            // Repeating tasks registered during this tick were pushed onto the
            // queue while ours was taken out; keep the survivors ahead of them.
            let mut queue = self.queue.borrow_mut();
            let registered = mem::take(&mut queue.repeating);
            queue.repeating = kept;
            queue.repeating.extend(registered);
        }
        ran
    }

    /// Ticks until the queue drains or `max_ticks` passes without it doing so.
    pub fn run_until_idle(&self, ctx: &mut EditorContext, max_ticks: usize) -> Result<usize> {
        for tick in 0..max_ticks {
            if self.is_idle() {
                return Ok(tick);
            }
            self.tick(ctx);
        }
        if self.is_idle() {
            Ok(max_ticks)
        } else {
            bail!("scheduler still busy after {max_ticks} ticks")
        }
    }
}
