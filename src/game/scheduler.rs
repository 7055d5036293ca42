use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    Settle,
    Tick,
    Revert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerEvent {
    pub round: u64,
    pub kind: TimerKind,
}

pub trait Scheduler {
    fn schedule_once(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle;
    fn schedule_repeating(&mut self, interval: Duration, event: TimerEvent) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

struct VirtualEntry {
    handle: TimerHandle,
    due: Duration,
    every: Option<Duration>,
    event: TimerEvent,
}

#[derive(Default)]
pub struct VirtualScheduler {
    now: Duration,
    next_id: u64,
    entries: Vec<VirtualEntry>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    fn push(&mut self, due: Duration, every: Option<Duration>, event: TimerEvent) -> TimerHandle {
        self.next_id = self.next_id.wrapping_add(1);
        let handle = TimerHandle(self.next_id);
        self.entries.push(VirtualEntry {
            handle,
            due,
            every,
            event,
        });
        handle
    }

    // Pops the earliest timer due at or before `deadline`, moving the clock to
    // its due time. Ties fire in scheduling order.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<TimerEvent> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= deadline)
            .min_by_key(|(_, e)| (e.due, e.handle))
            .map(|(idx, _)| idx)?;

        let (due, every, event) = {
            let entry = &self.entries[idx];
            (entry.due, entry.every, entry.event)
        };
        self.now = self.now.max(due);
        match every {
            Some(every) => self.entries[idx].due = due + every,
            None => {
                self.entries.remove(idx);
            }
        }
        Some(event)
    }

    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_once(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let due = self.now + delay;
        self.push(due, None, event)
    }

    fn schedule_repeating(&mut self, interval: Duration, event: TimerEvent) -> TimerHandle {
        let interval = interval.max(Duration::from_millis(1));
        let due = self.now + interval;
        self.push(due, Some(interval), event)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.entries.retain(|e| e.handle != handle);
    }
}

pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerEvent>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler {
            tx,
            tasks: HashMap::new(),
            next_id: 0,
        };
        (scheduler, rx)
    }

    fn track(&mut self, task: JoinHandle<()>) -> TimerHandle {
        self.tasks.retain(|_, t| !t.is_finished());
        self.next_id = self.next_id.wrapping_add(1);
        let handle = TimerHandle(self.next_id);
        self.tasks.insert(handle, task);
        handle
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        });
        self.track(task)
    }

    fn schedule_repeating(&mut self, interval: Duration, event: TimerEvent) -> TimerHandle {
        let tx = self.tx.clone();
        let interval = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
        self.track(task)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

#[cfg(feature = "glib")]
pub use glib_scheduler::GlibScheduler;

#[cfg(feature = "glib")]
mod glib_scheduler {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    use super::{Scheduler, TimerEvent, TimerHandle};

    type Sources = Rc<RefCell<HashMap<TimerHandle, glib::SourceId>>>;

    pub struct GlibScheduler {
        dispatch: Rc<dyn Fn(TimerEvent)>,
        sources: Sources,
        next_id: u64,
    }

    impl GlibScheduler {
        pub fn new(dispatch: impl Fn(TimerEvent) + 'static) -> Self {
            GlibScheduler {
                dispatch: Rc::new(dispatch),
                sources: Rc::new(RefCell::new(HashMap::new())),
                next_id: 0,
            }
        }

        fn next_handle(&mut self) -> TimerHandle {
            self.next_id = self.next_id.wrapping_add(1);
            TimerHandle(self.next_id)
        }
    }

    impl Scheduler for GlibScheduler {
        fn schedule_once(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
            let handle = self.next_handle();
            let sources = self.sources.clone();
            let dispatch = self.dispatch.clone();
            let id = glib::timeout_add_local_once(delay, move || {
                // The source is gone once this runs; forget it before dispatching.
                sources.borrow_mut().remove(&handle);
                dispatch(event);
            });
            self.sources.borrow_mut().insert(handle, id);
            handle
        }

        fn schedule_repeating(&mut self, interval: Duration, event: TimerEvent) -> TimerHandle {
            let handle = self.next_handle();
            let dispatch = self.dispatch.clone();
            let id = glib::timeout_add_local(interval, move || {
                dispatch(event);
                glib::ControlFlow::Continue
            });
            self.sources.borrow_mut().insert(handle, id);
            handle
        }

        fn cancel(&mut self, handle: TimerHandle) {
            let source = self.sources.borrow_mut().remove(&handle);
            if let Some(source) = source {
                source.remove();
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(round: u64, kind: TimerKind) -> TimerEvent {
        TimerEvent { round, kind }
    }

    #[test]
    fn virtual_timers_fire_in_due_order() {
        let mut sched = VirtualScheduler::new();
        sched.schedule_once(Duration::from_millis(1000), ev(1, TimerKind::Revert));
        sched.schedule_repeating(Duration::from_millis(400), ev(1, TimerKind::Tick));

        let deadline = Duration::from_millis(1000);
        let mut fired = Vec::new();
        while let Some(e) = sched.pop_due(deadline) {
            fired.push((sched.now().as_millis(), e.kind));
        }
        assert_eq!(
            fired,
            vec![
                (400, TimerKind::Tick),
                (800, TimerKind::Tick),
                (1000, TimerKind::Revert),
            ]
        );
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn cancelled_virtual_timer_never_fires() {
        let mut sched = VirtualScheduler::new();
        let handle = sched.schedule_once(Duration::from_millis(10), ev(1, TimerKind::Settle));
        sched.cancel(handle);
        assert_eq!(sched.pop_due(Duration::from_secs(5)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timers_deliver_and_cancel() {
        let (mut sched, mut rx) = TokioScheduler::new();
        let tick = sched.schedule_repeating(Duration::from_secs(1), ev(4, TimerKind::Tick));
        let revert = sched.schedule_once(Duration::from_millis(500), ev(4, TimerKind::Revert));
        sched.cancel(revert);

        assert_eq!(rx.recv().await, Some(ev(4, TimerKind::Tick)));
        assert_eq!(rx.recv().await, Some(ev(4, TimerKind::Tick)));
        sched.cancel(tick);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
    }
}
