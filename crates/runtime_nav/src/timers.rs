use html::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Deferred work owned by a session. Tasks name the anchor whose prefetcher they belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    Prefetch(NodeId),
    CollectHint(NodeId),
}

#[derive(Debug)]
struct Timer {
    id: TimerId,
    due_ms: u64,
    task: Task,
}

/// Single-threaded timer wheel driven by an external clock.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, due_ms: u64, task: Task) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer { id, due_ms, task });
        id
    }

    /// Returns whether the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Remove and return every task due at `now_ms`, earliest first; ties keep arming order.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<(TimerId, Task)> {
        let mut due: Vec<Timer> = Vec::new();
        let mut pending = Vec::with_capacity(self.timers.len());
        for timer in self.timers.drain(..) {
            if timer.due_ms <= now_ms {
                due.push(timer);
            } else {
                pending.push(timer);
            }
        }
        self.timers = pending;
        due.sort_by_key(|t| (t.due_ms, t.id));
        due.into_iter().map(|t| (t.id, t.task)).collect()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due_ms).min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
