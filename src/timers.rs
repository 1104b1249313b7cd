//! A virtual clock for deferred work. Nothing here sleeps: time only moves when
//! the owner calls [`Timers::pop_due`] with a later deadline.

/// How long a filter message stays up.
pub const MESSAGE_LIFETIME_MS: u64 = 3000;

/// How long after boot leftover loading indicators are hidden.
pub const LOADING_SAFETY_TIMEOUT_MS: u64 = 3000;

/// How long after an already-interactive boot the catalog checks whether it
/// still needs to initialize.
pub const INITIAL_LOAD_CHECK_MS: u64 = 100;

/// Work that runs on a later turn of the event loop.
#[derive(Clone, Debug, PartialEq)]
pub enum Task {
    /// Puts the viewport back `distance` pixels above the bottom of the
    /// document.
    RestoreScroll { distance: f64 },

    /// Removes filter message `id` if it is still showing.
    DismissMessage { id: u64 },

    /// Hides any loading indicator still on the page.
    HideLoadingIndicators,

    /// Initializes the catalog if the articles arrived and the content is no
    /// longer a loading placeholder.
    InitialLoadCheck,
}

#[derive(Debug)]
struct Scheduled {
    due: u64,
    order: u64,
    task: Task,
}

/// Pending tasks ordered by due time, then by scheduling order.
#[derive(Debug, Default)]
pub struct Timers {
    now: u64,
    scheduled: u64,
    queue: Vec<Scheduled>,
}

impl Timers {
    pub fn new() -> Timers {
        Timers::default()
    }

    /// Milliseconds since the clock started.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Runs `task` `delay` milliseconds from now. A zero delay means the next
    /// turn.
    pub fn schedule(&mut self, delay: u64, task: Task) {
        self.queue.push(Scheduled {
            due: self.now.saturating_add(delay),
            order: self.scheduled,
            task,
        });
        self.scheduled += 1;
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The pending tasks in the order they'll run.
    pub fn tasks(&self) -> Vec<&Task> {
        let mut queue: Vec<&Scheduled> = self.queue.iter().collect();
        queue.sort_by_key(|s| (s.due, s.order));
        queue.into_iter().map(|s| &s.task).collect()
    }

    /// Removes and returns the next task due at or before `deadline`, moving
    /// the clock to its due time. Returns `None` once nothing else is due, at
    /// which point the clock sits at `deadline`.
    pub fn pop_due(&mut self, deadline: u64) -> Option<Task> {
        let next = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due <= deadline)
            .min_by_key(|(_, s)| (s.due, s.order))
            .map(|(i, _)| i);
        match next {
            Some(i) => {
                let scheduled = self.queue.remove(i);
                self.now = self.now.max(scheduled.due);
                Some(scheduled.task)
            }
            None => {
                self.now = self.now.max(deadline);
                None
            }
        }
    }
}
