//! Snapshot fan-out to subscribers.
//!
//! Every subscriber owns a bounded mailbox. Publishing never blocks: when a
//! mailbox is full its oldest snapshot is discarded and counted against that
//! subscriber. Mailboxes whose [`Subscription`] was dropped are pruned on the
//! next publish.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{RecvError, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use crate::snapshot::Snapshot;

/// Default snapshots buffered per subscriber.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 16;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct Mailbox {
    queue: Mutex<VecDeque<Arc<Snapshot>>>,
    ready: Condvar,
    capacity: usize,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl Mailbox {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            ready: Condvar::new(),
            capacity,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue, evicting the oldest entry when full. Returns true on eviction.
    fn deliver(&self, snapshot: Arc<Snapshot>) -> bool {
        let mut queue = lock(&self.queue);
        let evicted = if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        };
        queue.push_back(snapshot);
        drop(queue);
        self.ready.notify_one();
        evicted
    }

    fn close(&self) {
        // Take the queue lock so a receiver cannot miss the wakeup between
        // checking `closed` and waiting.
        let _queue = lock(&self.queue);
        self.closed.store(true, Ordering::Release);
        self.ready.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Receiving end of a subscription.
///
/// Queued snapshots remain readable after the publisher is gone; receive
/// calls report disconnection only once the mailbox is empty.
#[derive(Debug)]
pub struct Subscription {
    mailbox: Arc<Mailbox>,
}

impl Subscription {
    /// Block until a snapshot arrives or the publisher is dropped.
    pub fn recv(&self) -> Result<Arc<Snapshot>, RecvError> {
        let mut queue = lock(&self.mailbox.queue);
        loop {
            if let Some(snapshot) = queue.pop_front() {
                return Ok(snapshot);
            }
            if self.mailbox.is_closed() {
                return Err(RecvError);
            }
            queue = self
                .mailbox
                .ready
                .wait(queue)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Arc<Snapshot>, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        let mut queue = lock(&self.mailbox.queue);
        loop {
            if let Some(snapshot) = queue.pop_front() {
                return Ok(snapshot);
            }
            if self.mailbox.is_closed() {
                return Err(RecvTimeoutError::Disconnected);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(RecvTimeoutError::Timeout);
            }
            queue = self
                .mailbox
                .ready
                .wait_timeout(queue, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    pub fn try_recv(&self) -> Result<Arc<Snapshot>, TryRecvError> {
        let mut queue = lock(&self.mailbox.queue);
        match queue.pop_front() {
            Some(snapshot) => Ok(snapshot),
            None if self.mailbox.is_closed() => Err(TryRecvError::Disconnected),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Snapshots lost to mailbox overflow so far.
    pub fn dropped(&self) -> u64 {
        self.mailbox.dropped.load(Ordering::Relaxed)
    }

    /// Snapshots waiting to be received.
    pub fn pending(&self) -> usize {
        lock(&self.mailbox.queue).len()
    }

    pub fn capacity(&self) -> usize {
        self.mailbox.capacity
    }
}

/// Outcome of one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Mailboxes that received the snapshot.
    pub delivered: usize,
    /// Of those, how many had to evict their oldest entry.
    pub lagged: usize,
    /// Mailboxes removed because their subscription was dropped.
    pub pruned: usize,
    /// The snapshot was older than one already published and was skipped.
    pub stale: bool,
}

#[derive(Debug, Default)]
struct Subscribers {
    mailboxes: Vec<Weak<Mailbox>>,
    last_sequence: u64,
}

/// Fan-out publisher with per-subscriber bounded mailboxes.
#[derive(Debug)]
pub struct SnapshotPublisher {
    subscribers: Mutex<Subscribers>,
    capacity: usize,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}

impl SnapshotPublisher {
    /// Create a publisher whose mailboxes hold `capacity` snapshots (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Subscribers::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let mailbox = Arc::new(Mailbox::new(self.capacity));
        lock(&self.subscribers)
            .mailboxes
            .push(Arc::downgrade(&mailbox));
        Subscription { mailbox }
    }

    /// Deliver `snapshot` to every live subscriber.
    ///
    /// Snapshots carrying a lower sequence than one already published are
    /// skipped, so subscribers never see state go backwards.
    pub fn publish(&self, snapshot: Arc<Snapshot>) -> PublishReport {
        let mut subscribers = lock(&self.subscribers);
        let mut report = PublishReport::default();

        if snapshot.sequence < subscribers.last_sequence {
            report.stale = true;
            return report;
        }
        subscribers.last_sequence = snapshot.sequence;

        let before = subscribers.mailboxes.len();
        subscribers.mailboxes.retain(|weak| match weak.upgrade() {
            Some(mailbox) => {
                report.delivered += 1;
                if mailbox.deliver(Arc::clone(&snapshot)) {
                    report.lagged += 1;
                }
                true
            }
            None => false,
        });
        report.pruned = before - subscribers.mailboxes.len();
        report
    }

    /// Live subscriptions (handles not yet dropped).
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers)
            .mailboxes
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for SnapshotPublisher {
    fn drop(&mut self) {
        for mailbox in lock(&self.subscribers)
            .mailboxes
            .iter()
            .filter_map(Weak::upgrade)
        {
            mailbox.close();
        }
    }
}
