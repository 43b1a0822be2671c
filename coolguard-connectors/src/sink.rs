//! Buffered, retrying notification sink
//!
//! ## Overview
//!
//! Two layers:
//!
//! - [`DeliveryQueue`]: the synchronous state machine. Messages waiting for
//!   their first attempt and messages waiting for a retry share one bound;
//!   at capacity the oldest undelivered message is evicted. Per-message
//!   retry counts, exponential backoff and counters live here too. No I/O,
//!   no clock; easy to test exhaustively.
//! - [`NotificationSink`]: a cloneable handle plus one tokio worker task. The
//!   handle only touches the queue under a short lock; the worker owns the
//!   [`Transport`] and is the only place a send ever happens, so there are
//!   never two sends in flight.
//!
//! ```text
//!   NotificationSink::write ──submit──► DeliveryQueue ◄──── worker ──► Transport
//!        (never blocks)           (fresh │ retry buffer)   (one send
//!                                  evict oldest at bound)   at a time)
//! ```
//!
//! ## Retry Policy
//!
//! ```text
//! write                  → fresh (evict oldest undelivered if full), wake worker
//! first attempt fails    → retry buffer, arm timer at `backoff`
//! retry of head succeeds → backoff = base, try next head right away
//! retry of head fails    → retries += 1
//!                          retries == max  → drop head, backoff = base
//!                          otherwise       → backoff = min(2 * backoff, 60 s)
//! buffer empty           → timer disarmed until the next failure
//! ```
//!
//! A message is taken out of the queue while it is being sent, so a write
//! that evicts during a slow send never removes the wrong message.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use coolguard_core::constants::{
    buffers::DEFAULT_SINK_BUFFER_SIZE,
    control::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS, MAX_RETRY_DELAY_MS},
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::{kv::KeyValueStore, Transport};

/// Sink errors
///
/// Returned by [`NotificationSink::write`] for callers that care; the control
/// loop ignores them.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The worker has stopped
    #[error("Sink closed")]
    Closed,
}

/// Sink configuration
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Master switch; a disabled sink discards every write
    pub enabled: bool,
    /// Key under which the endpoint URL is stored
    pub url_key: String,
    /// Undelivered messages kept, fresh and buffered together
    pub buffer_size: usize,
    /// Retries per buffered message before it is dropped
    pub max_retries: u32,
    /// First retry delay, and the delay after a success or a drop
    pub base_delay: Duration,
    /// Upper bound for the backoff
    pub max_delay: Duration,
}

impl SinkConfig {
    /// Create new configuration reading the URL from `url_key`
    pub fn new(url_key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            url_key: url_key.into(),
            buffer_size: DEFAULT_SINK_BUFFER_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_RETRY_DELAY_MS),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay = Duration::from_millis(ms);
        self
    }
}

/// A message waiting for another attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedMessage {
    pub text: String,
    /// Failed retries so far (the initial attempt is not counted)
    pub retries: u32,
}

/// Delivery counters, serializable for health reports
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    /// Delivered, first try or retry
    pub sent: u64,
    /// Failed the first try and entered the buffer
    pub buffered: u64,
    /// Removed after using up their retries
    pub dropped: u64,
    /// Pushed out by a newer message while the queue was full
    pub evicted: u64,
}

/// What happened to the head after a failed retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Back at the head; next attempt after the returned delay
    Backoff(Duration),
    /// Out of retries and removed
    Dropped(BufferedMessage),
    /// Newer messages filled the queue during the attempt; this one was oldest
    Evicted(BufferedMessage),
}

/// Undelivered messages and backoff state
///
/// Everything in `buffer` was attempted before anything in `fresh`, so the
/// oldest undelivered message is the buffer head, or the fresh head when the
/// buffer is empty.
#[derive(Debug)]
pub struct DeliveryQueue {
    fresh: VecDeque<String>,
    buffer: VecDeque<BufferedMessage>,
    capacity: usize,
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff: Duration,
    stats: SinkStats,
}

impl DeliveryQueue {
    pub fn new(config: &SinkConfig) -> Self {
        let capacity = config.buffer_size.max(1);
        Self {
            fresh: VecDeque::with_capacity(capacity),
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            max_retries: config.max_retries.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay.max(config.base_delay),
            backoff: config.base_delay,
            stats: SinkStats::default(),
        }
    }

    /// Undelivered messages, fresh and buffered
    pub fn len(&self) -> usize {
        self.fresh.len() + self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fresh.is_empty() && self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Whether anything waits for a retry
    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    /// Delay before the next retry
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn head(&self) -> Option<&BufferedMessage> {
        self.buffer.front()
    }

    /// Undelivered texts, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.buffer
            .iter()
            .map(|m| m.text.as_str())
            .chain(self.fresh.iter().map(String::as_str))
    }

    /// Accept a new message for its first attempt, returning the evicted text
    pub fn submit(&mut self, text: String) -> Option<String> {
        let evicted = if self.is_full() {
            self.evict_oldest()
        } else {
            None
        };
        self.fresh.push_back(text);
        evicted
    }

    /// Next message for a first attempt
    pub fn next_fresh(&mut self) -> Option<String> {
        self.fresh.pop_front()
    }

    /// A first attempt went through
    pub fn record_sent(&mut self) {
        self.stats.sent += 1;
    }

    /// A first attempt failed: buffer `text`, returning the evicted text
    ///
    /// When the queue is full and nothing is buffered, `text` itself is the
    /// oldest undelivered message and is the one evicted.
    pub fn enqueue(&mut self, text: String) -> Option<String> {
        if self.is_full() {
            if self.buffer.is_empty() {
                self.stats.evicted += 1;
                return Some(text);
            }
            let evicted = self.evict_oldest();
            self.push_buffered(text);
            return evicted;
        }
        self.push_buffered(text);
        None
    }

    /// Take the head out for a retry attempt
    pub fn take_head(&mut self) -> Option<BufferedMessage> {
        self.buffer.pop_front()
    }

    /// The taken head was delivered
    pub fn retry_succeeded(&mut self) {
        self.stats.sent += 1;
        self.backoff = self.base_delay;
    }

    /// The taken head failed again
    pub fn retry_failed(&mut self, mut message: BufferedMessage) -> RetryOutcome {
        message.retries += 1;

        if message.retries >= self.max_retries {
            self.backoff = self.base_delay;
            self.stats.dropped += 1;
            return RetryOutcome::Dropped(message);
        }
        if self.is_full() {
            self.backoff = self.base_delay;
            self.stats.evicted += 1;
            return RetryOutcome::Evicted(message);
        }

        self.backoff = (self.backoff * 2).min(self.max_delay);
        self.buffer.push_front(message);
        RetryOutcome::Backoff(self.backoff)
    }

    fn push_buffered(&mut self, text: String) {
        self.buffer.push_back(BufferedMessage { text, retries: 0 });
        self.stats.buffered += 1;
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let evicted = self
            .buffer
            .pop_front()
            .map(|m| m.text)
            .or_else(|| self.fresh.pop_front());
        if evicted.is_some() {
            self.stats.evicted += 1;
        }
        evicted
    }
}

/// State shared by the handles and the worker
#[derive(Debug)]
struct Shared {
    queue: Mutex<DeliveryQueue>,
    wake: Notify,
    /// Every handle is gone
    closed: AtomicBool,
    /// The worker has exited
    stopped: AtomicBool,
}

impl Shared {
    // The lock is never held across an await; a poisoned queue is still consistent
    fn queue(&self) -> MutexGuard<'_, DeliveryQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned by the handles; the last one to go tells the worker to stop
#[derive(Debug)]
struct HandleGuard(Arc<Shared>);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.closed.store(true, Ordering::Release);
        self.0.wake.notify_one();
    }
}

/// Handle for writing notifications
///
/// Cheap to clone; all clones feed the same worker. The worker stops when
/// the last handle is dropped.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    inner: Option<Arc<HandleGuard>>,
}

impl NotificationSink {
    /// Resolve the endpoint and start the delivery worker
    ///
    /// Must be called from within a tokio runtime. A disabled configuration
    /// or a URL missing from `store` yields a sink whose writes are no-ops.
    pub fn start<S, T>(config: SinkConfig, store: &S, transport: T) -> Self
    where
        S: KeyValueStore + ?Sized,
        T: Transport + 'static,
    {
        if !config.enabled {
            log::info!("Notification sink disabled");
            return Self::disabled();
        }
        let Some(url) = store.get(&config.url_key).filter(|u| !u.trim().is_empty()) else {
            log::warn!(
                "Notification sink disabled: no endpoint under '{}'",
                config.url_key
            );
            return Self::disabled();
        };

        let shared = Arc::new(Shared {
            queue: Mutex::new(DeliveryQueue::new(&config)),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        });
        let worker = Worker {
            shared: Arc::clone(&shared),
            transport,
            url,
            next_retry: None,
        };
        tokio::spawn(worker.run());
        log::info!("Notification sink started (buffer {})", config.buffer_size);

        Self {
            inner: Some(Arc::new(HandleGuard(shared))),
        }
    }

    /// A sink that discards everything
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Queue `text` for delivery without waiting
    ///
    /// At capacity the oldest undelivered message makes room.
    pub fn write(&self, text: impl Into<String>) -> Result<(), SinkError> {
        let Some(guard) = &self.inner else {
            return Ok(());
        };
        let shared = &guard.0;
        if shared.stopped.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        let evicted = shared.queue().submit(text.into());
        if let Some(evicted) = evicted {
            log::warn!("Notification queue full, evicted: {}", evicted);
        }
        shared.wake.notify_one();
        Ok(())
    }

    /// Current delivery counters
    pub fn stats(&self) -> SinkStats {
        match &self.inner {
            Some(guard) => guard.0.queue().stats(),
            None => SinkStats::default(),
        }
    }
}

struct Worker<T> {
    shared: Arc<Shared>,
    transport: T,
    url: String,
    /// Armed while the retry buffer is non-empty
    next_retry: Option<Instant>,
}

impl<T: Transport> Worker<T> {
    async fn run(mut self) {
        let shared = Arc::clone(&self.shared);
        loop {
            if self.next_retry.is_some_and(|at| at <= Instant::now()) {
                self.retry().await;
                continue;
            }

            let fresh = shared.queue().next_fresh();
            if let Some(text) = fresh {
                self.deliver(text).await;
                continue;
            }

            if shared.closed.load(Ordering::Acquire) {
                break;
            }

            tokio::select! {
                _ = shared.wake.notified() => {}
                _ = wait_until(self.next_retry) => self.retry().await,
            }
        }

        let undelivered = shared.queue().len();
        if undelivered > 0 {
            log::debug!("Notification sink stopped with {} undelivered", undelivered);
        }
    }

    async fn deliver(&mut self, text: String) {
        if send(&self.transport, &self.url, &text).await {
            self.shared.queue().record_sent();
            return;
        }

        let (evicted, buffered, backoff) = {
            let mut queue = self.shared.queue();
            let evicted = queue.enqueue(text);
            (evicted, queue.has_buffered(), queue.backoff())
        };
        if let Some(evicted) = evicted {
            log::warn!("Notification buffer full, evicted: {}", evicted);
        }
        if buffered && self.next_retry.is_none() {
            self.next_retry = Some(Instant::now() + backoff);
        }
    }

    async fn retry(&mut self) {
        loop {
            let head = self.shared.queue().take_head();
            let Some(message) = head else {
                break;
            };

            if send(&self.transport, &self.url, &message.text).await {
                self.shared.queue().retry_succeeded();
                continue;
            }

            let outcome = self.shared.queue().retry_failed(message);
            match outcome {
                RetryOutcome::Dropped(message) => log::warn!(
                    "Notification dropped after {} retries: {}",
                    message.retries,
                    message.text
                ),
                RetryOutcome::Evicted(message) => {
                    log::warn!("Notification buffer full, evicted: {}", message.text)
                }
                RetryOutcome::Backoff(_) => {}
            }
            break;
        }

        let (buffered, backoff) = {
            let queue = self.shared.queue();
            (queue.has_buffered(), queue.backoff())
        };
        self.next_retry = buffered.then(|| Instant::now() + backoff);
    }
}

impl<T> Drop for Worker<T> {
    fn drop(&mut self) {
        self.shared.stopped.store(true, Ordering::Release);
    }
}

async fn send<T: Transport>(transport: &T, url: &str, text: &str) -> bool {
    let body = serde_json::json!({ "text": text }).to_string();
    match transport.post_json(url, body).await {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Notification delivery failed: {}", e);
            false
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
