//! # Waitable event bus.
//!
//! [`EventBus`] delivers [`Event`]s to listeners through per-listener bounded
//! queues, each drained by a dedicated worker task. It offers two broadcast
//! disciplines on the same set of listeners:
//!
//! - [`emit`](EventBus::emit): fire-and-forget. Returns as soon as the event is queued.
//! - [`emit_and_wait`](EventBus::emit_and_wait): resolves once every matching
//!   listener has finished handling the event, and fails if any of them failed.
//!
//! ## Architecture
//! ```text
//! emit(ev) / emit_and_wait(ev)
//!     │  (filtered by each subscription's KindSet)
//!     ├──► [queue L1] ──► worker L1 ──► listener1.on_event() ──┐
//!     │    (bounded)          └──► panic → ListenerError        │ ack (emit_and_wait only)
//!     ├──► [queue L2] ──► worker L2 ──► listener2.on_event() ──┤
//!     └──► [queue LN] ──► worker LN ──► listenerN.on_event() ──┘
//! ```
//!
//! ## Rules
//! - **Per-listener FIFO**: a listener sees events in emission order, whichever
//!   discipline emitted them. `emit(End)` followed by `emit_and_wait(EndRunner)`
//!   reaches every listener of both kinds as `End` first.
//! - **No cross-listener ordering**: listener A may handle event N while B handles N+5.
//! - **Isolation on `emit`**: a failing or panicking listener never reaches the
//!   emitter; the failure is logged and published as `ListenerFailed`.
//! - **Overflow on `emit`**: a full bounded queue drops the event for that
//!   listener only and publishes `ListenerOverflow`. `emit_and_wait` waits for
//!   queue room instead.
//! - **Lossless listeners**: a listener whose [`Listen::lossless`] is `true`
//!   gets an unbounded queue and never drops an event. The passthrough bridge
//!   and the result pipeline are lossless.
//! - **Recursion guard**: failures/overflows while handling a bus signal are not re-signalled.
//!
//! ## Deadlocks
//! A listener must not `emit_and_wait` an event of a kind it subscribes to on
//! the same bus, nor `drain` its own subscription: it would wait on its own queue.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::error::{ListenerError, panic_message};
use crate::listeners::{Listen, ListenFn};

use super::event::{Event, EventKind, KindSet};

/// Handle of one subscription on one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Ack = oneshot::Sender<Result<(), ListenerError>>;

/// One queued event, with an acknowledgement channel when emitted by `emit_and_wait`.
struct Delivery {
    event: Arc<Event>,
    ack: Option<Ack>,
}

/// Sending side of a listener queue.
#[derive(Clone)]
enum Queue {
    Bounded(mpsc::Sender<Delivery>),
    Unbounded(mpsc::UnboundedSender<Delivery>),
}

impl Queue {
    /// Non-blocking push; the error is the overflow reason.
    fn try_push(&self, delivery: Delivery) -> Result<(), &'static str> {
        match self {
            Queue::Bounded(tx) => tx.try_send(delivery).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => "full",
                mpsc::error::TrySendError::Closed(_) => "closed",
            }),
            Queue::Unbounded(tx) => tx.send(delivery).map_err(|_| "closed"),
        }
    }

    /// Push waiting for room; `false` if the worker is gone.
    async fn push(&self, delivery: Delivery) -> bool {
        match self {
            Queue::Bounded(tx) => tx.send(delivery).await.is_ok(),
            Queue::Unbounded(tx) => tx.send(delivery).is_ok(),
        }
    }
}

/// Receiving side of a listener queue.
enum Inbox {
    Bounded(mpsc::Receiver<Delivery>),
    Unbounded(mpsc::UnboundedReceiver<Delivery>),
}

impl Inbox {
    async fn recv(&mut self) -> Option<Delivery> {
        match self {
            Inbox::Bounded(rx) => rx.recv().await,
            Inbox::Unbounded(rx) => rx.recv().await,
        }
    }
}

/// Per-listener queue and worker.
struct Subscription {
    id: SubscriptionId,
    name: &'static str,
    kinds: KindSet,
    sender: Queue,
    worker: JoinHandle<()>,
}

struct Shared {
    subs: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
    capacity: usize,
}

/// Typed publish/subscribe bus with fire-and-forget and awaited broadcast.
///
/// ### Properties
/// - **Cloneable**: cheap to clone; all clones share the same listeners.
/// - **Scoped**: no global state; every run owns its own buses.
/// - **Runtime-bound**: subscribing spawns a tokio task, so it must happen inside a runtime.
#[derive(Clone)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    /// Creates a new bus whose listeners get queues of `capacity` events by default.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                subs: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Creates a bus sized by [`RunConfig::queue_capacity`].
    pub fn for_config(cfg: &RunConfig) -> Self {
        Self::new(cfg.queue_capacity_clamped())
    }

    /// Registers `listener` for every kind in `kinds` and starts its worker.
    ///
    /// The queue is unbounded for [`Listen::lossless`] listeners; otherwise its
    /// capacity is [`Listen::queue_capacity`] or the bus default.
    pub fn subscribe(&self, kinds: impl Into<KindSet>, listener: Arc<dyn Listen>) -> SubscriptionId {
        let kinds = kinds.into();
        let name = listener.name();
        let (sender, inbox) = if listener.lossless() {
            let (tx, rx) = mpsc::unbounded_channel::<Delivery>();
            (Queue::Unbounded(tx), Inbox::Unbounded(rx))
        } else {
            let cap = listener
                .queue_capacity()
                .unwrap_or(self.shared.capacity)
                .max(1);
            let (tx, rx) = mpsc::channel::<Delivery>(cap);
            (Queue::Bounded(tx), Inbox::Bounded(rx))
        };
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        let worker = tokio::spawn(run_worker(listener, inbox, Arc::downgrade(&self.shared)));

        self.shared.subs.write().push(Subscription {
            id,
            name,
            kinds,
            sender,
            worker,
        });
        debug!(listener = name, ?kinds, "listener subscribed");
        id
    }

    /// Registers a closure as a listener; see [`ListenFn`].
    pub fn on<F, Fut>(&self, kinds: impl Into<KindSet>, name: &'static str, f: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe(kinds, ListenFn::arc(name, f))
    }

    /// Removes a subscription.
    ///
    /// Events already queued for it are still handled in the background.
    /// Returns `false` if the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.take(id).is_some()
    }

    /// Removes a subscription and waits until its queued events are handled.
    ///
    /// Returns `false` if the id is unknown.
    pub async fn drain(&self, id: SubscriptionId) -> bool {
        let Some(sub) = self.take(id) else {
            return false;
        };
        drop(sub.sender);
        if let Err(e) = sub.worker.await {
            warn!(listener = sub.name, error = %e, "listener worker ended abnormally");
        }
        true
    }

    fn take(&self, id: SubscriptionId) -> Option<Subscription> {
        let mut subs = self.shared.subs.write();
        let pos = subs.iter().position(|s| s.id == id)?;
        Some(subs.remove(pos))
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.shared.subs.read().len()
    }

    /// Returns `true` if at least one subscription covers `kind`.
    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.shared.subs.read().iter().any(|s| s.kinds.contains(kind))
    }

    /// Queues `event` for every listener of its kind and returns immediately.
    pub fn emit(&self, event: Event) {
        self.emit_arc(Arc::new(event));
    }

    /// Queues a pre-allocated `Arc<Event>` for every listener of its kind.
    ///
    /// - Never blocks; lossless listeners always receive the event
    /// - On a full/closed bounded queue: drops the event for that listener, publishes `ListenerOverflow`
    pub fn emit_arc(&self, event: Arc<Event>) {
        let kind = event.kind();
        let mut overflowed = Vec::new();
        {
            let subs = self.shared.subs.read();
            for sub in subs.iter().filter(|s| s.kinds.contains(kind)) {
                let delivery = Delivery {
                    event: Arc::clone(&event),
                    ack: None,
                };
                if let Err(reason) = sub.sender.try_push(delivery) {
                    overflowed.push((sub.name, reason));
                }
            }
        }

        if event.is_bus_signal() {
            return;
        }
        for (listener, reason) in overflowed {
            warn!(listener, event = %kind, reason, "listener queue overflow; event dropped");
            self.emit(Event::listener_overflow(listener, kind, reason));
        }
    }

    /// Delivers `event` to every listener of its kind and waits for all of them.
    ///
    /// ### Semantics
    /// - Resolves only after **every** matching listener finished (success or not).
    /// - Fails with the first failure to complete; later failures are logged.
    /// - No listeners → resolves immediately with `Ok(())`.
    /// - Listeners removed before the event reached them are skipped.
    pub async fn emit_and_wait(&self, event: Event) -> Result<(), ListenerError> {
        let event = Arc::new(event);
        let kind = event.kind();
        let targets: Vec<(&'static str, Queue)> = self
            .shared
            .subs
            .read()
            .iter()
            .filter(|s| s.kinds.contains(kind))
            .map(|s| (s.name, s.sender.clone()))
            .collect();

        if targets.is_empty() {
            return Ok(());
        }

        let mut pending = FuturesUnordered::new();
        for (name, sender) in targets {
            let (ack, done) = oneshot::channel();
            let delivery = Delivery {
                event: Arc::clone(&event),
                ack: Some(ack),
            };
            if !sender.push(delivery).await {
                debug!(listener = name, event = %kind, "listener closed before delivery");
                continue;
            }
            pending.push(done);
        }

        let mut first: Option<ListenerError> = None;
        while let Some(res) = pending.next().await {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(err)) => match first {
                    None => first = Some(err),
                    Some(_) => warn!(event = %kind, error = %err, "additional listener failure"),
                },
                Err(_) => debug!(event = %kind, "listener worker gone before acknowledging"),
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Forwards every event of `kinds` published on `source` to this bus.
    ///
    /// One subscription on `source` covers all kinds, so forwarded events keep
    /// their source order. Events are re-emitted with [`emit`](Self::emit) and
    /// keep their payloads (`Arc`s are shared, not copied).
    ///
    /// Never bridge a bus to itself.
    pub fn passthrough(&self, source: &EventBus, kinds: impl Into<KindSet>) -> SubscriptionId {
        source.subscribe(
            kinds,
            Arc::new(Passthrough {
                target: self.clone(),
            }),
        )
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .field("capacity", &self.shared.capacity)
            .finish()
    }
}

/// Listener behind [`EventBus::passthrough`].
struct Passthrough {
    target: EventBus,
}

#[async_trait]
impl Listen for Passthrough {
    async fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        self.target.emit(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn lossless(&self) -> bool {
        true
    }
}

/// Worker loop: handles deliveries one by one until the queue is closed.
async fn run_worker(
    listener: Arc<dyn Listen>,
    mut rx: Inbox,
    bus: Weak<Shared>,
) {
    while let Some(Delivery { event, ack }) = rx.recv().await {
        let outcome = deliver(listener.as_ref(), &event).await;
        match ack {
            Some(ack) => {
                let _ = ack.send(outcome);
            }
            None => {
                if let Err(err) = outcome {
                    signal_failure(&bus, &event, err);
                }
            }
        }
    }
}

/// Runs the handler, converting errors and panics into [`ListenerError`].
async fn deliver(listener: &dyn Listen, event: &Event) -> Result<(), ListenerError> {
    match AssertUnwindSafe(listener.on_event(event))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ListenerError::Failed {
            listener: listener.name(),
            error: format!("{e:#}"),
        }),
        Err(panic) => Err(ListenerError::Panicked {
            listener: listener.name(),
            info: panic_message(panic.as_ref()),
        }),
    }
}

fn signal_failure(bus: &Weak<Shared>, event: &Event, err: ListenerError) {
    warn!(listener = err.listener(), event = %event.kind(), error = %err, "listener failed");
    if event.is_bus_signal() {
        return;
    }
    if let Some(shared) = bus.upgrade() {
        EventBus { shared }.emit(Event::listener_failed(err));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::events::{Notice, StateInfo};

    fn notice(msg: &str) -> Event {
        Event::Info(Arc::new(Notice {
            browser_id: None,
            message: msg.to_string(),
        }))
    }

    fn state(kind: EventKind, name: &str) -> Event {
        let info = Arc::new(StateInfo {
            browser_id: "chrome".into(),
            suite: vec!["root".to_string()],
            state: name.to_string(),
        });
        match kind {
            EventKind::BeginState => Event::BeginState(info),
            EventKind::EndState => Event::EndState(info),
            _ => Event::SkipState(info),
        }
    }

    /// Subscribes a listener that records every event it sees.
    fn record(bus: &EventBus, kinds: impl Into<KindSet>) -> (SubscriptionId, Arc<Mutex<Vec<Event>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let id = bus.on(kinds, "recorder", move |ev: Event| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(ev);
                Ok(())
            }
        });
        (id, log)
    }

    #[tokio::test]
    async fn test_emit_and_wait_without_listeners_resolves() {
        let bus = EventBus::new(8);
        assert!(bus.emit_and_wait(Event::End).await.is_ok());
    }

    #[tokio::test]
    async fn test_emit_and_wait_waits_for_slow_listener() {
        let bus = EventBus::new(8);
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        bus.on(EventKind::EndRunner, "slow", move |_ev: Event| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                flag.store(true, AtomicOrdering::SeqCst);
                Ok(())
            }
        });

        let runner = crate::runner::RunnerRef::new("test", Arc::new(RunConfig::default()), bus.clone());
        bus.emit_and_wait(Event::EndRunner(runner)).await.unwrap();
        assert!(done.load(AtomicOrdering::SeqCst));
    }

    #[tokio::test]
    async fn test_emit_and_wait_returns_first_failure_after_all_settle() {
        let bus = EventBus::new(8);
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        bus.on(EventKind::Info, "fast", |_ev: Event| async {
            Err(anyhow::anyhow!("fast failure"))
        });
        bus.on(EventKind::Info, "late", |_ev: Event| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(anyhow::anyhow!("late failure"))
        });
        bus.on(EventKind::Info, "ok", move |_ev: Event| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                flag.store(true, AtomicOrdering::SeqCst);
                Ok(())
            }
        });

        let err = bus.emit_and_wait(notice("hi")).await.unwrap_err();
        assert_eq!(
            err,
            ListenerError::Failed {
                listener: "fast",
                error: "fast failure".to_string()
            }
        );
        assert!(finished.load(AtomicOrdering::SeqCst));
    }

    #[tokio::test]
    async fn test_emit_and_wait_reports_panic() {
        let bus = EventBus::new(8);
        bus.on(EventKind::End, "boom", |ev: Event| async move {
            if ev.kind() == EventKind::End {
                panic!("listener exploded");
            }
            Ok(())
        });

        let err = bus.emit_and_wait(Event::End).await.unwrap_err();
        assert_eq!(
            err,
            ListenerError::Panicked {
                listener: "boom",
                info: "listener exploded".to_string()
            }
        );

        // The worker survives the panic.
        let err = bus.emit_and_wait(Event::End).await.unwrap_err();
        assert_eq!(err.as_label(), "listener_panicked");
    }

    #[tokio::test]
    async fn test_emit_isolates_listener_failure() {
        let bus = EventBus::new(8);
        let failing = bus.on(EventKind::Info, "broken", |_ev: Event| async {
            Err(anyhow::anyhow!("cannot write"))
        });
        let (observer, seen) = record(&bus, EventKind::ListenerFailed);

        bus.emit(notice("hello"));

        assert!(bus.drain(failing).await);
        assert!(bus.drain(observer).await);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            Event::ListenerFailed(err) => {
                assert_eq!(err.listener(), "broken");
                assert!(err.to_string().contains("cannot write"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listener_only_sees_subscribed_kinds() {
        let bus = EventBus::new(8);
        let (id, seen) = record(&bus, [EventKind::End]);

        bus.emit(notice("ignored"));
        bus.emit(Event::End);
        bus.drain(id).await;

        let kinds: Vec<_> = seen.lock().iter().map(Event::kind).collect();
        assert_eq!(kinds, vec![EventKind::End]);
    }

    #[tokio::test]
    async fn test_passthrough_preserves_order_and_payload() {
        let inner = EventBus::new(8);
        let outer = EventBus::new(8);
        let (rec, seen) = record(&outer, KindSet::all());
        let bridge = outer.passthrough(&inner, [EventKind::BeginState, EventKind::EndState]);

        let sent = vec![
            state(EventKind::BeginState, "a"),
            state(EventKind::EndState, "a"),
            notice("not bridged"),
            state(EventKind::BeginState, "b"),
            state(EventKind::EndState, "b"),
        ];
        for ev in &sent {
            inner.emit(ev.clone());
        }

        inner.drain(bridge).await;
        outer.drain(rec).await;

        let seen = seen.lock();
        let expected: Vec<&Event> = sent.iter().filter(|e| e.kind() != EventKind::Info).collect();
        assert_eq!(seen.len(), expected.len());
        for (got, want) in seen.iter().zip(expected) {
            match (got, want) {
                (Event::BeginState(a), Event::BeginState(b))
                | (Event::EndState(a), Event::EndState(b)) => assert!(Arc::ptr_eq(a, b)),
                other => panic!("order changed: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_per_listener_fifo_across_disciplines() {
        let bus = EventBus::new(8);
        let (_id, seen) = record(&bus, [EventKind::End, EventKind::EndRunner]);
        let runner = crate::runner::RunnerRef::new("test", Arc::new(RunConfig::default()), bus.clone());

        bus.emit(Event::End);
        bus.emit_and_wait(Event::EndRunner(runner)).await.unwrap();

        let kinds: Vec<_> = seen.lock().iter().map(Event::kind).collect();
        assert_eq!(kinds, vec![EventKind::End, EventKind::EndRunner]);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new(8);
        let (id, seen) = record(&bus, EventKind::End);
        assert_eq!(bus.subscription_count(), 1);
        assert!(bus.has_listeners(EventKind::End));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert!(!bus.has_listeners(EventKind::End));

        bus.emit(Event::End);
        bus.emit_and_wait(Event::End).await.unwrap();
        tokio::task::yield_now().await;
        assert!(seen.lock().is_empty());
    }

    struct Gate {
        permits: Arc<Semaphore>,
        lossless: bool,
        handled: Arc<AtomicUsize>,
    }

    impl Gate {
        fn new(permits: &Arc<Semaphore>, lossless: bool) -> Self {
            Self {
                permits: Arc::clone(permits),
                lossless,
                handled: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Listen for Gate {
        async fn on_event(&self, _event: &Event) -> anyhow::Result<()> {
            let _permit = self.permits.acquire().await?;
            self.handled.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "gate"
        }

        fn queue_capacity(&self) -> Option<usize> {
            Some(1)
        }

        fn lossless(&self) -> bool {
            self.lossless
        }
    }

    #[tokio::test]
    async fn test_overflow_is_signalled() {
        let bus = EventBus::new(8);
        let permits = Arc::new(Semaphore::new(0));
        let gate = bus.subscribe(EventKind::Info, Arc::new(Gate::new(&permits, false)));
        let (observer, seen) = record(&bus, EventKind::ListenerOverflow);

        for i in 0..3 {
            bus.emit(notice(&format!("n{i}")));
        }
        bus.drain(observer).await;

        {
            let seen = seen.lock();
            assert!(!seen.is_empty());
            for ev in seen.iter() {
                match ev {
                    Event::ListenerOverflow(info) => {
                        assert_eq!(info.listener, "gate");
                        assert_eq!(info.dropped, EventKind::Info);
                        assert_eq!(info.reason, "full");
                    }
                    other => panic!("unexpected event: {other:?}"),
                }
            }
        }

        permits.add_permits(3);
        assert!(bus.drain(gate).await);
    }

    #[tokio::test]
    async fn test_lossless_listener_keeps_every_event() {
        let bus = EventBus::new(1);
        let permits = Arc::new(Semaphore::new(0));
        let gate = Gate::new(&permits, true);
        let handled = Arc::clone(&gate.handled);
        let id = bus.subscribe(EventKind::Info, Arc::new(gate));
        let (observer, seen) = record(&bus, EventKind::ListenerOverflow);

        for i in 0..50 {
            bus.emit(notice(&format!("n{i}")));
        }
        permits.add_permits(50);
        assert!(bus.drain(id).await);
        bus.drain(observer).await;

        assert_eq!(handled.load(AtomicOrdering::SeqCst), 50);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_passthrough_is_lossless_on_small_queues() {
        let inner = EventBus::new(1);
        let outer = EventBus::new(64);
        let (rec, seen) = record(&outer, EventKind::Info);
        let bridge = outer.passthrough(&inner, EventKind::Info);

        for i in 0..40 {
            inner.emit(notice(&format!("n{i}")));
        }
        inner.drain(bridge).await;
        outer.drain(rec).await;

        assert_eq!(seen.lock().len(), 40);
    }
}
