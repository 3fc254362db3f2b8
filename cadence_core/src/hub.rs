//! State-change hub: one broker per topic plus the derived operating phase.
//!
//! The hub is an explicitly constructed context object. The application
//! builds exactly one, lends it mutably to subsystems while they register
//! their subscriptions, then hands it to the cycle driver, which lends it
//! immutably to every state machine during a cycle.
//!
//! ## Topic boundary
//! Every registration and publish resolves its [`TopicId`] through
//! [`Topic::from_id`]. Identifiers outside the registry are dropped here, and
//! only here: no effect, no fault, one `trace!` line and a counter bump.
//!
//! ## Phase throttling
//! [`StateChangeHub::run`] derives the operating phase once per cycle and
//! publishes it on [`Topic::GamePhase`] only when it differs from the
//! previous cycle's phase.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence_common::payload::{Payload, PayloadValue};
use cadence_common::phase::{ModeSignals, OperatingPhase};
use cadence_common::topic::{Topic, TopicId, TypedTopic, topics};
use tracing::{debug, trace};

use crate::broker::{Broker, StateChangeSubscriber, SubscriberRef};
use crate::error::HubError;

/// Owner of every broker and of the derived operating phase.
pub struct StateChangeHub {
    brokers: [Broker; Topic::COUNT],
    phase: OperatingPhase,
    published: Cell<u64>,
    dropped: Cell<u64>,
}

impl StateChangeHub {
    /// Build the broker table for the closed topic set. Initial phase is
    /// `Disabled`.
    pub fn new() -> Self {
        Self {
            brokers: std::array::from_fn(|i| Broker::new(Topic::ALL[i])),
            phase: OperatingPhase::Disabled,
            published: Cell::new(0),
            dropped: Cell::new(0),
        }
    }

    #[inline]
    fn broker(&self, id: TopicId) -> Option<&Broker> {
        Topic::from_id(id).map(|t| &self.brokers[t.index()])
    }

    #[inline]
    fn broker_mut(&mut self, id: TopicId) -> Option<&mut Broker> {
        Topic::from_id(id).map(|t| &mut self.brokers[t.index()])
    }

    fn record_drop(&self, id: TopicId, what: &str) {
        self.dropped.set(self.dropped.get() + 1);
        trace!(topic = %id, "{what} on out-of-range topic dropped");
    }

    /// Register `subscriber` for changes on `topic`.
    ///
    /// Returns `Ok(true)` when registered and `Ok(false)` when `topic` is out
    /// of range (nothing happens). Registering the same subscriber twice
    /// yields two notifications per publish.
    ///
    /// # Errors
    /// - `HubError::KindRejected` if the subscriber does not accept the
    ///   topic's payload kind.
    /// - `HubError::SubscriberBusy` if the subscriber is mutably borrowed.
    /// - `HubError::CapacityExhausted` if the topic's subscriber list is full.
    pub fn register_for_state_changes<S>(
        &mut self,
        subscriber: &Rc<RefCell<S>>,
        topic: impl Into<TopicId>,
    ) -> Result<bool, HubError>
    where
        S: StateChangeSubscriber + 'static,
    {
        let id = topic.into();
        let Some(broker) = self.broker_mut(id) else {
            self.record_drop(id, "registration");
            return Ok(false);
        };

        let topic = broker.topic();
        let kind = topic.kind();
        let accepts = subscriber
            .try_borrow()
            .map_err(|_| HubError::SubscriberBusy { topic })?
            .accepts(kind);
        if !accepts {
            return Err(HubError::KindRejected { topic, kind });
        }

        let weak: SubscriberRef = Rc::<RefCell<S>>::downgrade(subscriber);
        broker.add_subscriber(weak)?;
        debug!(%topic, registrations = broker.registrations(), "subscriber registered");
        Ok(true)
    }

    /// Publish `payload` on `topic` to every subscriber, synchronously and in
    /// subscription order.
    ///
    /// Returns the number of deliveries; `Ok(0)` for an out-of-range topic.
    ///
    /// # Errors
    /// - `HubError::KindMismatch` if the payload kind is not the topic's kind.
    /// - `HubError::Notify` with the first subscriber fault.
    pub fn publish_state_change(
        &self,
        topic: impl Into<TopicId>,
        payload: impl Into<Payload>,
    ) -> Result<usize, HubError> {
        let id = topic.into();
        let Some(broker) = self.broker(id) else {
            self.record_drop(id, "publish");
            return Ok(0);
        };
        let delivered = broker.notify(&payload.into())?;
        self.published.set(self.published.get() + 1);
        Ok(delivered)
    }

    /// Publish through a typed topic handle. The value type is checked at
    /// compile time.
    #[inline]
    pub fn publish<T: PayloadValue>(&self, topic: TypedTopic<T>, value: T) -> Result<usize, HubError> {
        self.publish_state_change(topic.topic(), value)
    }

    /// Per-cycle update: derive the operating phase from `signals` and publish
    /// it if it changed.
    ///
    /// Returns the new phase when a change was published. The phase is
    /// updated before publishing, so a subscriber fault does not cause the
    /// same change to be published again next cycle.
    pub fn run(&mut self, signals: ModeSignals) -> Result<Option<OperatingPhase>, HubError> {
        let phase = OperatingPhase::derive(signals, self.phase);
        if phase == self.phase {
            return Ok(None);
        }

        debug!(from = %self.phase, to = %phase, "operating phase changed");
        self.phase = phase;
        self.publish(topics::GAME_PHASE, phase.as_i32())?;
        Ok(Some(phase))
    }

    /// Phase derived on the most recent [`run`](Self::run).
    #[inline]
    pub fn phase(&self) -> OperatingPhase {
        self.phase
    }

    /// Live subscribers registered for `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.brokers[topic.index()].live_subscribers()
    }

    /// Remove registrations of dropped subscribers on every topic.
    pub fn prune(&mut self) -> usize {
        self.brokers.iter_mut().map(Broker::prune).sum()
    }

    /// Publishes that reached every subscriber of their topic. Rejected,
    /// faulted and out-of-range publishes are not counted.
    #[inline]
    pub fn published(&self) -> u64 {
        self.published.get()
    }

    /// Registrations and publishes dropped for an out-of-range topic.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }
}

impl Default for StateChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
