//! Per-topic subscriber list and synchronous fan-out.
//!
//! A [`Broker`] holds non-owning references to every subscriber registered
//! for one topic, in registration order. Subscribers are owned by their
//! subsystems; a subscriber that has been dropped is skipped on delivery.
//!
//! Delivery is synchronous on the calling thread. The first failing
//! subscriber aborts the remaining deliveries of that `notify` call and its
//! fault is returned to the publisher.

use std::cell::RefCell;
use std::rc::Weak;

use cadence_common::consts::MAX_SUBSCRIBERS_PER_TOPIC;
use cadence_common::payload::{Payload, PayloadKind};
use cadence_common::topic::Topic;

use crate::error::{HubError, NotifyError, SubscriberFault};

/// Receiver of state changes for the topics it registered for.
pub trait StateChangeSubscriber {
    /// Called once per publish on every topic this subscriber registered for
    /// (once per registration).
    ///
    /// The payload kind is the one bound to `topic`.
    fn on_state_change(&mut self, topic: Topic, payload: &Payload) -> Result<(), SubscriberFault>;

    /// Whether this subscriber can handle payloads of `kind`.
    ///
    /// Checked once at registration time against the topic's bound kind.
    fn accepts(&self, kind: PayloadKind) -> bool {
        let _ = kind;
        true
    }
}

/// Non-owning subscriber reference held by a broker.
pub type SubscriberRef = Weak<RefCell<dyn StateChangeSubscriber>>;

/// Subscriber list and fan-out for one topic.
pub struct Broker {
    topic: Topic,
    subscribers: heapless::Vec<SubscriberRef, MAX_SUBSCRIBERS_PER_TOPIC>,
}

impl Broker {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            subscribers: heapless::Vec::new(),
        }
    }

    #[inline]
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Append a subscriber. Duplicates are kept and notified once per entry.
    ///
    /// # Errors
    /// `HubError::CapacityExhausted` when the pre-allocated list is full.
    pub fn add_subscriber(&mut self, subscriber: SubscriberRef) -> Result<(), HubError> {
        self.subscribers
            .push(subscriber)
            .map_err(|_| HubError::CapacityExhausted {
                topic: self.topic,
                capacity: MAX_SUBSCRIBERS_PER_TOPIC,
            })
    }

    /// Deliver `payload` to every live subscriber in registration order.
    ///
    /// Returns the number of deliveries made.
    ///
    /// # Errors
    /// - `HubError::KindMismatch` if `payload` is not of the topic's kind
    ///   (nothing is delivered).
    /// - `HubError::Notify` with the first subscriber fault; subscribers after
    ///   it are not notified.
    pub fn notify(&self, payload: &Payload) -> Result<usize, HubError> {
        let expected = self.topic.kind();
        if payload.kind() != expected {
            return Err(HubError::KindMismatch {
                topic: self.topic,
                expected,
                actual: payload.kind(),
            });
        }

        let mut delivered = 0;
        for (position, weak) in self.subscribers.iter().enumerate() {
            let Some(strong) = weak.upgrade() else {
                continue;
            };
            let mut subscriber = strong
                .try_borrow_mut()
                .map_err(|_| NotifyError::Reentrant { topic: self.topic })?;
            subscriber
                .on_state_change(self.topic, payload)
                .map_err(|source| NotifyError::Subscriber {
                    topic: self.topic,
                    position,
                    source,
                })?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Number of registrations, including ones whose subscriber was dropped.
    #[inline]
    pub fn registrations(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of registrations whose subscriber is still alive.
    pub fn live_subscribers(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    /// Drop registrations of subscribers that no longer exist.
    ///
    /// Returns the number of registrations removed.
    pub fn prune(&mut self) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.strong_count() > 0);
        before - self.subscribers.len()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
