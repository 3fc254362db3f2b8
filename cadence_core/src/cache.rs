//! Latest-value cache subscriber.
//!
//! Lets a subsystem read state published by other subsystems without holding
//! references to them: register one `TopicCache` for the topics of interest
//! and query it from state logic.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_common::payload::{Payload, PayloadValue};
use cadence_common::topic::{Topic, TypedTopic};

use crate::broker::StateChangeSubscriber;
use crate::error::{HubError, SubscriberFault};
use crate::hub::StateChangeHub;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    latest: Option<Payload>,
    updates: u64,
}

/// Latest payload per topic plus an update counter.
#[derive(Debug, Clone)]
pub struct TopicCache {
    slots: [Slot; Topic::COUNT],
}

impl TopicCache {
    pub fn new() -> Self {
        Self {
            slots: [Slot::default(); Topic::COUNT],
        }
    }

    /// Create a shared cache registered on every topic in `topics`.
    pub fn subscribe(
        hub: &mut StateChangeHub,
        topics: &[Topic],
    ) -> Result<Rc<RefCell<Self>>, HubError> {
        let cache = Rc::new(RefCell::new(Self::new()));
        for &topic in topics {
            hub.register_for_state_changes(&cache, topic)?;
        }
        Ok(cache)
    }

    /// Latest payload seen on `topic`.
    pub fn get(&self, topic: Topic) -> Option<Payload> {
        self.slots[topic.index()].latest
    }

    /// Latest value seen on `topic`, typed.
    pub fn get_typed<T: PayloadValue>(&self, topic: TypedTopic<T>) -> Option<T> {
        self.get(topic.topic())
            .and_then(|payload| T::from_payload(&payload))
    }

    /// Number of publishes received on `topic`.
    pub fn updates(&self, topic: Topic) -> u64 {
        self.slots[topic.index()].updates
    }

    pub fn clear(&mut self) {
        self.slots = [Slot::default(); Topic::COUNT];
    }
}

impl Default for TopicCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StateChangeSubscriber for TopicCache {
    fn on_state_change(&mut self, topic: Topic, payload: &Payload) -> Result<(), SubscriberFault> {
        let slot = &mut self.slots[topic.index()];
        slot.latest = Some(*payload);
        slot.updates += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_common::payload::{Angle, Length, Pose2d};
    use cadence_common::topic::topics;

    #[test]
    fn keeps_latest_value_per_topic() {
        let mut hub = StateChangeHub::new();
        let cache = TopicCache::subscribe(&mut hub, &[Topic::ArmAngle, Topic::ChassisPose]).unwrap();

        hub.publish(topics::ARM_ANGLE, Angle::from_degrees(10.0)).unwrap();
        hub.publish(topics::ARM_ANGLE, Angle::from_degrees(45.0)).unwrap();
        let pose = Pose2d::new(
            Length::from_meters(1.0),
            Length::from_meters(2.0),
            Angle::from_degrees(90.0),
        );
        hub.publish(topics::CHASSIS_POSE, pose).unwrap();

        let cache = cache.borrow();
        let arm = cache.get_typed(topics::ARM_ANGLE).unwrap();
        assert!((arm.degrees() - 45.0).abs() < 1e-9);
        assert_eq!(cache.updates(Topic::ArmAngle), 2);
        assert_eq!(cache.get_typed(topics::CHASSIS_POSE), Some(pose));
    }

    #[test]
    fn unsubscribed_topics_stay_empty() {
        let mut hub = StateChangeHub::new();
        let cache = TopicCache::subscribe(&mut hub, &[Topic::GamePieceHeld]).unwrap();

        hub.publish(topics::CLIMB_ARMED, true).unwrap();
        assert_eq!(cache.borrow().get(Topic::ClimbArmed), None);
        assert_eq!(cache.borrow().updates(Topic::ClimbArmed), 0);
    }

    #[test]
    fn clear_resets_slots() {
        let mut cache = TopicCache::new();
        cache.on_state_change(Topic::ScoringMode, &Payload::Int(3)).unwrap();
        assert_eq!(cache.get_typed(topics::SCORING_MODE), Some(3));
        cache.clear();
        assert_eq!(cache.get(Topic::ScoringMode), None);
    }
}
