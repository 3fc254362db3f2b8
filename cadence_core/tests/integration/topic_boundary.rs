//! Integration test: topic resolution, ordering and fault propagation at the
//! hub boundary.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_common::payload::{Payload, PayloadKind};
use cadence_common::topic::{Topic, TopicId, topics};
use cadence_core::broker::StateChangeSubscriber;
use cadence_core::error::{HubError, NotifyError, SubscriberFault};
use cadence_core::hub::StateChangeHub;

use super::common::Recorder;

#[test]
fn every_out_of_range_id_is_ignored() {
    let mut hub = StateChangeHub::new();
    let recorder = Recorder::shared();

    for raw in [Topic::RANGE_END, Topic::RANGE_END + 1, 1000, u16::MAX] {
        assert_eq!(hub.register_for_state_changes(&recorder, TopicId(raw)), Ok(false));
        assert_eq!(hub.publish_state_change(TopicId(raw), true), Ok(0));
    }
    assert!(recorder.borrow().seen.is_empty());
    assert_eq!(hub.dropped(), 8);
}

#[test]
fn raw_ids_in_range_resolve() {
    let mut hub = StateChangeHub::new();
    let recorder = Recorder::shared();
    let id = TopicId::from(Topic::VisionTargetVisible);

    assert_eq!(hub.register_for_state_changes(&recorder, id), Ok(true));
    assert_eq!(hub.publish_state_change(id, true), Ok(1));
    assert_eq!(
        recorder.borrow().seen,
        [(Topic::VisionTargetVisible, Payload::Bool(true))]
    );
}

#[test]
fn duplicate_registration_yields_duplicate_deliveries_in_order() {
    let mut hub = StateChangeHub::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    struct Tagged(&'static str, Rc<RefCell<Vec<&'static str>>>);
    impl StateChangeSubscriber for Tagged {
        fn on_state_change(&mut self, _: Topic, _: &Payload) -> Result<(), SubscriberFault> {
            self.1.borrow_mut().push(self.0);
            Ok(())
        }
    }

    let a = Rc::new(RefCell::new(Tagged("a", Rc::clone(&log))));
    let b = Rc::new(RefCell::new(Tagged("b", Rc::clone(&log))));
    hub.register_for_state_changes(&a, Topic::BatteryVoltage).unwrap();
    hub.register_for_state_changes(&b, Topic::BatteryVoltage).unwrap();
    hub.register_for_state_changes(&a, Topic::BatteryVoltage).unwrap();

    assert_eq!(hub.publish(topics::BATTERY_VOLTAGE, 12.4), Ok(3));
    assert_eq!(*log.borrow(), ["a", "b", "a"]);
    assert_eq!(hub.subscriber_count(Topic::BatteryVoltage), 3);
}

#[test]
fn first_fault_reaches_the_publisher() {
    let mut hub = StateChangeHub::new();

    struct Refuses;
    impl StateChangeSubscriber for Refuses {
        fn on_state_change(&mut self, _: Topic, _: &Payload) -> Result<(), SubscriberFault> {
            Err(SubscriberFault::new("brownout"))
        }
    }

    let first = Recorder::shared();
    let refuses = Rc::new(RefCell::new(Refuses));
    let last = Recorder::shared();
    hub.register_for_state_changes(&first, Topic::MatchTimeRemaining).unwrap();
    hub.register_for_state_changes(&refuses, Topic::MatchTimeRemaining).unwrap();
    hub.register_for_state_changes(&last, Topic::MatchTimeRemaining).unwrap();

    let err = hub.publish(topics::MATCH_TIME_REMAINING, 15.0).unwrap_err();
    assert!(matches!(
        err,
        HubError::Notify(NotifyError::Subscriber { position: 1, .. })
    ));
    assert_eq!(first.borrow().seen.len(), 1);
    assert!(last.borrow().seen.is_empty());
}

#[test]
fn kind_checked_on_both_sides() {
    let mut hub = StateChangeHub::new();

    struct BoolsOnly;
    impl StateChangeSubscriber for BoolsOnly {
        fn on_state_change(&mut self, _: Topic, _: &Payload) -> Result<(), SubscriberFault> {
            Ok(())
        }
        fn accepts(&self, kind: PayloadKind) -> bool {
            kind == PayloadKind::Bool
        }
    }

    let bools = Rc::new(RefCell::new(BoolsOnly));
    assert!(matches!(
        hub.register_for_state_changes(&bools, Topic::ChassisSpeed),
        Err(HubError::KindRejected { .. })
    ));
    assert_eq!(hub.register_for_state_changes(&bools, Topic::ClimbArmed), Ok(true));

    assert!(matches!(
        hub.publish_state_change(Topic::ClimbArmed, 3_i32),
        Err(HubError::KindMismatch {
            expected: PayloadKind::Bool,
            actual: PayloadKind::Int,
            ..
        })
    ));
}
