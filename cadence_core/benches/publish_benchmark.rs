//! Publish fan-out benchmark: one typed publish delivered to N subscribers.
//!
//! Measures the synchronous delivery path (topic resolution, kind check,
//! weak upgrade, borrow, callback) that every state change goes through.

use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use cadence_common::payload::{Length, Payload};
use cadence_common::topic::{Topic, TopicId, topics};
use cadence_core::broker::StateChangeSubscriber;
use cadence_core::error::SubscriberFault;
use cadence_core::hub::StateChangeHub;

/// Minimal subscriber: accumulates the published height.
#[derive(Default)]
struct Sink {
    sum_m: f64,
}

impl StateChangeSubscriber for Sink {
    fn on_state_change(&mut self, _topic: Topic, payload: &Payload) -> Result<(), SubscriberFault> {
        if let Payload::Length(height) = payload {
            self.sum_m += height.meters();
        }
        Ok(())
    }
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fan_out");
    group.significance_level(0.01);

    for &n_subscribers in &[1usize, 4, 8, 16, 32] {
        let mut hub = StateChangeHub::new();
        let sinks: Vec<Rc<RefCell<Sink>>> = (0..n_subscribers)
            .map(|_| Rc::new(RefCell::new(Sink::default())))
            .collect();
        for sink in &sinks {
            hub.register_for_state_changes(sink, Topic::ElevatorHeight)
                .unwrap();
        }

        let mut step = 0u32;
        group.bench_with_input(
            BenchmarkId::new("subscribers", n_subscribers),
            &n_subscribers,
            |b, &_n| {
                b.iter(|| {
                    step = step.wrapping_add(1);
                    let height = Length::from_meters(f64::from(step % 100) * 0.01);
                    hub.publish(topics::ELEVATOR_HEIGHT, black_box(height))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_dropped_publish(c: &mut Criterion) {
    let hub = StateChangeHub::new();
    c.bench_function("publish_out_of_range", |b| {
        b.iter(|| {
            hub.publish_state_change(black_box(TopicId(Topic::RANGE_END)), true)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_fan_out, bench_dropped_publish);
criterion_main!(benches);
