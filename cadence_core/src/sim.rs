//! Scripted host for running the core without a driver station.

use cadence_common::config::{SimConfig, SimMode, SimSegment};
use cadence_common::phase::ModeSignals;
use tracing::debug;

use crate::cycle::ModeSource;

/// Mode source replaying a fixed timeline of `{mode, cycles}` segments.
///
/// Once every segment has been consumed the source reports
/// [`finished`](ModeSource::finished); further `signals()` calls keep
/// returning the last segment's signals (or disabled for an empty timeline).
#[derive(Debug, Clone)]
pub struct ScriptedModeSource {
    timeline: Vec<SimSegment>,
    segment: usize,
    remaining: u32,
    consumed: u64,
}

impl ScriptedModeSource {
    pub fn new(timeline: Vec<SimSegment>) -> Self {
        let remaining = timeline.first().map_or(0, |s| s.cycles);
        let mut source = Self {
            timeline,
            segment: 0,
            remaining,
            consumed: 0,
        };
        source.skip_empty();
        source
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.timeline.clone())
    }

    /// Mode of the segment the next `signals()` call will come from.
    pub fn current_mode(&self) -> Option<SimMode> {
        self.timeline.get(self.segment).map(|s| s.mode)
    }

    /// Cycles handed out so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn skip_empty(&mut self) {
        while self.remaining == 0 && self.segment < self.timeline.len() {
            self.segment += 1;
            self.remaining = self.timeline.get(self.segment).map_or(0, |s| s.cycles);
        }
    }
}

impl ModeSource for ScriptedModeSource {
    fn signals(&mut self) -> ModeSignals {
        let Some(segment) = self.timeline.get(self.segment) else {
            return self
                .timeline
                .last()
                .map_or(ModeSignals::empty(), |s| s.mode.signals());
        };

        let signals = segment.mode.signals();
        if self.remaining == segment.cycles {
            debug!(segment = self.segment, mode = ?segment.mode, cycles = segment.cycles, "sim segment started");
        }
        self.remaining -= 1;
        self.consumed += 1;
        self.skip_empty();
        signals
    }

    fn finished(&self) -> bool {
        self.segment >= self.timeline.len()
    }
}
