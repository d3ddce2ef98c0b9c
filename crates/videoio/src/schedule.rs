// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Host scheduling hints and dropped-frame accounting.

use std::fmt;

use crate::rational::Rational;

/// How the host decides when to run a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleType {
    /// Run only when the node asks for it, once per requested count.
    #[default]
    OnDemand,
}

/// Scheduling request a node hands to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleInfo {
    pub importance: u32,
    /// Seconds between executions.
    pub delta_seconds: Rational,
    pub schedule_type: ScheduleType,
}

impl fmt::Display for ScheduleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "importance {} every {}s ({:?})",
            self.importance, self.delta_seconds, self.schedule_type
        )
    }
}

/// Tracks the interval reported to the host for one node and notices when
/// the channel's frame rate changes underneath it.
///
/// ```
/// use videoio::rational::Rational;
/// use videoio::schedule::ScheduleBridge;
///
/// let mut bridge = ScheduleBridge::new(1);
/// assert!(bridge.update(Rational::new(1, 50)));
/// assert!(!bridge.update(Rational::new(1, 50)));
/// assert!(bridge.update(Rational::new(1001, 60000)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleBridge {
    importance: u32,
    delta_seconds: Rational,
}

impl ScheduleBridge {
    pub fn new(importance: u32) -> Self {
        ScheduleBridge {
            importance,
            delta_seconds: Rational::default(),
        }
    }

    pub fn schedule_info(&self) -> ScheduleInfo {
        ScheduleInfo {
            importance: self.importance,
            delta_seconds: self.delta_seconds,
            schedule_type: ScheduleType::OnDemand,
        }
    }

    pub fn delta_seconds(&self) -> Rational {
        self.delta_seconds
    }

    /// Record the channel's current interval. Returns true when it differs
    /// from the last one reported, meaning the host must recompile the node.
    pub fn update(&mut self, delta_seconds: Rational) -> bool {
        if self.delta_seconds == delta_seconds {
            return false;
        }
        log::debug!(
            "Frame interval changed from {} to {}",
            self.delta_seconds,
            delta_seconds
        );
        self.delta_seconds = delta_seconds;
        true
    }
}

/// Frames lost between two field counter readings.
///
/// Consecutive frames advance the counter by 2 when `interlaced`, by 1
/// otherwise. Partial frames are not counted.
///
/// ```
/// use videoio::schedule::dropped_frames;
///
/// assert_eq!(dropped_frames(10, 12, true), 0);
/// assert_eq!(dropped_frames(10, 13, true), 0);
/// assert_eq!(dropped_frames(10, 16, false), 5);
/// ```
pub fn dropped_frames(previous: u64, current: u64, interlaced: bool) -> u64 {
    let expected = if interlaced { 2 } else { 1 };
    let delta = current.saturating_sub(previous);
    if delta > expected {
        delta / expected - 1
    } else {
        0
    }
}

/// Remembers the last field counter of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropDetector {
    last: Option<u64>,
}

impl DropDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the counter returned by a VBI wait, returns the frames dropped
    /// since the previous reading. The first reading never reports drops.
    pub fn observe(&mut self, field_count: u64, interlaced: bool) -> u64 {
        let dropped = self
            .last
            .map_or(0, |last| dropped_frames(last, field_count, interlaced));
        self.last = Some(field_count);
        dropped
    }

    pub fn last(&self) -> Option<u64> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
