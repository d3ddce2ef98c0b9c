// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Buffer-slot bookkeeping for the cyclic DMA pipelines.
//!
//! Each channel rotates through `depth` card-side buffer slots. Playback
//! writes into the current slot and advances by one per transferred frame.
//! Capture arms the slot `pipeline_depth` ahead of the current one and reads
//! the current one, which was armed `pipeline_depth` cycles earlier and has
//! therefore passed through the card's internal transfer latency.

use std::fmt;

use crate::Error;

/// Largest number of slots a channel may rotate through.
pub const MAX_CYCLE_DEPTH: u32 = 16;

/// Slot rotation constants of one channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    /// Number of slots rotated.
    pub depth: u32,
    /// Cycles between arming a capture slot and reading it. Unused for playback.
    pub pipeline_depth: u32,
}

impl CycleConfig {
    pub const fn new(depth: u32, pipeline_depth: u32) -> Self {
        CycleConfig {
            depth,
            pipeline_depth,
        }
    }

    /// Playback rotation: four slots, no capture offset.
    pub const fn playback() -> Self {
        CycleConfig::new(4, 0)
    }

    /// Capture rotation: four slots, arm two cycles ahead.
    pub const fn capture() -> Self {
        CycleConfig::new(4, 2)
    }

    /// Check the rotation for a playback channel.
    pub fn validate_playback(&self) -> Result<(), Error> {
        if self.depth < 2 || self.depth > MAX_CYCLE_DEPTH {
            return Err(Error::InvalidCycle(format!(
                "cycle depth {} outside 2..={}",
                self.depth, MAX_CYCLE_DEPTH
            )));
        }
        Ok(())
    }

    /// Check the rotation for a capture channel against the declared capture
    /// latency of the card.
    ///
    /// The offset must be at least one cycle, must leave the read slot
    /// distinct from the armed slot, and must span at least
    /// `latency_fields` fields given `fields_per_frame` fields per cycle.
    pub fn validate_capture(&self, latency_fields: u32, fields_per_frame: u32) -> Result<(), Error> {
        self.validate_playback()?;
        if self.pipeline_depth == 0 || self.pipeline_depth >= self.depth {
            return Err(Error::InvalidCycle(format!(
                "pipeline depth {} must be in 1..{}",
                self.pipeline_depth, self.depth
            )));
        }
        let covered = self.pipeline_depth * fields_per_frame.max(1);
        if covered < latency_fields {
            return Err(Error::InvalidCycle(format!(
                "pipeline depth {} covers {} fields, card needs {}",
                self.pipeline_depth, covered, latency_fields
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CycleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth {} / pipeline {}", self.depth, self.pipeline_depth)
    }
}

/// Current position in a channel's slot rotation.
///
/// Owned by the single thread driving DMA for one channel; two threads must
/// never share a cycle for the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaCycle {
    config: CycleConfig,
    index: u32,
}

impl DmaCycle {
    pub fn new(config: CycleConfig) -> Self {
        DmaCycle { config, index: 0 }
    }

    pub fn config(&self) -> CycleConfig {
        self.config
    }

    /// Always in `0..depth`.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot written by the next playback transfer.
    pub fn write_slot(&self) -> u32 {
        self.index
    }

    /// Slot armed for capture this cycle.
    pub fn arm_slot(&self) -> u32 {
        (self.index + self.config.pipeline_depth) % self.config.depth
    }

    /// Slot read out this cycle, armed `pipeline_depth` cycles earlier.
    pub fn read_slot(&self) -> u32 {
        self.index
    }

    /// Move to the next slot after a successful transfer, returns the new index.
    pub fn advance(&mut self) -> u32 {
        self.index = (self.index + 1) % self.config.depth;
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_index_is_k_mod_depth() {
        for depth in [2u32, 3, 4, 8] {
            let mut cycle = DmaCycle::new(CycleConfig::new(depth, 0));
            for k in 1..=50u32 {
                cycle.advance();
                assert_eq!(cycle.index(), k % depth);
            }
        }
    }

    #[test]
    fn test_post_increment_sequence() {
        let mut cycle = DmaCycle::new(CycleConfig::playback());
        let observed: Vec<u32> = (0..5).map(|_| cycle.advance()).collect();
        assert_eq!(observed, vec![1, 2, 3, 0, 1]);
    }

    #[test]
    fn test_arm_leads_read_by_pipeline_depth() {
        let mut cycle = DmaCycle::new(CycleConfig::capture());
        let mut armed = Vec::new();
        for _ in 0..12 {
            assert_eq!(cycle.arm_slot(), (cycle.index() + 2) % 4);
            armed.push(cycle.arm_slot());
            // slot read now was armed two cycles ago
            if armed.len() > 2 {
                assert_eq!(cycle.read_slot(), armed[armed.len() - 3]);
            }
            cycle.advance();
        }
    }

    #[test]
    fn test_legacy_two_slot_capture() {
        let mut cycle = DmaCycle::new(CycleConfig::new(2, 1));
        assert_eq!((cycle.arm_slot(), cycle.read_slot()), (1, 0));
        cycle.advance();
        assert_eq!((cycle.arm_slot(), cycle.read_slot()), (0, 1));
    }

    #[test]
    fn test_validate() {
        assert!(CycleConfig::playback().validate_playback().is_ok());
        assert!(CycleConfig::new(1, 0).validate_playback().is_err());
        assert!(CycleConfig::new(32, 0).validate_playback().is_err());

        assert!(CycleConfig::capture().validate_capture(2, 1).is_ok());
        assert!(CycleConfig::capture().validate_capture(4, 2).is_ok());
        assert!(CycleConfig::capture().validate_capture(3, 1).is_err());
        assert!(CycleConfig::new(2, 1).validate_capture(2, 2).is_ok());
        assert!(CycleConfig::new(2, 1).validate_capture(2, 1).is_err());
        assert!(CycleConfig::new(4, 0).validate_capture(0, 1).is_err());
        assert!(CycleConfig::new(4, 4).validate_capture(0, 1).is_err());
    }

    #[test]
    fn test_reset() {
        let mut cycle = DmaCycle::new(CycleConfig::playback());
        cycle.advance();
        cycle.advance();
        cycle.reset();
        assert_eq!(cycle.index(), 0);
    }
}
