// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::channel_id::Direction;
use crate::cycle::CycleConfig;

/// Settings shared by every device of a registry.
///
/// ```
/// use videoio::config::Config;
/// use videoio::cycle::CycleConfig;
///
/// let config = Config::default().with_input_cycle(CycleConfig::new(2, 1));
/// assert_eq!(config.input_cycle().depth, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// slot rotation of capture channels
    input_cycle: CycleConfig,

    /// slot rotation of playback channels
    output_cycle: CycleConfig,

    /// importance reported to the host scheduler
    importance: u32,
}

impl Config {
    pub fn with_input_cycle(self, input_cycle: CycleConfig) -> Config {
        Config {
            input_cycle,
            ..self
        }
    }

    pub fn with_output_cycle(self, output_cycle: CycleConfig) -> Config {
        Config {
            output_cycle,
            ..self
        }
    }

    pub fn with_importance(self, importance: u32) -> Config {
        Config { importance, ..self }
    }

    pub fn input_cycle(&self) -> CycleConfig {
        self.input_cycle
    }

    pub fn output_cycle(&self) -> CycleConfig {
        self.output_cycle
    }

    pub fn cycle_for(&self, direction: Direction) -> CycleConfig {
        match direction {
            Direction::Input => self.input_cycle,
            Direction::Output => self.output_cycle,
        }
    }

    pub fn importance(&self) -> u32 {
        self.importance
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            input_cycle: CycleConfig::capture(),
            output_cycle: CycleConfig::playback(),
            importance: 1,
        }
    }
}
