// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::fmt;
use std::str::FromStr;

/// Signal direction of a channel, derived from its [`ChannelId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Input => "Input",
            Direction::Output => "Output",
        }
    }

    /// Raw direction value understood by the driver shim.
    pub fn raw(&self) -> u32 {
        match self {
            Direction::Input => videoio_sys::VIO_DIRECTION_INPUT,
            Direction::Output => videoio_sys::VIO_DIRECTION_OUTPUT,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Logical video channel of a card.
///
/// Cards expose up to eight outputs and eight inputs. The direction is a
/// property of the identifier itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ChannelId {
    Output1 = 0,
    Output2 = 1,
    Output3 = 2,
    Output4 = 3,
    Output5 = 4,
    Output6 = 5,
    Output7 = 6,
    Output8 = 7,
    Input1 = 8,
    Input2 = 9,
    Input3 = 10,
    Input4 = 11,
    Input5 = 12,
    Input6 = 13,
    Input7 = 14,
    Input8 = 15,
}

impl ChannelId {
    /// Number of channels per direction.
    pub const PER_DIRECTION: u8 = 8;

    pub const ALL: [ChannelId; 16] = [
        ChannelId::Output1,
        ChannelId::Output2,
        ChannelId::Output3,
        ChannelId::Output4,
        ChannelId::Output5,
        ChannelId::Output6,
        ChannelId::Output7,
        ChannelId::Output8,
        ChannelId::Input1,
        ChannelId::Input2,
        ChannelId::Input3,
        ChannelId::Input4,
        ChannelId::Input5,
        ChannelId::Input6,
        ChannelId::Input7,
        ChannelId::Input8,
    ];

    pub fn from_raw(raw: u32) -> Option<Self> {
        ChannelId::ALL.get(raw as usize).copied()
    }

    pub fn raw(&self) -> u32 {
        *self as u32
    }

    /// Build from a direction and a 1-based channel number.
    pub fn new(direction: Direction, number: u8) -> Option<Self> {
        if number == 0 || number > Self::PER_DIRECTION {
            return None;
        }
        let base = match direction {
            Direction::Output => 0,
            Direction::Input => Self::PER_DIRECTION as u32,
        };
        ChannelId::from_raw(base + number as u32 - 1)
    }

    pub fn direction(&self) -> Direction {
        if self.raw() >= Self::PER_DIRECTION as u32 {
            Direction::Input
        } else {
            Direction::Output
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction() == Direction::Input
    }

    /// 1-based channel number within its direction.
    pub fn number(&self) -> u8 {
        (self.raw() % Self::PER_DIRECTION as u32) as u8 + 1
    }

    /// Human-readable name, e.g. "Input Ch 3".
    pub fn name(&self) -> String {
        format!("{} Ch {}", self.direction(), self.number())
    }

    pub fn inputs() -> impl Iterator<Item = ChannelId> {
        ChannelId::ALL.into_iter().filter(|c| c.is_input())
    }

    pub fn outputs() -> impl Iterator<Item = ChannelId> {
        ChannelId::ALL.into_iter().filter(|c| !c.is_input())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a channel name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChannel(pub String);

impl fmt::Display for UnknownChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown channel: {}", self.0)
    }
}

impl std::error::Error for UnknownChannel {}

/// Accepts "input3", "in3", "output1", "out1" and the display form "Input Ch 3".
impl FromStr for ChannelId {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        let (direction, rest) = if let Some(rest) = compact.strip_prefix("output") {
            (Direction::Output, rest)
        } else if let Some(rest) = compact.strip_prefix("out") {
            (Direction::Output, rest)
        } else if let Some(rest) = compact.strip_prefix("input") {
            (Direction::Input, rest)
        } else if let Some(rest) = compact.strip_prefix("in") {
            (Direction::Input, rest)
        } else {
            return Err(UnknownChannel(s.to_string()));
        };

        let digits = rest.strip_prefix("ch").unwrap_or(rest);
        digits
            .parse::<u8>()
            .ok()
            .and_then(|n| ChannelId::new(direction, n))
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_is_derived_from_id() {
        assert_eq!(ChannelId::Output1.direction(), Direction::Output);
        assert_eq!(ChannelId::Output8.direction(), Direction::Output);
        assert_eq!(ChannelId::Input1.direction(), Direction::Input);
        assert_eq!(ChannelId::Input8.direction(), Direction::Input);
        assert_eq!(ChannelId::inputs().count(), 8);
        assert_eq!(ChannelId::outputs().count(), 8);
    }

    #[test]
    fn test_numbers_and_names() {
        assert_eq!(ChannelId::Input3.number(), 3);
        assert_eq!(ChannelId::Output8.number(), 8);
        assert_eq!(ChannelId::Input3.name(), "Input Ch 3");
        assert_eq!(ChannelId::Output1.to_string(), "Output Ch 1");
    }

    #[test]
    fn test_new_bounds() {
        assert_eq!(ChannelId::new(Direction::Input, 2), Some(ChannelId::Input2));
        assert_eq!(ChannelId::new(Direction::Output, 8), Some(ChannelId::Output8));
        assert_eq!(ChannelId::new(Direction::Output, 0), None);
        assert_eq!(ChannelId::new(Direction::Input, 9), None);
    }

    #[test]
    fn test_raw_round_trip() {
        for ch in ChannelId::ALL {
            assert_eq!(ChannelId::from_raw(ch.raw()), Some(ch));
        }
        assert_eq!(ChannelId::from_raw(16), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("input3".parse(), Ok(ChannelId::Input3));
        assert_eq!("in1".parse(), Ok(ChannelId::Input1));
        assert_eq!("out2".parse(), Ok(ChannelId::Output2));
        assert_eq!("Output Ch 4".parse(), Ok(ChannelId::Output4));
        assert!("output9".parse::<ChannelId>().is_err());
        assert!("aux1".parse::<ChannelId>().is_err());
    }
}
