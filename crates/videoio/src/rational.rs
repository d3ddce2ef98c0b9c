// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Rational frame rates and frame periods.
//!
//! Broadcast rates such as 59.94 Hz are exactly `60000/1001` and cannot be
//! represented by a float without drift, so both the rate of a channel and
//! the period handed to the host scheduler are kept as integer pairs.
//!
//! Orientation is fixed: a [`FrameRate`] is always *frames per second*
//! (`dividend / divisor`, e.g. `60000 / 1001`), and [`FrameRate::delta_seconds`]
//! is always *seconds per frame* (`1001 / 60000`).

use std::fmt;

/// Plain `numerator / denominator` pair, not reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Rational {
            numerator,
            denominator,
        }
    }

    /// Zero denominators evaluate to 0.0 rather than infinity.
    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0 || self.denominator == 0
    }

    pub const fn recip(self) -> Self {
        Rational {
            numerator: self.denominator,
            denominator: self.numerator,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Frames per second of a video mode as `dividend / divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRate {
    pub dividend: u32,
    pub divisor: u32,
}

impl FrameRate {
    /// Derive the exact rate from the integer fps of a mode and whether it
    /// is one of the NTSC-derived `/1001` rates.
    ///
    /// ```
    /// use videoio::rational::FrameRate;
    ///
    /// let rate = FrameRate::from_fps(60, true);
    /// assert_eq!((rate.dividend, rate.divisor), (60000, 1001));
    ///
    /// let rate = FrameRate::from_fps(25, false);
    /// assert_eq!((rate.dividend, rate.divisor), (25, 1));
    /// ```
    pub const fn from_fps(fps: u32, fractional: bool) -> Self {
        if fractional {
            FrameRate {
                dividend: fps * 1000,
                divisor: 1001,
            }
        } else {
            FrameRate {
                dividend: fps,
                divisor: 1,
            }
        }
    }

    pub fn as_rational(&self) -> Rational {
        Rational::new(self.dividend, self.divisor)
    }

    /// Seconds per frame, the value exposed to the host scheduler.
    pub fn delta_seconds(&self) -> Rational {
        self.as_rational().recip()
    }

    pub fn fps(&self) -> f64 {
        self.as_rational().as_f64()
    }

    pub fn is_fractional(&self) -> bool {
        self.divisor == 1001
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.fps())
    }
}
