// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video mode table and format descriptors.
//!
//! The table covers the SD, HD and single-link UHD broadcast modes the cards
//! can be configured for. Every mode carries its raster, scan type and the
//! integer fps plus `/1001` flag from which the exact [`FrameRate`] is derived.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::rational::FrameRate;

/// Scan type of a video mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scan {
    Progressive,
    Interlaced,
    /// Progressive segmented frame, a progressive picture carried as two fields.
    Psf,
}

/// Broadcast video modes.
///
/// Raw values are the identifiers used by the driver shim; 0 is reserved for
/// "no mode".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum VideoMode {
    Sd625i50 = 1,
    Sd525i5994 = 2,
    Hd720p50 = 3,
    Hd720p5994 = 4,
    Hd720p60 = 5,
    Hd1080i50 = 6,
    Hd1080i5994 = 7,
    Hd1080i60 = 8,
    Hd1080p2398 = 9,
    Hd1080p24 = 10,
    Hd1080p25 = 11,
    Hd1080p2997 = 12,
    Hd1080p30 = 13,
    Hd1080p50 = 14,
    Hd1080p5994 = 15,
    Hd1080p60 = 16,
    Hd1080psf2398 = 17,
    Hd1080psf24 = 18,
    Hd1080psf25 = 19,
    Dci2048p24 = 20,
    Dci2048p25 = 21,
    Dci2048p30 = 22,
    Uhd2160p2398 = 23,
    Uhd2160p24 = 24,
    Uhd2160p25 = 25,
    Uhd2160p2997 = 26,
    Uhd2160p30 = 27,
    Uhd2160p50 = 28,
    Uhd2160p5994 = 29,
    Uhd2160p60 = 30,
}

struct ModeInfo {
    name: &'static str,
    width: u32,
    height: u32,
    fps: u32,
    fractional: bool,
    scan: Scan,
}

const fn info(
    name: &'static str,
    width: u32,
    height: u32,
    fps: u32,
    fractional: bool,
    scan: Scan,
) -> ModeInfo {
    ModeInfo {
        name,
        width,
        height,
        fps,
        fractional,
        scan,
    }
}

impl VideoMode {
    /// Every mode in the table, in raw-id order.
    pub const ALL: [VideoMode; 30] = [
        VideoMode::Sd625i50,
        VideoMode::Sd525i5994,
        VideoMode::Hd720p50,
        VideoMode::Hd720p5994,
        VideoMode::Hd720p60,
        VideoMode::Hd1080i50,
        VideoMode::Hd1080i5994,
        VideoMode::Hd1080i60,
        VideoMode::Hd1080p2398,
        VideoMode::Hd1080p24,
        VideoMode::Hd1080p25,
        VideoMode::Hd1080p2997,
        VideoMode::Hd1080p30,
        VideoMode::Hd1080p50,
        VideoMode::Hd1080p5994,
        VideoMode::Hd1080p60,
        VideoMode::Hd1080psf2398,
        VideoMode::Hd1080psf24,
        VideoMode::Hd1080psf25,
        VideoMode::Dci2048p24,
        VideoMode::Dci2048p25,
        VideoMode::Dci2048p30,
        VideoMode::Uhd2160p2398,
        VideoMode::Uhd2160p24,
        VideoMode::Uhd2160p25,
        VideoMode::Uhd2160p2997,
        VideoMode::Uhd2160p30,
        VideoMode::Uhd2160p50,
        VideoMode::Uhd2160p5994,
        VideoMode::Uhd2160p60,
    ];

    fn info(&self) -> ModeInfo {
        use Scan::*;
        match self {
            VideoMode::Sd625i50 => info("625i50", 720, 576, 25, false, Interlaced),
            VideoMode::Sd525i5994 => info("525i59.94", 720, 486, 30, true, Interlaced),
            VideoMode::Hd720p50 => info("720p50", 1280, 720, 50, false, Progressive),
            VideoMode::Hd720p5994 => info("720p59.94", 1280, 720, 60, true, Progressive),
            VideoMode::Hd720p60 => info("720p60", 1280, 720, 60, false, Progressive),
            VideoMode::Hd1080i50 => info("1080i50", 1920, 1080, 25, false, Interlaced),
            VideoMode::Hd1080i5994 => info("1080i59.94", 1920, 1080, 30, true, Interlaced),
            VideoMode::Hd1080i60 => info("1080i60", 1920, 1080, 30, false, Interlaced),
            VideoMode::Hd1080p2398 => info("1080p23.98", 1920, 1080, 24, true, Progressive),
            VideoMode::Hd1080p24 => info("1080p24", 1920, 1080, 24, false, Progressive),
            VideoMode::Hd1080p25 => info("1080p25", 1920, 1080, 25, false, Progressive),
            VideoMode::Hd1080p2997 => info("1080p29.97", 1920, 1080, 30, true, Progressive),
            VideoMode::Hd1080p30 => info("1080p30", 1920, 1080, 30, false, Progressive),
            VideoMode::Hd1080p50 => info("1080p50", 1920, 1080, 50, false, Progressive),
            VideoMode::Hd1080p5994 => info("1080p59.94", 1920, 1080, 60, true, Progressive),
            VideoMode::Hd1080p60 => info("1080p60", 1920, 1080, 60, false, Progressive),
            VideoMode::Hd1080psf2398 => info("1080psf23.98", 1920, 1080, 24, true, Psf),
            VideoMode::Hd1080psf24 => info("1080psf24", 1920, 1080, 24, false, Psf),
            VideoMode::Hd1080psf25 => info("1080psf25", 1920, 1080, 25, false, Psf),
            VideoMode::Dci2048p24 => info("2048p24", 2048, 1080, 24, false, Progressive),
            VideoMode::Dci2048p25 => info("2048p25", 2048, 1080, 25, false, Progressive),
            VideoMode::Dci2048p30 => info("2048p30", 2048, 1080, 30, false, Progressive),
            VideoMode::Uhd2160p2398 => info("2160p23.98", 3840, 2160, 24, true, Progressive),
            VideoMode::Uhd2160p24 => info("2160p24", 3840, 2160, 24, false, Progressive),
            VideoMode::Uhd2160p25 => info("2160p25", 3840, 2160, 25, false, Progressive),
            VideoMode::Uhd2160p2997 => info("2160p29.97", 3840, 2160, 30, true, Progressive),
            VideoMode::Uhd2160p30 => info("2160p30", 3840, 2160, 30, false, Progressive),
            VideoMode::Uhd2160p50 => info("2160p50", 3840, 2160, 50, false, Progressive),
            VideoMode::Uhd2160p5994 => info("2160p59.94", 3840, 2160, 60, true, Progressive),
            VideoMode::Uhd2160p60 => info("2160p60", 3840, 2160, 60, false, Progressive),
        }
    }

    /// Convert from the raw shim value, `None` for 0 or unknown ids.
    pub fn from_raw(raw: u32) -> Option<Self> {
        VideoMode::ALL.iter().copied().find(|mode| *mode as u32 == raw)
    }

    pub fn raw(&self) -> u32 {
        *self as u32
    }

    /// Short broadcast name, e.g. `1080p59.94`.
    pub fn name(&self) -> &'static str {
        self.info().name
    }

    pub fn width(&self) -> u32 {
        self.info().width
    }

    /// Frame height (both fields for interlaced modes).
    pub fn height(&self) -> u32 {
        self.info().height
    }

    /// Integer frames per second before the `/1001` adjustment.
    pub fn fps(&self) -> u32 {
        self.info().fps
    }

    /// Whether the mode runs at `fps * 1000 / 1001`.
    pub fn is_fractional(&self) -> bool {
        self.info().fractional
    }

    pub fn scan(&self) -> Scan {
        self.info().scan
    }

    pub fn is_progressive(&self) -> bool {
        self.scan() == Scan::Progressive
    }

    pub fn is_psf(&self) -> bool {
        self.scan() == Scan::Psf
    }

    /// PsF modes are carried as fields on the wire.
    pub fn is_interlaced(&self) -> bool {
        !self.is_progressive()
    }

    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::from_fps(self.fps(), self.is_fractional())
    }
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a mode name is not in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVideoMode(pub String);

impl fmt::Display for UnknownVideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown video mode: {}", self.0)
    }
}

impl std::error::Error for UnknownVideoMode {}

impl FromStr for VideoMode {
    type Err = UnknownVideoMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        VideoMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| UnknownVideoMode(s.to_string()))
    }
}

/// Negotiated format of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub mode: VideoMode,
    pub width: u32,
    pub height: u32,
    pub interlaced: bool,
    pub frame_rate: FrameRate,
}

impl FormatDescriptor {
    pub fn from_mode(mode: VideoMode) -> Self {
        FormatDescriptor {
            mode,
            width: mode.width(),
            height: mode.height(),
            interlaced: mode.is_interlaced(),
            frame_rate: mode.frame_rate(),
        }
    }

    /// Bytes of one 8-bit 4:2:2 frame: two pixels share one 4-byte macropixel.
    pub fn frame_size(&self) -> usize {
        (self.width as usize >> 1) * self.height as usize * 4
    }

    /// Field counter increments per frame: 2 when interlaced, 1 otherwise.
    pub fn fields_per_frame(&self) -> u32 {
        if self.interlaced {
            2
        } else {
            1
        }
    }
}

impl From<VideoMode> for FormatDescriptor {
    fn from(mode: VideoMode) -> Self {
        FormatDescriptor::from_mode(mode)
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} {} @ {}",
            self.mode,
            self.width,
            self.height,
            if self.interlaced {
                "interlaced"
            } else {
                "progressive"
            },
            self.frame_rate
        )
    }
}

/// All formats sharing one frame rate within a [`FormatGroup`].
#[derive(Debug, Clone)]
pub struct RateGroup {
    pub frame_rate: FrameRate,
    pub formats: Vec<FormatDescriptor>,
}

/// All formats sharing one raster.
#[derive(Debug, Clone)]
pub struct FormatGroup {
    pub width: u32,
    pub height: u32,
    pub rates: Vec<RateGroup>,
}

/// Enumerate output formats grouped by raster, then by frame rate.
///
/// PsF modes are skipped; rasters ascend by width then height and rates
/// ascend numerically.
pub fn enumerate_formats() -> Vec<FormatGroup> {
    let mut by_extent: BTreeMap<(u32, u32), Vec<RateGroup>> = BTreeMap::new();

    for mode in VideoMode::ALL.iter().copied().filter(|m| !m.is_psf()) {
        let desc = FormatDescriptor::from_mode(mode);
        let rates = by_extent.entry((desc.width, desc.height)).or_default();
        match rates.iter_mut().find(|g| g.frame_rate == desc.frame_rate) {
            Some(group) => group.formats.push(desc),
            None => rates.push(RateGroup {
                frame_rate: desc.frame_rate,
                formats: vec![desc],
            }),
        }
    }

    by_extent
        .into_iter()
        .map(|((width, height), mut rates)| {
            rates.sort_by(|a, b| {
                let lhs = a.frame_rate.dividend as u64 * b.frame_rate.divisor as u64;
                let rhs = b.frame_rate.dividend as u64 * a.frame_rate.divisor as u64;
                lhs.cmp(&rhs)
            });
            FormatGroup {
                width,
                height,
                rates,
            }
        })
        .collect()
}
