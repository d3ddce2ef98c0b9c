// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Channel setup descriptors exchanged with the driver.

use std::fmt;

use crate::channel_id::ChannelId;
use crate::mode::{FormatDescriptor, VideoMode};
use crate::DeviceId;

/// Physical transport of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum SignalLink {
    #[default]
    SingleLink = 1,
    DualLink = 2,
    QuadLink = 4,
}

impl SignalLink {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(SignalLink::SingleLink),
            2 => Some(SignalLink::DualLink),
            4 => Some(SignalLink::QuadLink),
            _ => None,
        }
    }
}

impl fmt::Display for SignalLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalLink::SingleLink => write!(f, "SingleLink"),
            SignalLink::DualLink => write!(f, "DualLink"),
            SignalLink::QuadLink => write!(f, "QuadLink"),
        }
    }
}

/// Chroma sampling of the transported signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum Sampling {
    #[default]
    Yuv422 = 1,
    Yuv444 = 2,
    Rgb444 = 3,
}

impl Sampling {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Sampling::Yuv422),
            2 => Some(Sampling::Yuv444),
            3 => Some(Sampling::Rgb444),
            _ => None,
        }
    }
}

/// Card-side video engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum VideoEngine {
    /// Host-managed frame buffers transferred by DMA.
    #[default]
    Framestore = 1,
    Playthrough = 2,
}

impl VideoEngine {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(VideoEngine::Framestore),
            2 => Some(VideoEngine::Playthrough),
            _ => None,
        }
    }
}

/// Layout of frames in host memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum MemoryFormat {
    /// 8-bit packed 4:2:2, Cb Y0 Cr Y1.
    #[default]
    Cbycry8 = 1,
    Bgra8 = 2,
    V210 = 3,
}

impl MemoryFormat {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(MemoryFormat::Cbycry8),
            2 => Some(MemoryFormat::Bgra8),
            3 => Some(MemoryFormat::V210),
            _ => None,
        }
    }
}

/// Full setup of one channel as understood by the driver.
///
/// `mode` is `None` until the driver has detected or been told a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupDescriptor {
    pub device_id: DeviceId,
    pub channel: ChannelId,
    pub mode: Option<VideoMode>,
    pub link: SignalLink,
    pub sampling: Sampling,
    pub engine: VideoEngine,
    pub memory_format: MemoryFormat,
}

impl SetupDescriptor {
    pub fn new(device_id: DeviceId, channel: ChannelId, mode: Option<VideoMode>) -> Self {
        SetupDescriptor {
            device_id,
            channel,
            mode,
            link: SignalLink::default(),
            sampling: Sampling::default(),
            engine: VideoEngine::default(),
            memory_format: MemoryFormat::default(),
        }
    }

    /// Force the transport policy every channel runs with: single-link,
    /// 4:2:2 sampling, framestore engine and 8-bit packed frames.
    pub fn apply_policy(&mut self) {
        self.link = SignalLink::SingleLink;
        self.sampling = Sampling::Yuv422;
        self.engine = VideoEngine::Framestore;
        self.memory_format = MemoryFormat::Cbycry8;
    }

    pub fn format(&self) -> Option<FormatDescriptor> {
        self.mode.map(FormatDescriptor::from_mode)
    }
}
