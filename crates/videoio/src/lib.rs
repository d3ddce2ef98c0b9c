// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! VideoIO Library for Rust
//!
//! Channel management and VBI-paced DMA for multi-channel SDI
//! capture/playback cards.
//!
//! The library enumerates the cards present once, negotiates a video format
//! per logical channel, and drives a cyclic multi-buffer DMA pipeline so that
//! hardware transfer latency overlaps with the host pipeline re-invoking its
//! nodes once per frame.
//!
//! # Quick Start
//!
//! ## Playback
//!
//! ```no_run
//! use std::sync::Arc;
//! use videoio::{ChannelId, DeviceRegistry, DmaCycle, SysDriver, VideoMode};
//!
//! let registry = DeviceRegistry::new(Arc::new(SysDriver::load()?));
//! let device = registry.get_by_id(1).ok_or("no card")?;
//! device.open_channel(ChannelId::Output1, Some(VideoMode::Hd1080p50))?;
//!
//! let mut cycle = DmaCycle::new(device.cycle_config(ChannelId::Output1)?);
//! let frame = vec![0u8; device.channel_format(ChannelId::Output1)?.frame_size()];
//! loop {
//!     device.dma_write(ChannelId::Output1, cycle.write_slot(), &frame)?;
//!     cycle.advance();
//!     device.wait_vbi(ChannelId::Output1)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Simulation
//!
//! ```
//! use std::sync::Arc;
//! use videoio::mock::{MockCard, MockDriver};
//! use videoio::{ChannelId, DeviceRegistry, VideoMode};
//!
//! let driver = MockDriver::new()
//!     .with_card(MockCard::new("SN0001", "Simulated 8-channel").with_input(ChannelId::Input1, VideoMode::Hd1080i50));
//! let registry = DeviceRegistry::new(Arc::new(driver));
//! let device = registry.get("SN0001").unwrap();
//! assert!(device.can_accept_input(ChannelId::Input1));
//! assert!(!device.can_accept_input(ChannelId::Input2));
//! ```
//!
//! # Features
//!
//! - Lazy, idempotent card enumeration indexed by serial number
//! - Input format negotiation with detect/recommend fallback
//! - Exact `/1001` frame-rate arithmetic for scheduling
//! - Independent slot rotation per channel with pipelined capture
//! - Dropped-frame detection from the card's field counter

use std::{error, fmt};
use videoio_sys as ffi;

/// Numeric card identifier assigned by the driver, starting at 1.
pub type DeviceId = i32;

/// Error type for VideoIO library operations
#[derive(Debug)]
pub enum Error {
    /// The driver shim (libvideoio_driver.so) could not be loaded at runtime
    LibraryNotLoaded(ffi::libloading::Error),

    /// Driver call failed outside of a channel operation (e.g. enumeration)
    Driver(driver::DriverError),

    /// No card with the given serial number or id is registered
    DeviceNotFound(String),

    /// The channel descriptor does not name a device and a channel
    ChannelNotSelected,

    /// No channel is open for the given id
    ChannelNotOpen(ChannelId),

    /// Operation not available for the channel's direction
    WrongDirection(ChannelId),

    /// Playback channels need an explicit video mode
    ModeRequired(ChannelId),

    /// Neither signal detection nor the recommended setup produced a usable format,
    /// or the driver rejected the setup
    NegotiationFailed {
        channel: ChannelId,
        source: driver::DriverError,
    },

    /// The signal uses a transport other than single-link
    LinkTypeUnsupported {
        channel: ChannelId,
        link: setup::SignalLink,
    },

    /// Slot rotation constants are inconsistent with each other or the card
    InvalidCycle(String),

    /// Attaching a driver session failed
    AttachFailed {
        device_id: DeviceId,
        source: driver::DriverError,
    },

    /// Detaching a driver session failed
    DetachFailed {
        device_id: DeviceId,
        source: driver::DriverError,
    },

    /// The driver refused an asynchronous DMA transfer
    DmaSubmitFailed {
        channel: ChannelId,
        slot: u32,
        source: driver::DriverError,
    },

    /// The card refused to play out a written slot
    RenderCommitFailed {
        channel: ChannelId,
        slot: u32,
        source: driver::DriverError,
    },

    /// The card refused to capture into a slot
    CaptureArmFailed {
        channel: ChannelId,
        slot: u32,
        source: driver::DriverError,
    },

    /// Waiting for the vertical blank failed
    SyncWaitFailed {
        channel: ChannelId,
        source: driver::DriverError,
    },

    /// No frame buffer was supplied
    EmptyBuffer,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::LibraryNotLoaded(err) => {
                write!(f, "VideoIO driver library could not be loaded: {}", err)
            }
            Error::Driver(err) => write!(f, "Driver error: {}", err),
            Error::DeviceNotFound(key) => write!(f, "No such device: {}", key),
            Error::ChannelNotSelected => write!(f, "No device channel selected"),
            Error::ChannelNotOpen(ch) => write!(f, "Channel {} not open", ch),
            Error::WrongDirection(ch) => {
                write!(f, "Operation not supported on {} channel {}", ch.direction(), ch)
            }
            Error::ModeRequired(ch) => write!(f, "Channel {} needs a video mode", ch),
            Error::NegotiationFailed { channel, source } => {
                write!(f, "Format negotiation failed on {}: {}", channel, source)
            }
            Error::LinkTypeUnsupported { channel, link } => write!(
                f,
                "Unable to open {}: {} signals are not supported, only SingleLink",
                channel, link
            ),
            Error::InvalidCycle(msg) => write!(f, "Invalid DMA cycle: {}", msg),
            Error::AttachFailed { device_id, source } => {
                write!(f, "Attach to device {} failed: {}", device_id, source)
            }
            Error::DetachFailed { device_id, source } => {
                write!(f, "Detach from device {} failed: {}", device_id, source)
            }
            Error::DmaSubmitFailed {
                channel,
                slot,
                source,
            } => write!(f, "DMA on {} slot {} failed: {}", channel, slot, source),
            Error::RenderCommitFailed {
                channel,
                slot,
                source,
            } => write!(
                f,
                "Render buffer update on {} slot {} failed: {}",
                channel, slot, source
            ),
            Error::CaptureArmFailed {
                channel,
                slot,
                source,
            } => write!(
                f,
                "Capture buffer update on {} slot {} failed: {}",
                channel, slot, source
            ),
            Error::SyncWaitFailed { channel, source } => {
                write!(f, "Wait for VBI on {} failed: {}", channel, source)
            }
            Error::EmptyBuffer => write!(f, "No frame buffer supplied"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::LibraryNotLoaded(err) => Some(err),
            Error::Driver(err) => Some(err),
            Error::NegotiationFailed { source, .. }
            | Error::AttachFailed { source, .. }
            | Error::DetachFailed { source, .. }
            | Error::DmaSubmitFailed { source, .. }
            | Error::RenderCommitFailed { source, .. }
            | Error::CaptureArmFailed { source, .. }
            | Error::SyncWaitFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ffi::libloading::Error> for Error {
    fn from(err: ffi::libloading::Error) -> Self {
        Error::LibraryNotLoaded(err)
    }
}

impl From<driver::DriverError> for Error {
    fn from(err: driver::DriverError) -> Self {
        Error::Driver(err)
    }
}

/// The rational module provides exact frame-rate arithmetic.
pub mod rational;

/// The mode module provides the video mode table and format descriptors.
pub mod mode;

/// The channel_id module provides logical channel identifiers.
pub mod channel_id;

/// The setup module provides driver setup descriptors and the transport policy.
pub mod setup;

/// The driver module provides the hardware boundary and its implementations.
pub mod driver;

/// The config module provides registry-wide settings.
pub mod config;

/// The cycle module provides DMA slot rotation.
pub mod cycle;

/// The registry module provides card enumeration and lookup.
pub mod registry;

/// The device module provides per-card channel management.
pub mod device;

/// The channel module provides the negotiated channel and its DMA calls.
pub mod channel;

/// The schedule module provides host scheduling and drop detection.
pub mod schedule;

/// The node module provides the per-execution logic of host pipeline nodes.
pub mod node;

/// The mock module provides a simulated driver.
pub mod mock;

pub use channel::{Channel, ChannelState};
pub use channel_id::{ChannelId, Direction};
pub use config::Config;
pub use cycle::{CycleConfig, DmaCycle};
pub use device::Device;
pub use driver::{Driver, DriverError, DriverSession, SysDriver};
pub use mode::{FormatDescriptor, VideoMode};
pub use rational::{FrameRate, Rational};
pub use registry::DeviceRegistry;
