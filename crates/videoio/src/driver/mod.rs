// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video I/O driver boundary.
//!
//! The [`Driver`] trait is the complete set of hardware calls the channel
//! machinery needs. Every call returns an explicit `Result`; the raw vendor
//! status travels inside [`DriverError`].
//!
//! Two implementations ship with the crate:
//!
//! - [`SysDriver`] forwards to the runtime-loaded driver shim (`videoio-sys`)
//! - [`crate::mock::MockDriver`] simulates cards in memory for tests and the
//!   CLI `--simulate` mode

use std::{error, fmt};

use crate::channel_id::{ChannelId, Direction};
use crate::mode::VideoMode;
use crate::setup::SetupDescriptor;
use crate::DeviceId;

mod session;
mod sys;

pub use session::DriverSession;
pub use sys::SysDriver;

/// Raw status returned by the driver, never `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverError(pub i64);

impl DriverError {
    /// Status reported when the driver returned data the crate cannot map.
    pub const INVALID_DATA: DriverError = DriverError(-22);

    pub fn code(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "driver status {}", self.0)
    }
}

impl error::Error for DriverError {}

/// Opaque attach handle issued by [`Driver::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// Static information about an attached card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
    pub card_type: String,
}

/// Capture latency assumed when a driver does not report one.
pub const DEFAULT_CAPTURE_LATENCY_FIELDS: u32 = 2;

/// Hardware calls used by the device and channel layer.
///
/// Implementations must be callable from the control thread and from the
/// per-channel DMA threads at the same time.
pub trait Driver: Send + Sync {
    /// Number of cards present; device ids run from 1 to the count.
    fn enumerate(&self) -> Result<u32, DriverError>;

    fn attach(&self, device_id: DeviceId) -> Result<SessionHandle, DriverError>;

    fn detach(&self, handle: SessionHandle) -> Result<(), DriverError>;

    fn device_info(&self, handle: SessionHandle) -> Result<DeviceInfo, DriverError>;

    fn default_input_setup(&self, device_id: DeviceId, channel: ChannelId) -> SetupDescriptor;

    fn default_output_setup(
        &self,
        device_id: DeviceId,
        channel: ChannelId,
        mode: VideoMode,
    ) -> SetupDescriptor;

    /// Fill `setup` from the signal currently present on the input.
    fn detect_input_setup(
        &self,
        handle: SessionHandle,
        setup: &mut SetupDescriptor,
    ) -> Result<(), DriverError>;

    /// Fill `setup` with the driver's recommendation for the input.
    fn recommended_input_setup(
        &self,
        handle: SessionHandle,
        setup: &mut SetupDescriptor,
    ) -> Result<(), DriverError>;

    fn validate_setup(&self, setup: &SetupDescriptor) -> Result<(), DriverError>;

    fn apply_input_setup(
        &self,
        handle: SessionHandle,
        setup: &SetupDescriptor,
    ) -> Result<(), DriverError>;

    fn apply_output_setup(
        &self,
        handle: SessionHandle,
        setup: &SetupDescriptor,
    ) -> Result<(), DriverError>;

    /// Queue a host-to-card transfer of `buffer` into `slot`, returns bytes queued.
    fn dma_write_async(
        &self,
        handle: SessionHandle,
        buffer: &[u8],
        slot: u32,
    ) -> Result<usize, DriverError>;

    /// Queue a card-to-host transfer of `slot` into `buffer`, returns bytes queued.
    fn dma_read_async(
        &self,
        handle: SessionHandle,
        buffer: &mut [u8],
        slot: u32,
    ) -> Result<usize, DriverError>;

    /// Play `slot` out at the next interrupt.
    fn commit_render_buffer(&self, handle: SessionHandle, slot: u32) -> Result<(), DriverError>;

    /// Capture the next frame into `slot`.
    fn arm_capture_buffer(&self, handle: SessionHandle, slot: u32) -> Result<(), DriverError>;

    /// Block until the next field boundary, returns the field counter.
    fn wait_field_sync(
        &self,
        handle: SessionHandle,
        direction: Direction,
    ) -> Result<u64, DriverError>;

    /// Fields that pass between arming a capture slot and the slot being readable.
    fn capture_latency_fields(&self, _handle: SessionHandle) -> u32 {
        DEFAULT_CAPTURE_LATENCY_FIELDS
    }
}
