// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::fmt;

use crate::channel_id::{ChannelId, Direction};
use crate::cycle::CycleConfig;
use crate::device::Device;
use crate::driver::{DriverError, DriverSession};
use crate::mode::{FormatDescriptor, VideoMode};
use crate::rational::{FrameRate, Rational};
use crate::setup::SetupDescriptor;
use crate::Error;

/// Lifecycle state of a channel slot on a [`Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    /// Reserved while the format is being negotiated; DMA calls see it as closed.
    Negotiating,
    Open,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Closed => "closed",
            ChannelState::Negotiating => "negotiating",
            ChannelState::Open => "open",
        };
        write!(f, "{}", name)
    }
}

/// One open logical channel with its own driver session.
///
/// The format stored here is authoritative: for inputs it is whatever the
/// card negotiated, regardless of the mode asked for when opening.
pub struct Channel {
    id: ChannelId,
    session: DriverSession,
    setup: SetupDescriptor,
    format: FormatDescriptor,
    cycle: CycleConfig,
}

impl Channel {
    /// Attach a new session and bring `id` up on `device`.
    ///
    /// Inputs negotiate their format (see [`Device::negotiate_input_setup`]),
    /// outputs start from the driver's defaults for `mode` with the transport
    /// policy applied. In both cases the driver validates the setup before it
    /// is applied to the new session.
    pub(crate) fn open(
        device: &Device,
        id: ChannelId,
        mode: Option<VideoMode>,
        cycle: CycleConfig,
    ) -> Result<Self, Error> {
        let session = DriverSession::attach(device.driver().clone(), device.id())?;

        let setup = match id.direction() {
            Direction::Input => device.negotiate_input(id)?,
            Direction::Output => {
                let mode = mode.ok_or(Error::ModeRequired(id))?;
                let mut setup = session.driver().default_output_setup(device.id(), id, mode);
                setup.mode = Some(mode);
                setup.apply_policy();
                setup
            }
        };
        let format = setup.format().ok_or(Error::NegotiationFailed {
            channel: id,
            source: DriverError::INVALID_DATA,
        })?;

        match id.direction() {
            Direction::Input => {
                cycle.validate_capture(session.capture_latency_fields(), format.fields_per_frame())?
            }
            Direction::Output => cycle.validate_playback()?,
        }

        let negotiation = |source| Error::NegotiationFailed { channel: id, source };
        session.driver().validate_setup(&setup).map_err(negotiation)?;
        session.apply_setup(id.direction(), &setup).map_err(negotiation)?;

        log::debug!(
            "Opened {} on {}: {} ({} bytes per frame, cycle {})",
            id,
            device.serial(),
            format,
            format.frame_size(),
            cycle
        );

        Ok(Channel {
            id,
            session,
            setup,
            format,
            cycle,
        })
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.id.direction()
    }

    pub fn setup(&self) -> &SetupDescriptor {
        &self.setup
    }

    pub fn format(&self) -> FormatDescriptor {
        self.format
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.format.frame_rate
    }

    /// Seconds between frames, handed to the host scheduler.
    pub fn delta_seconds(&self) -> Rational {
        self.format.frame_rate.delta_seconds()
    }

    pub fn cycle_config(&self) -> CycleConfig {
        self.cycle
    }

    fn expect_direction(&self, direction: Direction) -> Result<(), Error> {
        if self.direction() != direction {
            return Err(Error::WrongDirection(self.id));
        }
        Ok(())
    }

    fn check_slot(&self, slot: u32) -> Result<(), Error> {
        if slot >= self.cycle.depth {
            return Err(Error::InvalidCycle(format!(
                "slot {} outside cycle depth {} of {}",
                slot, self.cycle.depth, self.id
            )));
        }
        Ok(())
    }

    /// Queue `buffer` into `slot` and commit the slot for playout at the next
    /// interrupt. Returns the number of bytes queued.
    ///
    /// A failed commit is reported after the transfer was queued; the
    /// transfer is not rolled back.
    pub fn dma_write_frame(&self, slot: u32, buffer: &[u8]) -> Result<usize, Error> {
        self.expect_direction(Direction::Output)?;
        self.check_slot(slot)?;
        let driver = self.session.driver();

        let bytes = driver
            .dma_write_async(self.session.handle(), buffer, slot)
            .map_err(|source| {
                log::error!("DMA write on {} slot {} failed: {}", self.id, slot, source);
                Error::DmaSubmitFailed {
                    channel: self.id,
                    slot,
                    source,
                }
            })?;

        driver
            .commit_render_buffer(self.session.handle(), slot)
            .map_err(|source| {
                log::error!(
                    "Render buffer update on {} slot {} failed: {}",
                    self.id,
                    slot,
                    source
                );
                Error::RenderCommitFailed {
                    channel: self.id,
                    slot,
                    source,
                }
            })?;

        log::trace!("{} wrote {} bytes to slot {}", self.id, bytes, slot);
        Ok(bytes)
    }

    /// Arm `arm_slot` for capture, then read the previously armed
    /// `read_slot` into `buffer`. Returns the number of bytes queued.
    pub fn dma_read_frame(&self, arm_slot: u32, read_slot: u32, buffer: &mut [u8]) -> Result<usize, Error> {
        self.expect_direction(Direction::Input)?;
        self.check_slot(arm_slot)?;
        self.check_slot(read_slot)?;
        let driver = self.session.driver();

        driver
            .arm_capture_buffer(self.session.handle(), arm_slot)
            .map_err(|source| {
                log::error!(
                    "Capture buffer update on {} slot {} failed: {}",
                    self.id,
                    arm_slot,
                    source
                );
                Error::CaptureArmFailed {
                    channel: self.id,
                    slot: arm_slot,
                    source,
                }
            })?;

        let bytes = driver
            .dma_read_async(self.session.handle(), buffer, read_slot)
            .map_err(|source| {
                log::error!("DMA read on {} slot {} failed: {}", self.id, read_slot, source);
                Error::DmaSubmitFailed {
                    channel: self.id,
                    slot: read_slot,
                    source,
                }
            })?;

        log::trace!("{} read {} bytes from slot {}", self.id, bytes, read_slot);
        Ok(bytes)
    }

    /// Block until the next vertical blank of this channel, returns the
    /// card's field counter.
    pub fn wait_vbi(&self) -> Result<u64, Error> {
        self.session
            .driver()
            .wait_field_sync(self.session.handle(), self.direction())
            .map_err(|source| Error::SyncWaitFailed {
                channel: self.id,
                source,
            })
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("device_id", &self.session.device_id())
            .field("format", &self.format)
            .field("cycle", &self.cycle)
            .finish()
    }
}
