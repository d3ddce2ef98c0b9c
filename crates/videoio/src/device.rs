// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::channel::{Channel, ChannelState};
use crate::channel_id::ChannelId;
use crate::config::Config;
use crate::cycle::CycleConfig;
use crate::driver::{DeviceInfo, Driver, DriverError, DriverSession};
use crate::mode::{FormatDescriptor, VideoMode};
use crate::rational::Rational;
use crate::setup::{SetupDescriptor, SignalLink};
use crate::{DeviceId, Error};

enum Slot {
    Negotiating,
    Open(Arc<Channel>),
}

/// One physical card and the channels currently open on it.
///
/// Channel bookkeeping sits behind a reader/writer lock: opening and closing
/// take it exclusively for the map update only, while DMA and VBI calls take
/// it shared just long enough to clone the channel out. A channel closed
/// while another thread is inside one of its DMA calls is released when that
/// call returns.
pub struct Device {
    id: DeviceId,
    info: DeviceInfo,
    config: Config,
    session: DriverSession,
    channels: RwLock<HashMap<ChannelId, Slot>>,
}

impl Device {
    /// Attach to card `id` and read its serial number and type.
    pub fn attach(driver: Arc<dyn Driver>, id: DeviceId, config: Config) -> Result<Self, Error> {
        let session = DriverSession::attach(driver, id)?;
        let info = session.device_info()?;
        log::debug!("Device {} is {} ({})", id, info.serial, info.card_type);

        Ok(Device {
            id,
            info,
            config,
            session,
            channels: RwLock::new(HashMap::new()),
        })
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn serial(&self) -> &str {
        &self.info.serial
    }

    /// Card type reported by the driver, used as the display name.
    pub fn name(&self) -> &str {
        &self.info.card_type
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn driver(&self) -> &Arc<dyn Driver> {
        self.session.driver()
    }

    fn read_channels(&self) -> RwLockReadGuard<'_, HashMap<ChannelId, Slot>> {
        self.channels.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_channels(&self) -> RwLockWriteGuard<'_, HashMap<ChannelId, Slot>> {
        self.channels.write().unwrap_or_else(|p| p.into_inner())
    }

    /// True when `channel` is an input and a usable single-link format can
    /// be negotiated for it right now.
    pub fn can_accept_input(&self, channel: ChannelId) -> bool {
        channel.is_input() && self.negotiate_input(channel).is_ok()
    }

    /// Work out the format the card would capture on `channel`.
    ///
    /// The signal is detected first; when detection fails or reports no mode the
    /// driver's recommendation is used. Only single-link signals are accepted.
    pub fn negotiate_input_setup(&self, channel: ChannelId) -> Result<FormatDescriptor, Error> {
        let setup = self.negotiate_input(channel)?;
        setup.format().ok_or(Error::NegotiationFailed {
            channel,
            source: DriverError::INVALID_DATA,
        })
    }

    pub(crate) fn negotiate_input(&self, channel: ChannelId) -> Result<SetupDescriptor, Error> {
        if !channel.is_input() {
            return Err(Error::WrongDirection(channel));
        }

        let mut setup = self.driver().default_input_setup(self.id, channel);
        // a detection that reports no mode counts as no signal
        let detected = self
            .session
            .detect_input_setup(&mut setup)
            .and_then(|()| setup.mode.map(|_| ()).ok_or(DriverError::INVALID_DATA));
        if let Err(detect) = detected {
            log::debug!("{} on {}: no signal detected ({})", channel, self.serial(), detect);
            setup = self.driver().default_input_setup(self.id, channel);
            self.session
                .recommended_input_setup(&mut setup)
                .map_err(|source| Error::NegotiationFailed { channel, source })?;
        }

        if setup.link != SignalLink::SingleLink {
            return Err(Error::LinkTypeUnsupported {
                channel,
                link: setup.link,
            });
        }
        if setup.mode.is_none() {
            return Err(Error::NegotiationFailed {
                channel,
                source: DriverError::INVALID_DATA,
            });
        }

        setup.apply_policy();
        Ok(setup)
    }

    /// Bring `channel` up, replacing any channel already open on that id.
    ///
    /// `mode` is required for outputs and ignored for inputs, which always
    /// run in the negotiated mode. On failure the channel is left closed.
    pub fn open_channel(&self, channel: ChannelId, mode: Option<VideoMode>) -> Result<(), Error> {
        let previous = {
            let mut channels = self.write_channels();
            channels.insert(channel, Slot::Negotiating)
        };
        // the old session detaches here, outside the lock
        drop(previous);

        let cycle = self.config.cycle_for(channel.direction());
        let opened = Channel::open(self, channel, mode, cycle);

        let mut channels = self.write_channels();
        match opened {
            Ok(ch) => {
                log::info!("{} on {} opened: {}", channel, self.serial(), ch.format());
                channels.insert(channel, Slot::Open(Arc::new(ch)));
                Ok(())
            }
            Err(err) => {
                channels.remove(&channel);
                Err(err)
            }
        }
    }

    /// Close `channel`; closing a channel that is not open is a no-op.
    pub fn close_channel(&self, channel: ChannelId) {
        let removed = self.write_channels().remove(&channel);
        if let Some(Slot::Open(_)) = removed {
            log::info!("{} on {} closed", channel, self.serial());
        }
    }

    pub fn channel_state(&self, channel: ChannelId) -> ChannelState {
        match self.read_channels().get(&channel) {
            None => ChannelState::Closed,
            Some(Slot::Negotiating) => ChannelState::Negotiating,
            Some(Slot::Open(_)) => ChannelState::Open,
        }
    }

    /// Ids of every open channel, in id order.
    pub fn open_channels(&self) -> Vec<ChannelId> {
        let mut ids: Vec<ChannelId> = self
            .read_channels()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Open(_)))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// The open channel for `channel`.
    pub fn channel(&self, channel: ChannelId) -> Result<Arc<Channel>, Error> {
        match self.read_channels().get(&channel) {
            Some(Slot::Open(ch)) => Ok(ch.clone()),
            _ => Err(Error::ChannelNotOpen(channel)),
        }
    }

    pub fn channel_format(&self, channel: ChannelId) -> Result<FormatDescriptor, Error> {
        Ok(self.channel(channel)?.format())
    }

    pub fn delta_seconds(&self, channel: ChannelId) -> Result<Rational, Error> {
        Ok(self.channel(channel)?.delta_seconds())
    }

    pub fn cycle_config(&self, channel: ChannelId) -> Result<CycleConfig, Error> {
        Ok(self.channel(channel)?.cycle_config())
    }

    /// See [`Channel::dma_write_frame`].
    pub fn dma_write(&self, channel: ChannelId, slot: u32, buffer: &[u8]) -> Result<usize, Error> {
        self.channel(channel)?.dma_write_frame(slot, buffer)
    }

    /// See [`Channel::dma_read_frame`].
    pub fn dma_read(
        &self,
        channel: ChannelId,
        arm_slot: u32,
        read_slot: u32,
        buffer: &mut [u8],
    ) -> Result<usize, Error> {
        self.channel(channel)?
            .dma_read_frame(arm_slot, read_slot, buffer)
    }

    /// Wait for the next vertical blank of `channel`, returns the updated
    /// field counter.
    pub fn wait_vbi(&self, channel: ChannelId) -> Result<u64, Error> {
        self.channel(channel)?.wait_vbi()
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("serial", &self.info.serial)
            .field("card_type", &self.info.card_type)
            .field("open_channels", &self.open_channels())
            .finish()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.info.card_type, self.info.serial)
    }
}
