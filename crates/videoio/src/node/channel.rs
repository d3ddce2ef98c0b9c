// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use super::{ChannelInfo, Host, NodeId, StatusKind, StatusMessage};
use crate::channel_id::{ChannelId, Direction};
use crate::mode::VideoMode;
use crate::registry::DeviceRegistry;
use crate::{DeviceId, Error};

/// Which channel directions a [`ChannelNode`] may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionCapability {
    InputOnly,
    OutputOnly,
    #[default]
    Both,
}

impl DirectionCapability {
    pub fn allows(&self, direction: Direction) -> bool {
        match self {
            DirectionCapability::InputOnly => direction == Direction::Input,
            DirectionCapability::OutputOnly => direction == Direction::Output,
            DirectionCapability::Both => true,
        }
    }
}

/// Owns the open/close lifecycle of one channel on behalf of the host.
///
/// Runs on the host's control thread. Any DMA node using the same channel
/// must be stopped by the host before the descriptor changes.
#[derive(Debug)]
pub struct ChannelNode {
    id: NodeId,
    capability: DirectionCapability,
    info: ChannelInfo,
}

impl ChannelNode {
    /// Create the node, enumerating the registry's cards if that has not
    /// happened yet. An enumeration failure is shown as the node's status.
    pub fn new(
        id: NodeId,
        capability: DirectionCapability,
        registry: &DeviceRegistry,
        host: &dyn Host,
    ) -> Self {
        if let Err(err) = registry.enumerate() {
            host.set_status(
                id,
                vec![StatusMessage::new(
                    format!("Error during device initialization: {}", err),
                    StatusKind::Failure,
                )],
            );
        }
        ChannelNode {
            id,
            capability,
            info: ChannelInfo::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn capability(&self) -> DirectionCapability {
        self.capability
    }

    /// Descriptor of the channel this node currently holds open, or an
    /// empty one.
    pub fn info(&self) -> &ChannelInfo {
        &self.info
    }

    /// Restore a saved descriptor, opening the channel when its card is present.
    pub fn load(&mut self, registry: &DeviceRegistry, host: &dyn Host, info: ChannelInfo) {
        let present = info
            .device
            .as_ref()
            .is_some_and(|d| registry.get(&d.serial).is_some());
        if present {
            self.update_channel(registry, host, info);
        }
    }

    /// Select `channel` on card `device_id` as chosen from a menu.
    ///
    /// Inputs negotiate their mode first and `mode` is ignored; outputs use
    /// `mode`. Returns the descriptor now held by the node.
    pub fn select(
        &mut self,
        registry: &DeviceRegistry,
        host: &dyn Host,
        device_id: DeviceId,
        channel: ChannelId,
        mode: Option<VideoMode>,
    ) -> Result<ChannelInfo, Error> {
        let device = registry.device_by_id(device_id).map_err(|err| {
            log::error!("No such device found: {}", device_id);
            err
        })?;
        if !self.capability.allows(channel.direction()) {
            return Err(Error::WrongDirection(channel));
        }

        let mode = match channel.direction() {
            Direction::Input => match device.negotiate_input_setup(channel) {
                Ok(format) => Some(format.mode),
                Err(err) => {
                    log::error!("Unable to open input channel {}: {}", channel, err);
                    return Err(err);
                }
            },
            Direction::Output => Some(mode.ok_or(Error::ModeRequired(channel))?),
        };

        self.update_channel(registry, host, ChannelInfo::new(device, channel, mode));
        Ok(self.info.clone())
    }

    /// Switch to `info`: nothing happens when it equals the current
    /// descriptor, otherwise the current channel is closed and the new one
    /// opened.
    pub fn update_channel(&mut self, registry: &DeviceRegistry, host: &dyn Host, info: ChannelInfo) {
        if info == self.info {
            return;
        }
        self.close_channel(registry, host);
        self.info = info;
        self.open_channel(registry, host);
    }

    /// Close the held channel and forget the descriptor. Called by the host
    /// when the node is removed from the pipeline.
    pub fn release(&mut self, registry: &DeviceRegistry, host: &dyn Host) {
        self.close_channel(registry, host);
        self.info = ChannelInfo::default();
    }

    fn open_channel(&mut self, registry: &DeviceRegistry, host: &dyn Host) {
        let (Some(device_ref), Some(channel_ref)) = (&self.info.device, &self.info.channel) else {
            return;
        };
        let Some(device) = registry.get(&device_ref.serial) else {
            let text = format!("Unable to find device: {}", device_ref.serial);
            self.update_status(registry, host, StatusKind::Failure, text);
            return;
        };

        let channel = channel_ref.id;
        let mode = self.info.video_mode;
        match channel.direction() {
            Direction::Input => log::info!("Route input {}", channel),
            Direction::Output => {
                log::info!("Route output {} with video mode {}", channel, self.info.video_mode_name())
            }
        }

        match device.open_channel(channel, mode) {
            Ok(()) => {
                // inputs report what was negotiated
                let opened = device.channel_format(channel).map(|f| f.mode).ok().or(mode);
                self.info.video_mode = opened;
                let text = format!("{} {}", channel, self.info.video_mode_name());
                self.update_status(registry, host, StatusKind::Info, text);
            }
            Err(err) => {
                let text = format!("Unable to open channel {}: {}", channel, err);
                self.update_status(registry, host, StatusKind::Failure, text);
                self.info = ChannelInfo::default();
            }
        }
    }

    fn close_channel(&self, registry: &DeviceRegistry, host: &dyn Host) {
        let (Some(device_ref), Some(channel_ref)) = (&self.info.device, &self.info.channel) else {
            return;
        };
        match registry.get(&device_ref.serial) {
            Some(device) => device.close_channel(channel_ref.id),
            None => {
                let text = format!("Unable to find device: {}", device_ref.serial);
                self.update_status(registry, host, StatusKind::Failure, text);
            }
        }
    }

    fn update_status(&self, registry: &DeviceRegistry, host: &dyn Host, kind: StatusKind, text: String) {
        let mut messages = Vec::with_capacity(2);
        if let Some(device) = self
            .info
            .device
            .as_ref()
            .and_then(|d| registry.get(&d.serial))
        {
            messages.push(StatusMessage::new(device.name(), kind));
        }
        messages.push(StatusMessage::new(text, kind));
        host.set_status(self.id, messages);
    }
}
