// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use super::{ChannelInfo, Host, NodeId, StatusKind, StatusMessage};
use crate::registry::DeviceRegistry;
use crate::schedule::DropDetector;
use crate::Error;

/// Field counter after a wait and the frames lost since the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    pub field_count: u64,
    pub dropped: u64,
}

/// Blocks the pipeline until the channel's next vertical blank.
///
/// Dropped frames are published to the host as a warning status naming the
/// card and the running total for the bound channel.
#[derive(Debug)]
pub struct WaitVbiNode {
    id: NodeId,
    bound: Option<ChannelInfo>,
    detector: DropDetector,
    dropped_total: u64,
}

impl WaitVbiNode {
    pub fn new(id: NodeId) -> Self {
        WaitVbiNode {
            id,
            bound: None,
            detector: DropDetector::new(),
            dropped_total: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Frames reported dropped since the node was created.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }

    pub fn execute(
        &mut self,
        registry: &DeviceRegistry,
        host: &dyn Host,
        info: &ChannelInfo,
    ) -> Result<WaitOutcome, Error> {
        let (device, channel) = info.resolve(registry)?;
        let format = device.channel_format(channel)?;

        if self.bound.as_ref() != Some(info) {
            self.detector.reset();
            self.bound = Some(info.clone());
        }

        let field_count = device.wait_vbi(channel)?;
        let dropped = self.detector.observe(field_count, format.interlaced);
        if dropped > 0 {
            self.dropped_total += dropped;
            log::warn!(
                "{}: {} dropped {} frame(s) at field {}",
                self.id,
                channel,
                dropped,
                field_count
            );
            host.set_status(
                self.id,
                vec![
                    StatusMessage::new(device.name(), StatusKind::Warning),
                    StatusMessage::new(
                        format!("{}: {} frame(s) dropped", channel, self.dropped_total),
                        StatusKind::Warning,
                    ),
                ],
            );
        }

        Ok(WaitOutcome {
            field_count,
            dropped,
        })
    }
}
