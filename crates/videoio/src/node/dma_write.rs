// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use super::{check_alignment, is_dma_failure, BoundCycle, ChannelInfo, Host, NodeId, Transfer};
use crate::registry::DeviceRegistry;
use crate::schedule::{ScheduleBridge, ScheduleInfo};
use crate::Error;

/// Playback side: one frame from the pipeline to the card per execution.
#[derive(Debug)]
pub struct DmaWriteNode {
    id: NodeId,
    cycle: BoundCycle,
    schedule: ScheduleBridge,
}

impl DmaWriteNode {
    pub fn new(id: NodeId, importance: u32) -> Self {
        DmaWriteNode {
            id,
            cycle: BoundCycle::default(),
            schedule: ScheduleBridge::new(importance),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn schedule_info(&self) -> ScheduleInfo {
        self.schedule.schedule_info()
    }

    /// Slot the next successful write goes to, once bound to a channel.
    pub fn slot_index(&self) -> Option<u32> {
        self.cycle.index()
    }

    pub fn on_path_start(&self, host: &dyn Host) {
        host.schedule_node(self.id, 1);
    }

    /// Write `input` to the channel named by `info` and ask the host for the
    /// next execution, whatever the outcome.
    pub fn execute(
        &mut self,
        registry: &DeviceRegistry,
        host: &dyn Host,
        info: &ChannelInfo,
        input: &[u8],
    ) -> Result<Transfer, Error> {
        let result = self.write(registry, host, info, input);
        host.schedule_node(self.id, 1);
        result
    }

    fn write(
        &mut self,
        registry: &DeviceRegistry,
        host: &dyn Host,
        info: &ChannelInfo,
        input: &[u8],
    ) -> Result<Transfer, Error> {
        if input.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        let (device, channel) = info.resolve(registry)?;

        if self.schedule.update(device.delta_seconds(channel)?) {
            host.recompile_node(self.id);
        }
        check_alignment(input.as_ptr(), self.id);

        let cycle = self.cycle.bind(device, channel, info)?;
        let slot = cycle.write_slot();
        match device.dma_write(channel, slot, input) {
            Ok(bytes) => {
                cycle.advance();
                Ok(Transfer::Written { slot, bytes })
            }
            Err(err) if is_dma_failure(&err) => {
                log::warn!("{}: dropped frame for {} ({})", self.id, channel, err);
                Ok(Transfer::Dropped)
            }
            Err(err) => Err(err),
        }
    }
}
