// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::time::Instant;

use super::{check_alignment, is_dma_failure, BoundCycle, ChannelInfo, Host, NodeId, Transfer};
use crate::registry::DeviceRegistry;
use crate::schedule::{ScheduleBridge, ScheduleInfo};
use crate::Error;

/// Capture side: one frame from the card into the node's output buffer per
/// execution.
///
/// Each execution arms the slot `pipeline_depth` ahead and reads the slot
/// armed that many executions ago, so reads only ever touch slots the card
/// has finished capturing into once the pipeline is primed. A read is
/// reported primed only when its slot was actually armed earlier.
#[derive(Debug)]
pub struct DmaReadNode {
    id: NodeId,
    cycle: BoundCycle,
    schedule: ScheduleBridge,
    output: Vec<u8>,
}

impl DmaReadNode {
    pub fn new(id: NodeId, importance: u32) -> Self {
        DmaReadNode {
            id,
            cycle: BoundCycle::default(),
            schedule: ScheduleBridge::new(importance),
            output: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn schedule_info(&self) -> ScheduleInfo {
        self.schedule.schedule_info()
    }

    pub fn slot_index(&self) -> Option<u32> {
        self.cycle.index()
    }

    /// Last frame read; sized to the channel's frame once bound.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn on_path_start(&self, host: &dyn Host) {
        host.schedule_node(self.id, 1);
    }

    pub fn execute(
        &mut self,
        registry: &DeviceRegistry,
        host: &dyn Host,
        info: &ChannelInfo,
    ) -> Result<Transfer, Error> {
        let result = self.read(registry, host, info);
        host.schedule_node(self.id, 1);
        result
    }

    fn read(
        &mut self,
        registry: &DeviceRegistry,
        host: &dyn Host,
        info: &ChannelInfo,
    ) -> Result<Transfer, Error> {
        let (device, channel) = info.resolve(registry)?;
        let format = device.channel_format(channel)?;

        let size = format.frame_size();
        if self.output.len() != size {
            log::debug!("{}: output buffer resized to {} bytes for {}", self.id, size, format);
            self.output.resize(size, 0);
        }
        if self.schedule.update(format.frame_rate.delta_seconds()) {
            host.recompile_node(self.id);
        }
        check_alignment(self.output.as_ptr(), self.id);

        let cycle = self.cycle.bind(device, channel, info)?;
        let arm_slot = cycle.arm_slot();
        let read_slot = cycle.read_slot();

        let start = Instant::now();
        match device.dma_read(channel, arm_slot, read_slot, &mut self.output) {
            Ok(bytes) => {
                cycle.advance();
                let primed = self.cycle.take_armed(read_slot);
                self.cycle.set_armed(arm_slot, true);
                log::trace!("{} DMA read took {:?}", channel, start.elapsed());
                Ok(Transfer::Read {
                    arm_slot,
                    read_slot,
                    bytes,
                    primed,
                })
            }
            Err(err) if is_dma_failure(&err) => {
                // the arm is issued before the read
                let armed = !matches!(err, Error::CaptureArmFailed { .. });
                self.cycle.set_armed(arm_slot, armed);
                log::warn!("{}: dropped frame for {} ({})", self.id, channel, err);
                Ok(Transfer::Dropped)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::channel_id::ChannelId;
    use crate::mock::{DmaEvent, MockCard, MockDriver};
    use crate::mode::VideoMode;
    use crate::node::testing::RecordingHost;
    use crate::rational::Rational;

    fn setup() -> (Arc<MockDriver>, DeviceRegistry, ChannelInfo) {
        let mock = Arc::new(
            MockDriver::new().with_card(
                MockCard::new("SN1", "Sim").with_input(ChannelId::Input2, VideoMode::Hd1080i50),
            ),
        );
        let registry = DeviceRegistry::new(mock.clone());
        let device = registry.get("SN1").unwrap();
        device.open_channel(ChannelId::Input2, None).unwrap();
        let info = ChannelInfo::new(device, ChannelId::Input2, Some(VideoMode::Hd1080i50));
        (mock, registry, info)
    }

    #[test]
    fn test_pipelined_reads() {
        let (mock, registry, info) = setup();
        let host = RecordingHost::default();
        let mut node = DmaReadNode::new(NodeId(2), 1);

        let mut reads = Vec::new();
        for _ in 0..6 {
            match node.execute(&registry, &host, &info).unwrap() {
                Transfer::Read {
                    arm_slot,
                    read_slot,
                    primed,
                    ..
                } => reads.push((arm_slot, read_slot, primed)),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(
            reads,
            vec![
                (2, 0, false),
                (3, 1, false),
                (0, 2, true),
                (1, 3, true),
                (2, 0, true),
                (3, 1, true),
            ]
        );

        // every slot read after priming was armed two executions earlier
        let journal = mock.journal();
        let armed: Vec<u32> = journal
            .iter()
            .filter(|e| matches!(e, DmaEvent::Arm { .. }))
            .map(|e| e.slot())
            .collect();
        let read: Vec<u32> = journal
            .iter()
            .filter(|e| matches!(e, DmaEvent::Read { .. }))
            .map(|e| e.slot())
            .collect();
        for k in 2..read.len() {
            assert_eq!(read[k], armed[k - 2]);
        }
        assert_eq!(host.schedule_count(), 6);
    }

    #[test]
    fn test_output_sized_to_frame() {
        let (_, registry, info) = setup();
        let host = RecordingHost::default();
        let mut node = DmaReadNode::new(NodeId(2), 1);
        node.execute(&registry, &host, &info).unwrap();
        assert_eq!(node.output().len(), 960 * 1080 * 4);
        // the mock stamps frames with their slot number
        assert!(node.output().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_rate_change_requests_recompile() {
        let (_, registry, info) = setup();
        let host = RecordingHost::default();
        let mut node = DmaReadNode::new(NodeId(2), 1);

        node.execute(&registry, &host, &info).unwrap();
        node.execute(&registry, &host, &info).unwrap();
        assert_eq!(host.recompile_count(), 1);
        assert_eq!(node.schedule_info().delta_seconds, Rational::new(1, 25));
    }

    #[test]
    fn test_arm_failure_drops_frame() {
        let (mock, registry, info) = setup();
        let host = RecordingHost::default();
        let mut node = DmaReadNode::new(NodeId(2), 1);

        mock.fail_arm(true);
        assert_eq!(node.execute(&registry, &host, &info).unwrap(), Transfer::Dropped);
        assert_eq!(node.slot_index(), Some(0));
        assert!(mock.journal().is_empty());
    }

    #[test]
    fn test_unarmed_slot_is_not_primed() {
        let (mock, registry, info) = setup();
        let host = RecordingHost::default();
        let mut node = DmaReadNode::new(NodeId(2), 1);

        let mut reads = Vec::new();
        let mut record = |node: &mut DmaReadNode| match node.execute(&registry, &host, &info).unwrap() {
            Transfer::Read {
                arm_slot,
                read_slot,
                primed,
                ..
            } => reads.push((arm_slot, read_slot, primed)),
            other => reads.push((u32::MAX, u32::MAX, other == Transfer::Dropped)),
        };

        record(&mut node);
        mock.fail_arm(true);
        record(&mut node);
        record(&mut node);
        mock.fail_arm(false);
        for _ in 0..4 {
            record(&mut node);
        }
        assert_eq!(
            reads,
            vec![
                (2, 0, false),
                (u32::MAX, u32::MAX, true),
                (u32::MAX, u32::MAX, true),
                (3, 1, false),
                (0, 2, true),
                (1, 3, true),
                (2, 0, true),
            ]
        );
    }

    #[test]
    fn test_read_failure_keeps_arm() {
        let (mock, registry, info) = setup();
        let host = RecordingHost::default();
        let mut node = DmaReadNode::new(NodeId(2), 1);

        node.execute(&registry, &host, &info).unwrap();
        mock.fail_dma_read(true);
        assert_eq!(node.execute(&registry, &host, &info).unwrap(), Transfer::Dropped);
        mock.fail_dma_read(false);

        let primed: Vec<bool> = (0..3)
            .map(|_| match node.execute(&registry, &host, &info).unwrap() {
                Transfer::Read { primed, .. } => primed,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(primed, vec![false, true, true]);
    }

    #[test]
    fn test_output_channel_is_rejected() {
        let mock = Arc::new(MockDriver::new().with_card(MockCard::new("SN1", "Sim")));
        let registry = DeviceRegistry::new(mock);
        let device = registry.get("SN1").unwrap();
        device.open_channel(ChannelId::Output1, Some(VideoMode::Hd720p50)).unwrap();
        let info = ChannelInfo::new(device, ChannelId::Output1, Some(VideoMode::Hd720p50));

        let host = RecordingHost::default();
        let mut node = DmaReadNode::new(NodeId(2), 1);
        assert!(matches!(
            node.execute(&registry, &host, &info),
            Err(Error::WrongDirection(ChannelId::Output1))
        ));
    }
}
