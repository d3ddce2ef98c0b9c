// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies
//
// VideoIO DMA Pipeline Tests
//
// TESTING LAYERS:
//
// Layer 1 (Simulated driver - No hardware required):
//   - test_playout_slot_sequence: five writes visit slots 1,2,3,0,1 after each
//   - test_write_index_is_k_mod_depth: index after K writes is K mod D
//   - test_arm_slot_leads_read_slot: arm = (index + pipeline) mod depth
//   - test_closed_channel_leaves_index_alone
//   - test_concurrent_channels: one thread per channel, independent cycles
//   - test_realtime_pacing: simulated VBI waits follow the frame period
//
// RUN:
//   cargo test --test dma_pipeline

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use videoio::mock::{DmaEvent, MockCard, MockDriver};
use videoio::node::{ChannelInfo, DmaReadNode, DmaWriteNode, Host, NodeId, StatusMessage, Transfer, WaitVbiNode};
use videoio::{ChannelId, CycleConfig, DeviceRegistry, DmaCycle, Error, VideoMode};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Host that ignores every request.
struct NullHost;

impl Host for NullHost {
    fn schedule_node(&self, _node: NodeId, _count: u32) {}
    fn recompile_node(&self, _node: NodeId) {}
    fn set_status(&self, _node: NodeId, _messages: Vec<StatusMessage>) {}
}

fn simulated() -> Arc<MockDriver> {
    Arc::new(
        MockDriver::new().with_card(
            MockCard::new("SN-P", "Sim")
                .with_input(ChannelId::Input1, VideoMode::Hd1080i50)
                .with_input(ChannelId::Input2, VideoMode::Hd720p5994),
        ),
    )
}

fn written_slots(mock: &MockDriver, channel: ChannelId) -> Vec<u32> {
    mock.journal()
        .iter()
        .filter(|e| matches!(e, DmaEvent::Write { .. }) && e.channel() == Some(channel))
        .map(|e| e.slot())
        .collect()
}

#[test]
fn test_playout_slot_sequence() {
    init_logging();
    let mock = simulated();
    let registry = DeviceRegistry::new(mock.clone());
    let device = registry.get("SN-P").unwrap();
    device
        .open_channel(ChannelId::Output1, Some(VideoMode::Hd1080p50))
        .unwrap();

    let mut cycle = DmaCycle::new(device.cycle_config(ChannelId::Output1).unwrap());
    assert_eq!(cycle.config().depth, 4);
    let frame = vec![0x80u8; device.channel_format(ChannelId::Output1).unwrap().frame_size()];

    let mut observed = Vec::new();
    for _ in 0..5 {
        device
            .dma_write(ChannelId::Output1, cycle.write_slot(), &frame)
            .unwrap();
        observed.push(cycle.advance());
    }
    assert_eq!(observed, vec![1, 2, 3, 0, 1]);
    assert_eq!(written_slots(&mock, ChannelId::Output1), vec![0, 1, 2, 3, 0]);
}

#[test]
fn test_write_index_is_k_mod_depth() {
    init_logging();
    for depth in [2u32, 3, 4, 6] {
        let mock = simulated();
        let config = videoio::Config::default().with_output_cycle(CycleConfig::new(depth, 0));
        let registry = DeviceRegistry::with_config(mock, config);
        let device = registry.get("SN-P").unwrap();
        device
            .open_channel(ChannelId::Output2, Some(VideoMode::Hd720p50))
            .unwrap();
        let info = ChannelInfo::new(device, ChannelId::Output2, Some(VideoMode::Hd720p50));

        let mut node = DmaWriteNode::new(NodeId(1), 1);
        for k in 1..=23u32 {
            node.execute(&registry, &NullHost, &info, &[0u8; 256])
                .unwrap();
            assert_eq!(node.slot_index(), Some(k % depth));
        }
    }
}

#[test]
fn test_arm_slot_leads_read_slot() {
    init_logging();
    let mock = simulated();
    let registry = DeviceRegistry::new(mock.clone());
    let device = registry.get("SN-P").unwrap();
    device.open_channel(ChannelId::Input1, None).unwrap();
    let info = ChannelInfo::new(device, ChannelId::Input1, None);
    let config = device.cycle_config(ChannelId::Input1).unwrap();

    let mut node = DmaReadNode::new(NodeId(2), 1);
    for _ in 0..10 {
        let index = node.slot_index().unwrap_or(0);
        match node.execute(&registry, &NullHost, &info).unwrap() {
            Transfer::Read {
                arm_slot,
                read_slot,
                ..
            } => {
                assert_eq!(read_slot, index);
                assert_eq!(arm_slot, (index + config.pipeline_depth) % config.depth);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_closed_channel_leaves_index_alone() {
    init_logging();
    let registry = DeviceRegistry::new(simulated());
    let device = registry.get("SN-P").unwrap();
    device
        .open_channel(ChannelId::Output1, Some(VideoMode::Hd720p50))
        .unwrap();
    let info = ChannelInfo::new(device, ChannelId::Output1, Some(VideoMode::Hd720p50));

    let mut write = DmaWriteNode::new(NodeId(1), 1);
    write.execute(&registry, &NullHost, &info, &[0u8; 64]).unwrap();
    assert_eq!(write.slot_index(), Some(1));

    device.close_channel(ChannelId::Output1);
    for _ in 0..3 {
        assert!(matches!(
            write.execute(&registry, &NullHost, &info, &[0u8; 64]),
            Err(Error::ChannelNotOpen(ChannelId::Output1))
        ));
    }
    assert_eq!(write.slot_index(), Some(1));

    let mut read = vec![0u8; 64];
    assert!(matches!(
        device.dma_read(ChannelId::Input4, 2, 0, &mut read),
        Err(Error::ChannelNotOpen(ChannelId::Input4))
    ));
    assert!(matches!(
        device.wait_vbi(ChannelId::Output1),
        Err(Error::ChannelNotOpen(ChannelId::Output1))
    ));
}

#[test]
fn test_concurrent_channels() {
    init_logging();
    let mock = simulated();
    let registry = DeviceRegistry::new(mock.clone());
    let device = registry.get("SN-P").unwrap();
    device
        .open_channel(ChannelId::Output1, Some(VideoMode::Hd1080p25))
        .unwrap();
    device
        .open_channel(ChannelId::Output2, Some(VideoMode::Hd720p50))
        .unwrap();
    device.open_channel(ChannelId::Input2, None).unwrap();

    const FRAMES: usize = 50;
    thread::scope(|s| {
        for (channel, mode) in [
            (ChannelId::Output1, VideoMode::Hd1080p25),
            (ChannelId::Output2, VideoMode::Hd720p50),
        ] {
            let registry = &registry;
            s.spawn(move || {
                let device = registry.get("SN-P").unwrap();
                let info = ChannelInfo::new(device, channel, Some(mode));
                let mut write = DmaWriteNode::new(NodeId(channel.raw() as u64), 1);
                let mut wait = WaitVbiNode::new(NodeId(100 + channel.raw() as u64));
                let frame = vec![0u8; 4096];
                for _ in 0..FRAMES {
                    write.execute(registry, &NullHost, &info, &frame).unwrap();
                    wait.execute(registry, &NullHost, &info).unwrap();
                }
                assert_eq!(wait.dropped_total(), 0);
            });
        }

        let registry = &registry;
        s.spawn(move || {
            let device = registry.get("SN-P").unwrap();
            let info = ChannelInfo::new(device, ChannelId::Input2, None);
            let mut read = DmaReadNode::new(NodeId(50), 1);
            for _ in 0..FRAMES {
                read.execute(registry, &NullHost, &info).unwrap();
            }
            assert_eq!(read.output().len(), 640 * 720 * 4);
        });
    });

    let expected: Vec<u32> = (0..FRAMES as u32).map(|k| k % 4).collect();
    assert_eq!(written_slots(&mock, ChannelId::Output1), expected);
    assert_eq!(written_slots(&mock, ChannelId::Output2), expected);
}

#[test]
fn test_realtime_pacing() {
    init_logging();
    let mock = Arc::new(MockDriver::new().with_card(MockCard::new("SN-R", "Sim")).with_realtime(true));
    let registry = DeviceRegistry::new(mock);
    let device = registry.get("SN-R").unwrap();
    device
        .open_channel(ChannelId::Output1, Some(VideoMode::Hd720p50))
        .unwrap();

    let start = Instant::now();
    for _ in 0..5 {
        device.wait_vbi(ChannelId::Output1).unwrap();
    }
    // five 20ms frames
    assert!(start.elapsed() >= Duration::from_millis(90));
}
