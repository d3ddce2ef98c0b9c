// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Plays out on one channel while capturing on another, both on a simulated
//! card paced in real time.
//!
//! ```text
//! cargo run --example loopback -- 120
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use videoio::mock::{MockCard, MockDriver};
use videoio::node::{
    ChannelNode, DirectionCapability, DmaReadNode, DmaWriteNode, Host, NodeId, StatusMessage,
    Transfer, WaitVbiNode,
};
use videoio::{ChannelId, DeviceRegistry, VideoMode};

struct PrintHost;

impl Host for PrintHost {
    fn schedule_node(&self, _node: NodeId, _count: u32) {}

    fn recompile_node(&self, node: NodeId) {
        println!("[HOST] {} frame period changed", node);
    }

    fn set_status(&self, node: NodeId, messages: Vec<StatusMessage>) {
        for message in messages {
            println!("[HOST] {}: {}", node, message.text);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let frame_count: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);

    let driver = MockDriver::new()
        .with_card(
            MockCard::new("SIM-LOOP", "Loopback Simulator")
                .with_input(ChannelId::Input1, VideoMode::Hd1080i50),
        )
        .with_realtime(true);
    let registry = DeviceRegistry::new(Arc::new(driver));
    let host = PrintHost;

    let mut output = ChannelNode::new(NodeId(1), DirectionCapability::OutputOnly, &registry, &host);
    let mut input = ChannelNode::new(NodeId(2), DirectionCapability::InputOnly, &registry, &host);
    let playout = output.select(&registry, &host, 1, ChannelId::Output1, Some(VideoMode::Hd1080i50))?;
    let capture = input.select(&registry, &host, 1, ChannelId::Input1, None)?;
    println!("[PLAYOUT] {}", playout);
    println!("[CAPTURE] {}", capture);

    let start = Instant::now();
    thread::scope(|s| {
        let registry = &registry;
        let host = &host;
        let playout = &playout;
        let capture = &capture;

        s.spawn(move || {
            let mut write = DmaWriteNode::new(NodeId(3), 1);
            let mut wait = WaitVbiNode::new(NodeId(4));
            let frame = vec![0x80u8; 1920 * 1080 * 2];
            for i in 0..frame_count {
                let transfer = write.execute(registry, host, playout, &frame);
                let vbi = wait.execute(registry, host, playout);
                if i % 25 == 0 {
                    println!("[PLAYOUT] frame {}: {:?} {:?}", i, transfer, vbi);
                }
            }
        });

        s.spawn(move || {
            let mut read = DmaReadNode::new(NodeId(5), 1);
            let mut wait = WaitVbiNode::new(NodeId(6));
            for i in 0..frame_count {
                let transfer = read.execute(registry, host, capture);
                let vbi = wait.execute(registry, host, capture);
                if let (0, Ok(Transfer::Read { read_slot, primed, .. })) = (i % 25, transfer) {
                    println!(
                        "[CAPTURE] frame {}: slot {} primed {} first byte {} {:?}",
                        i,
                        read_slot,
                        primed,
                        read.output()[0],
                        vbi
                    );
                }
            }
        });
    });

    println!("[HOST] {} frames in {:?}", frame_count, start.elapsed());
    output.release(&registry, &host);
    input.release(&registry, &host);
    Ok(())
}
