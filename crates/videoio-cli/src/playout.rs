// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Play a test pattern out of an output channel, one frame per vertical blank.

use crate::error::CliError;
use crate::metrics::MetricsCollector;
use crate::utils::{install_signal_handler, open_registry, select_device, test_pattern, ConsoleHost};
use clap::Args as ClapArgs;
use std::sync::atomic::Ordering;
use std::time::Instant;
use videoio::node::{ChannelNode, DirectionCapability, DmaWriteNode, NodeId, Transfer, WaitVbiNode};
use videoio::{ChannelId, Direction, VideoMode};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Card serial number (first card when omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Output channel (e.g. out1, output3)
    #[arg(short, long, default_value = "out1")]
    channel: ChannelId,

    /// Video mode (e.g. 1080p50, 720p59.94, 1080i50)
    #[arg(short, long, default_value = "1080p50")]
    mode: VideoMode,

    /// Number of frames to play out (0 = until Ctrl+C)
    #[arg(short = 'n', long, default_value = "300")]
    frames: u64,
}

pub fn execute(args: Args, json: bool, simulate: bool) -> Result<(), CliError> {
    log::debug!("Executing playout command: {:?}", args);

    if args.channel.direction() != Direction::Output {
        return Err(CliError::InvalidArgs(format!(
            "{} is not an output channel",
            args.channel
        )));
    }

    let term = install_signal_handler()?;
    let registry = open_registry(simulate)?;
    let device = select_device(&registry, args.device.as_deref())?;
    let host = ConsoleHost;

    let mut channel = ChannelNode::new(NodeId(1), DirectionCapability::OutputOnly, &registry, &host);
    let info = channel.select(&registry, &host, device.id(), args.channel, Some(args.mode))?;
    if !info.is_selected() {
        return Err(CliError::Negotiation(format!(
            "unable to open {} on {}",
            args.channel, device
        )));
    }

    let format = device.channel_format(args.channel)?;
    let frame = test_pattern(&format);
    log::info!("Playing out {} on {} {}", format, device, args.channel);

    let mut write = DmaWriteNode::new(NodeId(2), registry.config().importance());
    let mut wait = WaitVbiNode::new(NodeId(3));
    write.on_path_start(&host);
    log::debug!("{:?}", write.schedule_info());

    let mut metrics = MetricsCollector::new();
    let mut played = 0u64;
    let result = loop {
        if term.load(Ordering::Relaxed) {
            log::info!("Interrupted after {} frame(s)", played);
            break Ok(());
        }
        if args.frames > 0 && played >= args.frames {
            break Ok(());
        }

        let start = Instant::now();
        let written = match write.execute(&registry, &host, &info, &frame) {
            Ok(Transfer::Written { bytes, .. }) => Some(bytes),
            Ok(_) => None,
            Err(err) => break Err(err),
        };
        match wait.execute(&registry, &host, &info) {
            Ok(outcome) => metrics.record_dropped(outcome.dropped),
            Err(err) => break Err(err),
        }
        match written {
            Some(bytes) => metrics.record_frame(bytes, start.elapsed().as_micros() as u64),
            None => metrics.record_rejected(),
        }
        played += 1;
    };

    channel.release(&registry, &host);
    result?;

    if json {
        metrics
            .print_json()
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
    } else {
        metrics.print_text();
    }
    Ok(())
}
