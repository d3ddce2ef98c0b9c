// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Capture frames from an input channel through the pipelined read path.

use crate::error::CliError;
use crate::metrics::MetricsCollector;
use crate::utils::{install_signal_handler, open_registry, select_device, ConsoleHost};
use clap::Args as ClapArgs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Instant;
use videoio::node::{ChannelNode, DirectionCapability, DmaReadNode, NodeId, Transfer, WaitVbiNode};
use videoio::{ChannelId, Direction};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Card serial number (first card when omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Input channel (e.g. in1, input2)
    #[arg(short, long, default_value = "in1")]
    channel: ChannelId,

    /// Number of frames to capture (0 = until Ctrl+C)
    #[arg(short = 'n', long, default_value = "300")]
    frames: u64,

    /// Append captured 2VUY frames to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn execute(args: Args, json: bool, simulate: bool) -> Result<(), CliError> {
    log::debug!("Executing capture command: {:?}", args);

    if args.channel.direction() != Direction::Input {
        return Err(CliError::InvalidArgs(format!(
            "{} is not an input channel",
            args.channel
        )));
    }

    let term = install_signal_handler()?;
    let registry = open_registry(simulate)?;
    let device = select_device(&registry, args.device.as_deref())?;
    let host = ConsoleHost;

    let mut channel = ChannelNode::new(NodeId(1), DirectionCapability::InputOnly, &registry, &host);
    let info = channel.select(&registry, &host, device.id(), args.channel, None)?;
    if !info.is_selected() {
        return Err(CliError::Negotiation(format!(
            "unable to open {} on {}",
            args.channel, device
        )));
    }

    let format = device.channel_format(args.channel)?;
    log::info!("Capturing {} from {} {}", format, device, args.channel);

    let mut dump = match &args.output {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let mut read = DmaReadNode::new(NodeId(2), registry.config().importance());
    let mut wait = WaitVbiNode::new(NodeId(3));
    read.on_path_start(&host);
    log::debug!("{:?}", read.schedule_info());

    let mut metrics = MetricsCollector::new();
    let mut captured = 0u64;
    let result: Result<(), CliError> = loop {
        if term.load(Ordering::Relaxed) {
            log::info!("Interrupted after {} frame(s)", captured);
            break Ok(());
        }
        if args.frames > 0 && captured >= args.frames {
            break Ok(());
        }

        let start = Instant::now();
        let transfer = match read.execute(&registry, &host, &info) {
            Ok(transfer) => transfer,
            Err(err) => break Err(err.into()),
        };
        match wait.execute(&registry, &host, &info) {
            Ok(outcome) => metrics.record_dropped(outcome.dropped),
            Err(err) => break Err(err.into()),
        }

        match transfer {
            Transfer::Read { bytes, primed, .. } => {
                metrics.record_frame(bytes, start.elapsed().as_micros() as u64);
                // slots read before the pipeline fills hold no capture yet
                if let (true, Some(out)) = (primed, dump.as_mut()) {
                    if let Err(err) = out.write_all(read.output()) {
                        break Err(err.into());
                    }
                }
            }
            _ => metrics.record_rejected(),
        }
        captured += 1;
    };

    channel.release(&registry, &host);
    result?;
    if let Some(mut out) = dump {
        out.flush()?;
    }

    if json {
        metrics
            .print_json()
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
    } else {
        metrics.print_text();
    }
    Ok(())
}
