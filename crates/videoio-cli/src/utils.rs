// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use signal_hook::consts::SIGINT;
use signal_hook::flag;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use videoio::mock::{MockCard, MockDriver};
use videoio::node::{Host, NodeId, StatusKind, StatusMessage};
use videoio::{ChannelId, Device, DeviceRegistry, FormatDescriptor, SysDriver, VideoMode};

/// Install signal handler for graceful shutdown on Ctrl+C
///
/// Returns an Arc<AtomicBool> that will be set to true when SIGINT is received.
/// Check this flag periodically in your main loop to exit gracefully.
pub fn install_signal_handler() -> Result<Arc<AtomicBool>, CliError> {
    let term = Arc::new(AtomicBool::new(false));

    flag::register(SIGINT, Arc::clone(&term))
        .map_err(|e| CliError::General(format!("Failed to register signal handler: {}", e)))?;

    log::debug!("Installed SIGINT handler");
    Ok(term)
}

/// Simulated cards used by `--simulate`.
///
/// The first card sees a 1080i59.94 signal on Input Ch 1 and 720p50 on
/// Input Ch 2; the second has no signal but recommends 1080p25 on Input Ch 1.
/// DMA events are not journaled since runs may last until interrupted.
pub fn simulated_driver() -> MockDriver {
    MockDriver::new()
        .with_card(
            MockCard::new("SIM-0001", "VideoIO Simulator 8x8")
                .with_input(ChannelId::Input1, VideoMode::Hd1080i5994)
                .with_input(ChannelId::Input2, VideoMode::Hd720p50),
        )
        .with_card(
            MockCard::new("SIM-0002", "VideoIO Simulator 4x4")
                .with_recommended(ChannelId::Input1, VideoMode::Hd1080p25),
        )
        .with_realtime(true)
        .with_journal_capacity(0)
}

/// Build the registry over the hardware driver, or the simulated one, and
/// enumerate its cards.
pub fn open_registry(simulate: bool) -> Result<DeviceRegistry, CliError> {
    let registry = if simulate {
        log::debug!("Using simulated driver");
        DeviceRegistry::new(Arc::new(simulated_driver()))
    } else {
        DeviceRegistry::new(Arc::new(SysDriver::load()?))
    };

    let count = registry.enumerate()?;
    log::debug!("Enumerated {} card(s)", count);
    Ok(registry)
}

/// Pick the card named by `serial`, or the first card when none is given.
pub fn select_device<'r>(
    registry: &'r DeviceRegistry,
    serial: Option<&str>,
) -> Result<&'r Device, CliError> {
    match serial {
        Some(serial) => Ok(registry.device(serial)?),
        None => registry
            .iter()
            .next()
            .ok_or_else(|| CliError::DeviceNotFound("no cards installed".to_string())),
    }
}

// 75% bars in 8-bit BT.709, as (Y, Cb, Cr)
const BARS: [(u8, u8, u8); 8] = [
    (180, 128, 128),
    (168, 44, 136),
    (145, 147, 44),
    (133, 63, 52),
    (63, 193, 204),
    (51, 109, 212),
    (28, 212, 120),
    (16, 128, 128),
];

/// Color bars in the channel's 2VUY (Cb Y Cr Y) layout, sized to one frame.
pub fn test_pattern(format: &FormatDescriptor) -> Vec<u8> {
    let pairs = (format.width >> 1) as usize;
    let mut row = Vec::with_capacity(pairs * 4);
    for pair in 0..pairs {
        let (y, cb, cr) = BARS[pair * BARS.len() / pairs.max(1)];
        row.extend_from_slice(&[cb, y, cr, y]);
    }

    let mut frame = Vec::with_capacity(format.frame_size());
    for _ in 0..format.height {
        frame.extend_from_slice(&row);
    }
    frame
}

/// Host that reports node status through the logger.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl Host for ConsoleHost {
    fn schedule_node(&self, node: NodeId, count: u32) {
        log::trace!("{} scheduled {} time(s)", node, count);
    }

    fn recompile_node(&self, node: NodeId) {
        log::debug!("{} frame period changed", node);
    }

    fn set_status(&self, node: NodeId, messages: Vec<StatusMessage>) {
        for message in messages {
            match message.kind {
                StatusKind::Info => log::info!("{}: {}", node, message.text),
                StatusKind::Warning => log::warn!("{}: {}", node, message.text),
                StatusKind::Failure => log::error!("{}: {}", node, message.text),
            }
        }
    }
}
