// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Per-execution logic of the nodes a host media pipeline runs.
//!
//! The host owns the nodes and calls them: a [`ChannelNode`] on the control
//! thread whenever its channel descriptor changes, each DMA node on its own
//! long-lived thread once per frame, and a [`WaitVbiNode`] wherever the
//! pipeline needs hardware pacing. Nodes talk back to the host through the
//! [`Host`] trait.
//!
//! Every execution looks its device and channel up again. A failed lookup
//! fails that execution only; the next one retries from scratch.

use std::fmt;

use crate::channel_id::ChannelId;
use crate::cycle::{DmaCycle, MAX_CYCLE_DEPTH};
use crate::device::Device;
use crate::mode::VideoMode;
use crate::registry::DeviceRegistry;
use crate::Error;

mod channel;
mod dma_read;
mod dma_write;
mod wait_vbi;

pub use channel::{ChannelNode, DirectionCapability};
pub use dma_read::DmaReadNode;
pub use dma_write::DmaWriteNode;
pub use wait_vbi::{WaitOutcome, WaitVbiNode};

/// Required alignment of host buffers handed to the DMA engine.
pub const DMA_ALIGNMENT: usize = 64;

/// Host-assigned node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Failure,
}

/// One line of a node's status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, kind: StatusKind) -> Self {
        StatusMessage {
            text: text.into(),
            kind,
        }
    }
}

/// Calls a node makes back into the host pipeline.
pub trait Host: Send + Sync {
    /// Ask for `count` more executions of `node`.
    fn schedule_node(&self, node: NodeId, count: u32);

    /// The node's schedule info changed; the host must query it again.
    fn recompile_node(&self, node: NodeId);

    /// Replace the status messages shown for `node`.
    fn set_status(&self, node: NodeId, messages: Vec<StatusMessage>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub serial: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
}

/// Channel descriptor passed between nodes: which card, which channel and
/// which mode. An empty descriptor selects nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelInfo {
    pub device: Option<DeviceRef>,
    pub channel: Option<ChannelRef>,
    pub video_mode: Option<VideoMode>,
}

impl ChannelInfo {
    pub fn new(device: &Device, channel: ChannelId, video_mode: Option<VideoMode>) -> Self {
        ChannelInfo {
            device: Some(DeviceRef {
                serial: device.serial().to_owned(),
                name: device.name().to_owned(),
            }),
            channel: Some(ChannelRef {
                id: channel,
                name: channel.name(),
            }),
            video_mode,
        }
    }

    /// True when both a device and a channel are named.
    pub fn is_selected(&self) -> bool {
        self.device.is_some() && self.channel.is_some()
    }

    pub fn video_mode_name(&self) -> &'static str {
        self.video_mode.map_or("", |m| m.name())
    }

    /// Find the named device in `registry`.
    pub fn resolve<'r>(&self, registry: &'r DeviceRegistry) -> Result<(&'r Device, ChannelId), Error> {
        match (&self.device, &self.channel) {
            (Some(device), Some(channel)) => Ok((registry.device(&device.serial)?, channel.id)),
            _ => Err(Error::ChannelNotSelected),
        }
    }
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.device, &self.channel) {
            (Some(device), Some(channel)) => {
                write!(f, "{} {} {}", device.serial, channel.name, self.video_mode_name())
            }
            _ => write!(f, "<none>"),
        }
    }
}

/// Result of one DMA node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// A frame was queued into `slot` and committed for playout.
    Written { slot: u32, bytes: usize },
    /// `arm_slot` was armed and `read_slot` read out. `primed` is false while
    /// the pipeline is still filling and the read slot holds no capture yet.
    Read {
        arm_slot: u32,
        read_slot: u32,
        bytes: usize,
        primed: bool,
    },
    /// The driver refused the transfer; the slot index did not move.
    Dropped,
}

/// Slot rotation of a DMA node, restarted whenever the node is pointed at a
/// different channel or the channel's rotation changes.
#[derive(Debug, Default)]
struct BoundCycle {
    bound: Option<ChannelInfo>,
    cycle: Option<DmaCycle>,
    /// Slots armed for capture and not read back since, one bit per slot.
    armed: u64,
}

const _: () = assert!(MAX_CYCLE_DEPTH <= u64::BITS);

impl BoundCycle {
    fn bind(&mut self, device: &Device, channel: ChannelId, info: &ChannelInfo) -> Result<&mut DmaCycle, Error> {
        let config = device.cycle_config(channel)?;
        let same_channel = self.bound.as_ref() == Some(info);
        match self.cycle {
            Some(cycle) if same_channel && cycle.config() == config => {}
            _ => {
                log::debug!("{} on {}: slot rotation starts over ({})", channel, device.serial(), config);
                self.bound = Some(info.clone());
                self.armed = 0;
                self.cycle = Some(DmaCycle::new(config));
            }
        }
        Ok(self.cycle.get_or_insert(DmaCycle::new(config)))
    }

    fn index(&self) -> Option<u32> {
        self.cycle.map(|c| c.index())
    }

    fn set_armed(&mut self, slot: u32, armed: bool) {
        let bit = 1u64 << slot;
        if armed {
            self.armed |= bit;
        } else {
            self.armed &= !bit;
        }
    }

    /// Whether `slot` was armed, clearing it.
    fn take_armed(&mut self, slot: u32) -> bool {
        let armed = self.armed & (1u64 << slot) != 0;
        self.set_armed(slot, false);
        armed
    }
}

fn is_dma_failure(err: &Error) -> bool {
    matches!(
        err,
        Error::DmaSubmitFailed { .. } | Error::RenderCommitFailed { .. } | Error::CaptureArmFailed { .. }
    )
}

fn check_alignment(ptr: *const u8, node: NodeId) {
    if ptr as usize % DMA_ALIGNMENT != 0 {
        log::debug!(
            "{}: DMA buffer at {:p} is not aligned to {} bytes",
            node,
            ptr,
            DMA_ALIGNMENT
        );
    }
}
