// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! In-memory [`Driver`] simulating capture/playback cards.
//!
//! Used by the test suites and by `videoio --simulate`. DMA calls are
//! recorded in a bounded journal so tests can check which slots were written,
//! committed, armed and read; once [`JOURNAL_CAPACITY`] events are held the
//! oldest are dropped. Failures can be injected per call type at any time
//! through the shared handle.
//!
//! ```
//! use std::sync::Arc;
//! use videoio::mock::{DmaEvent, MockCard, MockDriver};
//! use videoio::{ChannelId, DeviceRegistry, VideoMode};
//!
//! let mock = Arc::new(MockDriver::new().with_card(MockCard::new("SN1", "Sim")));
//! let registry = DeviceRegistry::new(mock.clone());
//! let device = registry.get("SN1").unwrap();
//! device.open_channel(ChannelId::Output1, Some(VideoMode::Hd720p50)).unwrap();
//! device.dma_write(ChannelId::Output1, 0, &[0u8; 64]).unwrap();
//! assert_eq!(mock.journal().len(), 2);
//! assert!(matches!(mock.journal()[1], DmaEvent::Commit { slot: 0, .. }));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::channel_id::{ChannelId, Direction};
use crate::driver::{
    DeviceInfo, Driver, DriverError, SessionHandle, DEFAULT_CAPTURE_LATENCY_FIELDS,
};
use crate::mode::VideoMode;
use crate::setup::{MemoryFormat, Sampling, SetupDescriptor, SignalLink};
use crate::DeviceId;

/// Status returned when no signal is present on an input.
pub const NO_SIGNAL: DriverError = DriverError(-61);

/// Status returned by injected failures.
pub const INJECTED: DriverError = DriverError(-5);

/// Status returned for unknown handles and device ids.
pub const NO_DEVICE: DriverError = DriverError(-19);

/// Default number of DMA events kept in the journal.
pub const JOURNAL_CAPACITY: usize = 4096;

/// Signal seen by a simulated input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MockSignal {
    /// What signal detection reports.
    pub detected: Option<(VideoMode, SignalLink)>,
    /// What the driver recommends when detection fails.
    pub recommended: Option<(VideoMode, SignalLink)>,
    /// Detection succeeds without reporting a mode.
    pub detected_without_mode: bool,
}

/// One simulated card.
#[derive(Debug, Clone)]
pub struct MockCard {
    serial: String,
    card_type: String,
    inputs: HashMap<ChannelId, MockSignal>,
    capture_latency_fields: u32,
    fail_attach: bool,
}

impl MockCard {
    pub fn new(serial: &str, card_type: &str) -> Self {
        MockCard {
            serial: serial.to_owned(),
            card_type: card_type.to_owned(),
            inputs: HashMap::new(),
            capture_latency_fields: DEFAULT_CAPTURE_LATENCY_FIELDS,
            fail_attach: false,
        }
    }

    /// A single-link signal in `mode` on `channel`.
    pub fn with_input(self, channel: ChannelId, mode: VideoMode) -> Self {
        self.with_input_link(channel, mode, SignalLink::SingleLink)
    }

    pub fn with_input_link(mut self, channel: ChannelId, mode: VideoMode, link: SignalLink) -> Self {
        self.inputs.entry(channel).or_default().detected = Some((mode, link));
        self
    }

    /// Detection on `channel` reports success but leaves the mode unset.
    pub fn with_modeless_detection(mut self, channel: ChannelId) -> Self {
        self.inputs.entry(channel).or_default().detected_without_mode = true;
        self
    }

    /// A recommendation used when detection finds nothing.
    pub fn with_recommended(mut self, channel: ChannelId, mode: VideoMode) -> Self {
        self.inputs.entry(channel).or_default().recommended = Some((mode, SignalLink::SingleLink));
        self
    }

    pub fn with_capture_latency(mut self, fields: u32) -> Self {
        self.capture_latency_fields = fields;
        self
    }

    /// Every attach to this card fails.
    pub fn failing_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }
}

/// DMA activity recorded by [`MockDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaEvent {
    Write {
        device_id: DeviceId,
        channel: Option<ChannelId>,
        slot: u32,
        bytes: usize,
    },
    Commit {
        device_id: DeviceId,
        channel: Option<ChannelId>,
        slot: u32,
    },
    Arm {
        device_id: DeviceId,
        channel: Option<ChannelId>,
        slot: u32,
    },
    Read {
        device_id: DeviceId,
        channel: Option<ChannelId>,
        slot: u32,
        bytes: usize,
    },
}

impl DmaEvent {
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            DmaEvent::Write { channel, .. }
            | DmaEvent::Commit { channel, .. }
            | DmaEvent::Arm { channel, .. }
            | DmaEvent::Read { channel, .. } => *channel,
        }
    }

    pub fn slot(&self) -> u32 {
        match self {
            DmaEvent::Write { slot, .. }
            | DmaEvent::Commit { slot, .. }
            | DmaEvent::Arm { slot, .. }
            | DmaEvent::Read { slot, .. } => *slot,
        }
    }
}

#[derive(Debug)]
struct Session {
    device_id: DeviceId,
    applied: Option<SetupDescriptor>,
    field_count: u64,
    next_sync: Option<Instant>,
}

impl Session {
    fn channel(&self) -> Option<ChannelId> {
        self.applied.map(|s| s.channel)
    }
}

#[derive(Debug)]
struct MockState {
    next_handle: u64,
    sessions: HashMap<u64, Session>,
    journal: VecDeque<DmaEvent>,
    journal_capacity: usize,
    fail_enumerate: bool,
    fail_detach: bool,
    fail_validate: bool,
    fail_dma_write: bool,
    fail_dma_read: bool,
    fail_commit: bool,
    fail_arm: bool,
    fail_sync: bool,
    skip_fields: u64,
}

impl Default for MockState {
    fn default() -> Self {
        MockState {
            next_handle: 0,
            sessions: HashMap::new(),
            journal: VecDeque::new(),
            journal_capacity: JOURNAL_CAPACITY,
            fail_enumerate: false,
            fail_detach: false,
            fail_validate: false,
            fail_dma_write: false,
            fail_dma_read: false,
            fail_commit: false,
            fail_arm: false,
            fail_sync: false,
            skip_fields: 0,
        }
    }
}

impl MockState {
    fn record(&mut self, event: DmaEvent) {
        if self.journal_capacity == 0 {
            return;
        }
        while self.journal.len() >= self.journal_capacity {
            self.journal.pop_front();
        }
        self.journal.push_back(event);
    }
}

/// Simulated driver holding any number of [`MockCard`]s.
#[derive(Debug, Default)]
pub struct MockDriver {
    cards: Vec<MockCard>,
    reported_count: Option<u32>,
    realtime: bool,
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a card; device ids follow insertion order starting at 1.
    pub fn with_card(mut self, card: MockCard) -> Self {
        self.cards.push(card);
        self
    }

    /// Report `count` devices from enumeration regardless of the cards added.
    pub fn with_reported_count(mut self, count: u32) -> Self {
        self.reported_count = Some(count);
        self
    }

    /// Pace field sync waits at the negotiated frame rate instead of returning at once.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Keep at most `capacity` DMA events; zero disables recording.
    pub fn with_journal_capacity(mut self, capacity: usize) -> Self {
        let state = self.state.get_mut().unwrap_or_else(|p| p.into_inner());
        state.journal_capacity = capacity;
        while state.journal.len() > capacity {
            state.journal.pop_front();
        }
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn card(&self, device_id: DeviceId) -> Option<&MockCard> {
        let index = usize::try_from(device_id).ok()?.checked_sub(1)?;
        self.cards.get(index)
    }

    pub fn fail_enumerate(&self, fail: bool) {
        self.state().fail_enumerate = fail;
    }

    pub fn fail_detach(&self, fail: bool) {
        self.state().fail_detach = fail;
    }

    pub fn fail_validate(&self, fail: bool) {
        self.state().fail_validate = fail;
    }

    pub fn fail_dma_write(&self, fail: bool) {
        self.state().fail_dma_write = fail;
    }

    pub fn fail_dma_read(&self, fail: bool) {
        self.state().fail_dma_read = fail;
    }

    pub fn fail_commit(&self, fail: bool) {
        self.state().fail_commit = fail;
    }

    pub fn fail_arm(&self, fail: bool) {
        self.state().fail_arm = fail;
    }

    pub fn fail_sync(&self, fail: bool) {
        self.state().fail_sync = fail;
    }

    /// Advance the field counter by `fields` extra on the next wait, as if
    /// the host had missed that many fields.
    pub fn skip_fields(&self, fields: u64) {
        self.state().skip_fields = fields;
    }

    pub fn open_sessions(&self) -> usize {
        self.state().sessions.len()
    }

    /// Recorded DMA events, oldest first.
    pub fn journal(&self) -> Vec<DmaEvent> {
        self.state().journal.iter().copied().collect()
    }

    pub fn clear_journal(&self) {
        self.state().journal.clear();
    }

    /// Setup most recently applied to `channel` of `device_id` by an open session.
    pub fn applied_setup(&self, device_id: DeviceId, channel: ChannelId) -> Option<SetupDescriptor> {
        self.state()
            .sessions
            .values()
            .filter(|s| s.device_id == device_id)
            .filter_map(|s| s.applied)
            .find(|s| s.channel == channel)
    }

    fn session_card(&self, handle: SessionHandle) -> Result<&MockCard, DriverError> {
        let device_id = self
            .state()
            .sessions
            .get(&handle.0)
            .map(|s| s.device_id)
            .ok_or(NO_DEVICE)?;
        self.card(device_id).ok_or(NO_DEVICE)
    }

    fn signal(
        &self,
        handle: SessionHandle,
        channel: ChannelId,
    ) -> Result<MockSignal, DriverError> {
        let card = self.session_card(handle)?;
        Ok(card.inputs.get(&channel).copied().unwrap_or_default())
    }

    fn apply(&self, handle: SessionHandle, setup: &SetupDescriptor) -> Result<(), DriverError> {
        let mut state = self.state();
        let session = state.sessions.get_mut(&handle.0).ok_or(NO_DEVICE)?;
        session.applied = Some(*setup);
        session.next_sync = None;
        Ok(())
    }
}

fn fill(setup: &mut SetupDescriptor, found: Option<(VideoMode, SignalLink)>) -> Result<(), DriverError> {
    let (mode, link) = found.ok_or(NO_SIGNAL)?;
    setup.mode = Some(mode);
    setup.link = link;
    Ok(())
}

impl Driver for MockDriver {
    fn enumerate(&self) -> Result<u32, DriverError> {
        if self.state().fail_enumerate {
            return Err(INJECTED);
        }
        match self.reported_count {
            Some(count) => Ok(count),
            None => u32::try_from(self.cards.len()).map_err(|_| DriverError::INVALID_DATA),
        }
    }

    fn attach(&self, device_id: DeviceId) -> Result<SessionHandle, DriverError> {
        let card = self.card(device_id).ok_or(NO_DEVICE)?;
        if card.fail_attach {
            return Err(INJECTED);
        }
        let mut state = self.state();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.sessions.insert(
            handle,
            Session {
                device_id,
                applied: None,
                field_count: 0,
                next_sync: None,
            },
        );
        Ok(SessionHandle(handle))
    }

    fn detach(&self, handle: SessionHandle) -> Result<(), DriverError> {
        let mut state = self.state();
        if state.fail_detach {
            return Err(INJECTED);
        }
        state.sessions.remove(&handle.0).map(|_| ()).ok_or(NO_DEVICE)
    }

    fn device_info(&self, handle: SessionHandle) -> Result<DeviceInfo, DriverError> {
        let card = self.session_card(handle)?;
        Ok(DeviceInfo {
            serial: card.serial.clone(),
            card_type: card.card_type.clone(),
        })
    }

    fn default_input_setup(&self, device_id: DeviceId, channel: ChannelId) -> SetupDescriptor {
        SetupDescriptor::new(device_id, channel, None)
    }

    fn default_output_setup(
        &self,
        device_id: DeviceId,
        channel: ChannelId,
        mode: VideoMode,
    ) -> SetupDescriptor {
        // cards default to full-bandwidth RGB, the policy overlay replaces it
        let mut setup = SetupDescriptor::new(device_id, channel, Some(mode));
        setup.sampling = Sampling::Rgb444;
        setup.memory_format = MemoryFormat::Bgra8;
        setup
    }

    fn detect_input_setup(
        &self,
        handle: SessionHandle,
        setup: &mut SetupDescriptor,
    ) -> Result<(), DriverError> {
        let signal = self.signal(handle, setup.channel)?;
        if signal.detected_without_mode {
            return Ok(());
        }
        fill(setup, signal.detected)
    }

    fn recommended_input_setup(
        &self,
        handle: SessionHandle,
        setup: &mut SetupDescriptor,
    ) -> Result<(), DriverError> {
        let signal = self.signal(handle, setup.channel)?;
        fill(setup, signal.recommended)
    }

    fn validate_setup(&self, setup: &SetupDescriptor) -> Result<(), DriverError> {
        if self.state().fail_validate {
            return Err(INJECTED);
        }
        if setup.mode.is_none() || self.card(setup.device_id).is_none() {
            return Err(DriverError::INVALID_DATA);
        }
        Ok(())
    }

    fn apply_input_setup(
        &self,
        handle: SessionHandle,
        setup: &SetupDescriptor,
    ) -> Result<(), DriverError> {
        self.apply(handle, setup)
    }

    fn apply_output_setup(
        &self,
        handle: SessionHandle,
        setup: &SetupDescriptor,
    ) -> Result<(), DriverError> {
        self.apply(handle, setup)
    }

    fn dma_write_async(
        &self,
        handle: SessionHandle,
        buffer: &[u8],
        slot: u32,
    ) -> Result<usize, DriverError> {
        let mut state = self.state();
        if state.fail_dma_write {
            return Err(INJECTED);
        }
        let session = state.sessions.get(&handle.0).ok_or(NO_DEVICE)?;
        let event = DmaEvent::Write {
            device_id: session.device_id,
            channel: session.channel(),
            slot,
            bytes: buffer.len(),
        };
        state.record(event);
        Ok(buffer.len())
    }

    fn dma_read_async(
        &self,
        handle: SessionHandle,
        buffer: &mut [u8],
        slot: u32,
    ) -> Result<usize, DriverError> {
        let mut state = self.state();
        if state.fail_dma_read {
            return Err(INJECTED);
        }
        let session = state.sessions.get(&handle.0).ok_or(NO_DEVICE)?;
        let event = DmaEvent::Read {
            device_id: session.device_id,
            channel: session.channel(),
            slot,
            bytes: buffer.len(),
        };
        state.record(event);
        // frames carry their slot number so readers can tell them apart
        buffer.fill(slot as u8);
        Ok(buffer.len())
    }

    fn commit_render_buffer(&self, handle: SessionHandle, slot: u32) -> Result<(), DriverError> {
        let mut state = self.state();
        if state.fail_commit {
            return Err(INJECTED);
        }
        let session = state.sessions.get(&handle.0).ok_or(NO_DEVICE)?;
        let event = DmaEvent::Commit {
            device_id: session.device_id,
            channel: session.channel(),
            slot,
        };
        state.record(event);
        Ok(())
    }

    fn arm_capture_buffer(&self, handle: SessionHandle, slot: u32) -> Result<(), DriverError> {
        let mut state = self.state();
        if state.fail_arm {
            return Err(INJECTED);
        }
        let session = state.sessions.get(&handle.0).ok_or(NO_DEVICE)?;
        let event = DmaEvent::Arm {
            device_id: session.device_id,
            channel: session.channel(),
            slot,
        };
        state.record(event);
        Ok(())
    }

    fn wait_field_sync(
        &self,
        handle: SessionHandle,
        _direction: Direction,
    ) -> Result<u64, DriverError> {
        let realtime = self.realtime;
        let (count, deadline) = {
            let mut state = self.state();
            if state.fail_sync {
                return Err(INJECTED);
            }
            let skipped = std::mem::take(&mut state.skip_fields);
            let session = state.sessions.get_mut(&handle.0).ok_or(NO_DEVICE)?;
            let format = session.applied.and_then(|s| s.format());
            let fields = format.map(|f| f.fields_per_frame()).unwrap_or(1) as u64;
            session.field_count += fields + skipped;

            let mut deadline = None;
            if let (true, Some(format)) = (realtime, format) {
                let period = Duration::from_secs_f64(format.frame_rate.delta_seconds().as_f64());
                let now = Instant::now();
                let next = session.next_sync.map_or(now + period, |t| (t + period).max(now));
                session.next_sync = Some(next);
                deadline = Some(next);
            }
            (session.field_count, deadline)
        };

        if let Some(deadline) = deadline {
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
        Ok(count)
    }

    fn capture_latency_fields(&self, handle: SessionHandle) -> u32 {
        self.session_card(handle)
            .map(|c| c.capture_latency_fields)
            .unwrap_or(DEFAULT_CAPTURE_LATENCY_FIELDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> MockDriver {
        MockDriver::new()
            .with_card(
                MockCard::new("SN1", "Sim A")
                    .with_input(ChannelId::Input1, VideoMode::Hd1080i50)
                    .with_recommended(ChannelId::Input2, VideoMode::Hd720p5994),
            )
            .with_card(MockCard::new("SN2", "Sim B").failing_attach())
    }

    #[test]
    fn test_enumerate_and_attach() {
        let mock = driver();
        assert_eq!(mock.enumerate(), Ok(2));
        let handle = mock.attach(1).unwrap();
        assert_eq!(mock.device_info(handle).unwrap().serial, "SN1");
        assert_eq!(mock.attach(2), Err(INJECTED));
        assert_eq!(mock.attach(0), Err(NO_DEVICE));
        assert_eq!(mock.attach(3), Err(NO_DEVICE));
        mock.detach(handle).unwrap();
        assert_eq!(mock.open_sessions(), 0);
    }

    #[test]
    fn test_detect_and_recommend() {
        let mock = driver();
        let handle = mock.attach(1).unwrap();

        let mut setup = mock.default_input_setup(1, ChannelId::Input1);
        mock.detect_input_setup(handle, &mut setup).unwrap();
        assert_eq!(setup.mode, Some(VideoMode::Hd1080i50));

        let mut setup = mock.default_input_setup(1, ChannelId::Input2);
        assert_eq!(mock.detect_input_setup(handle, &mut setup), Err(NO_SIGNAL));
        mock.recommended_input_setup(handle, &mut setup).unwrap();
        assert_eq!(setup.mode, Some(VideoMode::Hd720p5994));
    }

    #[test]
    fn test_field_counter_follows_scan() {
        let mock = driver();
        let handle = mock.attach(1).unwrap();
        let setup = SetupDescriptor::new(1, ChannelId::Input1, Some(VideoMode::Hd1080i50));
        mock.apply_input_setup(handle, &setup).unwrap();

        assert_eq!(mock.wait_field_sync(handle, Direction::Input), Ok(2));
        assert_eq!(mock.wait_field_sync(handle, Direction::Input), Ok(4));
        mock.skip_fields(6);
        assert_eq!(mock.wait_field_sync(handle, Direction::Input), Ok(12));
        assert_eq!(mock.wait_field_sync(handle, Direction::Input), Ok(14));
    }

    #[test]
    fn test_read_fills_slot_pattern() {
        let mock = driver();
        let handle = mock.attach(1).unwrap();
        let mut buffer = vec![0u8; 16];
        assert_eq!(mock.dma_read_async(handle, &mut buffer, 3), Ok(16));
        assert!(buffer.iter().all(|b| *b == 3));
    }

    #[test]
    fn test_injected_failures() {
        let mock = driver();
        let handle = mock.attach(1).unwrap();
        mock.fail_dma_write(true);
        assert_eq!(mock.dma_write_async(handle, &[0; 4], 0), Err(INJECTED));
        mock.fail_dma_write(false);
        assert_eq!(mock.dma_write_async(handle, &[0; 4], 0), Ok(4));
        assert_eq!(mock.journal().len(), 1);
    }

    #[test]
    fn test_journal_drops_oldest_events() {
        let mock = MockDriver::new()
            .with_card(MockCard::new("SN1", "Sim"))
            .with_journal_capacity(3);
        let handle = mock.attach(1).unwrap();
        for slot in 0..5 {
            mock.dma_write_async(handle, &[0; 4], slot).unwrap();
        }
        let slots: Vec<u32> = mock.journal().iter().map(|e| e.slot()).collect();
        assert_eq!(slots, vec![2, 3, 4]);
    }

    #[test]
    fn test_journal_disabled() {
        let mock = MockDriver::new()
            .with_card(MockCard::new("SN1", "Sim"))
            .with_journal_capacity(0);
        let handle = mock.attach(1).unwrap();
        mock.dma_write_async(handle, &[0; 4], 0).unwrap();
        mock.commit_render_buffer(handle, 0).unwrap();
        assert!(mock.journal().is_empty());
    }

    #[test]
    fn test_modeless_detection() {
        let mock = MockDriver::new().with_card(
            MockCard::new("SN1", "Sim").with_modeless_detection(ChannelId::Input1),
        );
        let handle = mock.attach(1).unwrap();
        let mut setup = mock.default_input_setup(1, ChannelId::Input1);
        assert_eq!(mock.detect_input_setup(handle, &mut setup), Ok(()));
        assert_eq!(setup.mode, None);
    }
}
