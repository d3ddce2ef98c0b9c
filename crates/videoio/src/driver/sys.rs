// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::ffi::c_int;

use videoio_sys as ffi;

use super::{DeviceInfo, Driver, DriverError, SessionHandle};
use crate::channel_id::{ChannelId, Direction};
use crate::mode::VideoMode;
use crate::setup::{MemoryFormat, Sampling, SetupDescriptor, SignalLink, VideoEngine};
use crate::{DeviceId, Error};

/// [`Driver`] backed by the runtime-loaded driver shim.
pub struct SysDriver {
    lib: &'static ffi::VideoIoDriver,
}

impl SysDriver {
    /// Load the shim (see [`videoio_sys::init`]).
    pub fn load() -> Result<Self, Error> {
        let lib = ffi::init()?;
        Ok(SysDriver { lib })
    }
}

fn status(code: ffi::vio_status) -> Result<(), DriverError> {
    if code == ffi::VIO_OK {
        Ok(())
    } else {
        Err(DriverError(code as i64))
    }
}

fn raw_handle(handle: SessionHandle) -> ffi::vio_handle {
    handle.0 as usize as ffi::vio_handle
}

fn to_ffi(setup: &SetupDescriptor) -> ffi::vio_setup {
    ffi::vio_setup {
        device_id: setup.device_id,
        channel: setup.channel.raw(),
        video_mode: setup
            .mode
            .map(|m| m.raw())
            .unwrap_or(ffi::VIO_VIDEO_MODE_INVALID),
        signal_link: setup.link as u32,
        sampling: setup.sampling as u32,
        engine: setup.engine as u32,
        memory_format: setup.memory_format as u32,
    }
}

fn from_ffi(raw: &ffi::vio_setup) -> Result<SetupDescriptor, DriverError> {
    let channel = ChannelId::from_raw(raw.channel).ok_or(DriverError::INVALID_DATA)?;
    let mut setup = SetupDescriptor::new(raw.device_id, channel, VideoMode::from_raw(raw.video_mode));
    setup.link = SignalLink::from_raw(raw.signal_link).ok_or(DriverError::INVALID_DATA)?;
    setup.sampling = Sampling::from_raw(raw.sampling).unwrap_or_default();
    setup.engine = VideoEngine::from_raw(raw.engine).unwrap_or_default();
    setup.memory_format = MemoryFormat::from_raw(raw.memory_format).unwrap_or_default();
    Ok(setup)
}

fn c_string(chars: &[std::ffi::c_char]) -> String {
    let bytes: Vec<u8> = chars
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn transferred(ret: i64) -> Result<usize, DriverError> {
    if ret < 0 {
        Err(DriverError(ret))
    } else {
        Ok(ret as usize)
    }
}

impl Driver for SysDriver {
    fn enumerate(&self) -> Result<u32, DriverError> {
        let mut count: c_int = 0;
        status(unsafe { (self.lib.vio_enumerate)(&mut count) })?;
        Ok(count.max(0) as u32)
    }

    fn attach(&self, device_id: DeviceId) -> Result<SessionHandle, DriverError> {
        let mut handle: ffi::vio_handle = std::ptr::null_mut();
        status(unsafe { (self.lib.vio_attach)(device_id, &mut handle) })?;
        if handle.is_null() {
            return Err(DriverError::INVALID_DATA);
        }
        Ok(SessionHandle(handle as usize as u64))
    }

    fn detach(&self, handle: SessionHandle) -> Result<(), DriverError> {
        status(unsafe { (self.lib.vio_detach)(raw_handle(handle)) })
    }

    fn device_info(&self, handle: SessionHandle) -> Result<DeviceInfo, DriverError> {
        let mut info = ffi::vio_device_info::default();
        status(unsafe { (self.lib.vio_device_info)(raw_handle(handle), &mut info) })?;
        Ok(DeviceInfo {
            serial: c_string(&info.serial),
            card_type: c_string(&info.card_type),
        })
    }

    fn default_input_setup(&self, device_id: DeviceId, channel: ChannelId) -> SetupDescriptor {
        let mut raw = ffi::vio_setup::default();
        unsafe { (self.lib.vio_default_input_setup)(device_id, channel.raw(), &mut raw) };
        from_ffi(&raw).unwrap_or_else(|_| SetupDescriptor::new(device_id, channel, None))
    }

    fn default_output_setup(
        &self,
        device_id: DeviceId,
        channel: ChannelId,
        mode: VideoMode,
    ) -> SetupDescriptor {
        let mut raw = ffi::vio_setup::default();
        unsafe {
            (self.lib.vio_default_output_setup)(device_id, channel.raw(), mode.raw(), &mut raw)
        };
        from_ffi(&raw).unwrap_or_else(|_| SetupDescriptor::new(device_id, channel, Some(mode)))
    }

    fn detect_input_setup(
        &self,
        handle: SessionHandle,
        setup: &mut SetupDescriptor,
    ) -> Result<(), DriverError> {
        let mut raw = to_ffi(setup);
        status(unsafe { (self.lib.vio_detect_input_setup)(raw_handle(handle), &mut raw) })?;
        *setup = from_ffi(&raw)?;
        Ok(())
    }

    fn recommended_input_setup(
        &self,
        handle: SessionHandle,
        setup: &mut SetupDescriptor,
    ) -> Result<(), DriverError> {
        let mut raw = to_ffi(setup);
        status(unsafe { (self.lib.vio_recommended_input_setup)(raw_handle(handle), &mut raw) })?;
        *setup = from_ffi(&raw)?;
        Ok(())
    }

    fn validate_setup(&self, setup: &SetupDescriptor) -> Result<(), DriverError> {
        let raw = to_ffi(setup);
        status(unsafe { (self.lib.vio_validate_setup)(&raw) })
    }

    fn apply_input_setup(
        &self,
        handle: SessionHandle,
        setup: &SetupDescriptor,
    ) -> Result<(), DriverError> {
        let raw = to_ffi(setup);
        status(unsafe { (self.lib.vio_apply_input_setup)(raw_handle(handle), &raw) })
    }

    fn apply_output_setup(
        &self,
        handle: SessionHandle,
        setup: &SetupDescriptor,
    ) -> Result<(), DriverError> {
        let raw = to_ffi(setup);
        status(unsafe { (self.lib.vio_apply_output_setup)(raw_handle(handle), &raw) })
    }

    fn dma_write_async(
        &self,
        handle: SessionHandle,
        buffer: &[u8],
        slot: u32,
    ) -> Result<usize, DriverError> {
        let size = u32::try_from(buffer.len()).map_err(|_| DriverError::INVALID_DATA)?;
        transferred(unsafe {
            (self.lib.vio_dma_write_async)(raw_handle(handle), buffer.as_ptr(), size, slot)
        })
    }

    fn dma_read_async(
        &self,
        handle: SessionHandle,
        buffer: &mut [u8],
        slot: u32,
    ) -> Result<usize, DriverError> {
        let size = u32::try_from(buffer.len()).map_err(|_| DriverError::INVALID_DATA)?;
        transferred(unsafe {
            (self.lib.vio_dma_read_async)(raw_handle(handle), buffer.as_mut_ptr(), size, slot)
        })
    }

    fn commit_render_buffer(&self, handle: SessionHandle, slot: u32) -> Result<(), DriverError> {
        status(unsafe { (self.lib.vio_commit_render_buffer)(raw_handle(handle), slot) })
    }

    fn arm_capture_buffer(&self, handle: SessionHandle, slot: u32) -> Result<(), DriverError> {
        status(unsafe { (self.lib.vio_arm_capture_buffer)(raw_handle(handle), slot) })
    }

    fn wait_field_sync(
        &self,
        handle: SessionHandle,
        direction: Direction,
    ) -> Result<u64, DriverError> {
        let mut field_count: u64 = 0;
        status(unsafe {
            (self.lib.vio_wait_field_sync)(raw_handle(handle), direction.raw(), &mut field_count)
        })?;
        Ok(field_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_ffi_round_trip() {
        let mut setup = SetupDescriptor::new(2, ChannelId::Input4, Some(VideoMode::Hd1080p5994));
        setup.apply_policy();
        let raw = to_ffi(&setup);
        assert_eq!(raw.channel, ChannelId::Input4.raw());
        assert_eq!(from_ffi(&raw), Ok(setup));
    }

    #[test]
    fn test_invalid_mode_maps_to_none() {
        let raw = ffi::vio_setup {
            device_id: 1,
            channel: ChannelId::Input1.raw(),
            video_mode: ffi::VIO_VIDEO_MODE_INVALID,
            signal_link: SignalLink::SingleLink as u32,
            ..Default::default()
        };
        assert_eq!(from_ffi(&raw).map(|s| s.mode), Ok(None));
    }

    #[test]
    fn test_unknown_link_is_rejected() {
        let raw = ffi::vio_setup {
            channel: ChannelId::Input1.raw(),
            signal_link: 7,
            ..Default::default()
        };
        assert_eq!(from_ffi(&raw), Err(DriverError::INVALID_DATA));
    }

    #[test]
    fn test_c_string() {
        let mut chars = [0 as std::ffi::c_char; 32];
        for (i, b) in b"SN4711".iter().enumerate() {
            chars[i] = *b as std::ffi::c_char;
        }
        assert_eq!(c_string(&chars), "SN4711");
        assert_eq!(c_string(&[0; 8]), "");
    }

    #[test]
    fn test_transferred() {
        assert_eq!(transferred(4096), Ok(4096));
        assert_eq!(transferred(-5), Err(DriverError(-5)));
    }
}
