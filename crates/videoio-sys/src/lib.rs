// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Raw bindings to the VideoIO driver shim.
//!
//! The shim is a thin C library placed in front of the vendor SDK of a
//! multi-channel SDI capture/playback card. It exports a flat set of
//! `vio_*` functions which are resolved at runtime through `libloading`,
//! so nothing links against the vendor SDK at build time.

#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

// Re-export libloading for error handling
pub use libloading;

use std::ffi::{c_char, c_int, c_void, OsStr};
use std::sync::{Mutex, OnceLock};

/// Opaque attach handle returned by `vio_attach`.
pub type vio_handle = *mut c_void;

/// Status code returned by the shim, `VIO_OK` on success.
pub type vio_status = c_int;

pub const VIO_OK: vio_status = 0;

/// Library name used when `VIDEOIO_DRIVER_LIBRARY` is not set.
pub const DEFAULT_LIBRARY: &str = "libvideoio_driver.so";

/// `vio_setup::video_mode` value meaning "no mode".
pub const VIO_VIDEO_MODE_INVALID: u32 = 0;

pub const VIO_DIRECTION_INPUT: u32 = 0;
pub const VIO_DIRECTION_OUTPUT: u32 = 1;

/// Channel setup exchanged with the shim.
///
/// All enumerations travel as their raw `u32` values.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct vio_setup {
    pub device_id: c_int,
    pub channel: u32,
    pub video_mode: u32,
    pub signal_link: u32,
    pub sampling: u32,
    pub engine: u32,
    pub memory_format: u32,
}

/// Static card information, NUL-terminated strings.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct vio_device_info {
    pub serial: [c_char; 32],
    pub card_type: [c_char; 64],
}

impl Default for vio_device_info {
    fn default() -> Self {
        vio_device_info {
            serial: [0; 32],
            card_type: [0; 64],
        }
    }
}

/// Function table resolved from the driver shim.
pub struct VideoIoDriver {
    pub vio_enumerate: unsafe extern "C" fn(count: *mut c_int) -> vio_status,
    pub vio_attach: unsafe extern "C" fn(device_id: c_int, handle: *mut vio_handle) -> vio_status,
    pub vio_detach: unsafe extern "C" fn(handle: vio_handle) -> vio_status,
    pub vio_device_info:
        unsafe extern "C" fn(handle: vio_handle, info: *mut vio_device_info) -> vio_status,
    pub vio_default_input_setup:
        unsafe extern "C" fn(device_id: c_int, channel: u32, setup: *mut vio_setup),
    pub vio_default_output_setup:
        unsafe extern "C" fn(device_id: c_int, channel: u32, mode: u32, setup: *mut vio_setup),
    pub vio_detect_input_setup:
        unsafe extern "C" fn(handle: vio_handle, setup: *mut vio_setup) -> vio_status,
    pub vio_recommended_input_setup:
        unsafe extern "C" fn(handle: vio_handle, setup: *mut vio_setup) -> vio_status,
    pub vio_validate_setup: unsafe extern "C" fn(setup: *const vio_setup) -> vio_status,
    pub vio_apply_input_setup:
        unsafe extern "C" fn(handle: vio_handle, setup: *const vio_setup) -> vio_status,
    pub vio_apply_output_setup:
        unsafe extern "C" fn(handle: vio_handle, setup: *const vio_setup) -> vio_status,
    /// Returns bytes queued, negative on failure.
    pub vio_dma_write_async:
        unsafe extern "C" fn(handle: vio_handle, buffer: *const u8, size: u32, slot: u32) -> i64,
    /// Returns bytes queued, negative on failure.
    pub vio_dma_read_async:
        unsafe extern "C" fn(handle: vio_handle, buffer: *mut u8, size: u32, slot: u32) -> i64,
    pub vio_commit_render_buffer: unsafe extern "C" fn(handle: vio_handle, slot: u32) -> vio_status,
    pub vio_arm_capture_buffer: unsafe extern "C" fn(handle: vio_handle, slot: u32) -> vio_status,
    pub vio_wait_field_sync:
        unsafe extern "C" fn(handle: vio_handle, direction: u32, field_count: *mut u64) -> vio_status,
    _lib: libloading::Library,
}

impl VideoIoDriver {
    /// Load the shim from `path` and resolve every `vio_*` symbol.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisers; the library must export the
    /// functions with exactly the signatures declared above.
    pub unsafe fn new<P: AsRef<OsStr>>(path: P) -> Result<Self, libloading::Error> {
        let lib = libloading::Library::new(path)?;

        Ok(VideoIoDriver {
            vio_enumerate: symbol(&lib, b"vio_enumerate\0")?,
            vio_attach: symbol(&lib, b"vio_attach\0")?,
            vio_detach: symbol(&lib, b"vio_detach\0")?,
            vio_device_info: symbol(&lib, b"vio_device_info\0")?,
            vio_default_input_setup: symbol(&lib, b"vio_default_input_setup\0")?,
            vio_default_output_setup: symbol(&lib, b"vio_default_output_setup\0")?,
            vio_detect_input_setup: symbol(&lib, b"vio_detect_input_setup\0")?,
            vio_recommended_input_setup: symbol(&lib, b"vio_recommended_input_setup\0")?,
            vio_validate_setup: symbol(&lib, b"vio_validate_setup\0")?,
            vio_apply_input_setup: symbol(&lib, b"vio_apply_input_setup\0")?,
            vio_apply_output_setup: symbol(&lib, b"vio_apply_output_setup\0")?,
            vio_dma_write_async: symbol(&lib, b"vio_dma_write_async\0")?,
            vio_dma_read_async: symbol(&lib, b"vio_dma_read_async\0")?,
            vio_commit_render_buffer: symbol(&lib, b"vio_commit_render_buffer\0")?,
            vio_arm_capture_buffer: symbol(&lib, b"vio_arm_capture_buffer\0")?,
            vio_wait_field_sync: symbol(&lib, b"vio_wait_field_sync\0")?,
            _lib: lib,
        })
    }
}

unsafe fn symbol<T: Copy>(lib: &libloading::Library, name: &[u8]) -> Result<T, libloading::Error> {
    let sym: libloading::Symbol<'_, T> = lib.get(name)?;
    Ok(*sym)
}

static LIBRARY: OnceLock<VideoIoDriver> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Initialize the driver shim by loading libvideoio_driver.so
///
/// Returns an error if the library cannot be loaded or a symbol is missing.
///
/// The environment variable `VIDEOIO_DRIVER_LIBRARY` can be used to specify
/// a custom path to the library. If not set, searches standard system paths.
pub fn init() -> Result<&'static VideoIoDriver, libloading::Error> {
    if let Some(lib) = LIBRARY.get() {
        return Ok(lib);
    }

    let _guard = INIT_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    // Double-check after acquiring lock
    if let Some(lib) = LIBRARY.get() {
        return Ok(lib);
    }

    let lib_path =
        std::env::var("VIDEOIO_DRIVER_LIBRARY").unwrap_or_else(|_| DEFAULT_LIBRARY.to_string());

    let lib = unsafe { VideoIoDriver::new(lib_path.as_str())? };

    Ok(LIBRARY.get_or_init(|| lib))
}

/// Try to get a reference to the loaded library without loading it
pub fn try_library() -> Option<&'static VideoIoDriver> {
    LIBRARY.get()
}
