//! Audio device data models.
//!
//! Defines the device record, format descriptor, usage roles and the error
//! taxonomy shared by the query and control layers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A playback endpoint read from the OS device registry.
///
/// Owns the live OS device object. Not `Clone`: the handle is released
/// exactly once, when the record is dropped or the handle is moved out with
/// [`OutputDevice::into_handle`].
#[derive(Debug)]
pub struct OutputDevice<H> {
    /// Unique Windows endpoint ID (opaque string from IMMDevice::GetId)
    pub id: String,

    /// Human-readable device name (from the device property store)
    pub name: String,

    handle: H,
}

impl<H> OutputDevice<H> {
    /// Create a record that owns `handle`.
    pub fn new(id: String, name: String, handle: H) -> Self {
        Self { id, name, handle }
    }

    /// Borrow the live device handle.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Transfer ownership of the handle to the caller.
    pub fn into_handle(self) -> H {
        self.handle
    }

    /// Identity of this record as handed across the binding boundary.
    pub fn to_info(&self, is_default: bool) -> DeviceInfo {
        DeviceInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            is_default,
        }
    }
}

/// Device entry as handed across the binding boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Shared-mode mix format snapshot of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatInfo {
    /// Bits per sample (e.g., 16, 24, 32)
    pub bit_depth: u16,

    /// Number of audio channels
    pub channels: u16,

    /// Bytes per sample frame across all channels
    pub block_align: u16,

    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// False when the format could not be read; all other fields are zero then
    pub valid: bool,
}

impl FormatInfo {
    /// Descriptor reported when the mix format is unavailable.
    pub const fn invalid() -> Self {
        Self {
            bit_depth: 0,
            channels: 0,
            block_align: 0,
            sample_rate: 0,
            valid: false,
        }
    }
}

impl std::fmt::Display for FormatInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.valid {
            return write!(f, "unknown");
        }
        let rate_khz = self.sample_rate as f64 / 1000.0;
        if rate_khz.fract() == 0.0 {
            write!(f, "{}kHz", rate_khz as u32)?;
        } else {
            write!(f, "{:.1}kHz", rate_khz)?;
        }
        write!(f, "/{}-bit/{}ch", self.bit_depth, self.channels)
    }
}

/// Audio usage role (maps to Windows ERole enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceRole {
    /// Games, system sounds, voice commands
    Console = 0,

    /// Music players, video players
    Multimedia = 1,

    /// Teams, Zoom, Discord and other VoIP applications
    Communications = 2,
}

impl DeviceRole {
    /// Every role, in the order default assignment walks them.
    pub const ALL: [DeviceRole; 3] = [
        DeviceRole::Console,
        DeviceRole::Multimedia,
        DeviceRole::Communications,
    ];
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceRole::Console => "console",
            DeviceRole::Multimedia => "multimedia",
            DeviceRole::Communications => "communications",
        };
        f.write_str(name)
    }
}

/// A failed OS call, reduced to its HRESULT and system message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (HRESULT 0x{code:08X})")]
pub struct OsError {
    pub code: i32,
    pub message: String,
}

impl OsError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for OsError {
    fn from(err: windows::core::Error) -> Self {
        Self {
            code: err.code().0,
            message: err.message(),
        }
    }
}

/// Audio service error types.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("COM initialization failed: {0}")]
    Initialization(#[source] OsError),

    #[error("Failed to enumerate devices: {0}")]
    Enumeration(#[source] OsError),

    #[error("No output devices found")]
    NoDevicesFound,

    #[error("Policy configuration interface unavailable: {0}")]
    PolicyUnavailable(#[source] OsError),

    #[error("Failed to set default device for {role} role: {source}")]
    SetDefaultFailed {
        role: DeviceRole,
        #[source]
        source: OsError,
    },

    #[error("Volume control not available for device")]
    VolumeNotAvailable,

    #[error("String conversion error: {0}")]
    StringConversion(String),

    #[error("Windows audio devices are not supported on this platform")]
    Unsupported,
}
