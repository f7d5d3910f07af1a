//! Mute control using IAudioEndpointVolume.

use super::device::{AudioError, OsError};
use windows::Win32::Media::Audio::{Endpoints::IAudioEndpointVolume, IMMDevice};
use windows::Win32::System::Com::CLSCTX_ALL;

/// Endpoint volume interface activated on one device.
pub struct EndpointVolume {
    endpoint_volume: IAudioEndpointVolume,
}

impl EndpointVolume {
    /// Activate the endpoint volume interface on `device`.
    pub fn new(device: &IMMDevice) -> Result<Self, AudioError> {
        unsafe {
            let endpoint_volume: IAudioEndpointVolume = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|_| AudioError::VolumeNotAvailable)?;

            Ok(Self { endpoint_volume })
        }
    }

    /// Get the current mute state.
    pub fn get_mute(&self) -> Result<bool, OsError> {
        unsafe {
            let muted = self.endpoint_volume.GetMute()?;
            Ok(muted.as_bool())
        }
    }

    /// Set the mute state.
    pub fn set_mute(&self, muted: bool) -> Result<(), OsError> {
        unsafe {
            self.endpoint_volume.SetMute(muted, std::ptr::null())?;
            Ok(())
        }
    }
}
