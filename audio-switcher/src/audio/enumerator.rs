//! Playback device enumeration using Windows MMDevice API.
//!
//! [`WasapiBackend`] borrows the thread's [`ComGuard`], so every interface it
//! hands out is used inside the apartment it was created in.

use super::backend::{collect_output_devices, AudioBackend, EndpointEntry};
use super::device::{AudioError, FormatInfo, OsError, OutputDevice};
use super::guard::{CoTaskMem, ComGuard};
use super::volume::EndpointVolume;
use super::wide::{from_wide, to_wide};
use tracing::{debug, info, warn};
use windows::core::{PCWSTR, PROPVARIANT, PWSTR};
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eConsole, eRender, IAudioClient, IMMDevice, IMMDeviceEnumerator, MMDeviceEnumerator,
    DEVICE_STATE_ACTIVE, WAVEFORMATEX,
};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL, STGM};
use windows::Win32::System::Variant::VT_LPWSTR;
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

/// Name reported for a default device whose property store is unreadable.
const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// Render endpoint access through IMMDeviceEnumerator.
pub struct WasapiBackend<'com> {
    _com: &'com ComGuard,
}

impl<'com> WasapiBackend<'com> {
    /// Create a backend bound to an initialized COM apartment.
    pub fn new(com: &'com ComGuard) -> Self {
        Self { _com: com }
    }

    fn enumerator(&self) -> Result<IMMDeviceEnumerator, OsError> {
        unsafe { Ok(CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?) }
    }

    /// Read the endpoint ID, freeing the OS-allocated string.
    fn device_id(device: &IMMDevice) -> Result<String, AudioError> {
        unsafe {
            let id = device
                .GetId()
                .map_err(|e| AudioError::Enumeration(e.into()))?;
            let id = CoTaskMem::from_raw(id.0);

            from_wide(PWSTR(id.as_ptr()).as_wide())
        }
    }

    /// Get the friendly name of a device from its property store.
    fn friendly_name(device: &IMMDevice) -> Option<String> {
        unsafe {
            // STGM_READ
            let props: IPropertyStore = device.OpenPropertyStore(STGM(0)).ok()?;

            let key = PROPERTYKEY {
                fmtid: DEVPKEY_Device_FriendlyName.fmtid,
                pid: DEVPKEY_Device_FriendlyName.pid,
            };
            let prop = props.GetValue(&key).ok()?;

            name_from_property(&prop)
        }
    }
}

/// A friendly name is a non-empty VT_LPWSTR; any other variant type is unreadable.
fn name_from_property(prop: &PROPVARIANT) -> Option<String> {
    if prop.vt() != VT_LPWSTR.0 {
        return None;
    }

    let name = prop.to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

impl AudioBackend for WasapiBackend<'_> {
    type Handle = IMMDevice;

    fn list_output_devices(&self) -> Result<Vec<OutputDevice<IMMDevice>>, AudioError> {
        let enumerator = self.enumerator().map_err(AudioError::Enumeration)?;

        let collection = unsafe { enumerator.EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE) }
            .map_err(|e| AudioError::Enumeration(e.into()))?;

        let count =
            unsafe { collection.GetCount() }.map_err(|e| AudioError::Enumeration(e.into()))?;

        collect_output_devices(count, |index| {
            let device = unsafe { collection.Item(index) }
                .map_err(|e| AudioError::Enumeration(e.into()))?;

            Ok(EndpointEntry {
                id: Self::device_id(&device)?,
                name: Self::friendly_name(&device),
                handle: device,
            })
        })
    }

    fn default_playback_device(&self) -> Option<OutputDevice<IMMDevice>> {
        let enumerator = match self.enumerator() {
            Ok(enumerator) => enumerator,
            Err(e) => {
                warn!(error = %e, "cannot create device enumerator");
                return None;
            }
        };

        let device = match unsafe { enumerator.GetDefaultAudioEndpoint(eRender, eConsole) } {
            Ok(device) => device,
            Err(e) => {
                debug!(error = %e, "no default playback device");
                return None;
            }
        };

        let id = Self::device_id(&device).ok()?;
        let name =
            Self::friendly_name(&device).unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string());

        Some(OutputDevice::new(id, name, device))
    }

    fn device_by_id(&self, device_id: &str) -> Option<IMMDevice> {
        let enumerator = self.enumerator().ok()?;
        let device_id_wide = to_wide(device_id);

        unsafe {
            match enumerator.GetDevice(PCWSTR::from_raw(device_id_wide.as_ptr())) {
                Ok(device) => Some(device),
                Err(e) => {
                    debug!(device_id, error = %e, "device id did not resolve");
                    None
                }
            }
        }
    }

    fn format_info(&self, device: &IMMDevice) -> FormatInfo {
        unsafe {
            // Activate IAudioClient to get the mix format
            let audio_client: IAudioClient = match device.Activate(CLSCTX_ALL, None) {
                Ok(client) => client,
                Err(e) => {
                    debug!(error = %e, "audio client activation failed");
                    return FormatInfo::invalid();
                }
            };

            let format = match audio_client.GetMixFormat() {
                Ok(ptr) => CoTaskMem::<WAVEFORMATEX>::from_raw(ptr),
                Err(e) => {
                    debug!(error = %e, "mix format unavailable");
                    return FormatInfo::invalid();
                }
            };

            match format.as_ref() {
                Some(wfx) => FormatInfo {
                    bit_depth: wfx.wBitsPerSample,
                    channels: wfx.nChannels,
                    block_align: wfx.nBlockAlign,
                    sample_rate: wfx.nSamplesPerSec,
                    valid: true,
                },
                None => FormatInfo::invalid(),
            }
        }
    }

    fn set_device_mute(&self, device: Option<&IMMDevice>, mute: bool) -> bool {
        let Some(device) = device else {
            return false;
        };

        let volume = match EndpointVolume::new(device) {
            Ok(volume) => volume,
            Err(e) => {
                warn!(error = %e, "cannot control endpoint mute");
                return false;
            }
        };

        match volume.set_mute(mute) {
            Ok(()) => {
                info!(mute, "endpoint mute state set");
                true
            }
            Err(e) => {
                warn!(mute, error = %e, "failed to set endpoint mute state");
                false
            }
        }
    }

    fn mute_state(&self, device: &IMMDevice) -> Option<bool> {
        EndpointVolume::new(device).ok()?.get_mute().ok()
    }
}
