//! Device query and control capability.
//!
//! The Windows implementation lives in [`super::enumerator`]. Boundary logic
//! in [`super::switcher`] only sees this trait, so it runs unchanged against
//! in-memory backends in tests.

use super::device::{AudioError, FormatInfo, OutputDevice};
use tracing::debug;

/// Query and control operations on playback endpoints.
pub trait AudioBackend {
    /// Live OS device object. Dropping it releases the object.
    type Handle;

    /// Active render devices in OS order.
    ///
    /// Entries whose ID or friendly name cannot be read are skipped. Fails with
    /// [`AudioError::NoDevicesFound`] when the OS reports no active devices and
    /// [`AudioError::Enumeration`] when the enumerator or collection cannot be
    /// created.
    fn list_output_devices(&self) -> Result<Vec<OutputDevice<Self::Handle>>, AudioError>;

    /// Default render device for the console role, if the OS has one.
    fn default_playback_device(&self) -> Option<OutputDevice<Self::Handle>>;

    /// Resolve an endpoint ID directly, without enumerating.
    fn device_by_id(&self, device_id: &str) -> Option<Self::Handle>;

    /// Shared-mode mix format. Never fails; see [`FormatInfo::invalid`].
    fn format_info(&self, device: &Self::Handle) -> FormatInfo;

    /// Mute or unmute a device. False for a missing handle, an unavailable
    /// volume interface, or a failed command.
    fn set_device_mute(&self, device: Option<&Self::Handle>, mute: bool) -> bool;

    /// Current endpoint mute state, if readable.
    fn mute_state(&self, device: &Self::Handle) -> Option<bool>;

    /// Mute or unmute the current default playback device.
    fn set_default_device_mute(&self, mute: bool) -> bool {
        let device = self.default_playback_device();
        self.set_device_mute(device.as_ref().map(OutputDevice::handle), mute)
    }
}

/// One entry of an OS endpoint collection, read but not yet validated.
pub struct EndpointEntry<H> {
    pub id: String,
    pub name: Option<String>,
    pub handle: H,
}

/// Build the output device list from a collection of `count` entries.
///
/// `read` is called once per index in OS order. Entries it fails to read,
/// and entries without a non-empty friendly name, are skipped and their
/// handles released. A zero count is [`AudioError::NoDevicesFound`].
pub fn collect_output_devices<H>(
    count: u32,
    mut read: impl FnMut(u32) -> Result<EndpointEntry<H>, AudioError>,
) -> Result<Vec<OutputDevice<H>>, AudioError> {
    if count == 0 {
        return Err(AudioError::NoDevicesFound);
    }

    let mut devices = Vec::with_capacity(count as usize);

    for index in 0..count {
        let entry = match read(index) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(index, error = %e, "skipping unreadable endpoint");
                continue;
            }
        };

        match entry.name {
            Some(name) if !name.is_empty() => {
                devices.push(OutputDevice::new(entry.id, name, entry.handle))
            }
            _ => debug!(index, id = %entry.id, "skipping endpoint without friendly name"),
        }
    }

    debug!(reported = count, listed = devices.len(), "enumerated output devices");
    Ok(devices)
}
