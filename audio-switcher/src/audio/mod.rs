//! Audio module for Windows Core Audio API interactions.
//!
//! This module provides playback device enumeration, default device
//! assignment, mute control and mix format queries. The COM-backed pieces
//! only exist on Windows; the capability traits and boundary logic are
//! platform independent.

pub mod backend;
pub mod device;
pub mod guard;
pub mod policy;
pub mod switcher;
pub mod wide;

#[cfg(windows)]
pub mod enumerator;
#[cfg(windows)]
pub mod volume;

pub use backend::{collect_output_devices, AudioBackend, EndpointEntry};
pub use device::{AudioError, DeviceInfo, DeviceRole, FormatInfo, OsError, OutputDevice};
pub use guard::Apartment;
pub use policy::{
    set_default_output_device, DefaultEndpointPolicy, PolicyClient, PolicyVariant,
};
pub use switcher::{AudioControl, AudioSwitcher};

#[cfg(windows)]
pub use enumerator::WasapiBackend;
#[cfg(windows)]
pub use guard::ComGuard;
