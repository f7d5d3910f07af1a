//! Audio Switcher - Library
//!
//! Windows playback device control for host runtimes that reach it through
//! the C ABI in `audio-switcher-ffi`, or through the `audio-switcher` CLI.
//!
//! ## Features
//!
//! - List active playback devices with the current default marked
//! - Set the default device for the console, multimedia and communications roles
//! - Mute or unmute the default device or any device by ID
//! - Read the shared-mode mix format of a device

pub mod audio;
pub mod config;
pub mod logging;
pub mod system;

pub use audio::{
    AudioBackend, AudioControl, AudioError, AudioSwitcher, DeviceInfo, DeviceRole, FormatInfo,
    PolicyVariant,
};
pub use config::{ConfigError, SwitcherConfig};
pub use system::with_system_audio;
