//! Per-call sessions against the system audio subsystem.

use crate::audio::{AudioControl, AudioError};
use crate::config::SwitcherConfig;

/// Initialize COM on the calling thread, run `f` against the system devices,
/// then tear everything down again.
///
/// Fails with [`AudioError::Initialization`] before `f` runs if COM cannot be
/// initialized. Device handles never escape `f`.
#[cfg(windows)]
pub fn with_system_audio<T, E: From<AudioError>>(
    config: &SwitcherConfig,
    f: impl FnOnce(&dyn AudioControl) -> Result<T, E>,
) -> Result<T, E> {
    use crate::audio::{AudioSwitcher, ComGuard, WasapiBackend};

    let com = ComGuard::new(config.apartment)?;
    let switcher = AudioSwitcher::new(WasapiBackend::new(&com), config.policy);
    f(&switcher)
}

/// Windows audio endpoints do not exist here.
#[cfg(not(windows))]
pub fn with_system_audio<T, E: From<AudioError>>(
    _config: &SwitcherConfig,
    _f: impl FnOnce(&dyn AudioControl) -> Result<T, E>,
) -> Result<T, E> {
    Err(AudioError::Unsupported.into())
}
