//! FFI bindings for Audio Switcher.
//!
//! This crate provides C ABI functions for host runtimes (P/Invoke, N-API
//! wrappers and the like). All functions use panic::catch_unwind to prevent
//! Rust panics from unwinding across the FFI boundary.

use audio_switcher::{
    logging, with_system_audio, AudioControl, AudioError, ConfigError, SwitcherConfig,
};
use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// Error Handling
// ============================================================================

/// Error codes returned by FFI functions.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidArgument = -2,
    InitializationFailed = -3,
    EnumerationFailed = -4,
    NoDevicesFound = -5,
    Unsupported = -6,
    JsonError = -7,
    OperationFailed = -8,
    Panic = -99,
}

impl From<&AudioError> for ErrorCode {
    fn from(err: &AudioError) -> Self {
        match err {
            AudioError::Initialization(_) => ErrorCode::InitializationFailed,
            AudioError::Enumeration(_) => ErrorCode::EnumerationFailed,
            AudioError::PolicyUnavailable(_)
            | AudioError::SetDefaultFailed { .. }
            | AudioError::VolumeNotAvailable => ErrorCode::OperationFailed,
            AudioError::NoDevicesFound => ErrorCode::NoDevicesFound,
            AudioError::StringConversion(_) => ErrorCode::InvalidArgument,
            AudioError::Unsupported => ErrorCode::Unsupported,
        }
    }
}

/// Failure raised by an export before it is reduced to a code and message.
#[derive(Debug, Error)]
enum FfiError {
    #[error("{0}")]
    InvalidArgument(&'static str),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to serialize result: {0}")]
    Json(#[from] serde_json::Error),
}

impl FfiError {
    fn code(&self) -> ErrorCode {
        match self {
            FfiError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            FfiError::Audio(e) => ErrorCode::from(e),
            FfiError::Config(_) | FfiError::Json(_) => ErrorCode::JsonError,
        }
    }
}

/// Thread-local storage for the last error.
thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, String)>> = const { RefCell::new(None) };
}

fn set_last_error(code: ErrorCode, message: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some((code, message.into()));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

// ============================================================================
// Configuration
// ============================================================================

/// Set by audio_switcher_init(); the environment applies until then.
static CONFIG: RwLock<Option<SwitcherConfig>> = RwLock::new(None);

fn current_config() -> SwitcherConfig {
    CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .unwrap_or_else(env_config)
}

/// Configuration from the environment, with logging installed first so
/// invalid settings are reported.
fn env_config() -> SwitcherConfig {
    logging::init(None);
    SwitcherConfig::from_env()
}

fn store_config(config: SwitcherConfig) {
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Allocate a C string from a Rust string. Caller must free with audio_switcher_free_string.
fn alloc_c_string(s: &str) -> *mut c_char {
    // Interior NULs cannot cross the boundary
    let sanitized = s.replace('\0', "");
    CString::new(sanitized).map_or(ptr::null_mut(), CString::into_raw)
}

/// Parse a C string to a Rust string slice.
unsafe fn parse_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

unsafe fn device_id_arg<'a>(ptr: *const c_char) -> Result<&'a str, FfiError> {
    parse_c_str(ptr).ok_or(FfiError::InvalidArgument("Device ID string expected"))
}

fn mute_flag_arg(mute: i32) -> Result<bool, FfiError> {
    match mute {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(FfiError::InvalidArgument("Boolean mute flag expected")),
    }
}

/// Run `f` behind catch_unwind, recording any failure as the last error.
fn guarded<T>(
    operation: &'static str,
    on_error: impl FnOnce(ErrorCode) -> T,
    f: impl FnOnce() -> Result<T, FfiError>,
) -> T {
    clear_last_error();

    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            let code = e.code();
            warn!(operation, code = code as i32, error = %e, "call failed");
            set_last_error(code, e.to_string());
            on_error(code)
        }
        Err(_) => {
            set_last_error(ErrorCode::Panic, format!("Panic during {operation}"));
            on_error(ErrorCode::Panic)
        }
    }
}

/// JSON-returning export: null pointer on failure.
fn guarded_json(
    operation: &'static str,
    f: impl FnOnce() -> Result<String, FfiError>,
) -> *mut c_char {
    guarded(operation, |_| ptr::null_mut(), || f().map(|json| alloc_c_string(&json)))
}

/// Boolean export: 1 or 0, negative error code on failure.
fn guarded_flag(operation: &'static str, f: impl FnOnce() -> Result<bool, FfiError>) -> i32 {
    guarded(operation, |code| code as i32, || f().map(i32::from))
}

/// Open a session with the current configuration and run `f` against it.
fn with_audio<T>(
    f: impl FnOnce(&dyn AudioControl) -> Result<T, FfiError>,
) -> Result<T, FfiError> {
    with_system_audio(&current_config(), f)
}

fn devices_json(audio: &dyn AudioControl) -> Result<String, FfiError> {
    Ok(serde_json::to_string(&audio.list_devices()?)?)
}

fn default_device_json(audio: &dyn AudioControl) -> Result<String, FfiError> {
    Ok(serde_json::to_string(&audio.default_device())?)
}

fn format_info_json(audio: &dyn AudioControl, device_id: &str) -> Result<String, FfiError> {
    Ok(serde_json::to_string(&audio.format_info_by_id(device_id))?)
}

// ============================================================================
// FFI Functions - Lifecycle
// ============================================================================

/// Apply configuration and install logging.
///
/// # Arguments
/// * `config_json` - JSON configuration string (can be null to read the environment)
///
/// # Returns
/// 0 on success, negative error code on failure.
///
/// # Safety
/// `config_json` must be null or point to a NUL-terminated string.
#[no_mangle]
pub extern "C" fn audio_switcher_init(config_json: *const c_char) -> i32 {
    guarded(
        "initialization",
        |code| code as i32,
        || {
            let config = if config_json.is_null() {
                env_config()
            } else {
                let json = unsafe { parse_c_str(config_json) }
                    .ok_or(FfiError::InvalidArgument("Configuration must be UTF-8"))?;
                SwitcherConfig::from_json(json)?
            };

            logging::init(config.log_level.as_deref());
            debug!(?config, "configuration applied");
            store_config(config);
            Ok(ErrorCode::Success as i32)
        },
    )
}

// ============================================================================
// FFI Functions - Device Operations
// ============================================================================

/// Get all active playback devices.
///
/// # Returns
/// JSON array of `{"id", "name", "isDefault"}` objects. Caller must free with
/// audio_switcher_free_string(). Returns null on failure.
#[no_mangle]
pub extern "C" fn audio_switcher_list_devices() -> *mut c_char {
    guarded_json("device enumeration", || with_audio(devices_json))
}

/// Get the default playback device.
///
/// # Returns
/// JSON object, or the JSON literal `null` when there is no default device.
/// Caller must free with audio_switcher_free_string(). Returns null on failure.
#[no_mangle]
pub extern "C" fn audio_switcher_get_default_device() -> *mut c_char {
    guarded_json("default device query", || with_audio(default_device_json))
}

/// Make a device the default for the console, multimedia and communications roles.
///
/// # Arguments
/// * `device_id` - The device ID (UTF-8 string)
///
/// # Returns
/// 1 if every role was assigned, 0 if the device is unknown or a role failed,
/// negative error code on failure.
#[no_mangle]
pub extern "C" fn audio_switcher_set_default_device(device_id: *const c_char) -> i32 {
    guarded_flag("set default device", || {
        let device_id = unsafe { device_id_arg(device_id) }?;
        with_audio(|audio| Ok(audio.set_default_device(device_id)?))
    })
}

/// Mute or unmute the default playback device.
///
/// # Arguments
/// * `mute` - 1 = muted, 0 = unmuted
///
/// # Returns
/// 1 on success, 0 if the device could not be muted, negative error code on failure.
#[no_mangle]
pub extern "C" fn audio_switcher_set_default_playback_mute(mute: i32) -> i32 {
    guarded_flag("set default playback mute", || {
        let mute = mute_flag_arg(mute)?;
        with_audio(|audio| Ok(audio.set_default_playback_mute(mute)))
    })
}

/// Mute or unmute a device by ID.
///
/// # Arguments
/// * `device_id` - The device ID (UTF-8 string)
/// * `mute` - 1 = muted, 0 = unmuted
///
/// # Returns
/// 1 on success, 0 if the device is unknown or could not be muted,
/// negative error code on failure.
#[no_mangle]
pub extern "C" fn audio_switcher_mute_device_by_id(device_id: *const c_char, mute: i32) -> i32 {
    guarded_flag("mute device", || {
        let device_id = unsafe { device_id_arg(device_id) }?;
        let mute = mute_flag_arg(mute)?;
        with_audio(|audio| Ok(audio.mute_device_by_id(device_id, mute)))
    })
}

/// Get the shared-mode mix format of a device.
///
/// # Arguments
/// * `device_id` - The device ID (UTF-8 string)
///
/// # Returns
/// JSON format descriptor (`"valid": false` when unreadable). Caller must free
/// with audio_switcher_free_string(). Returns null on failure.
#[no_mangle]
pub extern "C" fn audio_switcher_get_format_info(device_id: *const c_char) -> *mut c_char {
    guarded_json("format query", || {
        let device_id = unsafe { device_id_arg(device_id) }?;
        with_audio(|audio| format_info_json(audio, device_id))
    })
}

// ============================================================================
// FFI Functions - Memory Management
// ============================================================================

/// Free a string allocated by this library.
///
/// # Safety
/// The pointer must have been returned by one of the audio_switcher_* functions.
/// Do not call this on strings from other sources.
#[no_mangle]
pub extern "C" fn audio_switcher_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        drop(CString::from_raw(ptr));
    });
}

// ============================================================================
// FFI Functions - Error Handling
// ============================================================================

/// Get the last error code.
///
/// # Returns
/// The error code from the last failed operation, or 0 if no error.
#[no_mangle]
pub extern "C" fn audio_switcher_last_error_code() -> i32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(code, _)| *code as i32)
            .unwrap_or(ErrorCode::Success as i32)
    })
}

/// Get the last error message.
///
/// # Returns
/// Error message string. Caller must free with audio_switcher_free_string().
/// Returns null if no error.
#[no_mangle]
pub extern "C" fn audio_switcher_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(_, msg)| alloc_c_string(msg))
            .unwrap_or(ptr::null_mut())
    })
}

// ============================================================================
// FFI Functions - Utility
// ============================================================================

/// Get the library version.
///
/// # Returns
/// Version string. Caller must free with audio_switcher_free_string().
#[no_mangle]
pub extern "C" fn audio_switcher_version() -> *mut c_char {
    alloc_c_string(env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================
