//! Scoped ownership of COM state.
//!
//! [`ComGuard`] owns the "COM is initialized on this thread" fact and
//! [`CoTaskMem`] owns memory the audio interfaces hand back. Interface
//! pointers themselves are released by the `windows` crate's smart pointers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// COM threading model for the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Apartment {
    /// COINIT_MULTITHREADED
    #[default]
    Mta,

    /// COINIT_APARTMENTTHREADED, for callers running a UI message loop
    Sta,
}

impl FromStr for Apartment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mta" | "multithreaded" => Ok(Apartment::Mta),
            "sta" | "apartmentthreaded" => Ok(Apartment::Sta),
            other => Err(format!("unknown COM apartment: {other}")),
        }
    }
}

#[cfg(windows)]
pub use com::{CoTaskMem, ComGuard};

#[cfg(windows)]
mod com {
    use super::Apartment;
    use crate::audio::device::AudioError;
    use std::marker::PhantomData;
    use tracing::debug;
    use windows::Win32::System::Com::{
        CoInitializeEx, CoTaskMemFree, CoUninitialize, COINIT_APARTMENTTHREADED,
        COINIT_MULTITHREADED,
    };

    /// COM initialization guard that uninitializes COM on drop.
    ///
    /// Bound to the thread that created it. Interface pointers obtained while
    /// it is alive belong to its apartment.
    pub struct ComGuard {
        apartment: Apartment,
        _thread_bound: PhantomData<*const ()>,
    }

    impl ComGuard {
        /// Initialize COM for the current thread.
        pub fn new(apartment: Apartment) -> Result<Self, AudioError> {
            let coinit = match apartment {
                Apartment::Mta => COINIT_MULTITHREADED,
                Apartment::Sta => COINIT_APARTMENTTHREADED,
            };

            unsafe {
                // S_FALSE (already initialized) still needs a matching CoUninitialize
                CoInitializeEx(None, coinit)
                    .ok()
                    .map_err(|e| AudioError::Initialization(e.into()))?;
            }
            debug!(?apartment, "COM initialized");

            Ok(Self {
                apartment,
                _thread_bound: PhantomData,
            })
        }

        pub fn apartment(&self) -> Apartment {
            self.apartment
        }
    }

    impl Drop for ComGuard {
        fn drop(&mut self) {
            unsafe {
                CoUninitialize();
            }
        }
    }

    /// Memory allocated by the callee with CoTaskMemAlloc.
    pub struct CoTaskMem<T> {
        ptr: *mut T,
    }

    impl<T> CoTaskMem<T> {
        /// Take ownership of `ptr`.
        ///
        /// # Safety
        /// `ptr` must be null or allocated with CoTaskMemAlloc and not freed
        /// elsewhere.
        pub unsafe fn from_raw(ptr: *mut T) -> Self {
            Self { ptr }
        }

        pub fn as_ptr(&self) -> *mut T {
            self.ptr
        }

        /// Borrow the pointee, or None for a null allocation.
        ///
        /// # Safety
        /// The pointee must be a valid, initialized `T`.
        pub unsafe fn as_ref(&self) -> Option<&T> {
            self.ptr.as_ref()
        }
    }

    impl<T> Drop for CoTaskMem<T> {
        fn drop(&mut self) {
            if !self.ptr.is_null() {
                unsafe {
                    CoTaskMemFree(Some(self.ptr as *const _));
                }
            }
        }
    }
}
