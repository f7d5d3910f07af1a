//! Default endpoint assignment through the undocumented IPolicyConfig family.
//!
//! The interface layout differs between Windows builds, so callers go through
//! [`DefaultEndpointPolicy`] and pick a [`PolicyVariant`] at configuration
//! time.

use super::device::{AudioError, DeviceRole};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, warn};

/// Creates policy clients.
pub trait DefaultEndpointPolicy {
    type Client: PolicyClient;

    /// Instantiate the policy configuration object.
    fn instantiate(&self) -> Result<Self::Client, AudioError>;
}

/// A live policy configuration object.
pub trait PolicyClient {
    /// Make `device_id` the default endpoint for `role`.
    fn set_default_endpoint(&self, device_id: &str, role: DeviceRole) -> Result<(), AudioError>;
}

/// Sets `device_id` as the default for the console, multimedia and
/// communications roles.
///
/// Every role is attempted even after a failure, and nothing is rolled back.
/// Returns true only if all three assignments succeeded.
pub fn set_default_output_device<P: DefaultEndpointPolicy>(policy: &P, device_id: &str) -> bool {
    let client = match policy.instantiate() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "cannot create policy config client");
            return false;
        }
    };

    let mut all_set = true;
    for role in DeviceRole::ALL {
        if let Err(e) = client.set_default_endpoint(device_id, role) {
            warn!(device_id, %role, error = %e, "default endpoint assignment failed");
            all_set = false;
        }
    }

    if all_set {
        info!(device_id, "default output device set for all roles");
    }
    all_set
}

/// Which IPolicyConfig layout to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyVariant {
    /// IPolicyConfig, Windows 7 and later
    #[default]
    Modern,

    /// IPolicyConfigVista
    Vista,
}

impl FromStr for PolicyVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modern" | "win7" => Ok(PolicyVariant::Modern),
            "vista" => Ok(PolicyVariant::Vista),
            other => Err(format!("unknown policy variant: {other}")),
        }
    }
}

#[cfg(windows)]
pub use com::PolicyConfigClient;

#[cfg(windows)]
mod com {
    use super::{DefaultEndpointPolicy, PolicyClient, PolicyVariant};
    use crate::audio::device::{AudioError, DeviceRole};
    use crate::audio::wide::to_wide;
    use windows::core::*;
    use windows::Win32::Media::Audio::ERole;
    use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL};

    // Re-export windows_core so the interface macro can find it
    #[allow(unused_imports)]
    use windows_core;

    // CPolicyConfigClient
    const CLSID_POLICY_CONFIG_CLIENT: GUID =
        GUID::from_u128(0x870af99c_171d_4f9e_af0d_e63df40c2bc9);

    // CPolicyConfigVistaClient
    const CLSID_POLICY_CONFIG_VISTA_CLIENT: GUID =
        GUID::from_u128(0x294935ce_f637_4e7c_a41b_ab255460b862);

    #[interface("F8679F50-850A-41CF-9C72-430F290290C8")]
    pub unsafe trait IPolicyConfig: IUnknown {
        // GetMixFormat .. SetPropertyValue; only their vtable slots matter
        fn reserved1(&self) -> HRESULT;
        fn reserved2(&self) -> HRESULT;
        fn reserved3(&self) -> HRESULT;
        fn reserved4(&self) -> HRESULT;
        fn reserved5(&self) -> HRESULT;
        fn reserved6(&self) -> HRESULT;
        fn reserved7(&self) -> HRESULT;
        fn reserved8(&self) -> HRESULT;
        fn reserved9(&self) -> HRESULT;
        fn reserved10(&self) -> HRESULT;

        fn SetDefaultEndpoint(&self, device_id: PCWSTR, role: ERole) -> HRESULT;
    }

    #[interface("568B9108-44BF-40B4-9006-86AFE5B5A620")]
    pub unsafe trait IPolicyConfigVista: IUnknown {
        // Same as IPolicyConfig minus ResetDeviceFormat
        fn reserved1(&self) -> HRESULT;
        fn reserved2(&self) -> HRESULT;
        fn reserved3(&self) -> HRESULT;
        fn reserved4(&self) -> HRESULT;
        fn reserved5(&self) -> HRESULT;
        fn reserved6(&self) -> HRESULT;
        fn reserved7(&self) -> HRESULT;
        fn reserved8(&self) -> HRESULT;
        fn reserved9(&self) -> HRESULT;

        fn SetDefaultEndpoint(&self, device_id: PCWSTR, role: ERole) -> HRESULT;
    }

    /// Policy configuration object for one Windows layout.
    pub enum PolicyConfigClient {
        Modern(IPolicyConfig),
        Vista(IPolicyConfigVista),
    }

    impl DefaultEndpointPolicy for PolicyVariant {
        type Client = PolicyConfigClient;

        fn instantiate(&self) -> std::result::Result<PolicyConfigClient, AudioError> {
            let created = unsafe {
                match self {
                    PolicyVariant::Modern => {
                        CoCreateInstance(&CLSID_POLICY_CONFIG_CLIENT, None, CLSCTX_ALL)
                            .map(PolicyConfigClient::Modern)
                    }
                    PolicyVariant::Vista => {
                        CoCreateInstance(&CLSID_POLICY_CONFIG_VISTA_CLIENT, None, CLSCTX_ALL)
                            .map(PolicyConfigClient::Vista)
                    }
                }
            };

            created.map_err(|e| AudioError::PolicyUnavailable(e.into()))
        }
    }

    impl PolicyClient for PolicyConfigClient {
        fn set_default_endpoint(
            &self,
            device_id: &str,
            role: DeviceRole,
        ) -> std::result::Result<(), AudioError> {
            let device_id_wide = to_wide(device_id);
            let device_id = PCWSTR(device_id_wide.as_ptr());
            let role_value = ERole(role as i32);

            let hr = unsafe {
                match self {
                    PolicyConfigClient::Modern(config) => {
                        config.SetDefaultEndpoint(device_id, role_value)
                    }
                    PolicyConfigClient::Vista(config) => {
                        config.SetDefaultEndpoint(device_id, role_value)
                    }
                }
            };

            hr.ok().map_err(|e| AudioError::SetDefaultFailed {
                role,
                source: e.into(),
            })
        }
    }
}
