//! Operations exposed to the binding layer.
//!
//! [`AudioSwitcher`] composes a device backend with a default-endpoint policy
//! and applies the boundary rules: default marking, membership checks before
//! switching, and direct ID resolution for per-device mute.

use super::backend::AudioBackend;
use super::device::{AudioError, DeviceInfo, FormatInfo};
use super::policy::{set_default_output_device, DefaultEndpointPolicy};
use tracing::{debug, info};

/// Boundary surface, object safe so callers need not name the backend.
pub trait AudioControl {
    /// Active playback devices, with the current default marked.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, AudioError>;

    /// Current default playback device.
    fn default_device(&self) -> Option<DeviceInfo>;

    /// Make `device_id` the default for every role.
    ///
    /// `Ok(false)` when the ID is not in the current device list (the policy
    /// is not touched) or when any role assignment failed.
    fn set_default_device(&self, device_id: &str) -> Result<bool, AudioError>;

    /// Mute or unmute the current default playback device.
    fn set_default_playback_mute(&self, mute: bool) -> bool;

    /// Mute or unmute a device resolved directly by ID.
    fn mute_device_by_id(&self, device_id: &str, mute: bool) -> bool;

    /// Mix format of a device resolved by ID; invalid when it does not resolve.
    fn format_info_by_id(&self, device_id: &str) -> FormatInfo;

    /// Endpoint mute state of a device resolved by ID.
    fn mute_state_by_id(&self, device_id: &str) -> Option<bool>;
}

/// Device backend plus default-endpoint policy.
pub struct AudioSwitcher<B, P> {
    backend: B,
    policy: P,
}

impl<B: AudioBackend, P: DefaultEndpointPolicy> AudioSwitcher<B, P> {
    pub fn new(backend: B, policy: P) -> Self {
        Self { backend, policy }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn default_device_id(&self) -> String {
        self.backend
            .default_playback_device()
            .map(|device| device.id)
            .unwrap_or_default()
    }
}

impl<B: AudioBackend, P: DefaultEndpointPolicy> AudioControl for AudioSwitcher<B, P> {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        let devices = self.backend.list_output_devices()?;

        // Empty when there is no default, which matches no real endpoint ID
        let default_id = self.default_device_id();

        Ok(devices
            .iter()
            .map(|device| device.to_info(!default_id.is_empty() && device.id == default_id))
            .collect())
    }

    fn default_device(&self) -> Option<DeviceInfo> {
        self.backend
            .default_playback_device()
            .map(|device| device.to_info(true))
    }

    fn set_default_device(&self, device_id: &str) -> Result<bool, AudioError> {
        let devices = self.backend.list_output_devices()?;
        let present = devices.iter().any(|device| device.id == device_id);
        drop(devices);

        if !present {
            info!(device_id, "device id not in output device list");
            return Ok(false);
        }

        Ok(set_default_output_device(&self.policy, device_id))
    }

    fn set_default_playback_mute(&self, mute: bool) -> bool {
        self.backend.set_default_device_mute(mute)
    }

    fn mute_device_by_id(&self, device_id: &str, mute: bool) -> bool {
        let device = self.backend.device_by_id(device_id);
        if device.is_none() {
            debug!(device_id, "mute target did not resolve");
        }
        self.backend.set_device_mute(device.as_ref(), mute)
    }

    fn format_info_by_id(&self, device_id: &str) -> FormatInfo {
        match self.backend.device_by_id(device_id) {
            Some(device) => self.backend.format_info(&device),
            None => FormatInfo::invalid(),
        }
    }

    fn mute_state_by_id(&self, device_id: &str) -> Option<bool> {
        let device = self.backend.device_by_id(device_id)?;
        self.backend.mute_state(&device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{collect_output_devices, EndpointEntry};
    use crate::audio::device::{DeviceRole, OsError, OutputDevice};
    use crate::audio::policy::PolicyClient;
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    struct FakeEndpoint {
        id: String,
        name: Option<String>,
        muted: bool,
        format: Option<FormatInfo>,
    }

    #[derive(Default)]
    struct FakeSystem {
        endpoints: Vec<FakeEndpoint>,
        default_id: Option<String>,
        enumeration_broken: bool,
        role_defaults: HashMap<DeviceRole, String>,
        policy_calls: usize,
        policy_broken: bool,
        failing_role: Option<DeviceRole>,
    }

    impl FakeSystem {
        fn with_speakers(ids: &[(&str, &str)]) -> Rc<RefCell<Self>> {
            let system = FakeSystem {
                endpoints: ids
                    .iter()
                    .map(|(id, name)| FakeEndpoint {
                        id: id.to_string(),
                        name: Some(name.to_string()),
                        muted: false,
                        format: None,
                    })
                    .collect(),
                ..Default::default()
            };
            Rc::new(RefCell::new(system))
        }
    }

    /// Handle that counts its own releases.
    struct FakeHandle {
        id: String,
        released: Rc<Cell<usize>>,
    }

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    struct FakeBackend {
        system: Rc<RefCell<FakeSystem>>,
        released: Rc<Cell<usize>>,
    }

    impl FakeBackend {
        fn handle(&self, id: &str) -> FakeHandle {
            FakeHandle {
                id: id.to_string(),
                released: self.released.clone(),
            }
        }
    }

    impl AudioBackend for FakeBackend {
        type Handle = FakeHandle;

        fn list_output_devices(&self) -> Result<Vec<OutputDevice<FakeHandle>>, AudioError> {
            let system = self.system.borrow();
            if system.enumeration_broken {
                return Err(AudioError::Enumeration(OsError::new(
                    0x8000_4005_u32 as i32,
                    "Unspecified error",
                )));
            }
            collect_output_devices(system.endpoints.len() as u32, |index| {
                let endpoint = &system.endpoints[index as usize];
                Ok(EndpointEntry {
                    id: endpoint.id.clone(),
                    name: endpoint.name.clone(),
                    handle: self.handle(&endpoint.id),
                })
            })
        }

        fn default_playback_device(&self) -> Option<OutputDevice<FakeHandle>> {
            let system = self.system.borrow();
            let id = system.default_id.clone()?;
            let name = system
                .endpoints
                .iter()
                .find(|endpoint| endpoint.id == id)
                .and_then(|endpoint| endpoint.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            let handle = self.handle(&id);
            Some(OutputDevice::new(id, name, handle))
        }

        fn device_by_id(&self, device_id: &str) -> Option<FakeHandle> {
            let system = self.system.borrow();
            system
                .endpoints
                .iter()
                .any(|endpoint| endpoint.id == device_id)
                .then(|| self.handle(device_id))
        }

        fn format_info(&self, device: &FakeHandle) -> FormatInfo {
            let system = self.system.borrow();
            system
                .endpoints
                .iter()
                .find(|endpoint| endpoint.id == device.id)
                .and_then(|endpoint| endpoint.format)
                .unwrap_or_else(FormatInfo::invalid)
        }

        fn set_device_mute(&self, device: Option<&FakeHandle>, mute: bool) -> bool {
            let Some(device) = device else {
                return false;
            };
            let mut system = self.system.borrow_mut();
            match system
                .endpoints
                .iter_mut()
                .find(|endpoint| endpoint.id == device.id)
            {
                Some(endpoint) => {
                    endpoint.muted = mute;
                    true
                }
                None => false,
            }
        }

        fn mute_state(&self, device: &FakeHandle) -> Option<bool> {
            let system = self.system.borrow();
            system
                .endpoints
                .iter()
                .find(|endpoint| endpoint.id == device.id)
                .map(|endpoint| endpoint.muted)
        }
    }

    struct FakePolicy {
        system: Rc<RefCell<FakeSystem>>,
    }

    impl DefaultEndpointPolicy for FakePolicy {
        type Client = FakePolicyClient;

        fn instantiate(&self) -> Result<FakePolicyClient, AudioError> {
            if self.system.borrow().policy_broken {
                return Err(AudioError::PolicyUnavailable(OsError::new(
                    0x8004_0154_u32 as i32,
                    "Class not registered",
                )));
            }
            Ok(FakePolicyClient {
                system: self.system.clone(),
            })
        }
    }

    struct FakePolicyClient {
        system: Rc<RefCell<FakeSystem>>,
    }

    impl PolicyClient for FakePolicyClient {
        fn set_default_endpoint(&self, device_id: &str, role: DeviceRole) -> Result<(), AudioError> {
            let mut system = self.system.borrow_mut();
            system.policy_calls += 1;
            if system.failing_role == Some(role) {
                return Err(AudioError::SetDefaultFailed {
                    role,
                    source: OsError::new(0x8000_4005_u32 as i32, "Unspecified error"),
                });
            }
            system.role_defaults.insert(role, device_id.to_string());
            if role == DeviceRole::Console {
                system.default_id = Some(device_id.to_string());
            }
            Ok(())
        }
    }

    fn switcher(
        system: &Rc<RefCell<FakeSystem>>,
    ) -> (AudioSwitcher<FakeBackend, FakePolicy>, Rc<Cell<usize>>) {
        let released = Rc::new(Cell::new(0));
        let backend = FakeBackend {
            system: system.clone(),
            released: released.clone(),
        };
        let policy = FakePolicy {
            system: system.clone(),
        };
        (AudioSwitcher::new(backend, policy), released)
    }

    #[test]
    fn test_two_speaker_scenario() {
        let system = FakeSystem::with_speakers(&[("devA", "A"), ("devB", "B")]);
        system.borrow_mut().default_id = Some("devA".to_string());
        let (switcher, _) = switcher(&system);

        let devices = switcher.list_devices().unwrap();
        assert_eq!(
            devices,
            vec![
                DeviceInfo {
                    id: "devA".into(),
                    name: "A".into(),
                    is_default: true
                },
                DeviceInfo {
                    id: "devB".into(),
                    name: "B".into(),
                    is_default: false
                },
            ]
        );

        assert_eq!(switcher.set_default_device("devB").unwrap(), true);

        let devices = switcher.list_devices().unwrap();
        let default: Vec<&str> = devices
            .iter()
            .filter(|device| device.is_default)
            .map(|device| device.id.as_str())
            .collect();
        assert_eq!(default, vec!["devB"]);

        let system = system.borrow();
        for role in DeviceRole::ALL {
            assert_eq!(system.role_defaults.get(&role).map(String::as_str), Some("devB"));
        }
    }

    #[test]
    fn test_ids_unique_and_single_default() {
        let system =
            FakeSystem::with_speakers(&[("devA", "A"), ("devB", "B"), ("devC", "Monitor")]);
        system.borrow_mut().default_id = Some("devC".to_string());
        let (switcher, _) = switcher(&system);

        let devices = switcher.list_devices().unwrap();
        let ids: HashSet<&str> = devices.iter().map(|device| device.id.as_str()).collect();
        assert_eq!(ids.len(), devices.len());
        assert!(devices.iter().all(|device| !device.id.is_empty()));

        let defaults: Vec<&DeviceInfo> = devices.iter().filter(|device| device.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(Some(defaults[0].id.clone()), switcher.default_device().map(|d| d.id));
    }

    #[test]
    fn test_no_default_marks_nothing() {
        let system = FakeSystem::with_speakers(&[("devA", "A")]);
        let (switcher, _) = switcher(&system);

        let devices = switcher.list_devices().unwrap();
        assert!(devices.iter().all(|device| !device.is_default));
        assert!(switcher.default_device().is_none());
        assert!(!switcher.set_default_playback_mute(true));
    }

    #[test]
    fn test_zero_devices_is_an_error() {
        let system = FakeSystem::with_speakers(&[]);
        let (switcher, _) = switcher(&system);

        assert!(matches!(
            switcher.list_devices(),
            Err(AudioError::NoDevicesFound)
        ));
    }

    #[test]
    fn test_unreadable_entries_are_skipped() {
        let system = FakeSystem::with_speakers(&[("devA", "A"), ("devB", "B"), ("devC", "C")]);
        system.borrow_mut().endpoints[0].name = None;
        system.borrow_mut().endpoints[2].name = Some(String::new());
        let (switcher, released) = switcher(&system);

        let devices = switcher.list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "devB");
        assert_eq!(released.get(), 3);
    }

    #[test]
    fn test_unknown_id_does_not_touch_policy() {
        let system = FakeSystem::with_speakers(&[("devA", "A")]);
        system.borrow_mut().default_id = Some("devA".to_string());
        let (switcher, _) = switcher(&system);

        assert_eq!(switcher.set_default_device("devZ").unwrap(), false);

        let system = system.borrow();
        assert_eq!(system.policy_calls, 0);
        assert_eq!(system.default_id.as_deref(), Some("devA"));
    }

    #[test]
    fn test_set_default_propagates_enumeration_failure() {
        let system = FakeSystem::with_speakers(&[("devA", "A")]);
        system.borrow_mut().enumeration_broken = true;
        let (switcher, _) = switcher(&system);

        assert!(matches!(
            switcher.set_default_device("devA"),
            Err(AudioError::Enumeration(_))
        ));
        assert!(matches!(
            switcher.list_devices(),
            Err(AudioError::Enumeration(_))
        ));
    }

    #[test]
    fn test_policy_failures_report_false() {
        let system = FakeSystem::with_speakers(&[("devA", "A"), ("devB", "B")]);
        system.borrow_mut().policy_broken = true;
        let (switcher, _) = switcher(&system);
        assert_eq!(switcher.set_default_device("devB").unwrap(), false);

        system.borrow_mut().policy_broken = false;
        system.borrow_mut().failing_role = Some(DeviceRole::Communications);
        assert_eq!(switcher.set_default_device("devB").unwrap(), false);

        // No rollback: the roles before the failure keep the new default
        let system = system.borrow();
        assert_eq!(system.policy_calls, 3);
        assert_eq!(
            system.role_defaults.get(&DeviceRole::Multimedia).map(String::as_str),
            Some("devB")
        );
    }

    #[test]
    fn test_default_playback_mute_round_trip() {
        let system = FakeSystem::with_speakers(&[("devA", "A"), ("devB", "B")]);
        system.borrow_mut().default_id = Some("devB".to_string());
        let (switcher, _) = switcher(&system);

        for _ in 0..2 {
            assert!(switcher.set_default_playback_mute(true));
            assert_eq!(switcher.mute_state_by_id("devB"), Some(true));
        }
        assert_eq!(switcher.mute_state_by_id("devA"), Some(false));

        for _ in 0..2 {
            assert!(switcher.set_default_playback_mute(false));
            assert_eq!(switcher.mute_state_by_id("devB"), Some(false));
        }
    }

    #[test]
    fn test_mute_by_id() {
        let system = FakeSystem::with_speakers(&[("devA", "A")]);
        let (switcher, _) = switcher(&system);

        assert!(switcher.mute_device_by_id("devA", true));
        assert_eq!(switcher.mute_state_by_id("devA"), Some(true));
        assert!(!switcher.mute_device_by_id("missing", true));
    }

    #[test]
    fn test_format_info_by_id() {
        let format = FormatInfo {
            bit_depth: 32,
            channels: 2,
            block_align: 8,
            sample_rate: 48000,
            valid: true,
        };
        let system = FakeSystem::with_speakers(&[("devA", "A"), ("devB", "B")]);
        system.borrow_mut().endpoints[0].format = Some(format);
        let (switcher, _) = switcher(&system);

        assert_eq!(switcher.format_info_by_id("devA"), format);
        assert_eq!(switcher.format_info_by_id("devB"), FormatInfo::invalid());
        assert_eq!(switcher.format_info_by_id("missing"), FormatInfo::invalid());
    }

    #[test]
    fn test_every_handle_released() {
        let system = FakeSystem::with_speakers(&[("devA", "A"), ("devB", "B")]);
        system.borrow_mut().default_id = Some("devA".to_string());
        let (switcher, released) = switcher(&system);

        // Two enumerated handles plus one default handle
        switcher.list_devices().unwrap();
        assert_eq!(released.get(), 3);

        // Handles moved out of a record are released once, by their new owner
        let device = switcher.backend().default_playback_device().unwrap();
        let handle = device.into_handle();
        assert_eq!(released.get(), 3);
        drop(handle);
        assert_eq!(released.get(), 4);
    }

    #[test]
    fn test_usable_as_trait_object() {
        let system = FakeSystem::with_speakers(&[("devA", "A")]);
        let (switcher, _) = switcher(&system);
        let control: &dyn AudioControl = &switcher;

        assert_eq!(control.list_devices().unwrap().len(), 1);
    }
}
