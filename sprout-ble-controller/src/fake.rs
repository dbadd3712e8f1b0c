//! In-memory transport for driving discovery and provisioning in tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use sprout_proto::{DeviceStatus, PlantProfile, PlantRegistry, ble, codec};
use uuid::Uuid;

use crate::transport::{Advertisement, AdvertisementStream, BleCentral, BleLink, RadioState};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub &'static str);

pub fn adv(hardware_id: &str, name: &str, rssi: Option<i16>) -> Advertisement {
    Advertisement {
        hardware_id: hardware_id.to_string(),
        local_name: Some(name.to_string()),
        rssi,
    }
}

type Script = Vec<(Duration, Result<Advertisement, FakeError>)>;

struct CentralState {
    permissions: bool,
    radio: RadioState,
    fail_start: bool,
    script: Script,
    start_calls: usize,
    stop_calls: usize,
    links: HashMap<String, FakeLink>,
}

#[derive(Clone)]
pub struct FakeCentral {
    state: Arc<Mutex<CentralState>>,
}

impl FakeCentral {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CentralState {
                permissions: true,
                radio: RadioState::PoweredOn,
                fail_start: false,
                script: Vec::new(),
                start_calls: 0,
                stop_calls: 0,
                links: HashMap::new(),
            })),
        }
    }

    /// Advertisements for the next scan, each delivered `delay` after the
    /// previous one. The feed stays open afterwards.
    pub fn script<I>(&self, items: I)
    where
        I: IntoIterator<Item = (Duration, Result<Advertisement, FakeError>)>,
    {
        self.state.lock().unwrap().script = items.into_iter().collect();
    }

    pub fn deny_permissions(&self) {
        self.state.lock().unwrap().permissions = false;
    }

    pub fn set_radio(&self, radio: RadioState) {
        self.state.lock().unwrap().radio = radio;
    }

    pub fn fail_start(&self) {
        self.state.lock().unwrap().fail_start = true;
    }

    pub fn add_link(&self, hardware_id: &str, link: FakeLink) {
        self.state
            .lock()
            .unwrap()
            .links
            .insert(hardware_id.to_string(), link);
    }

    pub fn start_calls(&self) -> usize {
        self.state.lock().unwrap().start_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.state.lock().unwrap().stop_calls
    }
}

impl BleCentral for FakeCentral {
    type Error = FakeError;
    type Link = FakeLink;

    async fn request_permissions(&self) -> bool {
        self.state.lock().unwrap().permissions
    }

    async fn radio_state(&self) -> RadioState {
        self.state.lock().unwrap().radio
    }

    async fn start_scan(&self) -> Result<AdvertisementStream<FakeError>, FakeError> {
        let script = {
            let mut state = self.state.lock().unwrap();
            state.start_calls += 1;
            if state.fail_start {
                return Err(FakeError("scan refused"));
            }
            std::mem::take(&mut state.script)
        };

        let stream = futures::stream::unfold(script.into_iter(), |mut items| async move {
            let (delay, item) = items.next()?;
            tokio::time::sleep(delay).await;
            Some((item, items))
        })
        .chain(futures::stream::pending());
        Ok(Box::pin(stream))
    }

    async fn stop_scan(&self) -> Result<(), FakeError> {
        self.state.lock().unwrap().stop_calls += 1;
        Ok(())
    }

    async fn link(&self, hardware_id: &str) -> Result<FakeLink, FakeError> {
        self.state
            .lock()
            .unwrap()
            .links
            .get(hardware_id)
            .cloned()
            .ok_or(FakeError("unknown peripheral"))
    }
}

#[derive(Default)]
struct LinkState {
    connected: bool,
    fail_connect: bool,
    hang_connect: bool,
    connect_delay: Duration,
    fail_write: bool,
    device_info: Option<Vec<u8>>,
    writes: Vec<(Uuid, Vec<u8>)>,
    liveness_checks: usize,
    disconnects: usize,
}

/// A plant monitor that records what it is sent
#[derive(Clone, Default)]
pub struct FakeLink {
    state: Arc<Mutex<LinkState>>,
}

impl FakeLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_device_info(&self, status: DeviceStatus) {
        let raw = codec::encode(&status).unwrap();
        self.set_raw_device_info(raw);
    }

    pub fn set_raw_device_info(&self, raw: Vec<u8>) {
        self.state.lock().unwrap().device_info = Some(raw);
    }

    pub fn fail_connect(&self) {
        self.state.lock().unwrap().fail_connect = true;
    }

    /// Connect never resolves
    pub fn hang_connect(&self) {
        self.state.lock().unwrap().hang_connect = true;
    }

    /// Connect succeeds after `delay`
    pub fn slow_connect(&self, delay: Duration) {
        self.state.lock().unwrap().connect_delay = delay;
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_write = true;
    }

    /// The peripheral went away on its own
    pub fn drop_connection(&self) {
        self.state.lock().unwrap().connected = false;
    }

    pub fn connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn liveness_checks(&self) -> usize {
        self.state.lock().unwrap().liveness_checks
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }
}

impl BleLink for FakeLink {
    type Error = FakeError;

    async fn connect(&self) -> Result<(), FakeError> {
        let (hang, fail, delay) = {
            let state = self.state.lock().unwrap();
            (state.hang_connect, state.fail_connect, state.connect_delay)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(FakeError("connection refused"));
        }
        self.state.lock().unwrap().connected = true;
        Ok(())
    }

    async fn discover_services(&self) -> Result<(), FakeError> {
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool, FakeError> {
        let mut state = self.state.lock().unwrap();
        state.liveness_checks += 1;
        Ok(state.connected)
    }

    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, FakeError> {
        let state = self.state.lock().unwrap();
        if !state.connected {
            return Err(FakeError("not connected"));
        }
        if characteristic != ble::DEVICE_INFO_UUID {
            return Err(FakeError("characteristic not readable"));
        }
        state
            .device_info
            .clone()
            .ok_or(FakeError("characteristic not found"))
    }

    async fn write(&self, characteristic: Uuid, value: &[u8]) -> Result<(), FakeError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(FakeError("not connected"));
        }
        if state.fail_write {
            return Err(FakeError("write rejected"));
        }
        state.writes.push((characteristic, value.to_vec()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), FakeError> {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        state.disconnects += 1;
        Ok(())
    }
}

/// Registry whose backend is always down
pub struct FailingRegistry;

impl PlantRegistry for FailingRegistry {
    type Error = FakeError;

    async fn register_plant(
        &self,
        _device_id: &str,
        _profile: &PlantProfile,
    ) -> Result<(), FakeError> {
        Err(FakeError("backend unavailable"))
    }
}
