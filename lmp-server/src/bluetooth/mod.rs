//! Bluetooth adapter control through `bluetoothctl` and `rfkill`
//!
//! BlueZ does the real work; this module runs its CLI, parses the text it
//! prints and keeps the list of devices seen during the current discovery.
//! Device ids are MAC addresses.

pub mod parse;
pub mod runner;

use lmp_common::config::BluetoothConfig;
use lmp_common::events::DeviceInfo;
use lmp_common::{time, Error, EventBus, LmpEvent, Result};
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::parse::{DeviceDetails, ScanEvent, UNKNOWN_DEVICE};
pub use self::runner::{CommandOutput, CommandRunner, LineStream, SystemRunner};

/// Adapter power as reported to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdapterPower {
    PoweredOn,
    PoweredOff,
    Unavailable,
}

impl AdapterPower {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterPower::PoweredOn => "poweredOn",
            AdapterPower::PoweredOff => "poweredOff",
            AdapterPower::Unavailable => "unavailable",
        }
    }
}

/// Response body of the state endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterState {
    pub state: AdapterPower,
    pub is_scanning: bool,
    pub enabled: bool,
}

/// Result of a scan request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStart {
    Started,
    AlreadyScanning,
    NotReady,
}

/// Result of a connect request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    pub device: DeviceInfo,
    pub already_connected: bool,
}

#[derive(Debug, Clone)]
struct Discovered {
    info: DeviceInfo,
    last_seen: Instant,
}

#[derive(Debug, Default)]
struct Registry {
    discovered: HashMap<String, Discovered>,
    scan: Option<CancellationToken>,
    generation: u64,
}

impl Registry {
    /// Drop devices not seen within `ttl`
    fn prune(&mut self, ttl: Duration) {
        self.discovered.retain(|_, d| d.last_seen.elapsed() < ttl);
    }
}

/// Bluetooth operations shared by all handlers
#[derive(Clone)]
pub struct BluetoothService {
    runner: Arc<dyn CommandRunner>,
    config: BluetoothConfig,
    events: EventBus,
    registry: Arc<Mutex<Registry>>,
}

fn device_info(mac: &str, name: Option<&str>, rssi: Option<i16>) -> DeviceInfo {
    DeviceInfo {
        id: mac.to_string(),
        mac: mac.to_string(),
        name: name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_DEVICE)
            .to_string(),
        rssi,
    }
}

/// Validate a device id from a request
pub fn parse_device_id(id: Option<&str>) -> Result<String> {
    let id = id
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .ok_or_else(|| Error::InvalidInput("Device ID is required".to_string()))?;
    parse::normalize_mac(id).ok_or_else(|| Error::InvalidInput("Invalid device address".to_string()))
}

impl BluetoothService {
    pub fn new(runner: Arc<dyn CommandRunner>, config: BluetoothConfig, events: EventBus) -> Self {
        Self {
            runner,
            config,
            events,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Registry updates never panic mid-way, so a poisoned lock is still consistent
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn ctl(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run(&self.config.bluetoothctl, args).await
    }

    /// Run a bluetoothctl action and turn reported failures into errors
    async fn ctl_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.ctl(args).await?;
        let text = output.combined();
        if parse::reports_failure(&text) || !output.success {
            let detail = parse::last_message(&text)
                .unwrap_or_else(|| format!("bluetoothctl {} failed", args.join(" ")));
            return Err(Error::Command(detail));
        }
        Ok(output)
    }

    async fn rfkill(&self, action: &str) -> Result<CommandOutput> {
        let rfkill = self.config.rfkill.as_str();
        if self.config.use_sudo {
            self.runner.run("sudo", &[rfkill, action, "bluetooth"]).await
        } else {
            self.runner.run(rfkill, &[action, "bluetooth"]).await
        }
    }

    fn device_ttl(&self) -> Duration {
        Duration::from_secs(self.config.device_ttl_seconds)
    }

    pub fn is_scanning(&self) -> bool {
        self.registry().scan.is_some()
    }

    /// Adapter power; any failure to query reads as unavailable
    pub async fn power(&self) -> AdapterPower {
        match self.ctl(&["show"]).await {
            Ok(output) => match parse::parse_show(&output.combined()) {
                Some(info) if info.powered => AdapterPower::PoweredOn,
                Some(_) => AdapterPower::PoweredOff,
                None => AdapterPower::Unavailable,
            },
            Err(e) => {
                warn!("Cannot query Bluetooth adapter: {}", e);
                AdapterPower::Unavailable
            }
        }
    }

    pub async fn state(&self) -> AdapterState {
        let power = self.power().await;
        AdapterState {
            state: power,
            is_scanning: self.is_scanning(),
            enabled: power == AdapterPower::PoweredOn,
        }
    }

    /// Power the adapter on or off
    ///
    /// Turning off stops discovery and disconnects every connected device
    /// first, then blocks the radio with rfkill.
    pub async fn set_enabled(&self, enabled: bool) -> Result<AdapterState> {
        let state = if enabled {
            if let Err(e) = self.rfkill("unblock").await {
                warn!("rfkill unblock failed, trying to power on anyway: {}", e);
            }
            self.ctl_checked(&["power", "on"]).await?;
            self.state().await
        } else {
            self.stop_scan().await;
            match self.connected_devices().await {
                Ok(devices) => {
                    for device in devices {
                        if let Err(e) = self.ctl_checked(&["disconnect", device.mac.as_str()]).await {
                            warn!("Error disconnecting device {}: {}", device.mac, e);
                        }
                    }
                }
                Err(e) => warn!("Cannot list connected devices: {}", e),
            }
            self.ctl_checked(&["power", "off"]).await?;
            if let Err(e) = self.rfkill("block").await {
                warn!("rfkill block failed: {}", e);
            }
            AdapterState {
                state: AdapterPower::PoweredOff,
                is_scanning: false,
                enabled: false,
            }
        };

        info!("Bluetooth {}", if enabled { "enabled" } else { "disabled" });
        self.events.emit(LmpEvent::BluetoothStateChanged {
            enabled: state.enabled,
            state: state.state.as_str().to_string(),
            timestamp: time::now(),
        });
        Ok(state)
    }

    async fn list_devices(&self, filter: &str, legacy_command: Option<&str>) -> Result<Vec<DeviceInfo>> {
        let output = if filter.is_empty() {
            self.ctl(&["devices"]).await?
        } else {
            self.ctl(&["devices", filter]).await?
        };
        let text = output.combined();

        // bluetoothctl before 5.65 has no filter argument
        let text = if parse::reports_failure(&text) || !output.success {
            match legacy_command {
                Some(cmd) => self.ctl_checked(&[cmd]).await?.combined(),
                None => return Err(Error::Command(format!("devices {} not supported", filter))),
            }
        } else {
            text
        };

        Ok(parse::parse_devices(&text)
            .into_iter()
            .map(|(mac, name)| device_info(&mac, Some(name.as_str()), None))
            .collect())
    }

    pub async fn paired_devices(&self) -> Result<Vec<DeviceInfo>> {
        self.list_devices("Paired", Some("paired-devices")).await
    }

    pub async fn connected_devices(&self) -> Result<Vec<DeviceInfo>> {
        match self.list_devices("Connected", None).await {
            Ok(devices) => Ok(devices),
            Err(_) => {
                // Older bluetoothctl: ask every known device
                let mut connected = Vec::new();
                for device in self.list_devices("", None).await? {
                    if let Some(details) = self.device_details(&device.mac).await? {
                        if details.connected {
                            connected.push(device);
                        }
                    }
                }
                Ok(connected)
            }
        }
    }

    async fn device_details(&self, mac: &str) -> Result<Option<DeviceDetails>> {
        let output = self.ctl(&["info", mac]).await?;
        Ok(parse::parse_info(&output.combined()))
    }

    /// Devices seen during discovery within the configured time window,
    /// strongest signal first
    pub fn available_devices(&self) -> Vec<DeviceInfo> {
        let mut registry = self.registry();
        registry.prune(self.device_ttl());
        let mut devices: Vec<DeviceInfo> = registry
            .discovered
            .values()
            .map(|d| d.info.clone())
            .collect();
        devices.sort_by(|a, b| {
            b.rssi
                .unwrap_or(i16::MIN)
                .cmp(&a.rssi.unwrap_or(i16::MIN))
                .then_with(|| a.name.cmp(&b.name))
        });
        devices
    }

    /// Start discovery in the background
    pub async fn start_scan(&self) -> Result<ScanStart> {
        if self.is_scanning() {
            return Ok(ScanStart::AlreadyScanning);
        }
        if self.power().await != AdapterPower::PoweredOn {
            return Ok(ScanStart::NotReady);
        }

        let token = CancellationToken::new();
        let generation = {
            let mut registry = self.registry();
            if registry.scan.is_some() {
                return Ok(ScanStart::AlreadyScanning);
            }
            registry.prune(self.device_ttl());
            registry.scan = Some(token.clone());
            registry.generation += 1;
            registry.generation
        };

        let secs = self.config.scan_seconds.to_string();
        let lines = match self
            .runner
            .spawn_lines(&self.config.bluetoothctl, &["--timeout", secs.as_str(), "scan", "on"])
            .await
        {
            Ok(lines) => lines,
            Err(e) => {
                self.registry().scan = None;
                return Err(e);
            }
        };

        info!("Bluetooth scan started ({}s)", self.config.scan_seconds);
        self.events.emit(LmpEvent::BluetoothScanStarted {
            timestamp: time::now(),
        });

        let service = self.clone();
        tokio::spawn(async move { service.run_scan(lines, token, generation).await });
        Ok(ScanStart::Started)
    }

    async fn run_scan(&self, mut lines: LineStream, token: CancellationToken, generation: u64) {
        // bluetoothctl enforces --timeout itself; this guards against a hung tool
        let deadline = tokio::time::sleep(Duration::from_secs(self.config.scan_seconds + 5));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Bluetooth scan cancelled");
                    break;
                }
                _ = &mut deadline => {
                    warn!("Bluetooth scan did not finish in time, stopping");
                    break;
                }
                line = lines.next() => match line {
                    Some(line) => self.handle_scan_line(&line),
                    None => break,
                },
            }
        }
        // Kills bluetoothctl if it is still running
        drop(lines);

        let devices_found = {
            let mut registry = self.registry();
            // A newer scan may already own the slot
            if registry.generation == generation {
                registry.scan = None;
            }
            registry.discovered.len()
        };

        info!("Bluetooth scan complete, {} devices known", devices_found);
        self.events.emit(LmpEvent::BluetoothScanComplete {
            devices_found,
            timestamp: time::now(),
        });
    }

    /// Apply one line of scan output to the registry
    pub fn handle_scan_line(&self, line: &str) {
        let Some(event) = parse::parse_scan_line(line) else {
            return;
        };

        let found = {
            let mut registry = self.registry();
            match event {
                ScanEvent::New { mac, name } => {
                    let entry = registry.discovered.entry(mac.clone()).or_insert_with(|| Discovered {
                        info: device_info(&mac, None, None),
                        last_seen: Instant::now(),
                    });
                    if name != UNKNOWN_DEVICE || entry.info.name == UNKNOWN_DEVICE {
                        entry.info.name = name;
                    }
                    entry.last_seen = Instant::now();
                    Some(entry.info.clone())
                }
                ScanEvent::Rssi { mac, rssi } => {
                    let entry = registry.discovered.entry(mac.clone()).or_insert_with(|| Discovered {
                        info: device_info(&mac, None, None),
                        last_seen: Instant::now(),
                    });
                    entry.info.rssi = Some(rssi);
                    entry.last_seen = Instant::now();
                    Some(entry.info.clone())
                }
                ScanEvent::Name { mac, name } => registry.discovered.get_mut(&mac).map(|entry| {
                    entry.info.name = name;
                    entry.last_seen = Instant::now();
                    entry.info.clone()
                }),
                ScanEvent::Deleted { mac } => {
                    registry.discovered.remove(&mac);
                    None
                }
            }
        };

        if let Some(device) = found {
            debug!("Bluetooth device found: {} ({})", device.name, device.mac);
            self.events.emit(LmpEvent::BluetoothDeviceFound {
                device,
                timestamp: time::now(),
            });
        }
    }

    /// Stop discovery; returns whether a scan was running
    pub async fn stop_scan(&self) -> bool {
        let token = self.registry().scan.take();
        match token {
            Some(token) => {
                token.cancel();
                if let Err(e) = self.ctl(&["scan", "off"]).await {
                    debug!("scan off failed: {}", e);
                }
                info!("Bluetooth scan stopped");
                true
            }
            None => false,
        }
    }

    fn known_name(&self, mac: &str, details: Option<&DeviceDetails>) -> Option<String> {
        details
            .and_then(|d| d.name.clone())
            .or_else(|| self.registry().discovered.get(mac).map(|d| d.info.name.clone()))
    }

    /// Pair (when needed), trust and connect a device
    pub async fn connect(&self, mac: &str) -> Result<ConnectOutcome> {
        let details = self.device_details(mac).await?;
        let name = self.known_name(mac, details.as_ref());
        let device = device_info(mac, name.as_deref(), None);

        if details.as_ref().map(|d| d.connected).unwrap_or(false) {
            return Ok(ConnectOutcome {
                device,
                already_connected: true,
            });
        }

        // Discovery interferes with connection setup
        self.stop_scan().await;

        if !details.as_ref().map(|d| d.paired).unwrap_or(false) {
            info!("Pairing with {}", mac);
            self.ctl_checked(&["pair", mac]).await?;
        }
        if !details.as_ref().map(|d| d.trusted).unwrap_or(false) {
            if let Err(e) = self.ctl_checked(&["trust", mac]).await {
                warn!("Could not trust {}: {}", mac, e);
            }
        }
        self.ctl_checked(&["connect", mac]).await?;

        info!("Connected to {} ({})", device.name, mac);
        self.events.emit(LmpEvent::BluetoothDeviceConnected {
            device: device.clone(),
            timestamp: time::now(),
        });
        Ok(ConnectOutcome {
            device,
            already_connected: false,
        })
    }

    pub async fn disconnect(&self, mac: &str) -> Result<DeviceInfo> {
        let details = self.device_details(mac).await?;
        if !details.as_ref().map(|d| d.connected).unwrap_or(false) {
            return Err(Error::InvalidInput("Device not connected".to_string()));
        }
        let name = self.known_name(mac, details.as_ref());

        self.ctl_checked(&["disconnect", mac]).await?;

        info!("Disconnected {}", mac);
        self.events.emit(LmpEvent::BluetoothDeviceDisconnected {
            id: mac.to_string(),
            timestamp: time::now(),
        });
        Ok(device_info(mac, name.as_deref(), None))
    }

    /// Forget a paired device, disconnecting it first
    pub async fn remove(&self, mac: &str) -> Result<()> {
        let details = self.device_details(mac).await?;
        if details.as_ref().map(|d| d.connected).unwrap_or(false) {
            self.disconnect(mac).await?;
        }
        self.ctl_checked(&["remove", mac]).await?;
        self.registry().discovered.remove(mac);
        info!("Removed device {}", mac);
        Ok(())
    }
}
