//! Event types for the LMP event system
//!
//! Events are broadcast on an [`EventBus`] and serialized for SSE
//! transmission to connected browser UIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A Bluetooth device as reported to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device id (the MAC address)
    pub id: String,
    /// MAC address, upper-case colon separated
    pub mac: String,
    /// Advertised name, "Unknown Device" if none
    pub name: String,
    /// Signal strength in dBm, if seen during discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
}

/// LMP event types
///
/// Tagged by `type`, which doubles as the SSE event name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LmpEvent {
    /// A playlist was created, modified or deleted
    PlaylistsChanged {
        /// Affected playlist (None when the whole store changed)
        playlist_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Adapter power toggled
    BluetoothStateChanged {
        enabled: bool,
        state: String,
        timestamp: DateTime<Utc>,
    },

    /// Discovery started
    BluetoothScanStarted { timestamp: DateTime<Utc> },

    /// A device was seen (or seen again) during discovery
    BluetoothDeviceFound {
        device: DeviceInfo,
        timestamp: DateTime<Utc>,
    },

    /// Discovery ended (timeout, stop request or tool exit)
    BluetoothScanComplete {
        devices_found: usize,
        timestamp: DateTime<Utc>,
    },

    /// Device connected
    BluetoothDeviceConnected {
        device: DeviceInfo,
        timestamp: DateTime<Utc>,
    },

    /// Device disconnected
    BluetoothDeviceDisconnected { id: String, timestamp: DateTime<Utc> },
}

impl LmpEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            LmpEvent::PlaylistsChanged { .. } => "PlaylistsChanged",
            LmpEvent::BluetoothStateChanged { .. } => "BluetoothStateChanged",
            LmpEvent::BluetoothScanStarted { .. } => "BluetoothScanStarted",
            LmpEvent::BluetoothDeviceFound { .. } => "BluetoothDeviceFound",
            LmpEvent::BluetoothScanComplete { .. } => "BluetoothScanComplete",
            LmpEvent::BluetoothDeviceConnected { .. } => "BluetoothDeviceConnected",
            LmpEvent::BluetoothDeviceDisconnected { .. } => "BluetoothDeviceDisconnected",
        }
    }
}

/// Broadcast channel shared by all producers and SSE subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LmpEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast an event; having no subscribers is fine
    pub fn emit(&self, event: LmpEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LmpEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
