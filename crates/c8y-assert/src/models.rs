//! Platform objects read by the assertions.
//!
//! The types carry the well-known properties as fields and keep every other
//! fragment in an open [`Fragments`] map, so custom device fragments such as
//! `c8y_Firmware` or `delivery` survive a round trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Custom fragments keyed by fragment name.
pub type Fragments = serde_json::Map<String, Value>;

/// Fragment marking an event that has a binary attachment.
pub const BINARY_FRAGMENT: &str = "c8y_IsBinary";

/// Fragment listing the operations a device supports.
pub const SUPPORTED_OPERATIONS_FRAGMENT: &str = "c8y_SupportedOperations";

/// Reference to the managed object an alarm, event or measurement belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Managed object id
    pub id: String,
}

impl SourceRef {
    /// Reference the managed object `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Life cycle status of an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    /// Created, not yet picked up by the device
    #[default]
    Pending,
    /// Picked up by the device
    Executing,
    /// Completed successfully
    Successful,
    /// Completed with a failure
    Failed,
}

impl OperationStatus {
    /// Status name as used by the platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Executing => "EXECUTING",
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
        }
    }

    /// `SUCCESSFUL` or `FAILED`.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Successful | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation id
    #[serde(default)]
    pub id: String,
    /// Id of the device the operation targets
    pub device_id: String,
    /// Current status
    #[serde(default)]
    pub status: OperationStatus,
    /// Reason given by the device when the status is `FAILED`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    /// Other fragments, e.g. `c8y_Restart` or `delivery`
    #[serde(flatten)]
    pub fragments: Fragments,
}

impl Operation {
    /// Status of the `delivery` fragment, only set for MQTT connected agents.
    pub fn delivery_status(&self) -> Option<&str> {
        self.fragments.get("delivery")?.get("status")?.as_str()
    }
}

/// An alarm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    /// Alarm id
    #[serde(default)]
    pub id: String,
    /// Device that raised the alarm
    pub source: SourceRef,
    /// Alarm type
    #[serde(rename = "type")]
    pub kind: String,
    /// Alarm text
    #[serde(default)]
    pub text: String,
    /// `CRITICAL`, `MAJOR`, `MINOR` or `WARNING`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// `ACTIVE`, `ACKNOWLEDGED` or `CLEARED`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Time the alarm was raised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Other fragments
    #[serde(flatten)]
    pub fragments: Fragments,
}

/// An event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event id
    #[serde(default)]
    pub id: String,
    /// Device that sent the event
    pub source: SourceRef,
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Event text
    #[serde(default)]
    pub text: String,
    /// Time of the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Other fragments, e.g. `c8y_IsBinary`
    #[serde(flatten)]
    pub fragments: Fragments,
}

impl Event {
    /// Meta information of the attached binary.
    ///
    /// Returns `None` when the event has no attachment. Missing or non-string
    /// properties of the fragment come back as empty strings.
    pub fn attachment(&self) -> Option<AttachmentInfo> {
        let fragment = self.fragments.get(BINARY_FRAGMENT)?;
        let text = |key: &str| {
            fragment
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(AttachmentInfo {
            name: text("name"),
            content_type: text("type"),
            length: fragment.get("length").and_then(Value::as_u64),
        })
    }
}

/// Meta information of an event attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    /// File name offered for download
    pub name: String,
    /// Content type
    pub content_type: String,
    /// Size in bytes, when known
    pub length: Option<u64>,
}

/// A measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Measurement id
    #[serde(default)]
    pub id: String,
    /// Device that sent the measurement
    pub source: SourceRef,
    /// Measurement type
    #[serde(rename = "type")]
    pub kind: String,
    /// Time of the measurement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Value fragments, e.g. `{"c8y_Temperature": {"T": {"value": 21.5}}}`
    #[serde(flatten)]
    pub fragments: Fragments,
}

/// An inventory managed object (device, child device, service, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedObject {
    /// Managed object id
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Managed object type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Owner, e.g. the device user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Other fragments
    #[serde(flatten)]
    pub fragments: Fragments,
}

impl ManagedObject {
    /// Whether the object has the property or fragment `name`.
    pub fn has_fragment(&self, name: &str) -> bool {
        match name {
            "id" => true,
            "name" => self.name.is_some(),
            "type" => self.kind.is_some(),
            "owner" => self.owner.is_some(),
            _ => self.fragments.contains_key(name),
        }
    }

    /// Names of all properties and fragments present on the object.
    pub fn fragment_names(&self) -> Vec<String> {
        let mut names = vec!["id".to_string()];
        for (key, present) in [
            ("name", self.name.is_some()),
            ("type", self.kind.is_some()),
            ("owner", self.owner.is_some()),
        ] {
            if present {
                names.push(key.to_string());
            }
        }
        names.extend(self.fragments.keys().cloned());
        names
    }

    /// Entries of `c8y_SupportedOperations`, `None` when the fragment is absent.
    pub fn supported_operations(&self) -> Option<Vec<String>> {
        let list = self.fragments.get(SUPPORTED_OPERATIONS_FRAGMENT)?.as_array()?;
        Some(
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )
    }

    /// The whole object as a JSON object, the way the platform renders it.
    pub fn to_value(&self) -> Value {
        let mut object = Fragments::new();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        if let Some(name) = &self.name {
            object.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(kind) = &self.kind {
            object.insert("type".to_string(), Value::String(kind.clone()));
        }
        if let Some(owner) = &self.owner {
            object.insert("owner".to_string(), Value::String(owner.clone()));
        }
        for (key, value) in &self.fragments {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}
