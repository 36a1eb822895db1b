//! Remote accessor contract.
//!
//! The assertions never talk HTTP themselves. They read the platform through
//! [`DeviceManagementApi`], which a REST client (or a test fake) implements.
//! Every read may fail with [`ApiError::NotFound`] when the object does not
//! exist (yet).

use crate::error::ApiError;
use crate::models::{Alarm, Event, Fragments, ManagedObject, Measurement, Operation, OperationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fallible reads and writes against a device-management platform.
///
/// # Examples
///
/// ```rust
/// use c8y_assert::api::{DeviceManagementApi, OperationQuery};
/// use c8y_assert::models::OperationStatus;
///
/// # async fn example(api: &dyn DeviceManagementApi) -> Result<(), c8y_assert::ApiError> {
/// let pending = api
///     .list_operations(&OperationQuery::new().device_id("12345").status(OperationStatus::Pending))
///     .await?;
/// println!("{} pending operations", pending.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DeviceManagementApi: Send + Sync {
    /// Fetch one operation.
    async fn get_operation(&self, id: &str) -> Result<Operation, ApiError>;

    /// List operations matching `query`.
    async fn list_operations(&self, query: &OperationQuery) -> Result<Vec<Operation>, ApiError>;

    /// Create an operation for `device_id` carrying `fragments`.
    async fn create_operation(
        &self,
        device_id: &str,
        fragments: Fragments,
    ) -> Result<Operation, ApiError>;

    /// Fetch one alarm.
    async fn get_alarm(&self, id: &str) -> Result<Alarm, ApiError>;

    /// List alarms matching `query`.
    async fn list_alarms(&self, query: &AlarmQuery) -> Result<Vec<Alarm>, ApiError>;

    /// Fetch one event.
    async fn get_event(&self, id: &str) -> Result<Event, ApiError>;

    /// List events matching `query`.
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, ApiError>;

    /// Download the binary attached to an event, `NotFound` without attachment.
    async fn get_event_binary(&self, id: &str) -> Result<Vec<u8>, ApiError>;

    /// List measurements matching `query`.
    async fn list_measurements(
        &self,
        query: &MeasurementQuery,
    ) -> Result<Vec<Measurement>, ApiError>;

    /// Fetch one managed object.
    async fn get_managed_object(&self, id: &str) -> Result<ManagedObject, ApiError>;

    /// Series names (`<fragment>.<series>`) the managed object has measurements for.
    async fn get_supported_series(&self, id: &str) -> Result<Vec<String>, ApiError>;

    /// Child devices of a managed object.
    async fn list_child_devices(&self, id: &str) -> Result<Vec<ManagedObject>, ApiError>;

    /// Resolve an external identity (e.g. a `c8y_Serial`) to a managed object id.
    async fn get_external_id(
        &self,
        external_id: &str,
        external_type: &str,
    ) -> Result<String, ApiError>;
}

/// Operation filter.
///
/// Serializes to the platform's query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationQuery {
    /// Target device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
    /// Fragment the operation must carry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    /// Maximum number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl OperationQuery {
    /// Match every operation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only operations of `device_id`.
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Only operations in `status`.
    pub fn status(mut self, status: OperationStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Only operations carrying `fragment`.
    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }
}

/// Alarm filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmQuery {
    /// Source device, falls back to the context device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Alarm type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// `ACTIVE`, `ACKNOWLEDGED` or `CLEARED`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Severity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Lower time bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    /// Upper time bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Maximum number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl AlarmQuery {
    /// Match every alarm of the context device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only alarms raised by `source`.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Only alarms of type `kind`.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Only alarms in `status`.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Only alarms with `severity`.
    pub fn severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    /// Only alarms raised after `from`.
    pub fn date_from(mut self, from: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self
    }
}

/// Event filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    /// Source device, falls back to the context device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Event type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Fragment the event must carry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    /// Lower time bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    /// Upper time bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Maximum number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl EventQuery {
    /// Match every event of the context device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only events sent by `source`.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Only events of type `kind`.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Only events carrying `fragment`.
    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Only events after `from`.
    pub fn date_from(mut self, from: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self
    }
}

/// Measurement filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementQuery {
    /// Source device, falls back to the context device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Measurement type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Value fragment, e.g. `c8y_Temperature`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_fragment_type: Option<String>,
    /// Series within the value fragment, e.g. `T`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_fragment_series: Option<String>,
    /// Lower time bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    /// Upper time bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Maximum number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl MeasurementQuery {
    /// Match every measurement of the context device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only measurements sent by `source`.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Only measurements of type `kind`.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Only measurements of one series, e.g. `("c8y_Temperature", "T")`.
    pub fn series(mut self, fragment: impl Into<String>, series: impl Into<String>) -> Self {
        self.value_fragment_type = Some(fragment.into());
        self.value_fragment_series = Some(series.into());
        self
    }

    /// Only measurements after `from`.
    pub fn date_from(mut self, from: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self
    }
}
