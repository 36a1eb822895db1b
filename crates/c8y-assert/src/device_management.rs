//! One entry point bundling every assertion component for a device

use crate::alarms::Alarms;
use crate::api::DeviceManagementApi;
use crate::context::{AssertComponent, AssertContext};
use crate::error::{AssertError, Result};
use crate::events::Events;
use crate::inventory::AssertInventory;
use crate::measurements::AssertMeasurements;
use crate::models::{Fragments, Operation};
use crate::operation::AssertOperation;
use crate::operations::AssertOperations;
use c8y_assert_core::RetryError;
use c8y_assert_core::retry::RetryOptions;
use serde_json::{Value, json};
use std::sync::Arc;

/// Device management assertions.
///
/// All components share one [`AssertContext`], so changing the device with
/// [`set_device_id`](Self::set_device_id) retargets every one of them.
///
/// # Examples
///
/// ```rust
/// use c8y_assert::{DeviceManagement, DeviceManagementApi};
/// use c8y_assert_core::retry::RetryOptions;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example(api: Arc<dyn DeviceManagementApi>) -> c8y_assert::Result<()> {
/// let mut device = DeviceManagement::from_identity(api, "tedge01", "c8y_Serial").await?;
/// device.configure_retries(RetryOptions::new().timeout(Duration::from_secs(60)));
///
/// let operation = device.restart().await?;
/// operation.assert_success(RetryOptions::new()).await?;
/// device.operations().assert_all_completed(None, RetryOptions::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DeviceManagement {
    context: AssertContext,
    alarms: Alarms,
    events: Events,
    inventory: AssertInventory,
    measurements: AssertMeasurements,
    operations: AssertOperations,
    retries: Option<RetryOptions>,
}

impl DeviceManagement {
    /// Build every component on `context`.
    pub fn new(context: AssertContext) -> Self {
        Self {
            alarms: Alarms::new(context.clone()),
            events: Events::new(context.clone()),
            inventory: AssertInventory::new(context.clone()),
            measurements: AssertMeasurements::new(context.clone()),
            operations: AssertOperations::new(context.clone()),
            context,
            retries: None,
        }
    }

    /// Resolve the device from an external identity, e.g. its serial number.
    pub async fn from_identity(
        api: Arc<dyn DeviceManagementApi>,
        external_id: &str,
        external_type: &str,
    ) -> Result<Self> {
        let device_id = api
            .get_external_id(external_id, external_type)
            .await
            .map_err(|err| RetryError::Unsupervised(AssertError::from_lookup(err)))?;
        tracing::debug!(
            external_id,
            external_type,
            device_id = %device_id,
            "resolved device identity"
        );
        Ok(Self::new(AssertContext::new(api).with_device_id(device_id)))
    }

    /// The shared context.
    pub fn context(&self) -> &AssertContext {
        &self.context
    }

    /// Target another device in all components.
    pub fn set_device_id(&self, device_id: impl Into<String>) -> &Self {
        self.context.set_device_id(device_id);
        self
    }

    /// Replace the retry defaults of every component.
    ///
    /// Operations created afterwards use the same defaults. Returns how many
    /// members are supervised in total.
    pub fn configure_retries(&mut self, options: RetryOptions) -> usize {
        self.retries = Some(options);
        [
            self.alarms.configure_retries(options),
            self.events.configure_retries(options),
            self.inventory.configure_retries(options),
            self.measurements.configure_retries(options),
            self.operations.configure_retries(options),
        ]
        .into_iter()
        .sum()
    }

    /// Alarm assertions.
    pub fn alarms(&self) -> &Alarms {
        &self.alarms
    }

    /// Event assertions.
    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Inventory assertions.
    pub fn inventory(&self) -> &AssertInventory {
        &self.inventory
    }

    /// Measurement assertions.
    pub fn measurements(&self) -> &AssertMeasurements {
        &self.measurements
    }

    /// Operation collection assertions.
    pub fn operations(&self) -> &AssertOperations {
        &self.operations
    }

    /// Track an existing operation.
    pub fn operation(&self, operation: Operation) -> AssertOperation {
        let mut tracked = AssertOperation::new(self.context.clone(), operation);
        if let Some(options) = self.retries {
            tracked.configure_retries(options);
        }
        tracked
    }

    /// Create an operation for the current device.
    ///
    /// The description defaults to `Send operation`.
    pub async fn create_operation(&self, mut fragments: Fragments) -> Result<AssertOperation> {
        fragments
            .entry("description")
            .or_insert_with(|| Value::from("Send operation"));
        self.execute(fragments).await
    }

    /// Send a restart operation to the current device.
    pub async fn restart(&self) -> Result<AssertOperation> {
        let mut fragments = Fragments::new();
        fragments.insert("description".into(), Value::from("Restart device"));
        fragments.insert("c8y_Restart".into(), json!({}));
        self.execute(fragments).await
    }

    async fn execute(&self, fragments: Fragments) -> Result<AssertOperation> {
        let device_id = self
            .context
            .require_source(None)
            .map_err(RetryError::Unsupervised)?;
        let operation = self
            .context
            .api()
            .create_operation(&device_id, fragments)
            .await
            .map_err(|err| RetryError::Unsupervised(err.into()))?;
        tracing::info!(
            device_id = %device_id,
            operation_id = %operation.id,
            "created operation"
        );
        Ok(self.operation(operation))
    }
}
