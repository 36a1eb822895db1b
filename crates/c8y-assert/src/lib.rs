#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retrying assertions for Cumulocity IoT devices.
//!
//! Every `assert_*` member of the components below re-checks its condition
//! until it holds or the timeout elapses. Final outcomes, like an operation
//! that already `FAILED` while `SUCCESSFUL` was expected, end the call at
//! once.
//!
//! The components never talk HTTP themselves. They read the platform through
//! [`DeviceManagementApi`], implemented by a REST client or a test fake.
//!
//! # Examples
//!
//! ```rust
//! use c8y_assert::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(api: Arc<dyn DeviceManagementApi>) -> c8y_assert::Result<()> {
//! let config = AssertConfig::new()
//!     .with_device_id("12345")
//!     .with_timeout(Duration::from_secs(60));
//! let device = DeviceManagement::new(AssertContext::from_config(api, &config)?);
//!
//! let operation = device.restart().await?;
//! operation.assert_success(RetryOptions::new()).await?;
//!
//! device
//!     .inventory()
//!     .assert_contains_fragment_values(&json!({"c8y_Agent": {"name": "thin-edge.io"}}), None, RetryOptions::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod alarms;
pub mod api;
pub mod background;
pub mod compare;
pub mod config;
pub mod context;
pub mod device_management;
pub mod error;
pub mod events;
pub mod inventory;
pub mod measurements;
pub mod models;
pub mod operation;
pub mod operations;

pub use alarms::Alarms;
pub use api::DeviceManagementApi;
pub use background::BackgroundTasks;
pub use config::AssertConfig;
pub use context::{AssertComponent, AssertContext};
pub use device_management::DeviceManagement;
pub use error::{ApiError, AssertError, Result};
pub use events::Events;
pub use inventory::AssertInventory;
pub use measurements::AssertMeasurements;
pub use operation::AssertOperation;
pub use operations::AssertOperations;

/// Convenient re-exports of commonly used items.
pub mod prelude {
    pub use crate::api::{AlarmQuery, EventQuery, MeasurementQuery, OperationQuery};
    pub use crate::compare::{CountRange, RegexPattern};
    pub use crate::{
        Alarms, ApiError, AssertComponent, AssertConfig, AssertContext, AssertError,
        AssertInventory, AssertMeasurements, AssertOperation, AssertOperations, BackgroundTasks,
        DeviceManagement, DeviceManagementApi, Events,
    };
    pub use c8y_assert_core::retry::RetryOptions;
    pub use c8y_assert_core::timer::TimerSettings;
}
