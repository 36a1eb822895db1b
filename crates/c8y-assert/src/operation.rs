//! Assertions on a single operation

use crate::compare::RegexPattern;
use crate::context::{AssertComponent, AssertContext};
use crate::error::{AssertError, Result};
use crate::models::{Operation, OperationStatus};
use c8y_assert_core::decorate::{Decorate, MemberTable};
use c8y_assert_core::retry::RetryOptions;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Failure reason pattern accepting any non-empty reason.
pub const ANY_FAILURE_REASON: &str = ".+";

/// Tracks one operation and asserts on its status.
///
/// Every assertion fetches the operation again and keeps the latest copy,
/// available through [`operation`](Self::operation).
///
/// # Examples
///
/// ```rust
/// use c8y_assert::{AssertContext, AssertOperation};
/// use c8y_assert::models::Operation;
/// use c8y_assert_core::retry::RetryOptions;
/// use std::time::Duration;
///
/// # async fn example(context: AssertContext, created: Operation) -> c8y_assert::Result<()> {
/// let operation = AssertOperation::new(context, created);
///
/// // A FAILED operation ends this call at once, with its failure reason
/// operation
///     .assert_success(RetryOptions::new().timeout(Duration::from_secs(120)))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct AssertOperation {
    context: AssertContext,
    members: MemberTable,
    operation: RwLock<Operation>,
}

impl Decorate for AssertOperation {
    const COMPONENT: &'static str = "AssertOperation";
    const MEMBERS: &'static [&'static str] = &[
        "fetch_operation",
        "assert_success",
        "assert_failed",
        "assert_pending",
        "assert_not_pending",
        "assert_executing",
        "assert_done",
        "assert_not_done",
        "assert_delivered",
    ];
}

impl AssertComponent for AssertOperation {
    fn context(&self) -> &AssertContext {
        &self.context
    }

    fn members(&self) -> &MemberTable {
        &self.members
    }

    fn members_mut(&mut self) -> &mut MemberTable {
        &mut self.members
    }
}

impl AssertOperation {
    /// Track `operation`.
    pub fn new(context: AssertContext, operation: Operation) -> Self {
        Self {
            members: context.member_table::<Self>(),
            context,
            operation: RwLock::new(operation),
        }
    }

    /// Operation id.
    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    /// Latest fetched copy of the operation.
    pub fn operation(&self) -> Operation {
        self.read().clone()
    }

    /// Fetch the operation again.
    pub async fn fetch_operation(&self) -> Result<Operation> {
        self.members
            .invoke("fetch_operation", RetryOptions::new(), || self.refresh())
            .await
    }

    /// Assert the status is `SUCCESSFUL`.
    ///
    /// A `FAILED` operation is a final outcome, reported with its failure reason.
    pub async fn assert_success(&self, options: RetryOptions) -> Result<Operation> {
        self.members
            .invoke("assert_success", options, || self.check_success())
            .await
    }

    /// Assert the status is `FAILED` with a failure reason matching `failure_reason`.
    ///
    /// Pass [`ANY_FAILURE_REASON`] to require any reason, `None` to skip the
    /// reason check. A `SUCCESSFUL` operation, a missing reason and a reason
    /// that does not match are final outcomes.
    pub async fn assert_failed(
        &self,
        failure_reason: Option<&str>,
        options: RetryOptions,
    ) -> Result<Operation> {
        self.members
            .invoke("assert_failed", options, || self.check_failed(failure_reason))
            .await
    }

    /// Assert the status is `PENDING`.
    pub async fn assert_pending(&self, options: RetryOptions) -> Result<Operation> {
        self.members
            .invoke("assert_pending", options, || {
                self.check_status(|status| status == OperationStatus::Pending, "to be PENDING")
            })
            .await
    }

    /// Assert the status is not `PENDING`.
    pub async fn assert_not_pending(&self, options: RetryOptions) -> Result<Operation> {
        self.members
            .invoke("assert_not_pending", options, || {
                self.check_status(|status| status != OperationStatus::Pending, "to not be PENDING")
            })
            .await
    }

    /// Assert the status is `EXECUTING`.
    pub async fn assert_executing(&self, options: RetryOptions) -> Result<Operation> {
        self.members
            .invoke("assert_executing", options, || {
                self.check_status(|status| status == OperationStatus::Executing, "to be EXECUTING")
            })
            .await
    }

    /// Assert the status is `SUCCESSFUL` or `FAILED`.
    pub async fn assert_done(&self, options: RetryOptions) -> Result<Operation> {
        self.members
            .invoke("assert_done", options, || {
                self.check_status(|status| status.is_done(), "to be done")
            })
            .await
    }

    /// Assert the status is neither `SUCCESSFUL` nor `FAILED`.
    pub async fn assert_not_done(&self, options: RetryOptions) -> Result<Operation> {
        self.members
            .invoke("assert_not_done", options, || {
                self.check_status(
                    |status| !status.is_done(),
                    "to not be done [SUCCESSFUL or FAILED]",
                )
            })
            .await
    }

    /// Assert the operation was delivered to the device.
    ///
    /// Only agents connected via MQTT report delivery.
    pub async fn assert_delivered(&self, options: RetryOptions) -> Result<Operation> {
        self.members
            .invoke("assert_delivered", options, || self.check_delivered())
            .await
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Operation> {
        self.operation.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh(&self) -> std::result::Result<Operation, AssertError> {
        let id = self.id();
        if id.is_empty() {
            return Err(AssertError::terminal("operation id is empty"));
        }

        let operation = self
            .context
            .api()
            .get_operation(&id)
            .await
            .map_err(AssertError::from_lookup)?;
        *self.operation.write().unwrap_or_else(PoisonError::into_inner) = operation.clone();
        Ok(operation)
    }

    async fn check_status(
        &self,
        accept: impl Fn(OperationStatus) -> bool,
        expectation: &str,
    ) -> std::result::Result<Operation, AssertError> {
        let operation = self.refresh().await?;
        if accept(operation.status) {
            return Ok(operation);
        }
        Err(AssertError::unmet(format!(
            "Expected operation (id={}) {expectation}, but got: {}",
            operation.id, operation.status
        )))
    }

    async fn check_success(&self) -> std::result::Result<Operation, AssertError> {
        let operation = self.refresh().await?;
        if operation.status == OperationStatus::Successful {
            return Ok(operation);
        }

        let message = format!(
            "Expected operation (id={}) to be SUCCESSFUL, but got: {} (failureReason: {})",
            operation.id,
            operation.status,
            operation.failure_reason.as_deref().unwrap_or_default()
        );
        if operation.status == OperationStatus::Failed {
            Err(AssertError::terminal(message))
        } else {
            Err(AssertError::unmet(message))
        }
    }

    async fn check_failed(
        &self,
        failure_reason: Option<&str>,
    ) -> std::result::Result<Operation, AssertError> {
        let pattern = failure_reason.map(RegexPattern::new).transpose()?;
        let operation = self.refresh().await?;

        if operation.status != OperationStatus::Failed {
            let message = format!(
                "Expected operation (id={}) to be FAILED, but got: {}",
                operation.id, operation.status
            );
            return if operation.status == OperationStatus::Successful {
                Err(AssertError::terminal(message))
            } else {
                Err(AssertError::unmet(message))
            };
        }

        if let Some(pattern) = pattern {
            let Some(actual) = operation.failure_reason.as_deref() else {
                return Err(AssertError::terminal(
                    "failureReason is mandatory when setting to FAILED",
                ));
            };
            if !pattern.is_match(actual) {
                return Err(AssertError::terminal(format!(
                    "Failure reason does not match regex pattern\ngot: {actual}\nwanted: {pattern}"
                )));
            }
        }
        Ok(operation)
    }

    async fn check_delivered(&self) -> std::result::Result<Operation, AssertError> {
        let operation = self.refresh().await?;
        if !operation.fragments.contains_key("delivery") {
            return Err(AssertError::unmet(format!(
                "Expected operation (id={}) to contain the delivery fragment",
                operation.id
            )));
        }

        let status = operation.delivery_status().unwrap_or_default().to_string();
        if status == "DELIVERED" {
            return Ok(operation);
        }
        Err(AssertError::unmet(format!(
            "Expected operation (id={}) to be DELIVERED, but got: {status}",
            operation.id
        )))
    }
}

impl fmt::Debug for AssertOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertOperation")
            .field("operation", &*self.read())
            .finish_non_exhaustive()
    }
}
