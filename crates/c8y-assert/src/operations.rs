//! Assertions on the operation collection

use crate::api::OperationQuery;
use crate::compare::CountRange;
use crate::context::{AssertComponent, AssertContext};
use crate::error::{AssertError, Result};
use crate::models::{Operation, OperationStatus};
use c8y_assert_core::decorate::{Decorate, MemberTable};
use c8y_assert_core::retry::RetryOptions;

const PAGE_SIZE: u32 = 1000;

/// Operation collection assertions.
#[derive(Debug)]
pub struct AssertOperations {
    context: AssertContext,
    members: MemberTable,
}

impl Decorate for AssertOperations {
    const COMPONENT: &'static str = "AssertOperations";
    const MEMBERS: &'static [&'static str] = &["assert_count", "assert_all_completed"];
}

impl AssertComponent for AssertOperations {
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

impl AssertOperations {
    /// Create the component.
    pub fn new(context: AssertContext) -> Self {
        Self {
            members: context.member_table::<Self>(),
            context,
        }
    }

    /// Assert the number of operations matching `query` lies in `range`.
    ///
    /// Without a device in `query` the context device is used. When that is
    /// empty too, operations of all devices are counted.
    pub async fn assert_count(
        &self,
        range: CountRange,
        query: &OperationQuery,
        options: RetryOptions,
    ) -> Result<Vec<Operation>> {
        self.members
            .invoke("assert_count", options, || self.check_count(range, query, "Operation"))
            .await
    }

    /// Assert no operation of the device is `PENDING` or `EXECUTING`.
    ///
    /// Operations stuck in these states usually point at a problem with the
    /// agent.
    pub async fn assert_all_completed(
        &self,
        device_id: Option<&str>,
        options: RetryOptions,
    ) -> Result<Vec<Operation>> {
        self.members
            .invoke("assert_all_completed", options, || {
                self.check_all_completed(device_id)
            })
            .await
    }

    async fn check_count(
        &self,
        range: CountRange,
        query: &OperationQuery,
        subject: &str,
    ) -> std::result::Result<Vec<Operation>, AssertError> {
        let mut query = query.clone();
        if query.device_id.as_deref().is_none_or(str::is_empty) {
            let device_id = self.context.device_id();
            query.device_id = (!device_id.is_empty()).then_some(device_id);
        }
        query.page_size.get_or_insert(PAGE_SIZE);

        let operations = self.context.api().list_operations(&query).await?;
        range.check(subject, operations.len())?;
        Ok(operations)
    }

    async fn check_all_completed(
        &self,
        device_id: Option<&str>,
    ) -> std::result::Result<Vec<Operation>, AssertError> {
        let mut query = OperationQuery::new();
        query.device_id = device_id.map(str::to_string);

        let mut remaining = Vec::new();
        for status in [OperationStatus::Pending, OperationStatus::Executing] {
            let query = query.clone().status(status);
            let subject = format!("{status} operation");
            remaining.extend(
                self.check_count(CountRange::exactly(0), &query, &subject)
                    .await?,
            );
        }
        Ok(remaining)
    }
}
