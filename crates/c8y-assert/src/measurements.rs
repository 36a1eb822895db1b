//! Measurement assertions

use crate::api::MeasurementQuery;
use crate::compare::CountRange;
use crate::context::{AssertComponent, AssertContext};
use crate::error::{AssertError, Result};
use crate::models::Measurement;
use c8y_assert_core::decorate::{Decorate, MemberTable};
use c8y_assert_core::retry::RetryOptions;

const PAGE_SIZE: u32 = 2000;

/// Measurement assertions.
///
/// Series are named `<fragment>.<series>`, e.g. `c8y_Temperature.T`.
#[derive(Debug)]
pub struct AssertMeasurements {
    context: AssertContext,
    members: MemberTable,
}

impl Decorate for AssertMeasurements {
    const COMPONENT: &'static str = "AssertMeasurements";
    const MEMBERS: &'static [&'static str] = &[
        "assert_count",
        "assert_supported_series",
        "assert_supported_series_contains",
    ];
}

impl AssertComponent for AssertMeasurements {
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

impl AssertMeasurements {
    /// Create the component.
    pub fn new(context: AssertContext) -> Self {
        Self {
            members: context.member_table::<Self>(),
            context,
        }
    }

    /// Assert the number of measurements matching `query` lies in `range`.
    pub async fn assert_count(
        &self,
        range: CountRange,
        query: &MeasurementQuery,
        options: RetryOptions,
    ) -> Result<Vec<Measurement>> {
        self.members
            .invoke("assert_count", options, || self.check_count(range, query))
            .await
    }

    /// Assert the device reports exactly `expected` series, in any order.
    pub async fn assert_supported_series(
        &self,
        expected: &[&str],
        options: RetryOptions,
    ) -> Result<Vec<String>> {
        self.members
            .invoke("assert_supported_series", options, || async {
                let mut wanted: Vec<&str> = expected.to_vec();
                wanted.sort_unstable();
                let mut got = self.supported_series().await?;
                got.sort_unstable();

                if got != wanted {
                    return Err(AssertError::unmet(format!("wanted={wanted:?}, got={got:?}")));
                }
                Ok(got)
            })
            .await
    }

    /// Assert the device reports at least the `expected` series.
    pub async fn assert_supported_series_contains(
        &self,
        expected: &[&str],
        options: RetryOptions,
    ) -> Result<Vec<String>> {
        self.members
            .invoke("assert_supported_series_contains", options, || async {
                let got = self.supported_series().await?;
                let missing = expected
                    .iter()
                    .any(|name| !got.iter().any(|series| series == name));
                if missing {
                    return Err(AssertError::unmet(format!(
                        "Device is missing some series. wanted={expected:?}, got={got:?}"
                    )));
                }
                Ok(got)
            })
            .await
    }

    async fn supported_series(&self) -> std::result::Result<Vec<String>, AssertError> {
        let device_id = self.context.require_source(None)?;
        self.context
            .api()
            .get_supported_series(&device_id)
            .await
            .map_err(AssertError::from_lookup)
    }

    async fn check_count(
        &self,
        range: CountRange,
        query: &MeasurementQuery,
    ) -> std::result::Result<Vec<Measurement>, AssertError> {
        let source = self.context.require_source(query.source.as_deref())?;
        let mut query = MeasurementQuery {
            source: Some(source),
            ..query.clone()
        };
        query.page_size.get_or_insert(PAGE_SIZE);

        let measurements = self.context.api().list_measurements(&query).await?;
        range.check("Measurement", measurements.len())?;
        Ok(measurements)
    }
}
