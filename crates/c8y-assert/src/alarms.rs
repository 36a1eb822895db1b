//! Alarm assertions

use crate::api::AlarmQuery;
use crate::compare::{CountRange, RegexPattern};
use crate::context::{AssertComponent, AssertContext};
use crate::error::{AssertError, Result};
use crate::models::Alarm;
use c8y_assert_core::decorate::{Decorate, MemberTable};
use c8y_assert_core::retry::RetryOptions;

/// Alarm assertions.
///
/// # Examples
///
/// ```rust
/// use c8y_assert::{Alarms, AssertContext};
/// use c8y_assert::api::AlarmQuery;
/// use c8y_assert::compare::CountRange;
/// use c8y_assert_core::retry::RetryOptions;
///
/// # async fn example(context: AssertContext) -> c8y_assert::Result<()> {
/// let alarms = Alarms::new(context);
///
/// // Text patterns match the start of the alarm text, ignoring case
/// let high = alarms
///     .assert_count(
///         Some("temperature"),
///         CountRange::between(1, 2),
///         &AlarmQuery::new().kind("c8y_TemperatureAlarm"),
///         RetryOptions::new(),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Alarms {
    context: AssertContext,
    members: MemberTable,
}

impl Decorate for Alarms {
    const COMPONENT: &'static str = "Alarms";
    const MEMBERS: &'static [&'static str] = &["assert_count", "assert_exists"];
}

impl AssertComponent for Alarms {
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

impl Alarms {
    /// Create the component.
    pub fn new(context: AssertContext) -> Self {
        Self {
            members: context.member_table::<Self>(),
            context,
        }
    }

    /// Assert the number of alarms matching `query` and `text` lies in `range`.
    ///
    /// `text` is a case-insensitive pattern matched at the start of the alarm
    /// text. The query source falls back to the context device; both being
    /// empty is a final failure.
    pub async fn assert_count(
        &self,
        text: Option<&str>,
        range: CountRange,
        query: &AlarmQuery,
        options: RetryOptions,
    ) -> Result<Vec<Alarm>> {
        self.members
            .invoke("assert_count", options, || self.check_count(text, range, query))
            .await
    }

    /// Assert that an alarm exists and return it.
    pub async fn assert_exists(&self, alarm_id: &str, options: RetryOptions) -> Result<Alarm> {
        self.members
            .invoke("assert_exists", options, || async {
                self.context
                    .api()
                    .get_alarm(alarm_id)
                    .await
                    .map_err(AssertError::from_lookup)
            })
            .await
    }

    async fn check_count(
        &self,
        text: Option<&str>,
        range: CountRange,
        query: &AlarmQuery,
    ) -> std::result::Result<Vec<Alarm>, AssertError> {
        let source = self.context.require_source(query.source.as_deref())?;
        let pattern = text
            .filter(|text| !text.is_empty())
            .map(RegexPattern::case_insensitive)
            .transpose()?;

        let query = AlarmQuery {
            source: Some(source),
            ..query.clone()
        };
        let alarms = self.context.api().list_alarms(&query).await?;
        let matching: Vec<Alarm> = match &pattern {
            Some(pattern) => alarms
                .into_iter()
                .filter(|alarm| pattern.is_match(&alarm.text))
                .collect(),
            None => alarms,
        };

        if let Err(err) = range.check("Alarm", matching.len()) {
            let texts: Vec<&str> = matching.iter().map(|alarm| alarm.text.as_str()).collect();
            return Err(AssertError::unmet(format!("{err}\n\nalarms: {texts:?}")));
        }
        Ok(matching)
    }
}
