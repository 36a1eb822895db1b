//! Member decoration.
//!
//! Components list their public members through [`Decorate`] and route every
//! call through a [`MemberTable`]. At construction a [`Decoration`] marks the
//! members whose name matches a pattern (by default `^assert_.+`); those calls
//! run under the [`RetrySupervisor`], all others run exactly once.
//!
//! The table belongs to one component instance, so decorating it never
//! affects other instances.
//!
//! # Examples
//!
//! ```rust
//! use c8y_assert_core::decorate::{Decorate, Decoration, MemberTable};
//! use c8y_assert_core::retry::{RetryOptions, RetrySupervisor};
//! use std::time::Duration;
//!
//! struct Sensor;
//!
//! impl Decorate for Sensor {
//!     const COMPONENT: &'static str = "Sensor";
//!     const MEMBERS: &'static [&'static str] = &["assert_ready", "fetch"];
//! }
//!
//! let decoration = Decoration::assertions(RetryOptions::new().timeout(Duration::from_secs(5)));
//! let table = decoration.apply::<Sensor>(RetrySupervisor::new());
//!
//! assert!(table.is_decorated("assert_ready"));
//! assert!(!table.is_decorated("fetch"));
//! ```

use crate::error::{ConfigError, RetryError};
use crate::retry::{Classify, RetryOptions, RetrySupervisor};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;

/// Naming convention of assertion members.
pub const ASSERTION_PATTERN: &str = "^assert_.+";

static ASSERTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(ASSERTION_PATTERN).expect("Failed to compile assertion member pattern")
});

/// A component whose members can be decorated.
pub trait Decorate {
    /// Component name used in logs.
    const COMPONENT: &'static str;

    /// Every public member routed through the component's [`MemberTable`].
    const MEMBERS: &'static [&'static str];
}

/// A name pattern plus the retry defaults given to the members it matches.
#[derive(Debug, Clone)]
pub struct Decoration {
    pattern: Regex,
    defaults: RetryOptions,
}

impl Decoration {
    /// Decoration for members matching `pattern`.
    pub fn new(pattern: &str, defaults: RetryOptions) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            defaults,
        })
    }

    /// Decoration for `assert_*` members.
    pub fn assertions(defaults: RetryOptions) -> Self {
        Self {
            pattern: ASSERTION_RE.clone(),
            defaults,
        }
    }

    /// The pattern source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Retry defaults of decorated members.
    pub fn defaults(&self) -> &RetryOptions {
        &self.defaults
    }

    /// Same pattern, other defaults.
    pub fn with_defaults(&self, defaults: RetryOptions) -> Self {
        Self {
            pattern: self.pattern.clone(),
            defaults,
        }
    }

    /// Whether the pattern matches at the start of `member`.
    pub fn matches(&self, member: &str) -> bool {
        self.pattern
            .find(member)
            .is_some_and(|found| found.start() == 0)
    }

    /// Build the member table of a new `C` instance.
    pub fn apply<C: Decorate + ?Sized>(&self, supervisor: RetrySupervisor) -> MemberTable {
        let mut table = MemberTable::undecorated::<C>(supervisor);
        table.decorate(self);
        table
    }
}

/// Build a decorated member table from a pattern string.
pub fn decorate_members<C: Decorate + ?Sized>(
    supervisor: RetrySupervisor,
    pattern: &str,
    defaults: RetryOptions,
) -> Result<MemberTable, ConfigError> {
    Ok(Decoration::new(pattern, defaults)?.apply::<C>(supervisor))
}

/// Per-instance dispatch table: which members are supervised and with which defaults.
#[derive(Debug, Clone)]
pub struct MemberTable {
    component: &'static str,
    members: BTreeMap<&'static str, Option<RetryOptions>>,
    supervisor: RetrySupervisor,
}

impl MemberTable {
    /// A table for `C` with no decorated member.
    pub fn undecorated<C: Decorate + ?Sized>(supervisor: RetrySupervisor) -> Self {
        Self {
            component: C::COMPONENT,
            members: C::MEMBERS.iter().map(|name| (*name, None)).collect(),
            supervisor,
        }
    }

    /// Decorate every member matching `decoration`, returning how many matched.
    ///
    /// Decorating a member again replaces its defaults; retry layers are
    /// never stacked.
    pub fn decorate(&mut self, decoration: &Decoration) -> usize {
        let mut decorated = 0;
        for (name, slot) in self.members.iter_mut() {
            if decoration.matches(name) {
                *slot = Some(*decoration.defaults());
                decorated += 1;
            }
        }
        tracing::debug!(
            component = self.component,
            pattern = decoration.pattern(),
            decorated,
            "configured retries"
        );
        decorated
    }

    /// Component name.
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Whether calls to `member` are supervised.
    pub fn is_decorated(&self, member: &str) -> bool {
        matches!(self.members.get(member), Some(Some(_)))
    }

    /// Names of supervised members, sorted.
    pub fn decorated_members(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members
            .iter()
            .filter(|(_, slot)| slot.is_some())
            .map(|(name, _)| *name)
    }

    /// Retry defaults of a supervised member.
    pub fn defaults(&self, member: &str) -> Option<&RetryOptions> {
        self.members.get(member).and_then(Option::as_ref)
    }

    /// The supervisor used for decorated members.
    pub fn supervisor(&self) -> &RetrySupervisor {
        &self.supervisor
    }

    /// Invoke `member`.
    ///
    /// Decorated members run under the supervisor with `options` layered over
    /// the member defaults. Other members run once; their failure comes back
    /// as [`RetryError::Unsupervised`] and `options` is ignored. A name missing
    /// from the component's member list is a [`ConfigError::UnknownMember`]
    /// and `operation` is never called.
    pub async fn invoke<T, E, F, Fut>(
        &self,
        member: &str,
        options: RetryOptions,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Error,
    {
        match self.members.get(member) {
            Some(Some(defaults)) => {
                self.supervisor
                    .run_with_options(member, &options, defaults, operation)
                    .await
            }
            Some(None) => operation().await.map_err(RetryError::Unsupervised),
            None => {
                tracing::error!(component = self.component, member, "unknown member");
                Err(RetryError::Configuration(ConfigError::UnknownMember {
                    component: self.component,
                    member: member.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Sensor;

    impl Decorate for Sensor {
        const COMPONENT: &'static str = "Sensor";
        const MEMBERS: &'static [&'static str] =
            &["assert_ready", "assert_done", "fetch", "reassert_ready", "assert_"];
    }

    fn fast() -> RetryOptions {
        RetryOptions::new()
            .wait(Duration::from_millis(10))
            .timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_assertion_pattern_matches_prefix_only() {
        let table = Decoration::assertions(fast()).apply::<Sensor>(RetrySupervisor::new());

        assert_eq!(
            table.decorated_members().collect::<Vec<_>>(),
            vec!["assert_done", "assert_ready"]
        );
        assert!(!table.is_decorated("fetch"));
        assert!(!table.is_decorated("reassert_ready"));
        assert!(!table.is_decorated("assert_"));
    }

    #[test]
    fn test_custom_pattern_is_anchored_at_start() {
        let table = decorate_members::<Sensor>(RetrySupervisor::new(), "ready", fast()).unwrap();
        assert_eq!(table.decorated_members().count(), 0);

        let table = decorate_members::<Sensor>(RetrySupervisor::new(), "fet", fast()).unwrap();
        assert_eq!(table.decorated_members().collect::<Vec<_>>(), vec!["fetch"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Decoration::new("assert_(", RetryOptions::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern(_)));
    }

    #[test]
    fn test_redecorating_replaces_defaults() {
        let mut table = Decoration::assertions(fast()).apply::<Sensor>(RetrySupervisor::new());
        let slower = RetryOptions::new().timeout(Duration::from_secs(60));

        assert_eq!(table.decorate(&Decoration::assertions(fast()).with_defaults(slower)), 2);
        assert_eq!(table.defaults("assert_ready"), Some(&slower));
        assert_eq!(table.decorated_members().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecorated_member_runs_once() {
        let table = Decoration::assertions(fast()).apply::<Sensor>(RetrySupervisor::new());
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = table
            .invoke("fetch", RetryOptions::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(io::Error::other("not found"))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Unsupervised(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decorated_member_is_retried() {
        let table = Decoration::assertions(fast()).apply::<Sensor>(RetrySupervisor::new());
        let calls = AtomicU32::new(0);

        let result = table
            .invoke("assert_ready", RetryOptions::new(), || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(io::Error::other("not ready"))
                } else {
                    Ok("ready")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_options_override_member_defaults() {
        let table = Decoration::assertions(fast()).apply::<Sensor>(RetrySupervisor::new());
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = table
            .invoke(
                "assert_done",
                RetryOptions::new().timeout(Duration::ZERO),
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(io::Error::other("still running"))
                },
            )
            .await;

        assert_eq!(result.unwrap_err().diagnostic().unwrap().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_member_is_a_configuration_error() {
        let table = Decoration::assertions(fast()).apply::<Sensor>(RetrySupervisor::new());
        let calls = AtomicU32::new(0);

        let result: Result<(), RetryError<io::Error>> = table
            .invoke("assert_redy", RetryOptions::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        match result {
            Err(RetryError::Configuration(err)) => {
                assert_eq!(
                    err,
                    ConfigError::UnknownMember {
                        component: "Sensor",
                        member: "assert_redy".into(),
                    }
                );
                assert_eq!(err.to_string(), "Sensor has no member named assert_redy");
            }
            other => panic!("Expected configuration error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
