//! Assertion context shared by all components

use crate::api::DeviceManagementApi;
use crate::config::AssertConfig;
use crate::error::AssertError;
use c8y_assert_core::ConfigError;
use c8y_assert_core::decorate::{Decorate, Decoration, MemberTable};
use c8y_assert_core::retry::{RetryObserver, RetryOptions, RetrySupervisor, TracingObserver};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

const EMPTY_SOURCE: &str =
    "source and the current device context is empty. One of these values must be set!";

/// Everything an assertion component needs: the remote accessor, the current
/// device and the retry setup.
///
/// Cloning is cheap. Clones share the current device id, so
/// [`set_device_id`](Self::set_device_id) is seen by every component built
/// from the same context. [`with_device_id`](Self::with_device_id) detaches a
/// context for another device.
///
/// # Examples
///
/// ```rust
/// use c8y_assert::{AssertContext, DeviceManagementApi};
/// use c8y_assert_core::retry::RetryOptions;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example(api: Arc<dyn DeviceManagementApi>) {
/// let context = AssertContext::new(api)
///     .with_device_id("12345")
///     .with_retry_defaults(RetryOptions::new().timeout(Duration::from_secs(60)));
///
/// assert_eq!(context.device_id(), "12345");
/// # }
/// ```
#[derive(Clone)]
pub struct AssertContext {
    api: Arc<dyn DeviceManagementApi>,
    device_id: Arc<RwLock<String>>,
    decoration: Decoration,
    supervisor: RetrySupervisor,
}

impl AssertContext {
    /// Context without a device, default retries and a [`TracingObserver`].
    pub fn new(api: Arc<dyn DeviceManagementApi>) -> Self {
        Self {
            api,
            device_id: Arc::new(RwLock::new(String::new())),
            decoration: Decoration::assertions(RetryOptions::new()),
            supervisor: RetrySupervisor::with_observer(TracingObserver::default()),
        }
    }

    /// Context built from an [`AssertConfig`].
    pub fn from_config(
        api: Arc<dyn DeviceManagementApi>,
        config: &AssertConfig,
    ) -> Result<Self, ConfigError> {
        let context = Self::new(api)
            .with_member_pattern(config.member_pattern())?
            .with_retry_defaults(config.retry);
        Ok(match &config.device_id {
            Some(device_id) => context.with_device_id(device_id.clone()),
            None => context,
        })
    }

    /// A detached context targeting `device_id`.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Arc::new(RwLock::new(device_id.into()));
        self
    }

    /// Use `defaults` for every supervised member.
    pub fn with_retry_defaults(mut self, defaults: RetryOptions) -> Self {
        self.decoration = self.decoration.with_defaults(defaults);
        self
    }

    /// Supervise the members matching `pattern` instead of `^assert_.+`.
    pub fn with_member_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.decoration = Decoration::new(pattern, *self.decoration.defaults())?;
        Ok(self)
    }

    /// Report retry attempts to `observer`.
    pub fn with_observer(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.supervisor = RetrySupervisor::with_observer(observer);
        self
    }

    /// The remote accessor.
    pub fn api(&self) -> &dyn DeviceManagementApi {
        self.api.as_ref()
    }

    /// The current device id, empty when unset.
    pub fn device_id(&self) -> String {
        self.device_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Change the current device id of this context and all its clones.
    pub fn set_device_id(&self, device_id: impl Into<String>) {
        *self
            .device_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = device_id.into();
    }

    /// Retry defaults of supervised members.
    pub fn retry_defaults(&self) -> RetryOptions {
        *self.decoration.defaults()
    }

    /// The decoration applied to new components.
    pub fn decoration(&self) -> &Decoration {
        &self.decoration
    }

    /// The supervisor shared by all components.
    pub fn supervisor(&self) -> &RetrySupervisor {
        &self.supervisor
    }

    /// Member table of a new `C`, decorated with this context's settings.
    pub fn member_table<C: Decorate + ?Sized>(&self) -> MemberTable {
        self.decoration.apply::<C>(self.supervisor.clone())
    }

    /// `source` if given, the current device id otherwise.
    ///
    /// Both being empty can never resolve itself, so it is a terminal failure.
    pub fn require_source(&self, source: Option<&str>) -> Result<String, AssertError> {
        let source = match source {
            Some(source) if !source.is_empty() => source.to_string(),
            _ => self.device_id(),
        };
        if source.is_empty() {
            return Err(AssertError::terminal(EMPTY_SOURCE));
        }
        Ok(source)
    }
}

/// An assertion component: a [`Decorate`] type built on an [`AssertContext`].
pub trait AssertComponent: Decorate {
    /// The context the component was built from.
    fn context(&self) -> &AssertContext;

    /// The component's member table.
    fn members(&self) -> &MemberTable;

    /// Mutable access to the member table.
    fn members_mut(&mut self) -> &mut MemberTable;

    /// Replace the retry defaults of every supervised member.
    ///
    /// Members are matched with the context's pattern. Returns how many
    /// members are supervised afterwards.
    fn configure_retries(&mut self, options: RetryOptions) -> usize {
        let decoration = self.context().decoration().with_defaults(options);
        self.members_mut().decorate(&decoration)
    }
}

impl fmt::Debug for AssertContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertContext")
            .field("device_id", &self.device_id())
            .field("pattern", &self.decoration.pattern())
            .field("retry_defaults", self.decoration.defaults())
            .finish_non_exhaustive()
    }
}
