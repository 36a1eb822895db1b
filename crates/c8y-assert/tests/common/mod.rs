//! In-memory platform for testing assertions without a tenant
//!
//! Objects are scripted per id: every read returns the next scripted state
//! and the last one sticks, so a test can let an operation move from
//! `PENDING` to `SUCCESSFUL` or let a managed object appear after a few
//! reads. Calls are counted per method and failures can be injected.

#![allow(dead_code)]

use async_trait::async_trait;
use c8y_assert::AssertContext;
use c8y_assert::api::{AlarmQuery, DeviceManagementApi, EventQuery, MeasurementQuery, OperationQuery};
use c8y_assert::error::ApiError;
use c8y_assert::models::{
    Alarm, Event, Fragments, ManagedObject, Measurement, Operation, OperationStatus, SourceRef,
};
use c8y_assert_core::retry::RetryOptions;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Device id used by [`context`].
pub const DEVICE_ID: &str = "12345";

/// Successive states of one object. `None` reads as not found.
#[derive(Debug)]
struct Script<T> {
    states: VecDeque<Option<T>>,
}

impl<T: Clone> Script<T> {
    fn new(states: impl IntoIterator<Item = Option<T>>) -> Self {
        Self {
            states: states.into_iter().collect(),
        }
    }

    fn next(&mut self) -> Option<T> {
        if self.states.len() > 1 {
            self.states.pop_front().flatten()
        } else {
            self.states.front().cloned().flatten()
        }
    }
}

#[derive(Debug, Default)]
struct State {
    operations: HashMap<String, Script<Operation>>,
    operation_list: Vec<Operation>,
    alarms: Vec<Alarm>,
    events: Vec<Event>,
    binaries: HashMap<String, Vec<u8>>,
    measurements: Vec<Measurement>,
    managed_objects: HashMap<String, Script<ManagedObject>>,
    supported_series: HashMap<String, Script<Vec<String>>>,
    children: HashMap<String, Vec<ManagedObject>>,
    identities: HashMap<(String, String), String>,
    created: Vec<(String, Fragments)>,
    failures: VecDeque<ApiError>,
    calls: HashMap<&'static str, usize>,
    alarm_queries: Vec<AlarmQuery>,
    operation_queries: Vec<OperationQuery>,
    event_queries: Vec<EventQuery>,
    measurement_queries: Vec<MeasurementQuery>,
}

/// Scriptable [`DeviceManagementApi`].
#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    /// An empty platform.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and pop an injected failure, if any.
    fn enter(&self, method: &'static str) -> Result<(), ApiError> {
        let mut state = self.state();
        *state.calls.entry(method).or_default() += 1;
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Script the states `get_operation` returns for `id`.
    pub fn script_operation(&self, id: &str, statuses: &[OperationStatus]) {
        let states = statuses.iter().map(|status| Some(operation(id, *status)));
        self.state()
            .operations
            .insert(id.to_string(), Script::new(states));
    }

    /// Script full operation states for `operation.id`.
    pub fn script_operation_states(&self, id: &str, states: Vec<Operation>) {
        self.state()
            .operations
            .insert(id.to_string(), Script::new(states.into_iter().map(Some)));
    }

    /// Add an operation to the collection listed by `list_operations`.
    pub fn add_operation(&self, operation: Operation) {
        self.state().operation_list.push(operation);
    }

    /// Add an alarm.
    pub fn add_alarm(&self, alarm: Alarm) {
        self.state().alarms.push(alarm);
    }

    /// Add an event.
    pub fn add_event(&self, event: Event) {
        self.state().events.push(event);
    }

    /// Attach a binary to event `id`.
    pub fn add_binary(&self, id: &str, data: impl Into<Vec<u8>>) {
        self.state().binaries.insert(id.to_string(), data.into());
    }

    /// Add a measurement.
    pub fn add_measurement(&self, measurement: Measurement) {
        self.state().measurements.push(measurement);
    }

    /// Script the states of managed object `id`. `None` reads as not found.
    pub fn script_managed_object(&self, id: &str, states: Vec<Option<ManagedObject>>) {
        self.state()
            .managed_objects
            .insert(id.to_string(), Script::new(states));
    }

    /// Add managed object `mo` under its own id.
    pub fn add_managed_object(&self, mo: ManagedObject) {
        let id = mo.id.clone();
        self.script_managed_object(&id, vec![Some(mo)]);
    }

    /// Script the supported series of `id`.
    pub fn script_supported_series(&self, id: &str, states: Vec<Vec<&str>>) {
        let states = states
            .into_iter()
            .map(|series| Some(series.into_iter().map(str::to_string).collect()));
        self.state()
            .supported_series
            .insert(id.to_string(), Script::new(states));
    }

    /// Set the child devices of `id`.
    pub fn set_children(&self, id: &str, children: Vec<ManagedObject>) {
        self.state().children.insert(id.to_string(), children);
    }

    /// Register an external identity.
    pub fn add_identity(&self, external_id: &str, external_type: &str, id: &str) {
        self.state().identities.insert(
            (external_id.to_string(), external_type.to_string()),
            id.to_string(),
        );
    }

    /// Fail the next call with `err`.
    pub fn fail_next(&self, err: ApiError) {
        self.state().failures.push_back(err);
    }

    /// Number of calls to `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.state().calls.get(method).copied().unwrap_or_default()
    }

    /// Operations created through `create_operation`.
    pub fn created(&self) -> Vec<(String, Fragments)> {
        self.state().created.clone()
    }

    /// Queries received by `list_alarms`.
    pub fn alarm_queries(&self) -> Vec<AlarmQuery> {
        self.state().alarm_queries.clone()
    }

    /// Queries received by `list_operations`.
    pub fn operation_queries(&self) -> Vec<OperationQuery> {
        self.state().operation_queries.clone()
    }

    /// Queries received by `list_events`.
    pub fn event_queries(&self) -> Vec<EventQuery> {
        self.state().event_queries.clone()
    }

    /// Queries received by `list_measurements`.
    pub fn measurement_queries(&self) -> Vec<MeasurementQuery> {
        self.state().measurement_queries.clone()
    }
}

fn accepts(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().is_none_or(|filter| filter == value)
}

#[async_trait]
impl DeviceManagementApi for FakeApi {
    async fn get_operation(&self, id: &str) -> Result<Operation, ApiError> {
        self.enter("get_operation")?;
        self.state()
            .operations
            .get_mut(id)
            .and_then(Script::next)
            .ok_or_else(|| ApiError::not_found("operation", id))
    }

    async fn list_operations(&self, query: &OperationQuery) -> Result<Vec<Operation>, ApiError> {
        self.enter("list_operations")?;
        let mut state = self.state();
        state.operation_queries.push(query.clone());
        Ok(state
            .operation_list
            .iter()
            .filter(|op| accepts(&query.device_id, &op.device_id))
            .filter(|op| query.status.is_none_or(|status| status == op.status))
            .filter(|op| {
                query
                    .fragment
                    .as_ref()
                    .is_none_or(|fragment| op.fragments.contains_key(fragment))
            })
            .cloned()
            .collect())
    }

    async fn create_operation(
        &self,
        device_id: &str,
        mut fragments: Fragments,
    ) -> Result<Operation, ApiError> {
        self.enter("create_operation")?;
        let mut state = self.state();
        state.created.push((device_id.to_string(), fragments.clone()));

        let id = format!("op-{}", state.created.len());
        let description = fragments
            .remove("description")
            .and_then(|value| value.as_str().map(str::to_string));
        let created = Operation {
            id: id.clone(),
            device_id: device_id.to_string(),
            description,
            fragments,
            ..Operation::default()
        };
        state
            .operations
            .entry(id)
            .or_insert_with(|| Script::new([Some(created.clone())]));
        Ok(created)
    }

    async fn get_alarm(&self, id: &str) -> Result<Alarm, ApiError> {
        self.enter("get_alarm")?;
        self.state()
            .alarms
            .iter()
            .find(|alarm| alarm.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("alarm", id))
    }

    async fn list_alarms(&self, query: &AlarmQuery) -> Result<Vec<Alarm>, ApiError> {
        self.enter("list_alarms")?;
        let mut state = self.state();
        state.alarm_queries.push(query.clone());
        Ok(state
            .alarms
            .iter()
            .filter(|alarm| accepts(&query.source, &alarm.source.id))
            .filter(|alarm| accepts(&query.kind, &alarm.kind))
            .cloned()
            .collect())
    }

    async fn get_event(&self, id: &str) -> Result<Event, ApiError> {
        self.enter("get_event")?;
        self.state()
            .events
            .iter()
            .find(|event| event.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("event", id))
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, ApiError> {
        self.enter("list_events")?;
        let mut state = self.state();
        state.event_queries.push(query.clone());
        Ok(state
            .events
            .iter()
            .filter(|event| accepts(&query.source, &event.source.id))
            .filter(|event| accepts(&query.kind, &event.kind))
            .filter(|event| {
                query
                    .fragment
                    .as_ref()
                    .is_none_or(|fragment| event.fragments.contains_key(fragment))
            })
            .cloned()
            .collect())
    }

    async fn get_event_binary(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        self.enter("get_event_binary")?;
        self.state()
            .binaries
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("event binary", id))
    }

    async fn list_measurements(
        &self,
        query: &MeasurementQuery,
    ) -> Result<Vec<Measurement>, ApiError> {
        self.enter("list_measurements")?;
        let mut state = self.state();
        state.measurement_queries.push(query.clone());
        Ok(state
            .measurements
            .iter()
            .filter(|m| accepts(&query.source, &m.source.id))
            .filter(|m| accepts(&query.kind, &m.kind))
            .cloned()
            .collect())
    }

    async fn get_managed_object(&self, id: &str) -> Result<ManagedObject, ApiError> {
        self.enter("get_managed_object")?;
        self.state()
            .managed_objects
            .get_mut(id)
            .and_then(Script::next)
            .ok_or_else(|| ApiError::not_found("managed object", id))
    }

    async fn get_supported_series(&self, id: &str) -> Result<Vec<String>, ApiError> {
        self.enter("get_supported_series")?;
        Ok(self
            .state()
            .supported_series
            .get_mut(id)
            .and_then(Script::next)
            .unwrap_or_default())
    }

    async fn list_child_devices(&self, id: &str) -> Result<Vec<ManagedObject>, ApiError> {
        self.enter("list_child_devices")?;
        Ok(self.state().children.get(id).cloned().unwrap_or_default())
    }

    async fn get_external_id(
        &self,
        external_id: &str,
        external_type: &str,
    ) -> Result<String, ApiError> {
        self.enter("get_external_id")?;
        self.state()
            .identities
            .get(&(external_id.to_string(), external_type.to_string()))
            .cloned()
            .ok_or_else(|| ApiError::not_found("identity", external_id))
    }
}

/// Retries short enough for paused-clock tests: 10ms wait, 100ms timeout.
pub fn fast() -> RetryOptions {
    RetryOptions::new()
        .wait(Duration::from_millis(10))
        .timeout(Duration::from_millis(100))
}

/// Route assertion logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Context on [`DEVICE_ID`] with [`fast`] retries.
pub fn context(api: Arc<FakeApi>) -> AssertContext {
    init_tracing();
    AssertContext::new(api)
        .with_device_id(DEVICE_ID)
        .with_retry_defaults(fast())
}

/// An operation on [`DEVICE_ID`].
pub fn operation(id: &str, status: OperationStatus) -> Operation {
    Operation {
        id: id.to_string(),
        device_id: DEVICE_ID.to_string(),
        status,
        ..Operation::default()
    }
}

/// An alarm raised by `source`.
pub fn alarm(id: &str, source: &str, kind: &str, text: &str) -> Alarm {
    Alarm {
        id: id.to_string(),
        source: SourceRef::new(source),
        kind: kind.to_string(),
        text: text.to_string(),
        ..Alarm::default()
    }
}

/// An event sent by `source`.
pub fn event(id: &str, source: &str, kind: &str, text: &str) -> Event {
    Event {
        id: id.to_string(),
        source: SourceRef::new(source),
        kind: kind.to_string(),
        text: text.to_string(),
        ..Event::default()
    }
}

/// A measurement sent by `source`.
pub fn measurement(id: &str, source: &str, kind: &str) -> Measurement {
    Measurement {
        id: id.to_string(),
        source: SourceRef::new(source),
        kind: kind.to_string(),
        ..Measurement::default()
    }
}

/// A managed object built from platform JSON.
pub fn managed_object(value: serde_json::Value) -> ManagedObject {
    serde_json::from_value(value).expect("valid managed object")
}
