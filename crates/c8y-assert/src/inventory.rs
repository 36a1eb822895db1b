//! Inventory assertions
//!
//! Every member takes an optional managed object id and falls back to the
//! context device when it is `None`.

use crate::compare::{CountRange, contains_fragment_values};
use crate::context::{AssertComponent, AssertContext};
use crate::error::{AssertError, Result};
use crate::models::{ManagedObject, SUPPORTED_OPERATIONS_FRAGMENT};
use c8y_assert_core::decorate::{Decorate, MemberTable};
use c8y_assert_core::retry::RetryOptions;
use serde_json::Value;

/// Inventory assertions.
///
/// # Examples
///
/// ```rust
/// use c8y_assert::{AssertContext, AssertInventory};
/// use c8y_assert_core::retry::RetryOptions;
/// use serde_json::json;
///
/// # async fn example(context: AssertContext) -> c8y_assert::Result<()> {
/// let inventory = AssertInventory::new(context);
///
/// inventory
///     .assert_contains_fragment_values(
///         &json!({"c8y_Agent": {"name": "thin-edge.io"}}),
///         None,
///         RetryOptions::new(),
///     )
///     .await?;
/// inventory
///     .assert_contains_supported_operations(&["c8y_Restart"], None, RetryOptions::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AssertInventory {
    context: AssertContext,
    members: MemberTable,
}

impl Decorate for AssertInventory {
    const COMPONENT: &'static str = "AssertInventory";
    const MEMBERS: &'static [&'static str] = &[
        "assert_exists",
        "assert_not_exists",
        "assert_contains_fragments",
        "assert_missing_fragments",
        "assert_contains_fragment_values",
        "assert_supported_operations",
        "assert_contains_supported_operations",
        "assert_changed",
        "assert_child_device_count",
        "assert_child_device_names",
    ];
}

impl AssertComponent for AssertInventory {
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

impl AssertInventory {
    /// Create the component.
    pub fn new(context: AssertContext) -> Self {
        Self {
            members: context.member_table::<Self>(),
            context,
        }
    }

    /// Assert the managed object exists and return it.
    pub async fn assert_exists(
        &self,
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<ManagedObject> {
        self.members
            .invoke("assert_exists", options, || self.fetch(id))
            .await
    }

    /// Assert the managed object does not exist (anymore).
    pub async fn assert_not_exists(&self, id: Option<&str>, options: RetryOptions) -> Result<()> {
        self.members
            .invoke("assert_not_exists", options, || async {
                let id = self.context.require_source(id)?;
                match self.context.api().get_managed_object(&id).await {
                    Ok(_) => Err(AssertError::unmet(format!(
                        "Managed object (id={id}) should not exist"
                    ))),
                    Err(err) if err.is_not_found() => Ok(()),
                    Err(err) => Err(err.into()),
                }
            })
            .await
    }

    /// Assert the managed object has all `fragments`, regardless of their values.
    pub async fn assert_contains_fragments(
        &self,
        fragments: &[&str],
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<ManagedObject> {
        self.members
            .invoke("assert_contains_fragments", options, || {
                self.check_contains_fragments(fragments, id)
            })
            .await
    }

    /// Assert the managed object has none of `fragments`.
    pub async fn assert_missing_fragments(
        &self,
        fragments: &[&str],
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<ManagedObject> {
        self.members
            .invoke("assert_missing_fragments", options, || async {
                let mo = self.fetch(id).await?;
                let existing: Vec<&str> = fragments
                    .iter()
                    .copied()
                    .filter(|name| mo.has_fragment(name))
                    .collect();
                if !existing.is_empty() {
                    return Err(AssertError::unmet(format!(
                        "Device has unexpected fragments. wanted=[], got={existing:?}"
                    )));
                }
                Ok(mo)
            })
            .await
    }

    /// Assert the managed object contains `fragments` with their values.
    ///
    /// Nested objects are compared as subsets and empty expected values are
    /// ignored, see [`contains_fragment_values`].
    pub async fn assert_contains_fragment_values(
        &self,
        fragments: &Value,
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<ManagedObject> {
        self.members
            .invoke("assert_contains_fragment_values", options, || async {
                if fragments.as_object().is_none_or(|map| map.is_empty()) {
                    return Err(AssertError::terminal(
                        "At least 1 fragment is required to compare objects",
                    ));
                }

                let mo = self.fetch(id).await?;
                let actual = mo.to_value();
                if !contains_fragment_values(&actual, fragments) {
                    return Err(AssertError::unmet(format!(
                        "Managed object does not contain fragment values\n  wanted={fragments}\n  got={actual}"
                    )));
                }
                Ok(mo)
            })
            .await
    }

    /// Assert the supported operations are exactly `expected`, in any order.
    pub async fn assert_supported_operations(
        &self,
        expected: &[&str],
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<ManagedObject> {
        self.members
            .invoke("assert_supported_operations", options, || async {
                let (mo, mut got) = self.supported_operations(id).await?;
                got.sort_unstable();
                let mut wanted = expected.to_vec();
                wanted.sort_unstable();

                if got != wanted {
                    return Err(AssertError::unmet(format!(
                        "{SUPPORTED_OPERATIONS_FRAGMENT} does not match.\nexpected={wanted:?}\ngot={got:?}"
                    )));
                }
                Ok(mo)
            })
            .await
    }

    /// Assert the supported operations include `expected`. Others may exist.
    pub async fn assert_contains_supported_operations(
        &self,
        expected: &[&str],
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<ManagedObject> {
        self.members
            .invoke("assert_contains_supported_operations", options, || async {
                let (mo, got) = self.supported_operations(id).await?;
                let missing: Vec<&str> = expected
                    .iter()
                    .copied()
                    .filter(|name| !got.iter().any(|op| op == name))
                    .collect();

                if !missing.is_empty() {
                    return Err(AssertError::unmet(format!(
                        "{SUPPORTED_OPERATIONS_FRAGMENT} is missing expected operations.\nmissing={missing:?}\ngot={got:?}"
                    )));
                }
                Ok(mo)
            })
            .await
    }

    /// Assert the managed object differs from `reference`.
    ///
    /// With `fragment` only that fragment of both objects is compared. The
    /// object counts as unchanged while it still contains every value of the
    /// reference.
    pub async fn assert_changed(
        &self,
        reference: &Value,
        fragment: Option<&str>,
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<ManagedObject> {
        self.members
            .invoke("assert_changed", options, || async {
                let mo = self.fetch(id).await?;
                let actual = mo.to_value();
                let (actual, reference) = match fragment {
                    Some(name) => (
                        actual.get(name).cloned().unwrap_or(Value::Null),
                        reference.get(name).cloned().unwrap_or(Value::Null),
                    ),
                    None => (actual, reference.clone()),
                };

                if contains_fragment_values(&actual, &reference) {
                    return Err(AssertError::unmet(format!(
                        "Managed object (id={}) has not changed\n  reference={reference}\n  got={actual}",
                        mo.id
                    )));
                }
                Ok(mo)
            })
            .await
    }

    /// Assert the number of child devices lies in `range`.
    pub async fn assert_child_device_count(
        &self,
        range: CountRange,
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<Vec<ManagedObject>> {
        self.members
            .invoke("assert_child_device_count", options, || async {
                let children = self.child_devices(id).await?;
                range.check("Child device", children.len())?;
                Ok(children)
            })
            .await
    }

    /// Assert the child device names are exactly `expected`, in any order.
    pub async fn assert_child_device_names(
        &self,
        expected: &[&str],
        id: Option<&str>,
        options: RetryOptions,
    ) -> Result<Vec<ManagedObject>> {
        self.members
            .invoke("assert_child_device_names", options, || async {
                let children = self.child_devices(id).await?;
                let mut got: Vec<&str> = children
                    .iter()
                    .map(|child| child.name.as_deref().unwrap_or_default())
                    .collect();
                got.sort_unstable();
                let mut wanted = expected.to_vec();
                wanted.sort_unstable();

                if got != wanted {
                    return Err(AssertError::unmet(format!(
                        "Child device names do not match.\nwanted={wanted:?}\ngot={got:?}"
                    )));
                }
                Ok(children)
            })
            .await
    }

    async fn fetch(&self, id: Option<&str>) -> std::result::Result<ManagedObject, AssertError> {
        let id = self.context.require_source(id)?;
        self.context
            .api()
            .get_managed_object(&id)
            .await
            .map_err(AssertError::from_lookup)
    }

    async fn child_devices(
        &self,
        id: Option<&str>,
    ) -> std::result::Result<Vec<ManagedObject>, AssertError> {
        let id = self.context.require_source(id)?;
        self.context
            .api()
            .list_child_devices(&id)
            .await
            .map_err(AssertError::from_lookup)
    }

    async fn check_contains_fragments(
        &self,
        fragments: &[&str],
        id: Option<&str>,
    ) -> std::result::Result<ManagedObject, AssertError> {
        let mo = self.fetch(id).await?;
        let missing: Vec<&str> = fragments
            .iter()
            .copied()
            .filter(|name| !mo.has_fragment(name))
            .collect();
        if !missing.is_empty() {
            return Err(AssertError::unmet(format!(
                "Device is missing some fragments. wanted={missing:?}, got={:?}",
                mo.fragment_names()
            )));
        }
        Ok(mo)
    }

    async fn supported_operations(
        &self,
        id: Option<&str>,
    ) -> std::result::Result<(ManagedObject, Vec<String>), AssertError> {
        let mo = self
            .check_contains_fragments(&[SUPPORTED_OPERATIONS_FRAGMENT], id)
            .await?;
        let operations = mo.supported_operations().unwrap_or_default();
        Ok((mo, operations))
    }
}
