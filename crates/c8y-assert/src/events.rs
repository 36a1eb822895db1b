//! Event assertions

use crate::api::EventQuery;
use crate::compare::{CountRange, RegexPattern};
use crate::context::{AssertComponent, AssertContext};
use crate::error::{AssertError, Result};
use crate::models::{BINARY_FRAGMENT, Event};
use c8y_assert_core::decorate::{Decorate, MemberTable};
use c8y_assert_core::retry::RetryOptions;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Expected checksum of an attachment.
///
/// Digests are hex encoded and compared case-insensitively. The file variants
/// hash a local reference file the attachment must be identical to; a file
/// that cannot be read fails the assertion at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checksum {
    /// MD5 digest
    Md5(String),
    /// MD5 digest of a local reference file
    Md5File(PathBuf),
    /// SHA-256 digest
    Sha256(String),
    /// SHA-256 digest of a local reference file
    Sha256File(PathBuf),
}

impl Checksum {
    /// Name of the digest algorithm.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Md5(_) | Self::Md5File(_) => "md5",
            Self::Sha256(_) | Self::Sha256File(_) => "sha256",
        }
    }

    /// Hex digest of `data` with this checksum's algorithm.
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            Self::Md5(_) | Self::Md5File(_) => hex::encode(Md5::digest(data)),
            Self::Sha256(_) | Self::Sha256File(_) => hex::encode(Sha256::digest(data)),
        }
    }

    async fn expected(&self) -> std::result::Result<String, AssertError> {
        match self {
            Self::Md5(digest) | Self::Sha256(digest) => Ok(digest.to_lowercase()),
            Self::Md5File(path) | Self::Sha256File(path) => {
                let data = tokio::fs::read(path).await.map_err(|err| {
                    AssertError::terminal(format!(
                        "Could not read checksum reference file {}: {err}",
                        path.display()
                    ))
                })?;
                Ok(self.digest(&data))
            }
        }
    }
}

/// What [`Events::assert_attachment`] checks. Unset fields are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentExpectation {
    /// Exact contents
    pub contents: Option<String>,
    /// Pattern the contents must match (multi-line, `.` matches newlines);
    /// takes precedence over `contents`
    pub pattern: Option<String>,
    /// Minimum size in bytes
    pub min_size: Option<usize>,
    /// Expected checksum
    pub checksum: Option<Checksum>,
}

/// Event assertions.
#[derive(Debug)]
pub struct Events {
    context: AssertContext,
    members: MemberTable,
}

impl Decorate for Events {
    const COMPONENT: &'static str = "Events";
    const MEMBERS: &'static [&'static str] = &[
        "assert_count",
        "assert_exists",
        "assert_attachment_info",
        "assert_attachment",
        "assert_no_attachment",
    ];
}

impl AssertComponent for Events {
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

impl Events {
    /// Create the component.
    pub fn new(context: AssertContext) -> Self {
        Self {
            members: context.member_table::<Self>(),
            context,
        }
    }

    /// Assert the number of events matching `query` and `text` lies in `range`.
    ///
    /// `text` is a case-insensitive pattern matched at the start of the event
    /// text. With `with_attachment` only events carrying a binary are
    /// counted, replacing any fragment filter of `query`.
    pub async fn assert_count(
        &self,
        text: Option<&str>,
        range: CountRange,
        with_attachment: bool,
        query: &EventQuery,
        options: RetryOptions,
    ) -> Result<Vec<Event>> {
        self.members
            .invoke("assert_count", options, || {
                self.check_count(text, range, with_attachment, query)
            })
            .await
    }

    /// Assert that an event exists and return it.
    pub async fn assert_exists(&self, event_id: &str, options: RetryOptions) -> Result<Event> {
        self.members
            .invoke("assert_exists", options, || self.fetch(event_id))
            .await
    }

    /// Assert the attachment meta information of an event.
    ///
    /// The name and type patterns are matched at the start of the values and
    /// skipped when `None`.
    pub async fn assert_attachment_info(
        &self,
        event_id: &str,
        name_pattern: Option<&str>,
        type_pattern: Option<&str>,
        options: RetryOptions,
    ) -> Result<Event> {
        self.members
            .invoke("assert_attachment_info", options, || {
                self.check_attachment_info(event_id, name_pattern, type_pattern)
            })
            .await
    }

    /// Download the attachment of an event and check it against `expected`.
    ///
    /// Returns the raw bytes for further checks.
    pub async fn assert_attachment(
        &self,
        event_id: &str,
        expected: &AttachmentExpectation,
        options: RetryOptions,
    ) -> Result<Vec<u8>> {
        self.members
            .invoke("assert_attachment", options, || {
                self.check_attachment(event_id, expected)
            })
            .await
    }

    /// Assert that an event has no attachment.
    pub async fn assert_no_attachment(&self, event_id: &str, options: RetryOptions) -> Result<()> {
        self.members
            .invoke("assert_no_attachment", options, || async {
                match self.context.api().get_event_binary(event_id).await {
                    Ok(_) => Err(AssertError::unmet("Attachment should not exist")),
                    Err(err) if err.is_not_found() => Ok(()),
                    Err(err) => Err(err.into()),
                }
            })
            .await
    }

    async fn fetch(&self, event_id: &str) -> std::result::Result<Event, AssertError> {
        self.context
            .api()
            .get_event(event_id)
            .await
            .map_err(AssertError::from_lookup)
    }

    async fn check_count(
        &self,
        text: Option<&str>,
        range: CountRange,
        with_attachment: bool,
        query: &EventQuery,
    ) -> std::result::Result<Vec<Event>, AssertError> {
        let source = self.context.require_source(query.source.as_deref())?;
        let pattern = text
            .filter(|text| !text.is_empty())
            .map(RegexPattern::case_insensitive)
            .transpose()?;

        let mut query = EventQuery {
            source: Some(source),
            ..query.clone()
        };
        if with_attachment {
            query.fragment = Some(BINARY_FRAGMENT.to_string());
        }

        let events = self.context.api().list_events(&query).await?;
        let matching: Vec<Event> = match &pattern {
            Some(pattern) => events
                .into_iter()
                .filter(|event| pattern.is_match(&event.text))
                .collect(),
            None => events,
        };
        range.check("Event", matching.len())?;
        Ok(matching)
    }

    async fn check_attachment_info(
        &self,
        event_id: &str,
        name_pattern: Option<&str>,
        type_pattern: Option<&str>,
    ) -> std::result::Result<Event, AssertError> {
        let name_pattern = name_pattern.map(RegexPattern::new).transpose()?;
        let type_pattern = type_pattern.map(RegexPattern::new).transpose()?;

        let event = self.fetch(event_id).await?;
        let Some(info) = event.attachment() else {
            return Err(AssertError::unmet(format!(
                "Expected event (id={event_id}) to contain the {BINARY_FRAGMENT} fragment"
            )));
        };

        if let Some(pattern) = name_pattern
            && !pattern.is_match(&info.name)
        {
            return Err(AssertError::unmet(format!(
                "Attachment name does not match\ngot: {}\nwanted: {pattern}",
                info.name
            )));
        }
        if let Some(pattern) = type_pattern
            && !pattern.is_match(&info.content_type)
        {
            return Err(AssertError::unmet(format!(
                "Attachment type does not match\ngot: {}\nwanted: {pattern}",
                info.content_type
            )));
        }
        Ok(event)
    }

    async fn check_attachment(
        &self,
        event_id: &str,
        expected: &AttachmentExpectation,
    ) -> std::result::Result<Vec<u8>, AssertError> {
        let pattern = expected
            .pattern
            .as_deref()
            .map(RegexPattern::multiline)
            .transpose()?;

        let data = self
            .context
            .api()
            .get_event_binary(event_id)
            .await
            .map_err(AssertError::from_lookup)?;

        if let Some(min_size) = expected.min_size
            && data.len() < min_size
        {
            return Err(AssertError::unmet(format!(
                "Expected file size to be greater or equal to {min_size} bytes, got {}",
                data.len()
            )));
        }

        if pattern.is_some() || expected.contents.is_some() {
            let contents = std::str::from_utf8(&data).map_err(|err| {
                AssertError::terminal(format!("Attachment contents are not valid UTF-8: {err}"))
            })?;
            match (&pattern, &expected.contents) {
                (Some(pattern), _) if !pattern.is_match(contents) => {
                    return Err(AssertError::unmet(format!(
                        "Attachment contents do not match pattern {pattern}"
                    )));
                }
                (None, Some(wanted)) if contents != wanted.as_str() => {
                    return Err(AssertError::unmet(format!(
                        "Attachment contents do not match\ngot: {contents}\nwanted: {wanted}"
                    )));
                }
                _ => {}
            }
        }

        if let Some(checksum) = &expected.checksum {
            let wanted = checksum.expected().await?;
            let got = checksum.digest(&data);
            if wanted != got {
                return Err(AssertError::unmet(format!(
                    "Event binary checksum ({}) did not match. wanted={wanted}, got={got}",
                    checksum.algorithm()
                )));
            }
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digests() {
        assert_eq!(
            Checksum::Sha256(String::new()).digest(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(
            Checksum::Md5(String::new()).digest(b"hello"),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(Checksum::Md5File(PathBuf::from("a.bin")).algorithm(), "md5");
        assert_eq!(Checksum::Sha256File(PathBuf::from("a.bin")).algorithm(), "sha256");
    }

    #[tokio::test]
    async fn test_missing_reference_file_is_terminal() {
        let checksum = Checksum::Md5File(PathBuf::from("/nonexistent/c8y-assert/reference.bin"));

        let err = checksum.expected().await.unwrap_err();
        assert!(matches!(err, AssertError::Final(_)));
        assert!(err.to_string().starts_with("Could not read checksum reference file"));
    }
}
