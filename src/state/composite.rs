//! Composite keys
//!
//! A composite key is `\0` + namespace + `\0` + part + `\0` + ... so that every
//! prefix of its parts is also a prefix of the encoded key, which is what makes
//! owner-only range scans over allowances possible.

use super::StateError;
use std::fmt;

/// Separator between namespace and parts
pub const COMPOSITE_KEY_DELIMITER: char = '\u{0}';

/// Reserved for range upper bounds, never allowed inside a part
const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Namespace for owner/spender allowances
pub const APPROVAL_NAMESPACE: &str = "approval";

/// An encoded composite key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(String);

impl CompositeKey {
    /// Build a key from a namespace and ordered parts.
    ///
    /// With fewer parts than the full key this yields the prefix used for range scans.
    pub fn new(namespace: &str, parts: &[&str]) -> Result<Self, StateError> {
        if namespace.is_empty() {
            return Err(StateError::InvalidKey(
                "namespace cannot be empty".to_string(),
            ));
        }
        validate_component(namespace)?;

        let mut key = String::with_capacity(
            2 + namespace.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>(),
        );
        key.push(COMPOSITE_KEY_DELIMITER);
        key.push_str(namespace);
        key.push(COMPOSITE_KEY_DELIMITER);

        for part in parts {
            validate_component(part)?;
            key.push_str(part);
            key.push(COMPOSITE_KEY_DELIMITER);
        }

        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.0.trim_matches(COMPOSITE_KEY_DELIMITER);
        write!(f, "{}", body.replace(COMPOSITE_KEY_DELIMITER, "/"))
    }
}

fn validate_component(component: &str) -> Result<(), StateError> {
    if component.contains(COMPOSITE_KEY_DELIMITER) || component.contains(MAX_UNICODE_RUNE) {
        return Err(StateError::InvalidKey(format!(
            "{:?} contains a reserved character",
            component
        )));
    }
    Ok(())
}

/// Whether a raw key is in composite form
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_DELIMITER)
}

/// Split an encoded key back into its namespace and parts
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>), StateError> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_DELIMITER)
        .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_DELIMITER))
        .ok_or_else(|| StateError::InvalidKey(format!("{:?} is not a composite key", key)))?;

    let mut components = body.split(COMPOSITE_KEY_DELIMITER).map(str::to_string);
    let namespace = components.next().unwrap_or_default();
    if namespace.is_empty() {
        return Err(StateError::InvalidKey(format!(
            "{:?} has an empty namespace",
            key
        )));
    }

    Ok((namespace, components.collect()))
}

/// Key of one owner/spender allowance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowanceKey {
    pub owner: String,
    pub spender: String,
}

impl AllowanceKey {
    pub fn new(owner: impl Into<String>, spender: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            spender: spender.into(),
        }
    }

    /// Encode as `approval/{owner}/{spender}`
    pub fn to_key(&self) -> Result<CompositeKey, StateError> {
        CompositeKey::new(APPROVAL_NAMESPACE, &[&self.owner, &self.spender])
    }

    /// Decode a key produced by [`AllowanceKey::to_key`]
    pub fn decode(key: &str) -> Result<Self, StateError> {
        let (namespace, mut parts) = split_composite_key(key)?;

        if namespace != APPROVAL_NAMESPACE {
            return Err(StateError::InvalidKey(format!(
                "expected {} namespace, found {}",
                APPROVAL_NAMESPACE, namespace
            )));
        }
        if parts.len() != 2 {
            return Err(StateError::InvalidKey(format!(
                "approval key needs 2 parts, found {}",
                parts.len()
            )));
        }

        let spender = parts.pop().unwrap_or_default();
        let owner = parts.pop().unwrap_or_default();
        Ok(Self { owner, spender })
    }
}
