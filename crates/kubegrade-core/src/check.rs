//! Check metadata

use serde::Serialize;

/// Metadata describing a single validation check.
///
/// A check is bound to exactly one target kind; the id is derived from the
/// display name and is what annotations and CLI flags refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub name: String,
    pub id: String,
    pub target_kind: String,
    pub comment: String,
    pub optional: bool,
}

impl Check {
    pub fn new(
        name: impl Into<String>,
        target_kind: impl Into<String>,
        comment: impl Into<String>,
        optional: bool,
    ) -> Self {
        let name = name.into();
        let id = check_id(&name);
        Self {
            name,
            id,
            target_kind: target_kind.into(),
            comment: comment.into(),
            optional,
        }
    }
}

/// Derive the machine-friendly check id from a display name.
pub fn check_id(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}
