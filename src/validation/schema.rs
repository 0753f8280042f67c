//! Static schemas for the models that accept create requests.
//!
//! The table is compiled in; there is no way to add or change a model at runtime.

use std::fmt;
use std::str::FromStr;

use crate::core::error::GatewayError;

/// Primitive shape a field value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-empty string
    String,

    /// Non-empty string holding an email address
    Email,

    /// Array whose items are all strings (the array itself may be empty)
    StringArray,
}

/// One declared field of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// JSON key
    pub name: &'static str,

    /// Human readable name used in messages
    pub label: &'static str,

    pub required: bool,
    pub kind: FieldKind,
}

impl FieldRule {
    const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            required: true,
            kind,
        }
    }
}

const CERTIFICATION: &[FieldRule] = &[
    FieldRule::required("certificateName", "Certificate Name", FieldKind::String),
    FieldRule::required("design", "Design", FieldKind::String),
    FieldRule::required("issuer", "Issuer", FieldKind::String),
    FieldRule::required("groups", "Groups", FieldKind::StringArray),
];

const APPROVER: &[FieldRule] = &[FieldRule::required("email", "Email", FieldKind::Email)];

const GROUP: &[FieldRule] = &[FieldRule::required("name", "Name", FieldKind::String)];

const MEMBER: &[FieldRule] = &[
    FieldRule::required("name", "Name", FieldKind::String),
    FieldRule::required("email", "Email", FieldKind::Email),
    FieldRule::required("groupId", "Group ID", FieldKind::String),
    FieldRule::required("groupName", "Group Name", FieldKind::String),
];

/// Models with a create schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Certification,
    Approver,
    Group,
    Member,
}

impl Model {
    pub const ALL: [Model; 4] = [
        Model::Certification,
        Model::Approver,
        Model::Group,
        Model::Member,
    ];

    /// Path segment naming this model
    pub fn name(&self) -> &'static str {
        match self {
            Model::Certification => "certification",
            Model::Approver => "approver",
            Model::Group => "group",
            Model::Member => "member",
        }
    }

    /// Declared fields, in the order violations are reported
    pub fn schema(&self) -> &'static [FieldRule] {
        match self {
            Model::Certification => CERTIFICATION,
            Model::Approver => APPROVER,
            Model::Group => GROUP,
            Model::Member => MEMBER,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldRule> {
        self.schema().iter().find(|rule| rule.name == name)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Model names are matched exactly, the way they appear in the path.
impl FromStr for Model {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|model| model.name() == s)
            .ok_or_else(|| GatewayError::unknown_model(s))
    }
}
