//! Runtime hints: dynamic accesses that must survive closed-world compilation.
//!
//! A hint is a `(subject, access kind, condition)` triple. Reflection hints
//! additionally carry the members they expose and the mode of each member:
//!
//! ```text
//! Subject::Type(SampleBean) + Construct + [<init>(String): Invoke] if BasicApplication reachable
//! ```
//!
//! Hints are accumulated in a [`HintRegistry`] and serialized by
//! [`config::NativeConfiguration`] into the `META-INF/native-image` layout.

pub mod config;
mod registry;

pub use registry::HintRegistry;

use serde::Deserialize;
use std::fmt;

use crate::types::ClassName;

/// Name used for constructors in member hints.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// What a hint is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    /// A type, for reflection and serialization hints.
    Type(ClassName),

    /// A resource pattern, for resource hints.
    Resource(String),

    /// An ordered list of interfaces implemented by a dynamic proxy.
    Proxy(Vec<ClassName>),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(name) => write!(f, "{name}"),
            Self::Resource(pattern) => write!(f, "resource '{pattern}'"),
            Self::Proxy(interfaces) => {
                let names: Vec<String> = interfaces.iter().map(ClassName::canonical_name).collect();
                write!(f, "proxy [{}]", names.join(", "))
            }
        }
    }
}

/// The kind of dynamic access a hint allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessKind {
    Construct,
    InvokeMethod,
    ReadField,
    LoadResource,
    Proxy,
    Serialize,
}

impl AccessKind {
    /// Returns true for kinds that are written to `reflect-config.json`.
    pub fn is_reflection(self) -> bool {
        matches!(self, Self::Construct | Self::InvokeMethod | Self::ReadField)
    }

    /// Returns the kind as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Construct => "construct",
            Self::InvokeMethod => "invoke-method",
            Self::ReadField => "read-field",
            Self::LoadResource => "load-resource",
            Self::Proxy => "proxy",
            Self::Serialize => "serialize",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reflective mode of a member hint.
///
/// `Invoke` subsumes `Introspect`. For fields, `Invoke` also allows writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Introspect,
    Invoke,
}

/// A constructor, method or field exposed by a reflection hint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    /// Member name, [`CONSTRUCTOR_NAME`] for constructors.
    pub name: String,

    /// Parameter types; `None` for fields.
    pub parameter_types: Option<Vec<ClassName>>,
}

impl Member {
    /// A constructor with the given parameter types.
    pub fn constructor(parameter_types: Vec<ClassName>) -> Self {
        Self {
            name: CONSTRUCTOR_NAME.to_string(),
            parameter_types: Some(parameter_types),
        }
    }

    /// A method with the given name and parameter types.
    pub fn method(name: impl Into<String>, parameter_types: Vec<ClassName>) -> Self {
        Self {
            name: name.into(),
            parameter_types: Some(parameter_types),
        }
    }

    /// A field.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_types: None,
        }
    }

    /// The access kind implied by this member.
    pub fn access_kind(&self) -> AccessKind {
        match &self.parameter_types {
            None => AccessKind::ReadField,
            Some(_) if self.name == CONSTRUCTOR_NAME => AccessKind::Construct,
            Some(_) => AccessKind::InvokeMethod,
        }
    }
}

/// A member together with its merged mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberHint {
    pub member: Member,
    pub mode: Mode,
}

/// A merged hint as stored by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintEntry {
    pub subject: Subject,
    pub kind: AccessKind,

    /// Members in first-registration order (reflection kinds only).
    pub members: Vec<MemberHint>,

    /// Type that must be reachable for the hint to apply; `None` means always.
    pub condition: Option<ClassName>,
}

impl HintEntry {
    /// Returns true if the hint applies regardless of reachability.
    pub fn is_unconditional(&self) -> bool {
        self.condition.is_none()
    }

    /// Mode registered for `member`, if any.
    pub fn mode_of(&self, member: &Member) -> Option<Mode> {
        self.members
            .iter()
            .find(|hint| &hint.member == member)
            .map(|hint| hint.mode)
    }
}
