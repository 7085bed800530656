//! Qualified type names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Source file extension of generated units.
pub const SOURCE_EXT: &str = "java";

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "break", "case", "catch", "class", "const", "continue", "default",
    "do", "else", "enum", "extends", "final", "finally", "for", "goto", "if", "implements",
    "import", "instanceof", "interface", "native", "new", "package", "private", "protected",
    "public", "return", "static", "strictfp", "super", "switch", "synchronized", "this",
    "throw", "throws", "transient", "try", "volatile", "while", "true", "false", "null",
];

/// Errors raised when parsing a qualified name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("type name cannot be empty")]
    Empty,

    #[error("invalid segment '{segment}' in type name '{name}'")]
    InvalidSegment { name: String, segment: String },
}

/// A qualified class name: package plus simple name.
///
/// Primitive types parse to a `ClassName` with an empty package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassName {
    package: String,
    simple_name: String,
}

impl ClassName {
    /// Create a class name from a package and a simple name.
    ///
    /// # Errors
    ///
    /// Returns an error if any segment is not a valid identifier.
    pub fn new(package: &str, simple_name: &str) -> Result<Self, TypeError> {
        if package.is_empty() {
            Self::parse(simple_name)
        } else {
            Self::parse(&format!("{package}.{simple_name}"))
        }
    }

    /// Parse a dotted qualified name such as `com.example.SampleBean`.
    pub fn parse(name: &str) -> Result<Self, TypeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TypeError::Empty);
        }

        for segment in name.split('.') {
            if !is_identifier(segment) {
                return Err(TypeError::InvalidSegment {
                    name: name.to_string(),
                    segment: segment.to_string(),
                });
            }
        }

        let (package, simple_name) = match name.rsplit_once('.') {
            Some((package, simple)) => (package.to_string(), simple.to_string()),
            None => (String::new(), name.to_string()),
        };

        Ok(Self {
            package,
            simple_name,
        })
    }

    /// A well-known name that needs no validation.
    pub(crate) fn known(package: &str, simple_name: &str) -> Self {
        Self {
            package: package.to_string(),
            simple_name: simple_name.to_string(),
        }
    }

    /// A well-known dotted name that needs no validation.
    pub(crate) fn known_qualified(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((package, simple_name)) => Self::known(package, simple_name),
            None => Self::known("", name),
        }
    }

    /// The package, empty for the default package and primitives.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The simple name.
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// The dotted fully-qualified name.
    pub fn canonical_name(&self) -> String {
        if self.package.is_empty() {
            self.simple_name.clone()
        } else {
            format!("{}.{}", self.package, self.simple_name)
        }
    }

    /// Returns true for `int`, `boolean` and the other primitive types.
    pub fn is_primitive(&self) -> bool {
        self.package.is_empty() && PRIMITIVES.contains(&self.simple_name.as_str())
    }

    /// Returns true for types that never need an import (`java.lang` and primitives).
    pub fn is_implicitly_imported(&self) -> bool {
        self.is_primitive() || self.package == "java.lang"
    }

    /// Create a sibling class in the same package.
    pub fn peer(&self, simple_name: &str) -> Result<Self, TypeError> {
        Self::new(&self.package, simple_name)
    }

    /// Path of the source file relative to a source root.
    pub fn relative_source_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        if !self.package.is_empty() {
            for segment in self.package.split('.') {
                path.push(segment);
            }
        }
        path.push(format!("{}.{}", self.simple_name, SOURCE_EXT));
        path
    }

    /// The boxed form of a primitive, or the type itself.
    pub fn boxed(&self) -> Self {
        if !self.is_primitive() {
            return self.clone();
        }
        let boxed = match self.simple_name.as_str() {
            "boolean" => "Boolean",
            "byte" => "Byte",
            "char" => "Character",
            "short" => "Short",
            "int" => "Integer",
            "long" => "Long",
            "float" => "Float",
            "double" => "Double",
            _ => "Void",
        };
        Self::known("java.lang", boxed)
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

impl FromStr for ClassName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ClassName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical_name())
    }
}

impl<'de> Deserialize<'de> for ClassName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Returns true if `s` is a valid identifier that is not a reserved word.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return false;
    }
    !KEYWORDS.contains(&s)
}
