//! The resolved object graph consumed by the generator.
//!
//! A graph is an ordered list of construction steps, exactly as the runtime
//! container executed them, plus optional hint contributions from application
//! code. Graphs are read from TOML (default) or JSON:
//!
//! ```toml
//! application = "com.example.nativex.sample.basic.BasicApplication"
//!
//! [[steps]]
//! kind = "literal"
//! bean = "message"
//! value = "hello"
//!
//! [[steps]]
//! kind = "instance"
//! bean = "sampleBean"
//! type = "com.example.nativex.sample.basic.SampleBean"
//! args = [{ ref = "message" }]
//!
//! [[steps]]
//! kind = "lifecycle"
//! bean = "sampleBean"
//! method = "printMessageOnStartup"
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::hint::{AccessKind, Member, Mode};
use crate::types::ClassName;

/// Errors that can occur when loading a graph.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("failed to read graph file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse graph: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse graph: {0}")]
    Json(#[from] serde_json::Error),
}

/// A fully resolved application graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedGraph {
    /// The root application type.
    pub application: ClassName,

    /// Construction steps in execution order.
    #[serde(default)]
    pub steps: Vec<ConstructionStep>,

    /// Hints declared by application code.
    #[serde(default)]
    pub hints: Vec<ContributedHint>,
}

impl ResolvedGraph {
    /// Create an empty graph for `application`.
    pub fn new(application: ClassName) -> Self {
        Self {
            application,
            steps: Vec::new(),
            hints: Vec::new(),
        }
    }

    /// Append a step.
    #[must_use]
    pub fn with_step(mut self, step: ConstructionStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Load a graph, choosing the format from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::parse_json(&content)
        } else {
            Self::parse(&content)
        }
    }

    /// Parse a graph from a TOML string.
    pub fn parse(content: &str) -> Result<Self, GraphError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a graph from a JSON string.
    pub fn parse_json(content: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Accessibility of a constructor, method or field from generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        self == Self::Public
    }
}

/// How a property value is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Injection {
    /// Through a `setXxx` method.
    #[default]
    Setter,
    /// Directly into a field.
    Field,
}

/// One step of the container's construction plan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConstructionStep {
    /// A bean whose value is a literal.
    Literal { bean: String, value: Literal },

    /// Create an instance through a constructor.
    Instance {
        bean: String,
        #[serde(rename = "type")]
        ty: ClassName,
        #[serde(default)]
        args: Vec<Argument>,
        /// Declared constructor parameter types, inferred from `args` when absent.
        #[serde(default, rename = "parameter-types")]
        parameter_types: Option<Vec<ClassName>>,
        #[serde(default)]
        visibility: Visibility,
    },

    /// Set a property on a previously created bean.
    Property {
        bean: String,
        name: String,
        value: Argument,
        #[serde(default)]
        injection: Injection,
        /// Declared setter parameter type, inferred from `value` when absent.
        #[serde(default, rename = "parameter-type")]
        parameter_type: Option<ClassName>,
        #[serde(default)]
        visibility: Visibility,
    },

    /// Invoke an initialization callback.
    Lifecycle {
        bean: String,
        method: String,
        #[serde(default)]
        visibility: Visibility,
    },

    /// An instance produced by an opaque supplier.
    Supplier {
        bean: String,
        #[serde(rename = "type")]
        ty: ClassName,
    },
}

impl ConstructionStep {
    /// The bean this step defines or acts upon.
    pub fn bean(&self) -> &str {
        match self {
            Self::Literal { bean, .. }
            | Self::Instance { bean, .. }
            | Self::Property { bean, .. }
            | Self::Lifecycle { bean, .. }
            | Self::Supplier { bean, .. } => bean,
        }
    }

    /// The step kind as written in graph files.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Literal { .. } => "literal",
            Self::Instance { .. } => "instance",
            Self::Property { .. } => "property",
            Self::Lifecycle { .. } => "lifecycle",
            Self::Supplier { .. } => "supplier",
        }
    }
}

/// A constructor or property argument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Argument {
    /// Reference to a previously created bean.
    Ref(String),
    /// An inline literal.
    Value(Literal),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// The Java type of the literal when used as an argument.
    pub fn java_type(&self) -> ClassName {
        match self {
            Self::Boolean(_) => ClassName::known("", "boolean"),
            Self::Integer(value) if i32::try_from(*value).is_ok() => ClassName::known("", "int"),
            Self::Integer(_) => ClassName::known("", "long"),
            Self::Float(_) => ClassName::known("", "double"),
            Self::String(_) => ClassName::known("java.lang", "String"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// A hint declared by application code, forwarded as-is to the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ContributedHint {
    Reflection {
        #[serde(rename = "type")]
        ty: ClassName,
        access: AccessKind,
        /// Method or field name; ignored for constructors.
        #[serde(default)]
        member: Option<String>,
        #[serde(default, rename = "parameter-types")]
        parameter_types: Vec<ClassName>,
        #[serde(default = "default_mode")]
        mode: Mode,
        #[serde(default, rename = "reachable-if")]
        reachable_if: Option<ClassName>,
    },
    Resource {
        pattern: String,
        #[serde(default, rename = "reachable-if")]
        reachable_if: Option<ClassName>,
    },
    Proxy {
        interfaces: Vec<ClassName>,
        #[serde(default, rename = "reachable-if")]
        reachable_if: Option<ClassName>,
    },
    Serialization {
        #[serde(rename = "type")]
        ty: ClassName,
        #[serde(default, rename = "reachable-if")]
        reachable_if: Option<ClassName>,
    },
}

fn default_mode() -> Mode {
    Mode::Invoke
}

impl ContributedHint {
    /// Resolve the member of a reflection contribution.
    ///
    /// Returns `None` when the access kind is not a reflection kind or a
    /// method/field contribution has no member name.
    pub fn reflection_member(&self) -> Option<Member> {
        let Self::Reflection {
            access,
            member,
            parameter_types,
            ..
        } = self
        else {
            return None;
        };
        match access {
            AccessKind::Construct => Some(Member::constructor(parameter_types.clone())),
            AccessKind::InvokeMethod => member
                .as_ref()
                .map(|name| Member::method(name.clone(), parameter_types.clone())),
            AccessKind::ReadField => member.as_ref().map(|name| Member::field(name.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
application = "com.example.nativex.sample.basic.BasicApplication"

[[steps]]
kind = "literal"
bean = "message"
value = "hello"

[[steps]]
kind = "instance"
bean = "sampleBean"
type = "com.example.nativex.sample.basic.SampleBean"
args = [{ ref = "message" }]

[[steps]]
kind = "lifecycle"
bean = "sampleBean"
method = "printMessageOnStartup"
"#;

    #[test]
    fn parse_sample_graph() {
        let graph = ResolvedGraph::parse(SAMPLE).unwrap();
        assert_eq!(graph.application.simple_name(), "BasicApplication");
        assert_eq!(graph.steps.len(), 3);
        assert_eq!(
            graph.steps[0],
            ConstructionStep::Literal {
                bean: String::from("message"),
                value: Literal::String(String::from("hello")),
            }
        );
        match &graph.steps[1] {
            ConstructionStep::Instance {
                args, visibility, ..
            } => {
                assert_eq!(args, &vec![Argument::Ref(String::from("message"))]);
                assert!(visibility.is_public());
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(graph.steps[2].kind(), "lifecycle");
        assert_eq!(graph.steps[2].bean(), "sampleBean");
    }

    #[test]
    fn parse_json_graph() {
        let json = r#"{
  "application": "com.example.App",
  "steps": [
    { "kind": "literal", "bean": "port", "value": 8080 },
    { "kind": "property", "bean": "server", "name": "port", "value": { "ref": "port" }, "injection": "field", "visibility": "private" }
  ]
}"#;
        let graph = ResolvedGraph::parse_json(json).unwrap();
        assert_eq!(
            graph.steps[0],
            ConstructionStep::Literal {
                bean: String::from("port"),
                value: Literal::Integer(8080),
            }
        );
        assert!(matches!(
            graph.steps[1],
            ConstructionStep::Property {
                injection: Injection::Field,
                visibility: Visibility::Private,
                ..
            }
        ));
    }

    #[test]
    fn parse_contributed_hints() {
        let toml = r#"
application = "com.example.App"

[[hints]]
kind = "resource"
pattern = "banner.txt"

[[hints]]
kind = "reflection"
type = "com.example.Plugin"
access = "invoke-method"
member = "start"
mode = "introspect"
reachable-if = "com.example.PluginLoader"
"#;
        let graph = ResolvedGraph::parse(toml).unwrap();
        assert_eq!(graph.hints.len(), 2);
        assert_eq!(graph.hints[0].reflection_member(), None);
        assert_eq!(
            graph.hints[1].reflection_member(),
            Some(Member::method("start", Vec::new()))
        );
    }

    #[test]
    fn parse_property_parameter_type() {
        let toml = r#"
application = "com.example.App"

[[steps]]
kind = "property"
bean = "service"
name = "store"
value = { ref = "store" }
parameter-type = "com.example.Store"
visibility = "private"
"#;
        let graph = ResolvedGraph::parse(toml).unwrap();
        match &graph.steps[0] {
            ConstructionStep::Property { parameter_type, .. } => {
                assert_eq!(parameter_type, &Some(ClassName::parse("com.example.Store").unwrap()));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let toml = r#"
application = "com.example.App"
beans = []
"#;
        assert!(matches!(ResolvedGraph::parse(toml), Err(GraphError::Toml(_))));
    }

    #[test]
    fn literal_types() {
        assert_eq!(Literal::Integer(1).java_type().simple_name(), "int");
        assert_eq!(Literal::Integer(i64::MAX).java_type().simple_name(), "long");
        assert_eq!(Literal::Float(1.5).java_type().simple_name(), "double");
        assert_eq!(
            Literal::String(String::new()).java_type().canonical_name(),
            "java.lang.String"
        );
    }
}
