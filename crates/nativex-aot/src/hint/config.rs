//! Serialization of hints into native-image configuration files.
//!
//! Each category of hints maps to one JSON file:
//!
//! | Access kinds                               | File                        |
//! |--------------------------------------------|-----------------------------|
//! | construct, invoke-method, read-field       | `reflect-config.json`       |
//! | load-resource                              | `resource-config.json`      |
//! | proxy                                      | `proxy-config.json`         |
//! | serialize                                  | `serialization-config.json` |
//!
//! Files are only produced for categories that hold at least one entry.

use serde::Serialize;

use super::{AccessKind, HintEntry, HintRegistry, Mode, Subject};
use crate::types::ClassName;

pub const REFLECT_CONFIG: &str = "reflect-config.json";
pub const RESOURCE_CONFIG: &str = "resource-config.json";
pub const PROXY_CONFIG: &str = "proxy-config.json";
pub const SERIALIZATION_CONFIG: &str = "serialization-config.json";

/// One rendered configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub name: &'static str,
    pub contents: String,
}

/// The configuration files rendered from a registry.
#[derive(Debug, Clone, Default)]
pub struct NativeConfiguration {
    files: Vec<ConfigFile>,
}

impl NativeConfiguration {
    /// Render every non-empty category of `hints`.
    pub fn from_registry(hints: &HintRegistry) -> Result<Self, serde_json::Error> {
        let mut files = Vec::new();

        let reflection = reflection_entries(hints);
        if !reflection.is_empty() {
            files.push(render(REFLECT_CONFIG, &reflection)?);
        }

        let includes: Vec<ResourcePattern> = hints
            .entries_of(AccessKind::LoadResource)
            .filter_map(|entry| match &entry.subject {
                Subject::Resource(pattern) => Some(ResourcePattern {
                    condition: Condition::of(entry),
                    pattern: pattern_to_regex(pattern),
                }),
                _ => None,
            })
            .collect();
        if !includes.is_empty() {
            let resources = ResourceConfig {
                resources: ResourceIncludes { includes },
                bundles: Vec::new(),
            };
            files.push(render(RESOURCE_CONFIG, &resources)?);
        }

        let proxies: Vec<ProxyEntry> = hints
            .entries_of(AccessKind::Proxy)
            .filter_map(|entry| match &entry.subject {
                Subject::Proxy(interfaces) => Some(ProxyEntry {
                    condition: Condition::of(entry),
                    interfaces: interfaces.iter().map(ClassName::canonical_name).collect(),
                }),
                _ => None,
            })
            .collect();
        if !proxies.is_empty() {
            files.push(render(PROXY_CONFIG, &proxies)?);
        }

        let types: Vec<SerializationEntry> = hints
            .entries_of(AccessKind::Serialize)
            .filter_map(|entry| match &entry.subject {
                Subject::Type(name) => Some(SerializationEntry {
                    condition: Condition::of(entry),
                    name: name.canonical_name(),
                }),
                _ => None,
            })
            .collect();
        if !types.is_empty() {
            let serialization = SerializationConfig {
                types,
                lambda_capturing_types: Vec::new(),
            };
            files.push(render(SERIALIZATION_CONFIG, &serialization)?);
        }

        Ok(Self { files })
    }

    /// Rendered files, in the fixed category order.
    pub fn files(&self) -> &[ConfigFile] {
        &self.files
    }

    /// Look up a rendered file by name.
    pub fn file(&self, name: &str) -> Option<&ConfigFile> {
        self.files.iter().find(|file| file.name == name)
    }
}

fn render<T: Serialize>(name: &'static str, value: &T) -> Result<ConfigFile, serde_json::Error> {
    let mut contents = serde_json::to_string_pretty(value)?;
    contents.push('\n');
    Ok(ConfigFile { name, contents })
}

/// Convert a resource pattern (`*` wildcards) to the quoted regex form.
fn pattern_to_regex(pattern: &str) -> String {
    let quoted = format!("\\Q{}\\E", pattern.replace('*', "\\E.*\\Q"));
    quoted.replace("\\Q\\E", "")
}

#[derive(Debug, Serialize)]
struct Condition {
    #[serde(rename = "typeReachable")]
    type_reachable: String,
}

impl Condition {
    fn of(entry: &HintEntry) -> Option<Self> {
        entry.condition.as_ref().map(|name| Self {
            type_reachable: name.canonical_name(),
        })
    }
}

/// One `reflect-config.json` element: every reflection entry sharing a type
/// and condition, in first-registration order.
#[derive(Debug, Serialize)]
struct TypeEntry {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    methods: Vec<MethodEntry>,
    #[serde(rename = "queriedMethods", skip_serializing_if = "Vec::is_empty")]
    queried_methods: Vec<MethodEntry>,
}

#[derive(Debug, Serialize)]
struct FieldEntry {
    name: String,
    #[serde(rename = "allowWrite", skip_serializing_if = "std::ops::Not::not")]
    allow_write: bool,
}

#[derive(Debug, Serialize)]
struct MethodEntry {
    name: String,
    #[serde(rename = "parameterTypes")]
    parameter_types: Vec<String>,
}

fn reflection_entries(hints: &HintRegistry) -> Vec<TypeEntry> {
    let mut grouped: Vec<(ClassName, Option<ClassName>, TypeEntry)> = Vec::new();

    for entry in hints.entries().filter(|entry| entry.kind.is_reflection()) {
        let Subject::Type(name) = &entry.subject else {
            continue;
        };

        let position = grouped
            .iter()
            .position(|(ty, condition, _)| ty == name && condition == &entry.condition);
        let position = match position {
            Some(position) => position,
            None => {
                grouped.push((
                    name.clone(),
                    entry.condition.clone(),
                    TypeEntry {
                        name: name.canonical_name(),
                        condition: Condition::of(entry),
                        fields: Vec::new(),
                        methods: Vec::new(),
                        queried_methods: Vec::new(),
                    },
                ));
                grouped.len() - 1
            }
        };
        let target = &mut grouped[position].2;

        for hint in &entry.members {
            match &hint.member.parameter_types {
                None => target.fields.push(FieldEntry {
                    name: hint.member.name.clone(),
                    allow_write: hint.mode == Mode::Invoke,
                }),
                Some(parameters) => {
                    let method = MethodEntry {
                        name: hint.member.name.clone(),
                        parameter_types: parameters.iter().map(ClassName::canonical_name).collect(),
                    };
                    match hint.mode {
                        Mode::Invoke => target.methods.push(method),
                        Mode::Introspect => target.queried_methods.push(method),
                    }
                }
            }
        }
    }

    grouped.into_iter().map(|(_, _, entry)| entry).collect()
}

#[derive(Debug, Serialize)]
struct ResourceConfig {
    resources: ResourceIncludes,
    bundles: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ResourceIncludes {
    includes: Vec<ResourcePattern>,
}

#[derive(Debug, Serialize)]
struct ResourcePattern {
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
    pattern: String,
}

#[derive(Debug, Serialize)]
struct ProxyEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
    interfaces: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SerializationConfig {
    types: Vec<SerializationEntry>,
    #[serde(rename = "lambdaCapturingTypes")]
    lambda_capturing_types: Vec<SerializationEntry>,
}

#[derive(Debug, Serialize)]
struct SerializationEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint::Member;

    fn name(s: &str) -> ClassName {
        ClassName::parse(s).unwrap()
    }

    #[test]
    fn empty_registry_renders_nothing() {
        let config = NativeConfiguration::from_registry(&HintRegistry::new()).unwrap();
        assert!(config.files().is_empty());
    }

    #[test]
    fn constructor_hint_with_condition() {
        let mut hints = HintRegistry::new();
        hints.register_reflection(
            name("com.example.App__ApplicationContextInitializer"),
            Member::constructor(Vec::new()),
            Mode::Invoke,
            Some(name("com.example.App")),
        );

        let config = NativeConfiguration::from_registry(&hints).unwrap();
        assert_eq!(config.files().len(), 1);
        let reflect = config.file(REFLECT_CONFIG).unwrap();
        let expected = r#"[
  {
    "name": "com.example.App__ApplicationContextInitializer",
    "condition": {
      "typeReachable": "com.example.App"
    },
    "methods": [
      {
        "name": "<init>",
        "parameterTypes": []
      }
    ]
  }
]
"#;
        assert_eq!(reflect.contents, expected);
    }

    #[test]
    fn reflection_kinds_for_one_type_share_an_element() {
        let mut hints = HintRegistry::new();
        let bean = name("com.example.SampleBean");
        hints.register_reflection(bean.clone(), Member::field("message"), Mode::Invoke, None);
        hints.register_reflection(bean.clone(), Member::method("init", Vec::new()), Mode::Introspect, None);
        hints.register_reflection(bean, Member::constructor(vec![name("java.lang.String")]), Mode::Invoke, None);

        let config = NativeConfiguration::from_registry(&hints).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&config.file(REFLECT_CONFIG).unwrap().contents).unwrap();
        let elements = json.as_array().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0]["fields"][0]["allowWrite"], true);
        assert_eq!(elements[0]["queriedMethods"][0]["name"], "init");
        assert_eq!(elements[0]["methods"][0]["parameterTypes"][0], "java.lang.String");
        assert!(elements[0].get("condition").is_none());
    }

    #[test]
    fn other_categories() {
        let mut hints = HintRegistry::new();
        hints.register_resource("config/*.properties", None);
        hints.register_proxy(vec![name("com.example.Greeter"), name("java.io.Closeable")], None);
        hints.register_serialization(name("com.example.Message"), Some(name("com.example.App")));

        let config = NativeConfiguration::from_registry(&hints).unwrap();
        let names: Vec<&str> = config.files().iter().map(|file| file.name).collect();
        assert_eq!(names, vec![RESOURCE_CONFIG, PROXY_CONFIG, SERIALIZATION_CONFIG]);

        let resources: serde_json::Value =
            serde_json::from_str(&config.file(RESOURCE_CONFIG).unwrap().contents).unwrap();
        assert_eq!(
            resources["resources"]["includes"][0]["pattern"],
            "\\Qconfig/\\E.*\\Q.properties\\E"
        );

        let proxies: serde_json::Value =
            serde_json::from_str(&config.file(PROXY_CONFIG).unwrap().contents).unwrap();
        assert_eq!(proxies[0]["interfaces"][1], "java.io.Closeable");

        let serialization: serde_json::Value =
            serde_json::from_str(&config.file(SERIALIZATION_CONFIG).unwrap().contents).unwrap();
        assert_eq!(serialization["types"][0]["condition"]["typeReachable"], "com.example.App");
    }

    #[test]
    fn pattern_quoting() {
        assert_eq!(pattern_to_regex("banner.txt"), "\\Qbanner.txt\\E");
        assert_eq!(pattern_to_regex("*.txt"), ".*\\Q.txt\\E");
        assert_eq!(pattern_to_regex("static/*"), "\\Qstatic/\\E.*");
    }
}
