//! Java source emission helpers.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::graph::Literal;
use crate::types::{is_identifier, ClassName};

const INDENT: &str = "\t";

/// Line-oriented source buffer with tab indentation.
#[derive(Debug, Default)]
pub struct SourceWriter {
    buffer: String,
    depth: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current depth.
    pub fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.buffer.push_str(INDENT);
            }
            self.buffer.push_str(text);
        }
        self.buffer.push('\n');
    }

    /// Write an empty line.
    pub fn blank(&mut self) {
        self.buffer.push('\n');
    }

    /// Write `header {` and increase the depth.
    pub fn open(&mut self, header: &str) {
        self.line(&format!("{header} {{"));
        self.depth += 1;
    }

    /// Decrease the depth and write `}`.
    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Decrease the depth and write `} trailer {`, staying at the same depth.
    pub fn reopen(&mut self, trailer: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
        self.open(trailer);
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Tracks the types referenced by one compilation unit and how to spell them.
///
/// The first type to claim a simple name gets it; later types with the same
/// simple name are written fully qualified. A type in the unit's own package
/// shadows `java.lang`, so it takes the name over from a `java.lang` claim.
#[derive(Debug)]
pub struct ImportSet {
    package: String,
    claimed: HashMap<String, ClassName>,
    imports: BTreeSet<String>,
}

impl ImportSet {
    /// Create an import set for a unit; the unit's own simple name is claimed.
    pub fn new(unit: &ClassName) -> Self {
        let mut set = Self {
            package: unit.package().to_string(),
            claimed: HashMap::new(),
            imports: BTreeSet::new(),
        };
        set.claimed
            .insert(unit.simple_name().to_string(), unit.clone());
        set
    }

    /// Claim the simple name of `ty` if it is still free.
    pub fn claim(&mut self, ty: &ClassName) {
        if ty.is_primitive() {
            return;
        }
        if let Some(owner) = self.claimed.get(ty.simple_name()) {
            let shadows = ty.package() == self.package
                && owner.package() == "java.lang"
                && owner != ty;
            if !shadows {
                return;
            }
        }
        self.claimed.insert(ty.simple_name().to_string(), ty.clone());
        if !ty.is_implicitly_imported() && ty.package() != self.package {
            self.imports.insert(ty.canonical_name());
        }
    }

    /// How `ty` is written in the unit's source.
    pub fn name(&self, ty: &ClassName) -> String {
        if ty.is_primitive() {
            return ty.simple_name().to_string();
        }
        match self.claimed.get(ty.simple_name()) {
            Some(owner) if owner == ty => ty.simple_name().to_string(),
            None if ty.is_implicitly_imported() => ty.simple_name().to_string(),
            _ => ty.canonical_name(),
        }
    }

    /// How the `java.lang` type `simple_name` is written in the unit's source.
    pub fn lang(&self, simple_name: &str) -> String {
        self.name(&ClassName::known("java.lang", simple_name))
    }

    /// Sorted import declarations.
    pub fn imports(&self) -> impl Iterator<Item = &String> {
        self.imports.iter()
    }
}

/// Assigns unique local variable names derived from bean names.
#[derive(Debug, Default)]
pub struct LocalNames {
    used: HashSet<String>,
}

impl LocalNames {
    /// Create a scope where `reserved` names are already taken.
    pub fn with_reserved(reserved: &[&str]) -> Self {
        Self {
            used: reserved.iter().map(|name| (*name).to_string()).collect(),
        }
    }

    /// A fresh identifier for `bean`.
    pub fn allocate(&mut self, bean: &str) -> String {
        let base = identifier_for(bean);
        let mut candidate = base.clone();
        let mut counter = 1;
        while self.used.contains(&candidate) {
            counter += 1;
            candidate = format!("{base}{counter}");
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Turn an arbitrary bean name into a lower camel case identifier.
fn identifier_for(bean: &str) -> String {
    let mut out = String::new();
    let mut upper_next = false;
    for c in bean.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if upper_next && !out.is_empty() {
                out.extend(c.to_uppercase());
            } else if out.is_empty() {
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }

    if out.is_empty() {
        return String::from("bean");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "bean");
    }
    if !is_identifier(&out) {
        out.push_str("Bean");
    }
    out
}

/// Render a literal as a Java expression.
pub fn literal(value: &Literal) -> String {
    match value {
        Literal::Boolean(value) => value.to_string(),
        Literal::Integer(value) => {
            if i32::try_from(*value).is_ok() {
                value.to_string()
            } else {
                format!("{value}L")
            }
        }
        Literal::Float(value) => {
            // Constant expressions, so a local `Double` cannot capture them.
            if value.is_nan() {
                String::from("(0.0d / 0.0)")
            } else if value.is_infinite() {
                if value.is_sign_positive() {
                    String::from("(1.0d / 0.0)")
                } else {
                    String::from("(-1.0d / 0.0)")
                }
            } else {
                format!("{value:?}")
            }
        }
        Literal::String(value) => string_literal(value),
    }
}

/// Render a quoted, escaped Java string literal. Non-ASCII characters are
/// written as `\uXXXX` escapes so the output does not depend on the source
/// encoding.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{unit:04x}"));
                }
            }
        }
    }
    out.push('"');
    out
}

/// `setMessage` for a property named `message`.
pub fn setter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => String::from("set"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ClassName {
        ClassName::parse(s).unwrap()
    }

    #[test]
    fn writer_indents_blocks() {
        let mut out = SourceWriter::new();
        out.open("class A");
        out.open("void run()");
        out.line("go();");
        out.close();
        out.close();
        assert_eq!(out.finish(), "class A {\n\tvoid run() {\n\t\tgo();\n\t}\n}\n");
    }

    #[test]
    fn imports_skip_same_package_and_java_lang() {
        let mut imports = ImportSet::new(&name("com.example.App__Init"));
        imports.claim(&name("java.lang.String"));
        imports.claim(&name("com.example.SampleBean"));
        imports.claim(&name("org.springframework.context.ApplicationContextInitializer"));
        imports.claim(&name("int"));

        let declared: Vec<&String> = imports.imports().collect();
        assert_eq!(
            declared,
            vec!["org.springframework.context.ApplicationContextInitializer"]
        );
        assert_eq!(imports.name(&name("com.example.SampleBean")), "SampleBean");
        assert_eq!(imports.name(&name("int")), "int");
    }

    #[test]
    fn conflicting_simple_names_are_qualified() {
        let mut imports = ImportSet::new(&name("com.example.App__Init"));
        imports.claim(&name("java.util.List"));
        imports.claim(&name("com.other.List"));
        assert_eq!(imports.name(&name("java.util.List")), "List");
        assert_eq!(imports.name(&name("com.other.List")), "com.other.List");
        assert_eq!(imports.imports().count(), 1);
    }

    #[test]
    fn same_package_type_shadows_java_lang() {
        let mut imports = ImportSet::new(&name("com.example.App__Init"));
        imports.claim(&name("java.lang.String"));
        imports.claim(&name("com.example.String"));
        imports.claim(&name("com.other.Override"));

        assert_eq!(imports.name(&name("com.example.String")), "String");
        assert_eq!(imports.name(&name("java.lang.String")), "java.lang.String");
        assert_eq!(imports.lang("String"), "java.lang.String");
        assert_eq!(imports.lang("Class"), "Class");
        // An explicit import keeps its claim, so java.lang loses the name.
        assert_eq!(imports.lang("Override"), "java.lang.Override");
        assert_eq!(imports.imports().count(), 1);
    }

    #[test]
    fn local_names() {
        let mut locals = LocalNames::with_reserved(&["context"]);
        assert_eq!(locals.allocate("message"), "message");
        assert_eq!(locals.allocate("message"), "message2");
        assert_eq!(locals.allocate("data-source"), "dataSource");
        assert_eq!(locals.allocate("context"), "context2");
        assert_eq!(locals.allocate("9lives"), "bean9lives");
        assert_eq!(locals.allocate("class"), "classBean");
        assert_eq!(locals.allocate("--"), "bean");
        assert_eq!(locals.allocate("SampleBean"), "sampleBean");
    }

    #[test]
    fn literals() {
        assert_eq!(literal(&Literal::Integer(42)), "42");
        assert_eq!(literal(&Literal::Integer(5_000_000_000)), "5000000000L");
        assert_eq!(literal(&Literal::Float(1.0)), "1.0");
        assert_eq!(literal(&Literal::Float(f64::NAN)), "(0.0d / 0.0)");
        assert_eq!(literal(&Literal::Float(f64::NEG_INFINITY)), "(-1.0d / 0.0)");
        assert_eq!(literal(&Literal::Boolean(true)), "true");
        assert_eq!(
            literal(&Literal::String(String::from("say \"hi\"\n\u{e9}"))),
            "\"say \\\"hi\\\"\\n\\u00e9\""
        );
    }

    #[test]
    fn setters() {
        assert_eq!(setter_name("message"), "setMessage");
        assert_eq!(setter_name("url"), "setUrl");
    }
}
