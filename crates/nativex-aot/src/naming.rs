//! Collision-free names for generated units.

use std::collections::{HashMap, HashSet};

use crate::types::{ClassName, TypeError};

/// Separator between the base name and the feature suffix.
pub const FEATURE_SEPARATOR: &str = "__";

/// Issues unique class names for one generation run.
///
/// The first request for a base and suffix yields `Base__Suffix`; later
/// requests for the same pair yield `Base__Suffix$2`, `Base__Suffix$3`, ...
#[derive(Debug, Default)]
pub struct NamingRegistry {
    issued: HashSet<ClassName>,
    sequences: HashMap<String, u32>,
}

impl NamingRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a unique name in the package of `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if `suffix` cannot form a valid identifier.
    pub fn generate_name(&mut self, base: &ClassName, suffix: &str) -> Result<ClassName, TypeError> {
        let stem = format!("{}{}{}", base.simple_name(), FEATURE_SEPARATOR, suffix);
        let key = format!("{}.{}", base.package(), stem);
        let counter = self.sequences.entry(key).or_insert(0);

        loop {
            *counter += 1;
            let simple = if *counter == 1 {
                stem.clone()
            } else {
                format!("{stem}${counter}")
            };
            let candidate = base.peer(&simple)?;
            if self.issued.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
    }

    /// Returns true if `name` was issued by this registry.
    pub fn is_issued(&self, name: &ClassName) -> bool {
        self.issued.contains(name)
    }

    /// Number of names issued so far.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Returns true if no name has been issued.
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> ClassName {
        ClassName::parse("com.example.nativex.sample.basic.BasicApplication").unwrap()
    }

    #[test]
    fn first_name_has_no_counter() {
        let mut naming = NamingRegistry::new();
        let name = naming
            .generate_name(&app(), "ApplicationContextInitializer")
            .unwrap();
        assert_eq!(
            name.canonical_name(),
            "com.example.nativex.sample.basic.BasicApplication__ApplicationContextInitializer"
        );
        assert!(naming.is_issued(&name));
    }

    #[test]
    fn repeated_requests_are_numbered() {
        let mut naming = NamingRegistry::new();
        let names: Vec<String> = (0..3)
            .map(|_| {
                naming
                    .generate_name(&app(), "BeanDefinitions")
                    .unwrap()
                    .simple_name()
                    .to_string()
            })
            .collect();
        assert_eq!(
            names,
            vec![
                "BasicApplication__BeanDefinitions",
                "BasicApplication__BeanDefinitions$2",
                "BasicApplication__BeanDefinitions$3",
            ]
        );
    }

    #[test]
    fn different_suffixes_are_independent() {
        let mut naming = NamingRegistry::new();
        let a = naming.generate_name(&app(), "A").unwrap();
        let b = naming.generate_name(&app(), "B").unwrap();
        assert_ne!(a, b);
        assert_eq!(b.simple_name(), "BasicApplication__B");
        assert_eq!(naming.len(), 2);
    }

    #[test]
    fn numbered_candidate_already_taken_is_skipped() {
        let mut naming = NamingRegistry::new();
        // Requesting suffix `X$2` directly takes the name the `X` sequence would issue next.
        let taken = ClassName::parse("com.example.App__X$2").unwrap();
        let base = ClassName::parse("com.example.App").unwrap();
        let first = naming.generate_name(&base, "X").unwrap();
        let direct = naming.generate_name(&base, "X$2").unwrap();
        assert_eq!(direct, taken);

        let second = naming.generate_name(&base, "X").unwrap();
        assert_eq!(first.simple_name(), "App__X");
        assert_eq!(second.simple_name(), "App__X$3");
    }

    #[test]
    fn invalid_suffix_is_rejected() {
        let mut naming = NamingRegistry::new();
        assert!(naming.generate_name(&app(), "not valid").is_err());
        assert!(naming.is_empty());
    }
}
