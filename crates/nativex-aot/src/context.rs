//! Per-run generation state.

use crate::hint::HintRegistry;
use crate::naming::NamingRegistry;

/// The mutable state shared by every part of one generation run.
///
/// A context is created for a single run and dropped at its end; there is
/// no way to reset it.
#[derive(Debug, Default)]
pub struct GenerationContext {
    naming: NamingRegistry,
    hints: HintRegistry,
}

impl GenerationContext {
    /// Create a fresh context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn naming(&self) -> &NamingRegistry {
        &self.naming
    }

    pub fn naming_mut(&mut self) -> &mut NamingRegistry {
        &mut self.naming
    }

    pub fn hints(&self) -> &HintRegistry {
        &self.hints
    }

    pub fn hints_mut(&mut self) -> &mut HintRegistry {
        &mut self.hints
    }

    /// Consume the context, keeping only the hints.
    pub fn into_hints(self) -> HintRegistry {
        self.hints
    }
}
