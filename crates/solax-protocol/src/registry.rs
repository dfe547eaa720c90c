use crate::variant::{DefinitionError, VariantDefinition};
use crate::variants::X3_HYBRID_G4;

/// Variants in the order discovery tries them. Append-only.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    variants: Vec<&'static VariantDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every variant this crate knows how to decode.
    pub fn builtin() -> Result<Self, DefinitionError> {
        let mut registry = Self::new();
        registry.register(&X3_HYBRID_G4)?;
        Ok(registry)
    }

    pub fn register(&mut self, variant: &'static VariantDefinition) -> Result<&mut Self, DefinitionError> {
        variant.check()?;
        self.variants.push(variant);
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static VariantDefinition> + '_ {
        self.variants.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
