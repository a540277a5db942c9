//! Component Registry
//!
//! Tag name to component definition. Owned by a [`Runtime`](crate::Runtime)
//! rather than shared process-wide, so separate runtimes never see each
//! other's tags.

use std::collections::HashMap;

use jolt_dom::is_valid_custom_element_name;

use crate::component::{ComponentOptions, Definition};

/// A defined tag
#[derive(Debug, Clone)]
pub struct Registration {
    pub options: ComponentOptions,
    pub definition: Definition,
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("component registration requires a tag name")]
    MissingName,

    #[error("invalid custom element name: {0:?}")]
    InvalidName(String),

    #[error("component {0:?} is already defined")]
    AlreadyDefined(String),
}

/// Tag registry
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    definitions: HashMap<String, Registration>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a tag; redefinition is rejected
    pub fn define(
        &mut self,
        options: ComponentOptions,
        definition: Definition,
    ) -> Result<(), RegistryError> {
        let name = options.name.as_str();
        if name.is_empty() {
            return Err(RegistryError::MissingName);
        }
        if !is_valid_custom_element_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.definitions.contains_key(name) {
            return Err(RegistryError::AlreadyDefined(name.to_string()));
        }

        tracing::debug!("Defined component <{}>", name);
        let key = name.to_string();
        self.definitions.insert(
            key,
            Registration {
                options,
                definition,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.definitions.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Defined tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}
