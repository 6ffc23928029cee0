//! Mapped class definitions (one per persisted Rust type).

use indexmap::IndexMap;
use serde::Serialize;
use smol_str::SmolStr;

use crate::error::{MappingError, MappingResult};
use crate::field::MappedField;

/// A Rust type mapped to documents of one collection.
#[derive(Debug, Clone, Serialize)]
pub struct MappedClass {
    /// Class name (usually the Rust type name).
    pub name: SmolStr,
    /// Collection the entities are stored in.
    pub collection: SmolStr,
    /// Parent class for inherited fields.
    pub parent: Option<SmolStr>,
    /// Value written under the discriminator key, if the class uses one.
    pub discriminator: Option<SmolStr>,
    /// Fields declared directly on this class, keyed by declared name.
    pub fields: IndexMap<SmolStr, MappedField>,
}

impl MappedClass {
    /// Create a class stored in a collection of the same name.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        Self {
            collection: name.clone(),
            name,
            parent: None,
            discriminator: None,
            fields: IndexMap::new(),
        }
    }

    /// Store entities in the named collection.
    pub fn collection(mut self, collection: impl Into<SmolStr>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Inherit fields from the named class.
    pub fn parent(mut self, parent: impl Into<SmolStr>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Record the concrete type in stored documents under the given value.
    pub fn discriminator(mut self, value: impl Into<SmolStr>) -> Self {
        self.discriminator = Some(value.into());
        self
    }

    /// Add a field declared on this class.
    pub fn field(mut self, mut field: MappedField) -> Self {
        field.declaring_class = self.name.clone();
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Get the class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether stored documents carry a discriminator.
    pub fn uses_discriminator(&self) -> bool {
        self.discriminator.is_some()
    }

    /// Look up a field declared on this class by declared name, then by stored key.
    ///
    /// Inherited fields are resolved by the [`Mapper`](crate::Mapper).
    pub fn own_field(&self, name: &str) -> Option<&MappedField> {
        self.fields
            .get(name)
            .or_else(|| self.fields.values().find(|f| f.db_key == name))
    }

    /// The identifier field declared on this class.
    pub fn id_field(&self) -> Option<&MappedField> {
        self.fields.values().find(|f| f.is_id)
    }

    /// Check the structural rules for stored keys.
    pub fn validate(&self) -> MappingResult<()> {
        if self.name.is_empty() {
            return Err(MappingError::invalid_class("<unnamed>", "class name is empty"));
        }
        if self.collection.is_empty() {
            return Err(MappingError::invalid_class(
                self.name.as_str(),
                "collection name is empty",
            ));
        }

        let mut errors = Vec::new();
        let mut keys: IndexMap<&str, &str> = IndexMap::new();

        for field in self.fields.values() {
            let key = field.db_key.as_str();
            if key.is_empty() {
                errors.push(MappingError::invalid_field(
                    self.name.as_str(),
                    field.name.as_str(),
                    "stored key is empty",
                ));
            } else if key.contains('.') {
                errors.push(MappingError::invalid_field(
                    self.name.as_str(),
                    field.name.as_str(),
                    format!("stored key `{key}` contains '.'"),
                ));
            } else if key.starts_with('$') {
                errors.push(MappingError::invalid_field(
                    self.name.as_str(),
                    field.name.as_str(),
                    format!("stored key `{key}` starts with '$'"),
                ));
            }

            if let Some(other) = keys.insert(key, field.name.as_str()) {
                errors.push(MappingError::duplicate(
                    "stored key",
                    format!("{}.{} / {}.{}", self.name, other, self.name, field.name),
                ));
            }
        }

        if self.fields.values().filter(|f| f.is_id).count() > 1 {
            errors.push(MappingError::invalid_class(
                self.name.as_str(),
                "more than one identifier field",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            count => Err(MappingError::ValidationFailed { count, errors }),
        }
    }
}
