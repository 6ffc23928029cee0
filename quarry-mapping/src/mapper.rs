//! The mapped class registry.
//!
//! Classes are registered once at startup and looked up by name or by Rust
//! type afterwards. Nothing here inspects types at runtime: every field the
//! query layer can see was declared through [`MappedClass`] / [`MappedField`].

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::debug;

use crate::class::MappedClass;
use crate::error::{MappingError, MappingResult};
use crate::field::MappedField;

/// Default document key holding the discriminator.
pub const DEFAULT_DISCRIMINATOR_KEY: &str = "className";

/// A Rust type that can be persisted.
pub trait Entity: 'static {
    /// Describe how the type is stored.
    fn mapped_class() -> MappedClass;
}

/// Options shared by every class of a mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperOptions {
    /// Document key the discriminator is stored under.
    pub discriminator_key: SmolStr,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            discriminator_key: SmolStr::new_static(DEFAULT_DISCRIMINATOR_KEY),
        }
    }
}

/// Registry of mapped classes.
#[derive(Debug, Default)]
pub struct Mapper {
    options: MapperOptions,
    classes: RwLock<IndexMap<SmolStr, Arc<MappedClass>>>,
    types: RwLock<HashMap<TypeId, SmolStr>>,
}

impl Mapper {
    /// Create an empty mapper with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mapper with the given options.
    pub fn with_options(options: MapperOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Mapper options.
    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Document key used for discriminators.
    pub fn discriminator_key(&self) -> &str {
        &self.options.discriminator_key
    }

    /// Register an entity type.
    pub fn map<T: Entity>(&self) -> MappingResult<Arc<MappedClass>> {
        let class = self.add_class(T::mapped_class())?;
        self.types
            .write()
            .insert(TypeId::of::<T>(), class.name.clone());
        Ok(class)
    }

    /// Register a class that is not backed by an [`Entity`] type
    /// (embedded documents, parents of a hierarchy).
    pub fn add_class(&self, class: MappedClass) -> MappingResult<Arc<MappedClass>> {
        class.validate()?;

        let mut classes = self.classes.write();
        if classes.contains_key(&class.name) {
            return Err(MappingError::duplicate("class", class.name.as_str()));
        }

        debug!(
            class = %class.name,
            collection = %class.collection,
            fields = class.fields.len(),
            "Mapped class registered"
        );

        let class = Arc::new(class);
        classes.insert(class.name.clone(), Arc::clone(&class));
        Ok(class)
    }

    /// Whether a type has been registered.
    pub fn is_mapped<T: Entity>(&self) -> bool {
        self.types.read().contains_key(&TypeId::of::<T>())
    }

    /// Look up the class registered for an entity type.
    pub fn mapped_class<T: Entity>(&self) -> MappingResult<Arc<MappedClass>> {
        let name = self
            .types
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or_else(|| MappingError::not_mapped(std::any::type_name::<T>()))?;
        self.class(&name)
    }

    /// Look up a class by name.
    pub fn class(&self, name: &str) -> MappingResult<Arc<MappedClass>> {
        self.classes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MappingError::not_mapped(name))
    }

    /// All registered classes in registration order.
    pub fn classes(&self) -> Vec<Arc<MappedClass>> {
        self.classes.read().values().cloned().collect()
    }

    /// Find a field on a class or any of its ancestors.
    ///
    /// Returns the field together with the class that declares it.
    pub fn field(
        &self,
        class: &Arc<MappedClass>,
        name: &str,
    ) -> Option<(Arc<MappedClass>, MappedField)> {
        let mut current = Some(Arc::clone(class));
        let mut depth = 0;

        while let Some(class) = current {
            if let Some(field) = class.own_field(name) {
                return Some((Arc::clone(&class), field.clone()));
            }
            // a malformed hierarchy must not loop forever
            depth += 1;
            if depth > 64 {
                return None;
            }
            current = class
                .parent
                .as_deref()
                .and_then(|parent| self.class(parent).ok());
        }

        None
    }

    /// All persisted fields of a class, inherited fields first.
    pub fn persistence_fields(&self, class: &Arc<MappedClass>) -> Vec<MappedField> {
        let mut chain = vec![Arc::clone(class)];
        while let Some(parent) = chain
            .last()
            .and_then(|c| c.parent.clone())
            .and_then(|p| self.class(&p).ok())
        {
            if chain.len() > 64 || chain.iter().any(|c| c.name == parent.name) {
                break;
            }
            chain.push(parent);
        }

        chain
            .iter()
            .rev()
            .flat_map(|c| c.fields.values().cloned())
            .collect()
    }

    /// Check that every parent and embedded reference points at a registered class.
    pub fn validate(&self) -> MappingResult<()> {
        let classes = self.classes.read();
        let mut errors = Vec::new();

        for class in classes.values() {
            if let Some(parent) = &class.parent {
                if !classes.contains_key(parent) {
                    errors.push(MappingError::unknown_reference(
                        class.name.as_str(),
                        "<parent>",
                        parent.as_str(),
                    ));
                }
            }
            for field in class.fields.values() {
                if let Some(target) = field.embedded_class() {
                    if !classes.contains_key(target) {
                        errors.push(MappingError::unknown_reference(
                            class.name.as_str(),
                            field.name.as_str(),
                            target,
                        ));
                    }
                }
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            count => Err(MappingError::ValidationFailed { count, errors }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person;

    impl Entity for Person {
        fn mapped_class() -> MappedClass {
            MappedClass::new("Person")
                .collection("people")
                .parent("Base")
                .field(MappedField::new("name"))
                .field(MappedField::new("address").embedded("Address"))
        }
    }

    struct Unmapped;

    impl Entity for Unmapped {
        fn mapped_class() -> MappedClass {
            MappedClass::new("Unmapped")
        }
    }

    fn mapper() -> Mapper {
        let mapper = Mapper::new();
        mapper
            .add_class(MappedClass::new("Base").field(MappedField::new("id").id()))
            .unwrap();
        mapper
            .add_class(MappedClass::new("Address").field(MappedField::new("city")))
            .unwrap();
        mapper.map::<Person>().unwrap();
        mapper
    }

    #[test]
    fn test_lookup_by_type() {
        let mapper = mapper();
        let class = mapper.mapped_class::<Person>().unwrap();
        assert_eq!(class.name(), "Person");
        assert_eq!(class.collection, "people");
        assert!(mapper.is_mapped::<Person>());
    }

    #[test]
    fn test_unmapped_type() {
        let mapper = mapper();
        let err = mapper.mapped_class::<Unmapped>().unwrap_err();
        assert!(err.is_not_mapped());
    }

    #[test]
    fn test_duplicate_registration() {
        let mapper = mapper();
        assert!(mapper.map::<Person>().is_err());
    }

    #[test]
    fn test_inherited_field_lookup() {
        let mapper = mapper();
        let person = mapper.mapped_class::<Person>().unwrap();

        let (declaring, field) = mapper.field(&person, "id").unwrap();
        assert_eq!(declaring.name(), "Base");
        assert_eq!(field.db_key(), "_id");

        let (declaring, _) = mapper.field(&person, "name").unwrap();
        assert_eq!(declaring.name(), "Person");
    }

    #[test]
    fn test_persistence_fields_include_parents() {
        let mapper = mapper();
        let person = mapper.mapped_class::<Person>().unwrap();
        let names: Vec<_> = mapper
            .persistence_fields(&person)
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["id", "name", "address"]);
    }

    #[test]
    fn test_validate_references() {
        let mapper = mapper();
        assert!(mapper.validate().is_ok());

        let broken = Mapper::new();
        broken.map::<Person>().unwrap();
        match broken.validate().unwrap_err() {
            MappingError::ValidationFailed { count, .. } => assert_eq!(count, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_discriminator_key() {
        let mapper = Mapper::with_options(MapperOptions {
            discriminator_key: "_t".into(),
        });
        assert_eq!(mapper.discriminator_key(), "_t");
        assert_eq!(Mapper::new().discriminator_key(), "className");
    }
}
