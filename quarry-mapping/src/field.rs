//! Field metadata for mapped classes.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use smol_str::SmolStr;

use crate::codec::Codec;

/// The document key MongoDB uses for identifiers.
pub const ID_KEY: &str = "_id";

/// How the value of a field is laid out in the stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    /// A plain value (scalar, list of scalars, or opaque document).
    Value,
    /// A nested document described by another mapped class.
    Embedded(SmolStr),
    /// A document with dynamic keys; anything below it is not validated.
    Map,
}

/// A single persisted field of a mapped class.
#[derive(Clone, Serialize)]
pub struct MappedField {
    /// Field name as declared on the Rust type.
    pub name: SmolStr,
    /// Key used in the stored document.
    pub db_key: SmolStr,
    /// Name of the class that declares the field.
    pub declaring_class: SmolStr,
    /// Whether the field holds the document identifier.
    pub is_id: bool,
    /// Whether the declared type is a list or set.
    pub is_collection: bool,
    /// Layout of the field value.
    pub kind: FieldKind,
    /// Codec used to encode filter values of the field's type.
    #[serde(skip)]
    pub codec: Option<Arc<dyn Codec>>,
}

impl MappedField {
    /// Create a plain field stored under its declared name.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        Self {
            db_key: name.clone(),
            name,
            declaring_class: SmolStr::default(),
            is_id: false,
            is_collection: false,
            kind: FieldKind::Value,
            codec: None,
        }
    }

    /// Store the field under a different document key.
    pub fn stored_as(mut self, key: impl Into<SmolStr>) -> Self {
        self.db_key = key.into();
        self
    }

    /// Mark the field as the identifier (stored as `_id`).
    pub fn id(mut self) -> Self {
        self.is_id = true;
        self.db_key = SmolStr::new_static(ID_KEY);
        self
    }

    /// The field holds a nested document of the given mapped class.
    pub fn embedded(mut self, class: impl Into<SmolStr>) -> Self {
        self.kind = FieldKind::Embedded(class.into());
        self
    }

    /// The field holds a document with dynamic keys.
    pub fn map(mut self) -> Self {
        self.kind = FieldKind::Map;
        self
    }

    /// The declared type is a list or set.
    pub fn collection(mut self) -> Self {
        self.is_collection = true;
        self
    }

    /// Attach a codec.
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Attach a shared codec.
    pub fn shared_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored document key.
    pub fn db_key(&self) -> &str {
        &self.db_key
    }

    /// Name of the embedded class, if the field is embedded.
    pub fn embedded_class(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Embedded(class) => Some(class.as_str()),
            _ => None,
        }
    }

    /// Whether keys below this field are dynamic.
    pub fn is_map(&self) -> bool {
        self.kind == FieldKind::Map
    }

    /// The field's codec, if any.
    pub fn get_codec(&self) -> Option<&Arc<dyn Codec>> {
        self.codec.as_ref()
    }
}

impl fmt::Debug for MappedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedField")
            .field("name", &self.name)
            .field("db_key", &self.db_key)
            .field("declaring_class", &self.declaring_class)
            .field("is_id", &self.is_id)
            .field("is_collection", &self.is_collection)
            .field("kind", &self.kind)
            .field("codec", &self.codec.as_ref().map(|c| c.type_name()))
            .finish()
    }
}
