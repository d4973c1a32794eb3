//! Entity identity and tagged JSON dispatch.
//!
//! Every persisted progression entity carries an `itemId` and a `className`
//! type tag. Decoding reads the tag first and only hands the object to the
//! concrete decoder once the tag is known, so an unknown tag is reported by
//! name instead of as a generic shape error.

use levelup_common::{EntityKind, LevelUpError, LevelUpResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// JSON field holding the type tag.
pub const CLASS_NAME: &str = "className";
/// JSON field holding the entity id.
pub const ITEM_ID: &str = "itemId";
/// JSON field holding the display name.
pub const NAME: &str = "name";

/// A persisted progression entity.
pub trait Entity: Sized {
    /// What kind of entity this is.
    const KIND: EntityKind;
    /// Every type tag this entity decodes from.
    const TYPE_TAGS: &'static [&'static str];

    /// Unique id within the owning container.
    fn id(&self) -> &str;

    /// Type tag written to `className`.
    fn type_tag(&self) -> &'static str;

    /// Serialized representation.
    fn to_json(&self) -> LevelUpResult<Value>;

    /// Reconstructs the entity from its serialized representation.
    fn from_json(value: &Value) -> LevelUpResult<Self>;

    /// Serialized representation as compact text.
    fn to_json_string(&self) -> LevelUpResult<String> {
        Ok(self.to_json()?.to_string())
    }

    /// Reconstructs the entity from JSON text.
    fn from_json_str(text: &str) -> LevelUpResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }
}

/// Reads and validates the type tag of a serialized entity.
pub fn type_tag_of<'a>(
    kind: EntityKind,
    known: &[&str],
    value: &'a Value,
) -> LevelUpResult<&'a str> {
    let object = value.as_object().ok_or_else(|| {
        LevelUpError::Deserialization(format!("{kind} representation is not an object"))
    })?;
    let tag = object
        .get(CLASS_NAME)
        .and_then(Value::as_str)
        .ok_or_else(|| LevelUpError::Deserialization(format!("{kind} is missing {CLASS_NAME}")))?;

    if known.contains(&tag) {
        Ok(tag)
    } else {
        Err(LevelUpError::UnknownType {
            kind,
            tag: tag.to_string(),
        })
    }
}

/// Decodes a serde-derived entity after checking its tag.
pub(crate) fn decode_tagged<T: Entity + DeserializeOwned>(value: &Value) -> LevelUpResult<T> {
    type_tag_of(T::KIND, T::TYPE_TAGS, value)?;
    Ok(T::deserialize(value)?)
}

/// Encodes a serde-derived entity.
pub(crate) fn encode<T: Serialize>(entity: &T) -> LevelUpResult<Value> {
    serde_json::to_value(entity).map_err(|e| LevelUpError::Serialization(e.to_string()))
}

/// Decodes a JSON array field into entities, or an empty list when absent.
pub(crate) fn decode_array<T: Entity>(
    owner: &str,
    value: &Value,
    field: &str,
) -> LevelUpResult<Vec<T>> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(T::from_json).collect(),
        Some(_) => Err(LevelUpError::Deserialization(format!(
            "{owner}: field {field} is not an array"
        ))),
    }
}
