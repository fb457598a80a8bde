//! Persistence of sheen parameters
//!
//! The persisted fields are listed explicitly in [`SHEEN_FIELDS`]; serialize,
//! deserialize and copy all walk that list. A record written by an older or
//! newer version still loads: each missing or malformed field falls back to
//! its default on its own.

use crate::SheenFeature;
use glam::Vec3;
use helio_features::{Error, Result, TextureLibrary};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A persisted sheen property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheenField {
    Enabled,
    LinkWithAlbedo,
    Intensity,
    Color,
    Texture,
}

impl SheenField {
    /// Key of the field in the serialized record
    pub fn key(self) -> &'static str {
        match self {
            SheenField::Enabled => "isEnabled",
            SheenField::LinkWithAlbedo => "linkSheenWithAlbedo",
            SheenField::Intensity => "intensity",
            SheenField::Color => "color",
            SheenField::Texture => "texture",
        }
    }
}

/// Every persisted field, in record order
pub const SHEEN_FIELDS: &[SheenField] = &[
    SheenField::Enabled,
    SheenField::LinkWithAlbedo,
    SheenField::Intensity,
    SheenField::Color,
    SheenField::Texture,
];

const TYPE_KEY: &str = "customType";

/// Textures are persisted by identifier only
#[derive(Serialize, Deserialize)]
struct TextureRef {
    name: String,
}

impl SheenFeature {
    pub fn serialize(&self) -> Value {
        self.serialize_fields(SHEEN_FIELDS)
    }

    /// Serialize only `fields`; an absent texture is omitted
    pub fn serialize_fields(&self, fields: &[SheenField]) -> Value {
        let mut record = Map::new();
        record.insert(TYPE_KEY.to_string(), Value::from(self.class_name()));

        for &field in fields {
            let value = match field {
                SheenField::Enabled => Value::from(self.is_enabled()),
                SheenField::LinkWithAlbedo => Value::from(self.link_with_albedo()),
                SheenField::Intensity => Value::from(self.intensity()),
                SheenField::Color => Value::from(self.color().to_array().to_vec()),
                SheenField::Texture => match self.texture() {
                    Some(texture) => serde_json::json!(TextureRef {
                        name: texture.name().to_string(),
                    }),
                    None => continue,
                },
            };
            record.insert(field.key().to_string(), value);
        }

        Value::Object(record)
    }

    pub fn deserialize(&mut self, record: &Value, textures: &TextureLibrary) -> Result<()> {
        self.deserialize_fields(record, SHEEN_FIELDS, textures)
    }

    /// Load `fields` from `record` through the regular setters.
    ///
    /// Only a record that is not an object is rejected; individual fields
    /// that are missing or malformed are reset to their default.
    pub fn deserialize_fields(
        &mut self,
        record: &Value,
        fields: &[SheenField],
        textures: &TextureLibrary,
    ) -> Result<()> {
        let Some(record) = record.as_object() else {
            return Err(Error::Serialization(format!(
                "{} record must be an object",
                self.class_name()
            )));
        };

        if let Some(tag) = record.get(TYPE_KEY).and_then(Value::as_str) {
            if tag != self.class_name() {
                log::warn!("Loading a '{}' record into {}", tag, self.class_name());
            }
        }

        for &field in fields {
            let value = record.get(field.key());
            if value.is_none() {
                log::trace!("Sheen record has no '{}', using default", field.key());
            }

            match field {
                SheenField::Enabled => {
                    let enabled = read(field, value, Value::as_bool).unwrap_or(false);
                    self.set_enabled(enabled);
                }
                SheenField::LinkWithAlbedo => {
                    let link = read(field, value, Value::as_bool).unwrap_or(false);
                    self.set_link_with_albedo(link);
                }
                SheenField::Intensity => {
                    let intensity = read(field, value, Value::as_f64).map_or(1.0, |v| v as f32);
                    self.set_intensity(intensity);
                }
                SheenField::Color => {
                    let color = read(field, value, |v| {
                        serde_json::from_value::<[f32; 3]>(v.clone()).ok()
                    })
                    .map_or(Vec3::ONE, Vec3::from_array);
                    self.set_color(color);
                }
                SheenField::Texture => {
                    let texture = read(field, value, |v| {
                        serde_json::from_value::<TextureRef>(v.clone()).ok()
                    })
                    .and_then(|reference| {
                        let texture = textures.get(&reference.name);
                        if texture.is_none() {
                            log::warn!("Sheen texture '{}' not found in library", reference.name);
                        }
                        texture
                    });
                    self.set_texture(texture);
                }
            }
        }

        Ok(())
    }

    /// Parse a JSON document produced by [`SheenFeature::to_json_string`]
    pub fn parse_json(&mut self, source: &str, textures: &TextureLibrary) -> Result<()> {
        let record: Value = serde_json::from_str(source)?;
        self.deserialize(&record, textures)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.serialize())?)
    }

    /// Copy every persisted field into `target` through its setters.
    ///
    /// The texture is shared, not duplicated.
    pub fn copy_to(&self, target: &mut SheenFeature) {
        for &field in SHEEN_FIELDS {
            match field {
                SheenField::Enabled => target.set_enabled(self.is_enabled()),
                SheenField::LinkWithAlbedo => target.set_link_with_albedo(self.link_with_albedo()),
                SheenField::Intensity => target.set_intensity(self.intensity()),
                SheenField::Color => target.set_color(self.color()),
                SheenField::Texture => target.set_texture(self.texture().cloned()),
            }
        }
    }
}

/// Read a field, logging when it is present but has the wrong shape
fn read<T>(
    field: SheenField,
    value: Option<&Value>,
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = value?;
    let parsed = parse(value);
    if parsed.is_none() {
        log::warn!("Malformed sheen field '{}': {}", field.key(), value);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_features::ImageTexture;
    use serde_json::json;
    use std::sync::Arc;

    fn sheen() -> SheenFeature {
        SheenFeature::new(Arc::new(|| {}))
    }

    #[test]
    fn record_uses_persisted_keys() {
        let record = sheen()
            .with_enabled(true)
            .with_intensity(0.5)
            .with_color(Vec3::new(1.0, 0.5, 0.25))
            .serialize();

        assert_eq!(
            record,
            json!({
                "customType": "PBRSheenConfiguration",
                "isEnabled": true,
                "linkSheenWithAlbedo": false,
                "intensity": 0.5,
                "color": [1.0, 0.5, 0.25],
            })
        );
    }

    #[test]
    fn partial_field_list_serializes_subset() {
        let record = sheen().serialize_fields(&[SheenField::Intensity]);
        assert_eq!(record, json!({ "customType": "PBRSheenConfiguration", "intensity": 1.0 }));
    }

    #[test]
    fn malformed_fields_reset_to_default() {
        let mut feature = sheen()
            .with_enabled(true)
            .with_intensity(3.0)
            .with_color(Vec3::ZERO);

        let record = json!({
            "isEnabled": "yes",
            "intensity": [1, 2],
            "color": [0.1, 0.2],
            "unknownField": 42,
        });
        feature.deserialize(&record, &TextureLibrary::new()).unwrap();

        assert!(!feature.is_enabled());
        assert_eq!(feature.intensity(), 1.0);
        assert_eq!(feature.color(), Vec3::ONE);
    }

    #[test]
    fn non_object_record_is_rejected() {
        let mut feature = sheen();
        let err = feature.deserialize(&json!([1, 2, 3]), &TextureLibrary::new());
        assert!(err.is_err());
        assert!(feature.parse_json("not json", &TextureLibrary::new()).is_err());
    }

    #[test]
    fn unknown_texture_leaves_slot_empty() {
        let mut feature = sheen().with_texture(ImageTexture::loaded("old.png").into_shared());
        let record = json!({ "texture": { "name": "missing.png" } });
        feature.deserialize(&record, &TextureLibrary::new()).unwrap();
        assert!(feature.texture().is_none());
    }
}
