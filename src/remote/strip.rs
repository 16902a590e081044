use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::foundation::core::ObjectId;
use crate::foundation::error::{SceneError, SceneResult};
use crate::scene::model::Environment;

/// Image payloads removed from an environment before it is sent to the service.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageMap {
    pub objects: IndexMap<ObjectId, String>,
    pub backgrounds: IndexMap<String, String>,
}

impl ImageMap {
    /// Nothing was stripped.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.backgrounds.is_empty()
    }
}

/// Environment JSON without image payloads, plus what was removed.
#[derive(Clone, Debug, PartialEq)]
pub struct StrippedEnvironment {
    /// Object `image` keys deleted and every background value `null`.
    pub env: Value,
    pub images: ImageMap,
}

fn object_entries(env: &mut Value) -> SceneResult<Option<&mut Map<String, Value>>> {
    match env.get_mut("objects") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(SceneError::serde(format!(
            "environment objects must be a map, got {other}"
        ))),
    }
}

fn background_entries(env: &mut Value) -> SceneResult<Option<&mut Map<String, Value>>> {
    match env.get_mut("backgrounds") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(SceneError::serde(format!(
            "environment backgrounds must be a map, got {other}"
        ))),
    }
}

/// Remove image payloads for transmission.
///
/// Only non-empty object images are recorded. Every background key is kept with a `null`
/// value so the service still sees the available fixture-state combinations.
pub fn strip_image_data(env: &Environment) -> SceneResult<StrippedEnvironment> {
    let mut json = serde_json::to_value(env)?;
    let mut images = ImageMap::default();

    if let Some(objects) = object_entries(&mut json)? {
        for (id, object) in objects.iter_mut() {
            let Some(fields) = object.as_object_mut() else {
                continue;
            };
            if let Some(Value::String(image)) = fields.remove("image")
                && !image.is_empty()
            {
                images.objects.insert(ObjectId::new(id.as_str()), image);
            }
        }
    }

    if let Some(backgrounds) = background_entries(&mut json)? {
        for (key, value) in backgrounds.iter_mut() {
            if let Value::String(image) = value.take() {
                images.backgrounds.insert(key.clone(), image);
            }
        }
    }

    Ok(StrippedEnvironment { env: json, images })
}

/// Put the payloads in `images` back into a stripped environment.
///
/// Object ids or background keys unknown to `stripped` are ignored. Backgrounds still `null`
/// afterwards are dropped from the result.
pub fn restore_image_data(stripped: &Value, images: &ImageMap) -> SceneResult<Environment> {
    let mut json = stripped.clone();

    if let Some(objects) = object_entries(&mut json)? {
        for (id, image) in &images.objects {
            if let Some(Value::Object(fields)) = objects.get_mut(id.as_str()) {
                fields.insert("image".to_string(), Value::String(image.clone()));
            }
        }
    }

    if let Some(backgrounds) = background_entries(&mut json)? {
        for (key, image) in &images.backgrounds {
            if let Some(slot) = backgrounds.get_mut(key) {
                *slot = Value::String(image.clone());
            }
        }
        backgrounds.retain(|_, v| !v.is_null());
    }

    Ok(serde_json::from_value(json)?)
}

#[cfg(test)]
#[path = "../../tests/unit/remote/strip.rs"]
mod tests;
