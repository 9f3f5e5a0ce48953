use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::brand::BrandDescription;
use crate::error::LogoError;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Raw raster bytes returned by the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();
        Self { bytes, mime_type }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(bytes, None)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }
}

/// One finished generation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedAsset {
    pub id: String,
    pub image: ImagePayload,
    pub request: BrandDescription,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedAsset {
    pub fn new(request: BrandDescription, prompt: impl Into<String>, image: ImagePayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            image,
            request,
            prompt: prompt.into(),
            created_at: Utc::now(),
        }
    }
}

/// Session-local list of generated logos, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    assets: Vec<GeneratedAsset>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends `asset`. Ids are unique within a history.
    pub fn push(&mut self, asset: GeneratedAsset) -> Result<&GeneratedAsset, LogoError> {
        if self.get(&asset.id).is_some() {
            return Err(LogoError::DuplicateAsset(asset.id));
        }
        self.assets.insert(0, asset);
        Ok(&self.assets[0])
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedAsset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&GeneratedAsset> {
        self.assets.get(index)
    }

    pub fn latest(&self) -> Option<&GeneratedAsset> {
        self.assets.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Drops every asset. There is no undo.
    pub fn clear(&mut self) -> usize {
        let removed = self.assets.len();
        self.assets.clear();
        removed
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::BASE64;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BASE64
            .decode(raw.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{GeneratedAsset, History, ImagePayload};
    use crate::brand::{BrandDescription, ColorPalette, LogoStyle};
    use crate::error::LogoError;

    fn asset(name: &str) -> GeneratedAsset {
        GeneratedAsset::new(
            BrandDescription::new(name, "Retail", LogoStyle::Monoline, ColorPalette::Earthy),
            format!("logo for {name}"),
            ImagePayload::png(vec![1, 2, 3]),
        )
    }

    #[test]
    fn push_prepends_newest_first() -> anyhow::Result<()> {
        let mut history = History::new();
        for name in ["first", "second", "third"] {
            history.push(asset(name))?;
        }
        assert_eq!(history.len(), 3);
        let names: Vec<&str> = history
            .iter()
            .map(|asset| asset.request.brand_name.as_str())
            .collect();
        assert_eq!(names, vec!["third", "second", "first"]);
        assert_eq!(
            history.latest().map(|asset| asset.request.brand_name.as_str()),
            Some("third")
        );
        Ok(())
    }

    #[test]
    fn duplicate_ids_are_rejected() -> anyhow::Result<()> {
        let mut history = History::new();
        let original = asset("dup");
        history.push(original.clone())?;
        match history.push(original.clone()) {
            Err(LogoError::DuplicateAsset(id)) => assert_eq!(id, original.id),
            other => panic!("unexpected push result: {other:?}"),
        }
        assert_eq!(history.len(), 1);
        Ok(())
    }

    #[test]
    fn clear_empties_history() -> anyhow::Result<()> {
        let mut history = History::new();
        history.push(asset("a"))?;
        history.push(asset("b"))?;
        assert_eq!(history.clear(), 2);
        assert!(history.is_empty());
        assert!(history.latest().is_none());
        Ok(())
    }

    #[test]
    fn generated_ids_are_unique() {
        let left = asset("x");
        let right = asset("x");
        assert_ne!(left.id, right.id);
        assert_eq!(left.id.len(), 32);
    }

    #[test]
    fn image_bytes_serialize_as_base64() -> anyhow::Result<()> {
        let payload = ImagePayload::new(vec![0xff, 0x00, 0x10], Some(""));
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.data_uri(), "data:image/png;base64,/wAQ");

        let value = serde_json::to_value(&payload)?;
        assert_eq!(value["bytes"], Value::String("/wAQ".to_string()));
        let restored: ImagePayload = serde_json::from_value(value)?;
        assert_eq!(restored, payload);
        Ok(())
    }
}
