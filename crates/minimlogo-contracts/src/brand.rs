use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LogoError;

/// Visual style requested for the mark.
///
/// Labels outside the five known styles are kept as `Unrecognized` so a
/// restored form never fails to load; the prompt builder gives them the
/// generic fallback clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogoStyle {
    #[default]
    Geometric,
    Typographic,
    Abstract,
    Monoline,
    MinimalistPictorial,
    Unrecognized(String),
}

impl LogoStyle {
    pub const KNOWN: [LogoStyle; 5] = [
        LogoStyle::Geometric,
        LogoStyle::Typographic,
        LogoStyle::Abstract,
        LogoStyle::Monoline,
        LogoStyle::MinimalistPictorial,
    ];

    pub fn label(&self) -> &str {
        match self {
            Self::Geometric => "Geometric",
            Self::Typographic => "Typographic",
            Self::Abstract => "Abstract",
            Self::Monoline => "Monoline",
            Self::MinimalistPictorial => "Minimalist Pictorial",
            Self::Unrecognized(label) => label.as_str(),
        }
    }

    pub fn parse_label(raw: &str) -> Self {
        let key = normalize_key(raw);
        Self::KNOWN
            .iter()
            .find(|style| normalize_key(style.label()) == key)
            .cloned()
            .unwrap_or_else(|| Self::Unrecognized(raw.trim().to_string()))
    }
}

impl fmt::Display for LogoStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LogoStyle {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_label(raw))
    }
}

impl From<String> for LogoStyle {
    fn from(raw: String) -> Self {
        Self::parse_label(&raw)
    }
}

impl From<LogoStyle> for String {
    fn from(style: LogoStyle) -> Self {
        style.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColorPalette {
    #[default]
    Monochrome,
    Pastel,
    Vibrant,
    Earthy,
    Luxury,
}

impl ColorPalette {
    pub const ALL: [ColorPalette; 5] = [
        ColorPalette::Monochrome,
        ColorPalette::Pastel,
        ColorPalette::Vibrant,
        ColorPalette::Earthy,
        ColorPalette::Luxury,
    ];

    /// Name of the palette as presented to the user and to the model.
    pub fn label(self) -> &'static str {
        match self {
            Self::Monochrome => "Monochrome (B&W)",
            Self::Pastel => "Soft Pastels",
            Self::Vibrant => "Modern Vibrant",
            Self::Earthy => "Natural Earthy",
            Self::Luxury => "Gold & Charcoal",
        }
    }

    fn variant_name(self) -> &'static str {
        match self {
            Self::Monochrome => "monochrome",
            Self::Pastel => "pastel",
            Self::Vibrant => "vibrant",
            Self::Earthy => "earthy",
            Self::Luxury => "luxury",
        }
    }
}

impl fmt::Display for ColorPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ColorPalette {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = normalize_key(raw);
        Self::ALL
            .into_iter()
            .find(|palette| palette.variant_name() == key || normalize_key(palette.label()) == key)
            .ok_or_else(|| {
                format!(
                    "unknown palette '{}'; expected one of: {}",
                    raw.trim(),
                    Self::ALL
                        .iter()
                        .map(|palette| palette.variant_name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

impl TryFrom<String> for ColorPalette {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<ColorPalette> for String {
    fn from(palette: ColorPalette) -> Self {
        palette.label().to_string()
    }
}

/// What the user asked for in one submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrandDescription {
    pub brand_name: String,
    pub industry: String,
    pub style: LogoStyle,
    pub palette: ColorPalette,
    #[serde(default)]
    pub custom_details: String,
    #[serde(default)]
    pub slogan: Option<String>,
}

impl BrandDescription {
    pub fn new(
        brand_name: impl Into<String>,
        industry: impl Into<String>,
        style: LogoStyle,
        palette: ColorPalette,
    ) -> Self {
        Self {
            brand_name: brand_name.into(),
            industry: industry.into(),
            style,
            palette,
            custom_details: String::new(),
            slogan: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.custom_details = details.into();
        self
    }

    pub fn with_slogan(mut self, slogan: impl Into<String>) -> Self {
        let slogan = slogan.into();
        self.slogan = if slogan.trim().is_empty() {
            None
        } else {
            Some(slogan)
        };
        self
    }

    /// Slogan text when one was given and is not blank.
    pub fn slogan_text(&self) -> Option<&str> {
        self.slogan
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn validate(&self) -> Result<(), LogoError> {
        if self.brand_name.trim().is_empty() {
            return Err(LogoError::validation(
                "brand_name",
                "Please enter a brand name.",
            ));
        }
        if self.industry.trim().is_empty() {
            return Err(LogoError::validation(
                "industry",
                "Please enter an industry.",
            ));
        }
        Ok(())
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{BrandDescription, ColorPalette, LogoStyle};
    use crate::error::LogoError;

    #[test]
    fn style_parsing_accepts_labels_and_keeps_unknown_values() {
        assert_eq!(LogoStyle::parse_label("geometric"), LogoStyle::Geometric);
        assert_eq!(
            LogoStyle::parse_label("Minimalist Pictorial"),
            LogoStyle::MinimalistPictorial
        );
        assert_eq!(
            LogoStyle::parse_label("minimalist-pictorial"),
            LogoStyle::MinimalistPictorial
        );
        assert_eq!(
            LogoStyle::parse_label(" Art Deco "),
            LogoStyle::Unrecognized("Art Deco".to_string())
        );
    }

    #[test]
    fn palette_parsing_accepts_variant_and_label() {
        assert_eq!("luxury".parse::<ColorPalette>(), Ok(ColorPalette::Luxury));
        assert_eq!(
            "Gold & Charcoal".parse::<ColorPalette>(),
            Ok(ColorPalette::Luxury)
        );
        assert_eq!(
            "Monochrome (B&W)".parse::<ColorPalette>(),
            Ok(ColorPalette::Monochrome)
        );
        let err = "neon".parse::<ColorPalette>().unwrap_err();
        assert!(err.contains("monochrome, pastel, vibrant, earthy, luxury"));
    }

    #[test]
    fn description_serializes_with_display_labels() -> anyhow::Result<()> {
        let description = BrandDescription::new(
            "Aether",
            "Architecture",
            LogoStyle::MinimalistPictorial,
            ColorPalette::Pastel,
        );
        let value = serde_json::to_value(&description)?;
        assert_eq!(value["style"], json!("Minimalist Pictorial"));
        assert_eq!(value["palette"], json!("Soft Pastels"));

        let restored: BrandDescription = serde_json::from_value(value)?;
        assert_eq!(restored, description);
        Ok(())
    }

    #[test]
    fn validation_requires_brand_name_then_industry() {
        let mut description =
            BrandDescription::new("  ", "Fintech", LogoStyle::Abstract, ColorPalette::Vibrant);
        match description.validate() {
            Err(LogoError::Validation { field, .. }) => assert_eq!(field, "brand_name"),
            other => panic!("unexpected validation result: {other:?}"),
        }

        description.brand_name = "Lumina".to_string();
        description.industry = String::new();
        match description.validate() {
            Err(LogoError::Validation { field, .. }) => assert_eq!(field, "industry"),
            other => panic!("unexpected validation result: {other:?}"),
        }

        description.industry = "Fintech".to_string();
        assert!(description.validate().is_ok());
    }

    #[test]
    fn blank_slogan_is_dropped() {
        let description = BrandDescription::default().with_slogan("   ");
        assert_eq!(description.slogan, None);
        let description = BrandDescription::default().with_slogan("Build bright");
        assert_eq!(description.slogan_text(), Some("Build bright"));
    }
}
