use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use minimlogo_contracts::history::DEFAULT_IMAGE_MIME;
use minimlogo_contracts::{GeneratedAsset, LogoError, WhiteThreshold};

use crate::background::{decode_rgba, encode_png, remove_near_white_background};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportVariant {
    /// The image as generated, on its white background.
    White,
    /// Near-white background stripped to alpha 0.
    Transparent,
}

impl ExportVariant {
    pub fn label(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Transparent => "transparent",
        }
    }

    pub fn is_transparent(self) -> bool {
        matches!(self, Self::Transparent)
    }

    pub fn from_transparent_flag(transparent: bool) -> Self {
        if transparent {
            Self::Transparent
        } else {
            Self::White
        }
    }
}

impl fmt::Display for ExportVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportVariant {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "white" | "opaque" => Ok(Self::White),
            "transparent" | "alpha" => Ok(Self::Transparent),
            other => Err(format!(
                "unknown export variant '{other}'; expected white or transparent"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Destination for finished downloads.
pub trait FileSink {
    fn save(&self, bytes: &[u8], file_name: &str, mime_type: &str) -> anyhow::Result<PathBuf>;
}

/// Writes exports into one directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for DirectorySink {
    fn save(&self, bytes: &[u8], file_name: &str, _mime_type: &str) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// `"Blue  Harbor"` becomes `blue-harbor-transparent.png`.
///
/// Whitespace runs and path separators collapse to a single `-`.
pub fn export_file_name(brand_name: &str, variant: ExportVariant) -> String {
    let stem = brand_name
        .split(|ch: char| ch.is_whitespace() || ch == '/' || ch == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    let stem = if stem.is_empty() { "logo".to_string() } else { stem };
    format!("{stem}-{}.png", variant.label())
}

/// Bytes ready to save for one asset. Never touches history.
pub fn prepare_export(
    asset: &GeneratedAsset,
    variant: ExportVariant,
    threshold: WhiteThreshold,
) -> Result<ExportedFile, LogoError> {
    let file_name = export_file_name(&asset.request.brand_name, variant);
    let bytes = match variant {
        ExportVariant::Transparent => remove_near_white_background(&asset.image.bytes, threshold),
        ExportVariant::White if asset.image.mime_type == DEFAULT_IMAGE_MIME => {
            Ok(asset.image.bytes.clone())
        }
        ExportVariant::White => {
            decode_rgba(&asset.image.bytes).and_then(|image| encode_png(&image))
        }
    }
    .map_err(|err| LogoError::export(file_name.clone(), err))?;

    Ok(ExportedFile {
        file_name,
        mime_type: DEFAULT_IMAGE_MIME,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::{Rgba, RgbaImage};
    use minimlogo_contracts::{
        BrandDescription, ColorPalette, GeneratedAsset, ImagePayload, LogoError, LogoStyle,
        WhiteThreshold,
    };

    use super::{export_file_name, prepare_export, DirectorySink, ExportVariant, FileSink};
    use crate::background::{decode_rgba, encode_png};

    fn asset_with(name: &str, image: ImagePayload) -> GeneratedAsset {
        GeneratedAsset::new(
            BrandDescription::new(name, "Studio", LogoStyle::Abstract, ColorPalette::Vibrant),
            "prompt",
            image,
        )
    }

    fn white_png() -> anyhow::Result<Vec<u8>> {
        Ok(encode_png(&RgbaImage::from_pixel(
            8,
            8,
            Rgba([255, 255, 255, 255]),
        ))?)
    }

    #[test]
    fn file_names_collapse_whitespace_and_lowercase() {
        assert_eq!(
            export_file_name("Blue  Harbor\tCo", ExportVariant::Transparent),
            "blue-harbor-co-transparent.png"
        );
        assert_eq!(export_file_name("Aether", ExportVariant::White), "aether-white.png");
        assert_eq!(
            export_file_name(" ../Evil/Name ", ExportVariant::White),
            "..-evil-name-white.png"
        );
        assert_eq!(export_file_name("   ", ExportVariant::White), "logo-white.png");
    }

    #[test]
    fn transparent_export_of_white_image_is_fully_clear() -> anyhow::Result<()> {
        let asset = asset_with("Aether", ImagePayload::png(white_png()?));
        let file = prepare_export(&asset, ExportVariant::Transparent, WhiteThreshold::DEFAULT)?;
        assert_eq!(file.file_name, "aether-transparent.png");
        assert_eq!(file.mime_type, "image/png");
        let image = decode_rgba(&file.bytes)?;
        assert!(image.pixels().all(|pixel| pixel[3] == 0));
        Ok(())
    }

    #[test]
    fn white_export_keeps_png_bytes() -> anyhow::Result<()> {
        let bytes = white_png()?;
        let asset = asset_with("Aether", ImagePayload::png(bytes.clone()));
        let file = prepare_export(&asset, ExportVariant::White, WhiteThreshold::DEFAULT)?;
        assert_eq!(file.bytes, bytes);
        Ok(())
    }

    #[test]
    fn corrupt_image_surfaces_as_export_error() {
        let asset = asset_with("Broken", ImagePayload::png(b"garbage".to_vec()));
        match prepare_export(&asset, ExportVariant::Transparent, WhiteThreshold::DEFAULT) {
            Err(LogoError::Export { file_name, source }) => {
                assert_eq!(file_name, "broken-transparent.png");
                assert!(matches!(*source, LogoError::ImageDecode(_)));
            }
            other => panic!("unexpected export result: {other:?}"),
        }
    }

    #[test]
    fn directory_sink_writes_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let sink = DirectorySink::new(temp.path().join("exports"));
        let path = sink.save(&[1, 2, 3], "aether-white.png", "image/png")?;
        assert_eq!(path, temp.path().join("exports").join("aether-white.png"));
        assert_eq!(fs::read(path)?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn variant_parsing() {
        assert_eq!("Transparent".parse::<ExportVariant>(), Ok(ExportVariant::Transparent));
        assert_eq!(ExportVariant::from_transparent_flag(false), ExportVariant::White);
        assert!("sepia".parse::<ExportVariant>().is_err());
    }
}
