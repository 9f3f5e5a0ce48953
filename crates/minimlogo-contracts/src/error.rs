use thiserror::Error;

/// Failures surfaced by the logo studio.
///
/// None of these are fatal to a session: validation and generation errors
/// are shown inline and the user may retry, export errors become a
/// notification and never touch history.
#[derive(Error, Debug)]
pub enum LogoError {
    /// A required form field was empty. Raised before any network call.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Credentials are missing or were rejected by the image service.
    #[error("Image service configuration error: {0}")]
    Configuration(String),

    /// The service answered but no part carried inline image data.
    #[error("The model returned no image.")]
    NoImageProduced,

    /// Any other generation failure, with the underlying message.
    #[error("Logo generation failed: {0}")]
    GenerationFailed(String),

    /// Input bytes could not be decoded as a raster image.
    #[error("Image could not be decoded: {0}")]
    ImageDecode(String),

    /// Preparing a download failed.
    #[error("Export of {file_name} failed: {source}")]
    Export {
        file_name: String,
        #[source]
        source: Box<LogoError>,
    },

    /// A submission arrived while another generation was still running.
    #[error("A logo is already being generated.")]
    GenerationInFlight,

    #[error("No logo with id {0} in history.")]
    UnknownAsset(String),

    #[error("History already contains a logo with id {0}.")]
    DuplicateAsset(String),

    /// Encoding or I/O failure outside the categories above.
    #[error("{0}")]
    Other(String),
}

impl LogoError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn export(file_name: impl Into<String>, source: LogoError) -> Self {
        Self::Export {
            file_name: file_name.into(),
            source: Box::new(source),
        }
    }

    /// Short, stable category name used in event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Configuration(_) => "configuration",
            Self::NoImageProduced => "no_image_produced",
            Self::GenerationFailed(_) => "generation_failed",
            Self::ImageDecode(_) => "image_decode",
            Self::Export { .. } => "export",
            Self::GenerationInFlight => "generation_in_flight",
            Self::UnknownAsset(_) => "unknown_asset",
            Self::DuplicateAsset(_) => "duplicate_asset",
            Self::Other(_) => "other",
        }
    }

    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(_) => {
                "The image service rejected the request: check that a valid API key is configured."
                    .to_string()
            }
            Self::Export { .. } => {
                "There was an issue processing the image for download.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LogoError;

    #[test]
    fn export_error_keeps_source_in_chain() {
        let err = LogoError::export(
            "acme-transparent.png",
            LogoError::ImageDecode("bad header".to_string()),
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("Image could not be decoded: bad header")
        );
        assert_eq!(err.kind(), "export");
        assert_eq!(
            err.user_message(),
            "There was an issue processing the image for download."
        );
    }

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = LogoError::validation("brand_name", "Please enter a brand name.");
        assert_eq!(err.user_message(), "Please enter a brand name.");
        assert_eq!(err.kind(), "validation");
    }
}
