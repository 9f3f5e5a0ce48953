use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{Rgba, RgbaImage};
use minimlogo_contracts::config::{non_empty_env, DEFAULT_REQUEST_TIMEOUT_S};
use minimlogo_contracts::{build_prompt, BrandDescription, ImagePayload, LogoError, StudioConfig};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

pub mod background;
pub mod export;
pub mod studio;

pub use background::{remove_near_white_background, strip_near_white, StripReport};
pub use export::{export_file_name, prepare_export, DirectorySink, ExportVariant, ExportedFile, FileSink};
pub use studio::{LogoStudio, PendingGeneration};

const DRYRUN_CANVAS: u32 = 512;
const MAX_REQUEST_TIMEOUT_S: f64 = 3600.0;

/// One piece of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineData {
        mime_type: Option<String>,
        /// Base64 as sent on the wire.
        data: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderGenerateRequest {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
    pub request_timeout_s: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderGenerateResponse {
    pub parts: Vec<ContentPart>,
    pub provider_response: Map<String, Value>,
}

pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &ProviderGenerateRequest) -> Result<ProviderGenerateResponse>;
}

#[derive(Default)]
pub struct ImageProviderRegistry {
    providers: BTreeMap<String, Box<dyn ImageProvider>>,
}

impl ImageProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: ImageProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn take(&mut self, name: &str) -> Option<Box<dyn ImageProvider>> {
        self.providers.remove(name.trim())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

pub fn default_provider_registry() -> ImageProviderRegistry {
    let mut providers = ImageProviderRegistry::new();
    providers.register(DryrunProvider);
    providers.register(GeminiProvider::from_env());
    providers
}

/// Offline provider: a flat colored square on pure white, colored by the
/// prompt digest so different briefs give visibly different marks.
pub struct DryrunProvider;

impl ImageProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &ProviderGenerateRequest) -> Result<ProviderGenerateResponse> {
        let bytes = render_dryrun_mark(&request.prompt)?;
        Ok(ProviderGenerateResponse {
            parts: vec![
                ContentPart::Text("dryrun render".to_string()),
                ContentPart::InlineData {
                    mime_type: Some("image/png".to_string()),
                    data: BASE64.encode(bytes),
                },
            ],
            provider_response: map_object(json!({
                "status": "ok",
                "model": request.model,
                "aspect_ratio": request.aspect_ratio,
            })),
        })
    }
}

pub struct GeminiProvider {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn from_env() -> Self {
        let api_base = non_empty_env("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string());
        Self::new(
            api_base,
            non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY")),
        )
    }

    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.filter(|value| !value.trim().is_empty()),
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(request: &ProviderGenerateRequest) -> Value {
        let mut image_config = Map::new();
        let aspect_ratio = request.aspect_ratio.trim();
        if !aspect_ratio.is_empty() {
            image_config.insert(
                "aspectRatio".to_string(),
                Value::String(aspect_ratio.to_string()),
            );
        }
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": Value::Object(image_config),
            },
        })
    }

    fn post(&self, endpoint: &str, api_key: &str, payload: &Value, timeout_s: f64) -> Result<HttpResponse> {
        self.http
            .post(endpoint)
            .header("x-goog-api-key", api_key)
            .timeout(request_timeout(timeout_s))
            .json(payload)
            .send()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Gemini request failed ({endpoint})"))
    }

    /// Parts of the first candidate, in response order.
    fn extract_parts(response_payload: &Value) -> Vec<ContentPart> {
        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        parts
            .into_iter()
            .filter_map(|part| {
                if let Some(inline) = part
                    .get("inlineData")
                    .or_else(|| part.get("inline_data"))
                    .and_then(Value::as_object)
                {
                    let data = inline
                        .get("data")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let mime_type = inline
                        .get("mimeType")
                        .or_else(|| inline.get("mime_type"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    return Some(ContentPart::InlineData { mime_type, data });
                }
                part.get("text")
                    .and_then(Value::as_str)
                    .map(|text| ContentPart::Text(text.to_string()))
            })
            .collect()
    }
}

impl ImageProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &ProviderGenerateRequest) -> Result<ProviderGenerateResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("Gemini API key missing: set GEMINI_API_KEY or GOOGLE_API_KEY");
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);
        let response = self.post(&endpoint, api_key, &payload, request.request_timeout_s)?;
        let response_payload = response_json_or_error("Gemini", response)?;

        Ok(ProviderGenerateResponse {
            parts: Self::extract_parts(&response_payload),
            provider_response: map_object(json!({
                "candidates": response_payload
                    .get("candidates")
                    .and_then(Value::as_array)
                    .map(|rows| rows.len())
                    .unwrap_or(0),
                "usage_metadata": response_payload.get("usageMetadata").cloned().unwrap_or(Value::Null),
            })),
        })
    }
}

/// Turns a brand description into one image through an injected provider.
pub struct GenerationClient {
    provider: Box<dyn ImageProvider>,
    config: StudioConfig,
}

impl GenerationClient {
    pub fn new(provider: Box<dyn ImageProvider>, config: StudioConfig) -> Self {
        Self { provider, config }
    }

    /// Provider named by `config.provider`, taken from the default registry.
    pub fn from_config(config: StudioConfig) -> Result<Self> {
        let mut registry = default_provider_registry();
        let names = registry.names();
        let Some(provider) = registry.take(&config.provider) else {
            bail!(
                "unknown image provider '{}'; available: {}",
                config.provider,
                names.join(", ")
            );
        };
        Ok(Self::new(provider, config))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn generate(&self, description: &BrandDescription) -> Result<ImagePayload, LogoError> {
        description.validate()?;
        self.generate_from_prompt(&build_prompt(description))
    }

    /// Issues exactly one provider call. No retries.
    pub fn generate_from_prompt(&self, prompt: &str) -> Result<ImagePayload, LogoError> {
        let request = ProviderGenerateRequest {
            prompt: prompt.to_string(),
            model: self.config.model.clone(),
            aspect_ratio: self.config.aspect_ratio.clone(),
            request_timeout_s: self.config.request_timeout_s,
        };
        let response = self
            .provider
            .generate(&request)
            .map_err(|err| self.normalize_provider_error(&err))?;
        first_inline_image(&response.parts)
    }

    fn normalize_provider_error(&self, err: &anyhow::Error) -> LogoError {
        let message = error_chain_text(err, 512);
        if self.config.is_auth_failure(&message) {
            LogoError::Configuration(message)
        } else {
            LogoError::GenerationFailed(message)
        }
    }
}

/// Non-finite or out-of-range values fall back into `1s..=MAX_REQUEST_TIMEOUT_S`.
fn request_timeout(timeout_s: f64) -> Duration {
    let seconds = if timeout_s.is_finite() {
        timeout_s.clamp(1.0, MAX_REQUEST_TIMEOUT_S)
    } else {
        DEFAULT_REQUEST_TIMEOUT_S
    };
    Duration::from_secs_f64(seconds)
}

fn first_inline_image(parts: &[ContentPart]) -> Result<ImagePayload, LogoError> {
    let Some((mime_type, data)) = parts.iter().find_map(|part| match part {
        ContentPart::InlineData { mime_type, data } if !data.trim().is_empty() => {
            Some((mime_type.as_deref(), data.trim()))
        }
        _ => None,
    }) else {
        return Err(LogoError::NoImageProduced);
    };
    let bytes = BASE64.decode(data.as_bytes()).map_err(|err| {
        LogoError::GenerationFailed(format!("image payload was not valid base64: {err}"))
    })?;
    Ok(ImagePayload::new(bytes, mime_type))
}

pub fn prompt_digest(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

fn render_dryrun_mark(prompt: &str) -> Result<Vec<u8>> {
    let (r, g, b) = color_from_prompt(prompt);
    let mut image = RgbaImage::from_pixel(DRYRUN_CANVAS, DRYRUN_CANVAS, Rgba([255, 255, 255, 255]));
    let inset = DRYRUN_CANVAS / 4;
    for y in inset..DRYRUN_CANVAS - inset {
        for x in inset..DRYRUN_CANVAS - inset {
            image.put_pixel(x, y, Rgba([r, g, b, 255]));
        }
    }
    background::encode_png(&image).context("dryrun render failed")
}

/// Kept below 200 per channel so the mark never reads as background.
fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    (digest[0] % 200, digest[1] % 200, digest[2] % 200)
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

pub fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().map(|existing| existing == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};

    use super::{ContentPart, ImageProvider, ProviderGenerateRequest, ProviderGenerateResponse};

    /// Replays canned outcomes and counts calls.
    pub struct StubProvider {
        outcome: Box<dyn Fn() -> Result<Vec<ContentPart>> + Send + Sync>,
        pub calls: Arc<AtomicUsize>,
        pub prompts: Arc<Mutex<Vec<String>>>,
    }

    impl StubProvider {
        pub fn parts(parts: Vec<ContentPart>) -> Self {
            Self::with(move || Ok(parts.clone()))
        }

        pub fn failing(message: &'static str) -> Self {
            Self::with(move || Err(anyhow!(message)))
        }

        fn with(outcome: impl Fn() -> Result<Vec<ContentPart>> + Send + Sync + 'static) -> Self {
            Self {
                outcome: Box::new(outcome),
                calls: Arc::new(AtomicUsize::new(0)),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ImageProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn generate(&self, request: &ProviderGenerateRequest) -> Result<ProviderGenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(request.prompt.clone());
            }
            Ok(ProviderGenerateResponse {
                parts: (self.outcome)()?,
                ..ProviderGenerateResponse::default()
            })
        }
    }

    pub fn inline_png(bytes: &[u8]) -> ContentPart {
        use base64::Engine as _;
        ContentPart::InlineData {
            mime_type: Some("image/png".to_string()),
            data: super::BASE64.encode(bytes),
        }
    }
}
