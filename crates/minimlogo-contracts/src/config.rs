use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";
pub const DEFAULT_REQUEST_TIMEOUT_S: f64 = 90.0;
pub const DEFAULT_AUTH_INDICATORS: &[&str] = &["api key", "unauthenticated", "permission_denied"];

/// Per-channel brightness cutoff for background removal.
///
/// A pixel is background when all of red, green and blue are strictly
/// greater than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhiteThreshold(pub u8);

impl WhiteThreshold {
    pub const DEFAULT: WhiteThreshold = WhiteThreshold(248);

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_background(self, red: u8, green: u8, blue: u8) -> bool {
        red > self.0 && green > self.0 && blue > self.0
    }
}

impl Default for WhiteThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for WhiteThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WhiteThreshold {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<u8>()
            .map(WhiteThreshold)
            .map_err(|_| format!("white threshold must be 0-255, got '{}'", raw.trim()))
    }
}

/// Runtime settings for a studio session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    pub provider: String,
    pub model: String,
    pub aspect_ratio: String,
    pub request_timeout_s: f64,
    pub white_threshold: WhiteThreshold,
    /// Substrings that mark a provider failure as a credentials problem.
    /// Matched case-insensitively against the whole error chain.
    pub auth_indicators: Vec<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            request_timeout_s: DEFAULT_REQUEST_TIMEOUT_S,
            white_threshold: WhiteThreshold::DEFAULT,
            auth_indicators: DEFAULT_AUTH_INDICATORS
                .iter()
                .map(|value| value.to_string())
                .collect(),
        }
    }
}

impl StudioConfig {
    /// Defaults overlaid with `MINIMLOGO_*` environment variables.
    /// Values that do not parse are ignored.
    pub fn from_env() -> Self {
        Self::default().with_lookup(non_empty_env)
    }

    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(provider) = lookup("MINIMLOGO_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = lookup("MINIMLOGO_MODEL") {
            self.model = model;
        }
        if let Some(ratio) = lookup("MINIMLOGO_ASPECT_RATIO") {
            self.aspect_ratio = ratio;
        }
        if let Some(timeout) = lookup("MINIMLOGO_REQUEST_TIMEOUT")
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value > 0.0)
        {
            self.request_timeout_s = timeout;
        }
        if let Some(threshold) =
            lookup("MINIMLOGO_WHITE_THRESHOLD").and_then(|raw| raw.parse::<WhiteThreshold>().ok())
        {
            self.white_threshold = threshold;
        }
        if let Some(raw) = lookup("MINIMLOGO_AUTH_INDICATORS") {
            let indicators = parse_indicator_list(&raw);
            if !indicators.is_empty() {
                self.auth_indicators = indicators;
            }
        }
        self
    }

    pub fn is_auth_failure(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.auth_indicators
            .iter()
            .map(|indicator| indicator.trim().to_lowercase())
            .filter(|indicator| !indicator.is_empty())
            .any(|indicator| lowered.contains(&indicator))
    }
}

pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_indicator_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{StudioConfig, WhiteThreshold};

    #[test]
    fn threshold_comparison_is_strict() {
        let threshold = WhiteThreshold(240);
        assert!(threshold.is_background(241, 241, 241));
        assert!(!threshold.is_background(240, 255, 255));
        assert!(!threshold.is_background(255, 255, 240));
        assert_eq!(WhiteThreshold::default().value(), 248);
    }

    #[test]
    fn env_overrides_apply_and_invalid_values_are_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MINIMLOGO_PROVIDER", "dryrun"),
            ("MINIMLOGO_WHITE_THRESHOLD", "240"),
            ("MINIMLOGO_REQUEST_TIMEOUT", "not-a-number"),
            ("MINIMLOGO_AUTH_INDICATORS", "invalid key, ,forbidden"),
        ]);
        let config = StudioConfig::default()
            .with_lookup(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config.provider, "dryrun");
        assert_eq!(config.white_threshold, WhiteThreshold(240));
        assert_eq!(config.request_timeout_s, 90.0);
        assert_eq!(config.auth_indicators, vec!["invalid key", "forbidden"]);
        assert_eq!(config.model, "gemini-2.5-flash-image");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!("256".parse::<WhiteThreshold>().is_err());
        assert_eq!("  245 ".parse::<WhiteThreshold>(), Ok(WhiteThreshold(245)));
    }

    #[test]
    fn auth_failure_detection_is_case_insensitive() {
        let config = StudioConfig::default();
        assert!(config.is_auth_failure("Gemini request failed (400): API key not valid."));
        assert!(config.is_auth_failure("status: PERMISSION_DENIED"));
        assert!(!config.is_auth_failure("Gemini request failed (500): internal"));
    }
}
