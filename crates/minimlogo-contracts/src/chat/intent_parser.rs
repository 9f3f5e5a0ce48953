use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{CommandSpec, EXPORT_COMMAND, FORM_FIELD_COMMANDS, NO_ARG_COMMANDS};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    /// Creative direction carried by a bare (non-slash) line.
    pub details: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            details: None,
            command_args: BTreeMap::new(),
        }
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args.get(key).and_then(Value::as_str)
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn is_variant_word(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "white" | "transparent" | "both"
    )
}

/// Parses `/export [target] [white|transparent|both]` in either order.
fn parse_export_args(arg: &str) -> (String, String) {
    let mut target: Option<String> = None;
    let mut variant: Option<String> = None;
    for part in split_args(arg) {
        if variant.is_none() && is_variant_word(&part) {
            variant = Some(part.to_ascii_lowercase());
        } else if target.is_none() {
            target = Some(part);
        }
    }
    (
        target.unwrap_or_else(|| "1".to_string()),
        variant.unwrap_or_else(|| "white".to_string()),
    )
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, FORM_FIELD_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert("value".to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            if command == EXPORT_COMMAND.command {
                let (target, variant) = parse_export_args(arg);
                let mut intent = Intent::new(EXPORT_COMMAND.action, text);
                intent
                    .command_args
                    .insert("target".to_string(), Value::String(target));
                intent
                    .command_args
                    .insert("variant".to_string(), Value::String(variant));
                return intent;
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("generate", text);
    intent.details = Some(raw_trimmed.to_string());
    intent
}
