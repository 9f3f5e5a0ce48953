use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;

use minimlogo_contracts::events::{EventLog, EventPayload};
use minimlogo_contracts::view_state::{ActiveTab, FormField, ViewEffect, ViewEvent, ViewState};
use minimlogo_contracts::{
    build_prompt, BrandDescription, GeneratedAsset, History, ImagePayload, LogoError,
    WhiteThreshold,
};
use serde_json::{json, Map, Value};

use crate::export::{prepare_export, ExportVariant, FileSink};
use crate::{error_chain_text, prompt_digest, GenerationClient};

const MIN_ID_PREFIX: usize = 4;

/// A submission that passed validation and is waiting on the image service.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingGeneration {
    pub request: BrandDescription,
    pub prompt: String,
}

/// One interactive session: form, history and exports around a client.
pub struct LogoStudio {
    client: Arc<GenerationClient>,
    state: ViewState,
    events: EventLog,
    threshold: WhiteThreshold,
    log_failures: Cell<u64>,
}

impl LogoStudio {
    pub fn new(client: GenerationClient, events: EventLog) -> Self {
        let threshold = client.config().white_threshold;
        let studio = Self {
            client: Arc::new(client),
            state: ViewState::new(),
            events,
            threshold,
            log_failures: Cell::new(0),
        };
        studio.log(
            "session_started",
            json!({
                "provider": studio.client.provider_name(),
                "model": studio.client.config().model,
                "white_threshold": threshold.value(),
            }),
        );
        studio
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.state.history
    }

    /// Shared handle so a front-end can run the call off its input thread.
    pub fn client(&self) -> Arc<GenerationClient> {
        Arc::clone(&self.client)
    }

    pub fn threshold(&self) -> WhiteThreshold {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: WhiteThreshold) {
        self.threshold = threshold;
    }

    pub fn edit(&mut self, field: FormField) -> Result<(), LogoError> {
        self.state.apply(ViewEvent::FormEdited(field)).map(|_| ())
    }

    pub fn select_tab(&mut self, tab: ActiveTab) -> Result<(), LogoError> {
        self.state.apply(ViewEvent::TabSelected(tab)).map(|_| ())
    }

    /// Validates the form and marks the studio as generating.
    pub fn begin_submit(&mut self) -> Result<PendingGeneration, LogoError> {
        let request = match self.state.apply(ViewEvent::Submit) {
            Ok(ViewEffect::Generate(request)) => request,
            Ok(other) => {
                return Err(LogoError::Other(format!(
                    "unexpected submit transition: {other:?}"
                )))
            }
            Err(err) => {
                if let LogoError::Validation { field, .. } = &err {
                    self.log(
                        "validation_failed",
                        json!({ "field": field, "message": err.user_message() }),
                    );
                }
                return Err(err);
            }
        };
        let prompt = build_prompt(&request);
        self.log(
            "generation_started",
            json!({
                "brand_name": request.brand_name,
                "style": request.style.label(),
                "palette": request.palette.label(),
                "prompt_sha256": prompt_digest(&prompt),
            }),
        );
        Ok(PendingGeneration { request, prompt })
    }

    /// Records the outcome of a pending generation.
    pub fn complete_submit(
        &mut self,
        pending: PendingGeneration,
        outcome: Result<ImagePayload, LogoError>,
    ) -> Result<&GeneratedAsset, LogoError> {
        let image = match outcome {
            Ok(image) => image,
            Err(err) => {
                self.state
                    .apply(ViewEvent::GenerationFailed(err.user_message()))?;
                self.log(
                    "generation_failed",
                    json!({
                        "brand_name": pending.request.brand_name,
                        "kind": err.kind(),
                        "message": err.to_string(),
                    }),
                );
                return Err(err);
            }
        };

        let asset = GeneratedAsset::new(pending.request, pending.prompt, image);
        let payload = json!({
            "asset_id": asset.id,
            "brand_name": asset.request.brand_name,
            "mime_type": asset.image.mime_type,
            "bytes": asset.image.bytes.len(),
        });
        let asset_id = match self.state.apply(ViewEvent::GenerationSucceeded(asset))? {
            ViewEffect::Recorded { asset_id } => asset_id,
            other => {
                return Err(LogoError::Other(format!(
                    "unexpected record transition: {other:?}"
                )))
            }
        };
        self.log("generation_succeeded", payload);
        self.state
            .history
            .get(&asset_id)
            .ok_or(LogoError::UnknownAsset(asset_id))
    }

    /// Validate, generate and record in one blocking call.
    pub fn submit(&mut self) -> Result<&GeneratedAsset, LogoError> {
        let pending = self.begin_submit()?;
        let outcome = self.client.generate_from_prompt(&pending.prompt);
        self.complete_submit(pending, outcome)
    }

    /// Resolves a 1-based history position, a full id, or a unique id
    /// prefix of at least `MIN_ID_PREFIX` characters.
    ///
    /// Positions win over ids, and a short target such as `2` is never
    /// matched against id prefixes.
    pub fn resolve_asset(&self, target: &str) -> Option<&GeneratedAsset> {
        let target = target.trim();
        if target.is_empty() {
            return self.state.history.latest();
        }
        if let Some(asset) = target
            .parse::<usize>()
            .ok()
            .and_then(|position| position.checked_sub(1))
            .and_then(|index| self.state.history.at(index))
        {
            return Some(asset);
        }
        if let Some(asset) = self.state.history.get(target) {
            return Some(asset);
        }
        if target.len() < MIN_ID_PREFIX {
            return None;
        }
        let mut matches = self
            .state
            .history
            .iter()
            .filter(|asset| asset.id.starts_with(target));
        match (matches.next(), matches.next()) {
            (Some(asset), None) => Some(asset),
            _ => None,
        }
    }

    /// Prepares and saves one export. Failures become a notice; history is
    /// left as it was.
    pub fn export(
        &mut self,
        asset_id: &str,
        variant: ExportVariant,
        sink: &dyn FileSink,
    ) -> Result<PathBuf, LogoError> {
        self.state.apply(ViewEvent::ExportRequested {
            asset_id: asset_id.to_string(),
            transparent: variant.is_transparent(),
        })?;
        let asset = self
            .state
            .history
            .get(asset_id)
            .cloned()
            .ok_or_else(|| LogoError::UnknownAsset(asset_id.to_string()))?;

        let saved = prepare_export(&asset, variant, self.threshold).and_then(|file| {
            sink.save(&file.bytes, &file.file_name, file.mime_type)
                .map(|path| (file.file_name.clone(), path))
                .map_err(|err| {
                    LogoError::export(
                        file.file_name.clone(),
                        LogoError::Other(error_chain_text(&err, 512)),
                    )
                })
        });

        match saved {
            Ok((file_name, path)) => {
                self.state
                    .apply(ViewEvent::ExportSucceeded { file_name })?;
                self.log(
                    "export_written",
                    json!({
                        "asset_id": asset.id,
                        "variant": variant.label(),
                        "path": path.to_string_lossy(),
                    }),
                );
                Ok(path)
            }
            Err(err) => {
                self.state
                    .apply(ViewEvent::ExportFailed(err.user_message()))?;
                self.log(
                    "export_failed",
                    json!({
                        "asset_id": asset.id,
                        "variant": variant.label(),
                        "message": err.to_string(),
                    }),
                );
                Err(err)
            }
        }
    }

    pub fn clear_history(&mut self) -> Result<usize, LogoError> {
        let removed = match self.state.apply(ViewEvent::HistoryCleared)? {
            ViewEffect::Cleared { removed } => removed,
            _ => 0,
        };
        self.log("history_cleared", json!({ "removed": removed }));
        Ok(removed)
    }

    /// Events that could not be written to the log this session.
    pub fn event_log_failures(&self) -> u64 {
        self.log_failures.get()
    }

    // A broken log file never fails a studio action. The first write
    // failure is reported on stderr, later ones are only counted.
    fn log(&self, event_type: &str, payload: Value) {
        let payload: EventPayload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Err(err) = self.events.emit(event_type, payload) {
            let failures = self.log_failures.get() + 1;
            self.log_failures.set(failures);
            if failures == 1 {
                let path = self
                    .events
                    .path()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                eprintln!("minimlogo warning: event log {path} is not writable: {err:#}");
            }
        }
    }
}
