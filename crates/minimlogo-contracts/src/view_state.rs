use serde::{Deserialize, Serialize};

use crate::brand::{BrandDescription, ColorPalette, LogoStyle};
use crate::error::LogoError;
use crate::history::{GeneratedAsset, History};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveTab {
    #[default]
    Create,
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    BrandName(String),
    Industry(String),
    Style(LogoStyle),
    Palette(ColorPalette),
    CustomDetails(String),
    Slogan(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    FormEdited(FormField),
    Submit,
    GenerationSucceeded(GeneratedAsset),
    GenerationFailed(String),
    ExportRequested { asset_id: String, transparent: bool },
    ExportSucceeded { file_name: String },
    ExportFailed(String),
    HistoryCleared,
    TabSelected(ActiveTab),
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEffect {
    None,
    /// Issue exactly one generation request for this snapshot of the form.
    Generate(BrandDescription),
    Recorded { asset_id: String },
    Export { asset_id: String, transparent: bool },
    Cleared { removed: usize },
}

/// Presentation state of the studio.
///
/// Only [`ViewState::apply`] mutates it, so every change corresponds to a
/// named user or system event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub form: BrandDescription,
    pub generating: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub active_tab: ActiveTab,
    pub history: History,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: ViewEvent) -> Result<ViewEffect, LogoError> {
        match event {
            ViewEvent::FormEdited(field) => {
                self.edit_form(field);
                Ok(ViewEffect::None)
            }
            ViewEvent::Submit => {
                if self.generating {
                    return Err(LogoError::GenerationInFlight);
                }
                if let Err(err) = self.form.validate() {
                    self.error = Some(err.user_message());
                    return Err(err);
                }
                self.generating = true;
                self.error = None;
                Ok(ViewEffect::Generate(self.form.clone()))
            }
            ViewEvent::GenerationSucceeded(asset) => {
                self.generating = false;
                let asset_id = self.history.push(asset)?.id.clone();
                Ok(ViewEffect::Recorded { asset_id })
            }
            ViewEvent::GenerationFailed(message) => {
                self.generating = false;
                self.error = Some(message);
                Ok(ViewEffect::None)
            }
            ViewEvent::ExportRequested {
                asset_id,
                transparent,
            } => {
                if self.history.get(&asset_id).is_none() {
                    return Err(LogoError::UnknownAsset(asset_id));
                }
                self.notice = None;
                Ok(ViewEffect::Export {
                    asset_id,
                    transparent,
                })
            }
            ViewEvent::ExportSucceeded { file_name } => {
                self.notice = Some(format!("Saved {file_name}"));
                Ok(ViewEffect::None)
            }
            ViewEvent::ExportFailed(message) => {
                self.notice = Some(message);
                Ok(ViewEffect::None)
            }
            ViewEvent::HistoryCleared => Ok(ViewEffect::Cleared {
                removed: self.history.clear(),
            }),
            ViewEvent::TabSelected(tab) => {
                self.active_tab = tab;
                Ok(ViewEffect::None)
            }
        }
    }

    fn edit_form(&mut self, field: FormField) {
        match field {
            FormField::BrandName(value) => self.form.brand_name = value,
            FormField::Industry(value) => self.form.industry = value,
            FormField::Style(value) => self.form.style = value,
            FormField::Palette(value) => self.form.palette = value,
            FormField::CustomDetails(value) => self.form.custom_details = value,
            FormField::Slogan(value) => {
                self.form.slogan = Some(value).filter(|value| !value.trim().is_empty())
            }
        }
    }
}
