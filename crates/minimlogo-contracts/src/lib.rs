pub mod brand;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod prompt;
pub mod view_state;

pub use brand::{BrandDescription, ColorPalette, LogoStyle};
pub use config::{StudioConfig, WhiteThreshold};
pub use error::LogoError;
pub use history::{GeneratedAsset, History, ImagePayload};
pub use prompt::build_prompt;
