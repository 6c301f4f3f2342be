pub mod catalog;
pub mod config;
pub mod errors;
pub mod intent;
pub mod responder;
pub mod variant;

pub use catalog::{
    CatalogError, CompanyProfile, QuickActionMenu, Reply, ResponseCatalog, TemplateSet,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{ApplicationError, InterfaceError};
pub use intent::{Intent, KeywordSet, KeywordTable, UnknownIntent};
pub use responder::{InboundMessage, Responder, SendAction};
pub use variant::{FixedPicker, SequencePicker, ThreadRngPicker, VariantPicker};
