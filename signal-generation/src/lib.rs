// Signal Generation
// Indicator library, trigger filters and the short-setup generator

pub mod config;
pub mod filters;
pub mod generator;
pub mod indicators;

pub use config::SignalConfig;
pub use filters::{apply_all, Rejection, RejectionKind, TriggerFilter};
pub use generator::{ContextReading, ShortSignalGenerator};
