// Data Ingestion
// Concrete market data and news collaborators over public REST

pub mod connectors;

pub use connectors::{MexcClient, MexcConfig, NewsApiClient, NewsConfig, RateLimitGate};
