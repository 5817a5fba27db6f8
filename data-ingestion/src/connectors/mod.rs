pub mod mexc;
pub mod newsapi;

pub use mexc::{MexcClient, MexcConfig};
pub use newsapi::{NewsApiClient, NewsConfig, RateLimitGate};
