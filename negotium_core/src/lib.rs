pub mod api;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod session;
pub mod traits;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{NetworkError, ProtocolError, SessionError, ValidationError};
pub use session::SessionController;
pub use traits::{AnalysisClient, NegotiationClient};
