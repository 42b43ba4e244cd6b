pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod translate;
pub mod upstream;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use logging::SharedLogger;
pub use server::{build_router, AppState};
pub use upstream::{UpstreamClient, UpstreamSettings};
