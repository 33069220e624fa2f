pub mod backend;
pub mod config;
#[cfg(feature = "client")]
pub mod http;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod types;

pub use backend::Backend;
pub use config::{ClientConfig, normalize_base_url};
#[cfg(feature = "client")]
pub use http::HttpBackend;
pub use types::{AuthPhase, Credentials, SessionState};
