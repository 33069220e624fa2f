//! Process-wide stores mirroring backend state.
//!
//! Each store is built once by the application bootstrap and shared by `Arc`.
//! Reads are synchronous snapshots or `watch` receivers; remote operations
//! are async.

pub mod about;
pub mod config;
pub mod session;
pub mod task_status;

pub use about::{AboutStore, is_newer_release};
pub use config::{ConfigStore, ConfigView};
pub use session::{MIN_PASSWORD_LEN, SessionStore};
pub use task_status::TaskStatusMonitor;
