//! Client-side mirror of an embykit backend: settings, session, version info
//! and background-task status, each loaded at most once concurrently and
//! shared by every consumer in the process.

pub mod api;
pub mod binder;
pub mod client;
pub mod error;
pub mod navigation;
pub mod resource;
pub mod settings;
pub mod store;

pub use error::{SyncError, SyncResult};
pub use navigation::{NavigationDecision, NavigationGate, Route, RouteTable};
pub use resource::RemoteResource;
pub use settings::{ConfigSnapshot, SettingValue};
pub use store::{AboutStore, ConfigStore, SessionStore, TaskStatusMonitor};
