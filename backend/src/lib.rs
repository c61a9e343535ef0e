pub mod config;
pub mod error;
pub mod routes;
pub mod service;
pub mod store;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use routes::{api_router, app, AppState};
pub use service::TodoService;
pub use store::{MemoryStore, PostgrestStore, StoreError, TodoStore};
