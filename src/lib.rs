pub mod api {
    pub mod handler;
    pub mod model;
}
pub mod config;
pub mod db {
    pub mod entity;
    pub mod repo;
}
pub mod error;
pub mod service;
pub mod util;

// Re-export AppState for convenience
pub use crate::config::app_config::{AccountConfig, AppState};
pub use crate::db::entity::token::{Token, TokenPurpose};
pub use crate::db::entity::user::{Account, AccountStatus};
pub use crate::error::error_model::{AccountError, PersistenceError, StatusReason};
