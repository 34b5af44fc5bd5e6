pub mod account_state;
pub mod auth_service;
pub mod email;
pub mod throttle;
pub mod token_service;
pub mod user_service;
