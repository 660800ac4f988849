pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod media;
pub mod membership;
pub mod models;
pub mod security;
pub mod service;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
