//! User-account backend: registration with media upload, login, JWT
//! access/refresh rotation and profile updates over HTTP.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod response;
pub mod state;
pub mod storage;
pub mod users;

pub use app::build_app;
pub use state::AppState;
