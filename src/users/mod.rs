use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use memory::InMemoryUserStore;
pub use repo::{PgUserStore, UserStore};
pub use repo_types::{NewUser, PublicUser, User, UserChanges};

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
