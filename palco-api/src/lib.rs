pub mod auth;
pub mod http;
pub mod state;
pub mod ws;

pub use auth::{IdentityProvider, JwtIdentity};
pub use http::{create_router, AppError, AppResult};
pub use state::AppState;
