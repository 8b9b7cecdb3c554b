//! Portfolio Backend API
//!
//! A small REST service over a single-file document store: a public
//! project catalogue and contact intake, plus a JWT-authenticated admin
//! surface for content management and contact triage.

pub mod config;
pub mod error;
pub mod routes;
pub mod sanitize;
pub mod state;
pub mod token;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;
pub use token::TokenService;
