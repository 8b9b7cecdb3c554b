//! Embedded document-store subsystem for the portfolio backend.
//!
//! A single JSON file holds the `projects`, `contacts` and `users`
//! collections. Mutations are funneled through one writer task so they
//! apply one at a time, in submission order, and land on disk through an
//! atomic temp-file-then-rename replacement. On top of the store sit
//! typed per-collection repositories, a TTL/capacity-bounded response
//! cache, and a process-local login attempt tracker.

pub mod cache;
pub mod database;
pub mod error;
pub mod login_attempts;
pub mod models;
pub mod repository;

pub use cache::ResponseCache;
pub use database::{DatabaseContents, FileDatabase};
pub use error::{StoreError, StoreResult};
pub use login_attempts::{LockStatus, LoginAttemptTracker};
pub use models::{
    record_id, Contact, ContactStatus, Project, ProjectStatus, Role, StatusChange, User,
};
pub use repository::{ContactsRepository, ProjectsRepository, UsersRepository};
