//! Application state wiring.

use std::sync::Arc;

use chrono::Utc;

use portfolio_store::{
    record_id, ContactsRepository, FileDatabase, LoginAttemptTracker, ProjectsRepository,
    ResponseCache, Role, User, UsersRepository,
};

use crate::config::Config;
use crate::error::ApiError;
use crate::token::TokenService;

/// Bcrypt cost factor for admin provisioning
const BCRYPT_COST: u32 = 10;

/// Everything the route handlers need, built once at startup.
pub struct AppState {
    pub config: Config,
    pub projects: ProjectsRepository,
    pub contacts: ContactsRepository,
    pub users: UsersRepository,
    pub cache: ResponseCache,
    pub login_attempts: LoginAttemptTracker,
    pub tokens: TokenService,
}

impl AppState {
    /// Open the document store, provision the admin account and wire
    /// every component.
    pub async fn new(config: Config) -> Result<Arc<Self>, ApiError> {
        let db = FileDatabase::open(&config.data_file);
        db.ensure().await?;

        let state = Arc::new(Self {
            projects: ProjectsRepository::new(db.clone()),
            contacts: ContactsRepository::new(db.clone()),
            users: UsersRepository::new(db),
            cache: ResponseCache::new(config.cache_max_entries),
            login_attempts: LoginAttemptTracker::new(
                config.login_max_attempts,
                config.login_lock_window,
            ),
            tokens: TokenService::new(&config.jwt_secret, config.jwt_ttl_minutes),
            config,
        });

        state.ensure_admin_user().await?;
        Ok(state)
    }

    /// Idempotent admin provisioning: re-running with unchanged
    /// credentials leaves the stored record exactly as it was, including
    /// its update timestamp and password hash.
    async fn ensure_admin_user(&self) -> Result<(), ApiError> {
        let email = self.config.admin_email.trim().to_lowercase();
        let password = self.config.admin_password.clone();
        let password_hash = bcrypt::hash(&password, BCRYPT_COST)
            .map_err(|err| ApiError::Internal(err.to_string()))?;

        let lookup = email.clone();
        self.users
            .upsert_by_email(&lookup, move |current| match current {
                Some(user)
                    if user.role == Role::Admin
                        && user.email == email
                        && bcrypt::verify(&password, &user.password_hash).unwrap_or(false) =>
                {
                    user
                }
                Some(user) => User {
                    email,
                    password_hash,
                    role: Role::Admin,
                    updated_at: Utc::now(),
                    ..user
                },
                None => {
                    let now = Utc::now();
                    User {
                        id: record_id("user"),
                        email,
                        password_hash,
                        role: Role::Admin,
                        created_at: now,
                        updated_at: now,
                    }
                }
            })
            .await?;

        Ok(())
    }
}
