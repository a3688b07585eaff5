//! The user-store seam.
//!
//! Route handlers talk to [`UserStore`] rather than to [`UserRepo`] directly so
//! the auth flow can run against an in-memory store in tests.

use async_trait::async_trait;
use vinxen_core::types::DbId;

use crate::models::user::{CreateUser, User};
use crate::repositories::UserRepo;
use crate::DbPool;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, sqlx::Error>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error>;
    async fn create(&self, input: &CreateUser) -> Result<User, sqlx::Error>;
}

/// [`UserStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, sqlx::Error> {
        UserRepo::find_by_id(&self.pool, id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        UserRepo::find_by_email(&self.pool, email).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        UserRepo::email_exists(&self.pool, email).await
    }

    async fn create(&self, input: &CreateUser) -> Result<User, sqlx::Error> {
        UserRepo::create(&self.pool, input).await
    }
}
