//! Postgres access for the vinxen backend.
//!
//! - [`models`] -- row types and DTOs.
//! - [`repositories`] -- hand-written queries for the `users` table.
//! - [`store`] -- the [`store::UserStore`] seam handlers depend on.
//! - [`crud`] -- the generic CRUD generator used by scaffolded resources.

use sqlx::postgres::PgPoolOptions;

pub mod crud;
pub mod models;
pub mod repositories;
pub mod store;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run a trivial query to confirm the database answers.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
