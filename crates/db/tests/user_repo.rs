//! Integration tests for the `users` repository and the Postgres user store.

use sqlx::PgPool;
use vinxen_db::models::user::CreateUser;
use vinxen_db::repositories::UserRepo;
use vinxen_db::store::{PgUserStore, UserStore};

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        name: "Site Lead".to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn create_and_find_user(pool: PgPool) {
    let created = UserRepo::create(&pool, &new_user("lead@site.test"))
        .await
        .expect("insert should succeed");

    let by_id = UserRepo::find_by_id(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(by_id.email, "lead@site.test");

    let by_email = UserRepo::find_by_email(&pool, "lead@site.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, created.id);
    assert_eq!(by_email.to_public().name, "Site Lead");
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_email_violates_unique_constraint(pool: PgPool) {
    UserRepo::create(&pool, &new_user("dup@site.test")).await.unwrap();
    let err = UserRepo::create(&pool, &new_user("dup@site.test"))
        .await
        .expect_err("second insert must fail");

    match err {
        sqlx::Error::Database(db_err) => {
            assert_eq!(db_err.code().as_deref(), Some("23505"));
            assert_eq!(db_err.constraint(), Some("uq_users_email"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn store_reports_existing_email(pool: PgPool) {
    let store = PgUserStore::new(pool.clone());
    assert!(!store.email_exists("new@site.test").await.unwrap());

    store.create(&new_user("new@site.test")).await.unwrap();
    assert!(store.email_exists("new@site.test").await.unwrap());
    assert!(store.find_by_email("other@site.test").await.unwrap().is_none());
}
