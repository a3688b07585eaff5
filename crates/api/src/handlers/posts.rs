//! Handlers for `/api/posts`, the CRUD scaffolding over [`Crud<Post>`].
//!
//! Reads are public. Writes need an authenticated user, and updates and
//! deletes are limited to the post's author.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::Value;
use vinxen_core::error::CoreError;
use vinxen_core::pagination::{OrderBy, Paginated, PaginationOptions, SortDirection};
use vinxen_core::types::DbId;
use vinxen_core::validation::validate_id;
use vinxen_db::crud::{Crud, Fields};
use vinxen_db::models::post::Post;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::middleware::auth::{ensure_owner, AuthUser};
use crate::response::{created, ok, ApiJson};
use crate::state::AppState;

/// Query string for `GET /api/posts`.
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Column to order by (default `id`).
    pub sort: Option<String>,
    pub order: Option<SortDirection>,
    pub author_id: Option<DbId>,
    pub published: Option<bool>,
}

impl ListPostsQuery {
    fn pagination(&self) -> PaginationOptions {
        let order_by = match &self.sort {
            Some(column) => vec![OrderBy::new(column.clone(), self.order.unwrap_or_default())],
            None => Vec::new(),
        };
        PaginationOptions {
            page: self.page,
            limit: self.limit,
            order_by,
        }
    }

    fn filter(&self) -> Fields {
        let mut filter = Fields::new();
        if let Some(author_id) = self.author_id {
            filter.insert("author_id".into(), author_id.into());
        }
        if let Some(published) = self.published {
            filter.insert("published".into(), published.into());
        }
        filter
    }
}

fn crud(state: &AppState) -> Crud<Post> {
    Crud::new(state.pool.clone())
}

async fn load(crud: &Crud<Post>, id: DbId) -> AppResult<Post> {
    crud.find_by_id(validate_id(id)?)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Post", id }))
}

/// Build a URL slug from a title: lowercase ASCII alphanumerics joined by `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// GET /api/posts
pub async fn list(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListPostsQuery>, AppError>,
) -> AppResult<ApiJson<Paginated<Post>>> {
    let page = crud(&state)
        .find_many(&query.pagination(), &query.filter())
        .await?;
    Ok(ok(page))
}

/// GET /api/posts/{id}
pub async fn get(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<DbId>, AppError>,
) -> AppResult<ApiJson<Post>> {
    Ok(ok(load(&crud(&state), id).await?))
}

/// POST /api/posts
///
/// The author is always the caller. A missing slug is derived from the title.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(mut fields): AppJson<Fields>,
) -> AppResult<(StatusCode, ApiJson<Post>)> {
    fields.insert("author_id".into(), user.user_id.into());

    if !fields.contains_key("slug") {
        let slug = fields
            .get("title")
            .and_then(Value::as_str)
            .map(slugify)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("A post needs a title or a slug".into()))?;
        fields.insert("slug".into(), slug.into());
    }

    let post = crud(&state).create(&fields).await?;
    tracing::info!(post_id = post.id, user_id = user.user_id, "Post created");
    Ok(created(post))
}

/// PATCH /api/posts/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<DbId>, AppError>,
    AppJson(mut fields): AppJson<Fields>,
) -> AppResult<ApiJson<Post>> {
    let crud = crud(&state);
    let existing = load(&crud, id).await?;
    ensure_owner(existing.author_id, &user)?;

    // Posts cannot change hands.
    fields.remove("author_id");

    let post = crud
        .update(id, &fields)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Post", id }))?;
    Ok(ok(post))
}

/// DELETE /api/posts/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<DbId>, AppError>,
) -> AppResult<ApiJson<Post>> {
    let crud = crud(&state);
    let existing = load(&crud, id).await?;
    ensure_owner(existing.author_id, &user)?;

    let post = crud
        .delete(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Post", id }))?;
    tracing::info!(post_id = id, user_id = user.user_id, "Post deleted");
    Ok(ok(post))
}
