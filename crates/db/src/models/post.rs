//! Post entity, served through the generic CRUD generator.

use serde::{Deserialize, Serialize};
use vinxen_core::types::{DbId, Timestamp};

use crate::crud::CrudModel;

/// A row from the `posts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: DbId,
    pub title: String,
    pub content: Option<String>,
    pub published: bool,
    pub slug: String,
    pub author_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CrudModel for Post {
    const ENTITY: &'static str = "Post";
    const TABLE: &'static str = "posts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "content",
        "published",
        "slug",
        "author_id",
        "created_at",
        "updated_at",
    ];
    const WRITABLE: &'static [&'static str] =
        &["title", "content", "published", "slug", "author_id"];
}
