//! Generic CRUD generator.
//!
//! [`Crud<M>`] provides the standard create / read / update / delete / upsert
//! and bulk operations for any table described by a [`CrudModel`]. Inputs are
//! JSON field maps so callers can send partial rows.
//!
//! Column names are only ever taken from the model's static allow-lists and
//! are quoted before being spliced into SQL. Values are never interpolated:
//! each input map is bound as a single `jsonb` parameter and expanded with
//! `jsonb_populate_record(NULL::<table>, $n)`, so Postgres performs the type
//! conversion against the real column types.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::types::Json;
use vinxen_core::pagination::{sanitize_pagination, Paginated, PaginationMeta, PaginationOptions};
use vinxen_core::types::DbId;

use crate::DbPool;

/// A partial row: column name to JSON value.
pub type Fields = serde_json::Map<String, Value>;

/// Static description of a table served by [`Crud`].
pub trait CrudModel: DeserializeOwned + Send + Unpin + 'static {
    /// Human-readable entity name used in errors (e.g. `"Post"`).
    const ENTITY: &'static str;
    /// Table name. Must also be the name of the row's composite type.
    const TABLE: &'static str;
    /// Every column, usable for filtering and ordering.
    const COLUMNS: &'static [&'static str];
    /// Columns callers may write through create/update/upsert.
    const WRITABLE: &'static [&'static str];
    /// Primary key column.
    const ID_COLUMN: &'static str = "id";
}

#[derive(Debug, thiserror::Error)]
pub enum CrudError {
    #[error("Unknown or read-only column `{column}` for {entity}")]
    UnknownColumn {
        entity: &'static str,
        column: String,
    },

    #[error("No fields supplied for {0}")]
    EmptyInput(&'static str),

    #[error("Rows in a bulk insert must all supply the same fields")]
    MismatchedRows,

    #[error("Failed to decode {entity} row: {source}")]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Count of rows touched by a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BatchCount {
    pub count: u64,
}

/// CRUD operations over the table described by `M`.
pub struct Crud<M> {
    pool: DbPool,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Crud<M> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: CrudModel> Crud<M> {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            _model: PhantomData,
        }
    }

    /// Insert one row built from `data`, returning it.
    pub async fn create(&self, data: &Fields) -> Result<M, CrudError> {
        let cols = writable_columns::<M>(data)?;
        let sql = format!(
            "WITH affected AS (
                INSERT INTO {table} ({list})
                SELECT {picked} FROM jsonb_populate_record(NULL::{table}, $1) AS r
                RETURNING *
             )
             SELECT to_jsonb(affected) FROM affected",
            table = M::TABLE,
            list = column_list(&cols),
            picked = prefixed_list("r", &cols),
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(as_doc(data))
            .fetch_one(&self.pool)
            .await?;
        decode::<M>(row)
    }

    /// Fetch one row by primary key.
    pub async fn find_by_id(&self, id: DbId) -> Result<Option<M>, CrudError> {
        let sql = format!(
            "SELECT to_jsonb(t) FROM {table} AS t WHERE t.{id_col} = $1",
            table = M::TABLE,
            id_col = quote(M::ID_COLUMN),
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode::<M>).transpose()
    }

    /// Fetch one page of rows matching `filter` (column equality).
    ///
    /// Pagination is sanitized first: `page >= 1`, `1 <= limit <= 100`.
    pub async fn find_many(
        &self,
        options: &PaginationOptions,
        filter: &Fields,
    ) -> Result<Paginated<M>, CrudError> {
        let pagination = sanitize_pagination(options);
        let condition = where_clause::<M>("t", "f", filter)?;

        let mut order_terms = Vec::with_capacity(pagination.order_by.len());
        for term in &pagination.order_by {
            let col = known_column::<M>(&term.column, M::COLUMNS)?;
            order_terms.push(format!("t.{} {}", quote(col), term.direction.as_sql()));
        }

        let list_sql = format!(
            "SELECT to_jsonb(t) FROM {table} AS t, jsonb_populate_record(NULL::{table}, $1) AS f
             WHERE {condition}
             ORDER BY {order}
             LIMIT $2 OFFSET $3",
            table = M::TABLE,
            order = order_terms.join(", "),
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM {table} AS t, jsonb_populate_record(NULL::{table}, $1) AS f
             WHERE {condition}",
            table = M::TABLE,
        );

        let rows = sqlx::query_scalar::<_, Value>(&list_sql)
            .bind(as_doc(filter))
            .bind(pagination.limit)
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(as_doc(filter))
            .fetch_one(&self.pool)
            .await?;

        let data = rows
            .into_iter()
            .map(decode::<M>)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            data,
            meta: PaginationMeta::new(pagination.page, pagination.limit, total),
        })
    }

    /// Apply `data` to the row with `id`. Returns `None` if no such row exists.
    pub async fn update(&self, id: DbId, data: &Fields) -> Result<Option<M>, CrudError> {
        let cols = writable_columns::<M>(data)?;
        let sql = format!(
            "WITH affected AS (
                UPDATE {table} AS t SET {assignments}
                FROM jsonb_populate_record(NULL::{table}, $2) AS r
                WHERE t.{id_col} = $1
                RETURNING t.*
             )
             SELECT to_jsonb(affected) FROM affected",
            table = M::TABLE,
            assignments = assignments("r", &cols),
            id_col = quote(M::ID_COLUMN),
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .bind(as_doc(data))
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode::<M>).transpose()
    }

    /// Delete the row with `id`, returning it. `None` if it did not exist.
    pub async fn delete(&self, id: DbId) -> Result<Option<M>, CrudError> {
        let sql = format!(
            "WITH affected AS (
                DELETE FROM {table} AS t WHERE t.{id_col} = $1 RETURNING t.*
             )
             SELECT to_jsonb(affected) FROM affected",
            table = M::TABLE,
            id_col = quote(M::ID_COLUMN),
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode::<M>).transpose()
    }

    /// Insert `create` (merged with the `unique` key fields) or, when a row
    /// with the same unique key exists, apply `update` to it.
    ///
    /// The keys of `unique` must match a unique constraint on the table.
    pub async fn upsert(
        &self,
        unique: &Fields,
        create: &Fields,
        update: &Fields,
    ) -> Result<M, CrudError> {
        if unique.is_empty() {
            return Err(CrudError::EmptyInput(M::ENTITY));
        }
        let conflict = checked_columns::<M>(unique.keys(), M::WRITABLE)?;

        let mut insert_doc = create.clone();
        for (k, v) in unique {
            insert_doc.insert(k.clone(), v.clone());
        }
        let insert_cols = writable_columns::<M>(&insert_doc)?;

        let update_cols = checked_columns::<M>(update.keys(), M::WRITABLE)?;
        let on_conflict = if update_cols.is_empty() {
            // A no-op assignment so RETURNING still yields the existing row.
            let col = quote(conflict[0]);
            format!("{col} = EXCLUDED.{col}")
        } else {
            update_cols
                .iter()
                .map(|c| {
                    format!(
                        "{col} = (SELECT u.{col} FROM jsonb_populate_record(NULL::{table}, $2) AS u)",
                        col = quote(c),
                        table = M::TABLE,
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let sql = format!(
            "WITH affected AS (
                INSERT INTO {table} AS t ({list})
                SELECT {picked} FROM jsonb_populate_record(NULL::{table}, $1) AS r
                ON CONFLICT ({conflict}) DO UPDATE SET {on_conflict}
                RETURNING t.*
             )
             SELECT to_jsonb(affected) FROM affected",
            table = M::TABLE,
            list = column_list(&insert_cols),
            picked = prefixed_list("r", &insert_cols),
            conflict = column_list(&conflict),
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(as_doc(&insert_doc))
            .bind(as_doc(update))
            .fetch_one(&self.pool)
            .await?;
        decode::<M>(row)
    }

    /// Insert many rows at once. Every row must supply the same fields.
    pub async fn create_many(&self, rows: &[Fields]) -> Result<BatchCount, CrudError> {
        let Some(first) = rows.first() else {
            return Ok(BatchCount { count: 0 });
        };
        let cols = writable_columns::<M>(first)?;
        let same_shape = rows
            .iter()
            .all(|row| row.len() == cols.len() && cols.iter().all(|c| row.contains_key(*c)));
        if !same_shape {
            return Err(CrudError::MismatchedRows);
        }

        let sql = format!(
            "INSERT INTO {table} ({list})
             SELECT {picked} FROM jsonb_populate_recordset(NULL::{table}, $1) AS r",
            table = M::TABLE,
            list = column_list(&cols),
            picked = prefixed_list("r", &cols),
        );
        let docs: Vec<Value> = rows.iter().cloned().map(Value::Object).collect();
        let result = sqlx::query(&sql)
            .bind(Json(Value::Array(docs)))
            .execute(&self.pool)
            .await?;
        Ok(BatchCount {
            count: result.rows_affected(),
        })
    }

    /// Apply `data` to every row matching `filter`.
    pub async fn update_many(&self, filter: &Fields, data: &Fields) -> Result<BatchCount, CrudError> {
        let cols = writable_columns::<M>(data)?;
        let condition = where_clause::<M>("t", "f", filter)?;
        let sql = format!(
            "UPDATE {table} AS t SET {assignments}
             FROM jsonb_populate_record(NULL::{table}, $1) AS r,
                  jsonb_populate_record(NULL::{table}, $2) AS f
             WHERE {condition}",
            table = M::TABLE,
            assignments = assignments("r", &cols),
        );
        let result = sqlx::query(&sql)
            .bind(as_doc(data))
            .bind(as_doc(filter))
            .execute(&self.pool)
            .await?;
        Ok(BatchCount {
            count: result.rows_affected(),
        })
    }

    /// Delete every row matching `filter`. An empty filter deletes all rows.
    pub async fn delete_many(&self, filter: &Fields) -> Result<BatchCount, CrudError> {
        let condition = where_clause::<M>("t", "f", filter)?;
        let sql = format!(
            "DELETE FROM {table} AS t
             USING jsonb_populate_record(NULL::{table}, $1) AS f
             WHERE {condition}",
            table = M::TABLE,
        );
        let result = sqlx::query(&sql)
            .bind(as_doc(filter))
            .execute(&self.pool)
            .await?;
        Ok(BatchCount {
            count: result.rows_affected(),
        })
    }
}

// ---------------------------------------------------------------------------
// SQL assembly helpers
// ---------------------------------------------------------------------------

fn quote(column: &str) -> String {
    format!("\"{column}\"")
}

fn column_list(cols: &[&str]) -> String {
    cols.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ")
}

fn prefixed_list(alias: &str, cols: &[&str]) -> String {
    cols.iter()
        .map(|c| format!("{alias}.{}", quote(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn assignments(alias: &str, cols: &[&str]) -> String {
    cols.iter()
        .map(|c| format!("{col} = {alias}.{col}", col = quote(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve `name` against an allow-list, returning the static column name.
fn known_column<M: CrudModel>(
    name: &str,
    allowed: &'static [&'static str],
) -> Result<&'static str, CrudError> {
    allowed
        .iter()
        .copied()
        .find(|c| *c == name)
        .ok_or_else(|| CrudError::UnknownColumn {
            entity: M::ENTITY,
            column: name.to_string(),
        })
}

fn checked_columns<'a, M: CrudModel>(
    names: impl Iterator<Item = &'a String>,
    allowed: &'static [&'static str],
) -> Result<Vec<&'static str>, CrudError> {
    names.map(|n| known_column::<M>(n, allowed)).collect()
}

/// Writable columns named by `data`; rejects empty input.
fn writable_columns<M: CrudModel>(data: &Fields) -> Result<Vec<&'static str>, CrudError> {
    if data.is_empty() {
        return Err(CrudError::EmptyInput(M::ENTITY));
    }
    checked_columns::<M>(data.keys(), M::WRITABLE)
}

/// Equality conditions joining `row` against the populated `filter` record.
fn where_clause<M: CrudModel>(row: &str, filter_alias: &str, filter: &Fields) -> Result<String, CrudError> {
    let mut terms = Vec::with_capacity(filter.len());
    for (name, value) in filter {
        let col = quote(known_column::<M>(name, M::COLUMNS)?);
        if value.is_null() {
            terms.push(format!("{row}.{col} IS NULL"));
        } else {
            terms.push(format!("{row}.{col} = {filter_alias}.{col}"));
        }
    }
    if terms.is_empty() {
        Ok("TRUE".to_string())
    } else {
        Ok(terms.join(" AND "))
    }
}

fn as_doc(fields: &Fields) -> Json<Value> {
    Json(Value::Object(fields.clone()))
}

fn decode<M: CrudModel>(row: Value) -> Result<M, CrudError> {
    serde_json::from_value(row).map_err(|source| CrudError::Decode {
        entity: M::ENTITY,
        source,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::models::post::Post;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn where_clause_is_true_for_empty_filter() {
        let clause = where_clause::<Post>("t", "f", &Fields::new()).unwrap();
        assert_eq!(clause, "TRUE");
    }

    #[test]
    fn where_clause_handles_null_values() {
        let clause =
            where_clause::<Post>("t", "f", &fields(json!({ "content": null }))).unwrap();
        assert_eq!(clause, "t.\"content\" IS NULL");
    }

    #[test]
    fn where_clause_rejects_unknown_column() {
        let err = where_clause::<Post>("t", "f", &fields(json!({ "1=1; --": 1 }))).unwrap_err();
        assert_matches!(err, CrudError::UnknownColumn { column, .. } if column == "1=1; --");
    }

    #[test]
    fn read_only_columns_are_not_writable() {
        let err = writable_columns::<Post>(&fields(json!({ "id": 5 }))).unwrap_err();
        assert_matches!(err, CrudError::UnknownColumn { .. });
    }

    #[test]
    fn empty_writes_are_rejected() {
        let err = writable_columns::<Post>(&Fields::new()).unwrap_err();
        assert_matches!(err, CrudError::EmptyInput("Post"));
    }

    #[test]
    fn assignments_reference_populated_record() {
        assert_eq!(
            assignments("r", &["title", "published"]),
            "\"title\" = r.\"title\", \"published\" = r.\"published\""
        );
    }
}
