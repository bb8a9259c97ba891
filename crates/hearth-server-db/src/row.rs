// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Column decoding shared by the repositories.

use chrono::{DateTime, Utc};
use hearth_server_auth::{EntityRef, EntityType};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::error::DbError;

pub(crate) fn uuid(row: &SqliteRow, column: &str) -> Result<Uuid, DbError> {
	let raw: String = row.try_get(column)?;
	Uuid::parse_str(&raw).map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

pub(crate) fn opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, DbError> {
	let raw: Option<String> = row.try_get(column)?;
	raw.map(|s| Uuid::parse_str(&s).map_err(|e| DbError::Internal(format!("Invalid {column}: {e}"))))
		.transpose()
}

pub(crate) fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, DbError> {
	let raw: String = row.try_get(column)?;
	parse_timestamp(&raw, column)
}

pub(crate) fn opt_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, DbError> {
	let raw: Option<String> = row.try_get(column)?;
	raw.map(|s| parse_timestamp(&s, column)).transpose()
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(raw)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

pub(crate) fn json(row: &SqliteRow, column: &str) -> Result<Option<serde_json::Value>, DbError> {
	let raw: Option<String> = row.try_get(column)?;
	Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
}

pub(crate) fn entity(row: &SqliteRow) -> Result<EntityRef, DbError> {
	let raw: String = row.try_get("entity_type")?;
	let entity_type: EntityType = raw.parse().map_err(DbError::Internal)?;
	Ok(EntityRef::new(entity_type, uuid(row, "entity_id")?))
}

/// Parse a TEXT enum column through its `FromStr`.
pub(crate) fn parsed<T>(row: &SqliteRow, column: &str) -> Result<T, DbError>
where
	T: std::str::FromStr<Err = String>,
{
	let raw: String = row.try_get(column)?;
	raw.parse().map_err(DbError::Internal)
}
