//! Database query functions for citizen reports.
//!
//! All queries use `query_raw_params()` / `exec_raw_params()` with `$N`
//! placeholders. Row fields are converted through the
//! `moosicbox_json_utils` `ToValue` helpers.

use std::fmt::Write as _;

use civic_lens_database_models::{NewReport, ReportQuery, ReportRow};
use civic_lens_report_models::ReportStatus;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Inserts a new report and returns the stored row.
///
/// The store assigns the id (UUID v4) and the creation timestamp
/// (`NOW()` on the database server, so timestamps stay monotonic per
/// store regardless of client clocks). New reports always start with
/// `status = 'todo'` and an empty upvote set.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_report(db: &dyn Database, report: &NewReport) -> Result<ReportRow, DbError> {
    let id = uuid::Uuid::new_v4().to_string();
    let status = ReportStatus::Todo.to_string();

    let rows = db
        .query_raw_params(
            "INSERT INTO reports (
                id, image_url, latitude, longitude, category,
                severity, description, created_at, user_id, status, upvotes
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, NOW(), $8, $9, '[]'
            )
            RETURNING created_at",
            &[
                DatabaseValue::String(id.clone()),
                DatabaseValue::String(report.image_url.clone()),
                DatabaseValue::Real64(report.location.latitude),
                DatabaseValue::Real64(report.location.longitude),
                DatabaseValue::String(report.category.clone()),
                DatabaseValue::String(report.severity.to_string()),
                DatabaseValue::String(report.description.clone()),
                DatabaseValue::String(report.user_id.clone()),
                DatabaseValue::String(status.clone()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to get created_at from insert".to_string(),
    })?;

    let created_at_naive: chrono::NaiveDateTime =
        row.to_value("created_at").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse created_at: {e}"),
        })?;
    let created_at =
        chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(created_at_naive, chrono::Utc);

    Ok(ReportRow {
        id,
        image_url: report.image_url.clone(),
        latitude: report.location.latitude,
        longitude: report.location.longitude,
        category: report.category.clone(),
        severity: report.severity.to_string(),
        description: report.description.clone(),
        created_at,
        user_id: report.user_id.clone(),
        status: Some(status),
        upvotes: Vec::new(),
    })
}

/// Fetches a single report by id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_report(db: &dyn Database, id: &str) -> Result<Option<ReportRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, image_url, latitude, longitude, category, severity,
                    description, created_at, user_id, status, upvotes
             FROM reports WHERE id = $1",
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    Ok(rows.first().map(row_to_report))
}

/// Fetches the raw stored upvote text for a report.
///
/// Returned verbatim so [`swap_report_upvotes`] can compare-and-swap
/// against the exact value that was read.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_report_upvotes(db: &dyn Database, id: &str) -> Result<Option<String>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT upvotes FROM reports WHERE id = $1",
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let upvotes: String = row.to_value("upvotes").unwrap_or_default();
    Ok(Some(upvotes))
}

/// Queries reports with optional filters, ordered by creation time
/// descending.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn query_reports(
    db: &dyn Database,
    query: &ReportQuery,
) -> Result<Vec<ReportRow>, DbError> {
    let mut sql = String::from(
        "SELECT id, image_url, latitude, longitude, category, severity,
                description, created_at, user_id, status, upvotes
         FROM reports WHERE 1=1",
    );

    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(user_id) = &query.user_id {
        write!(sql, " AND user_id = ${param_idx}").unwrap();
        params.push(DatabaseValue::String(user_id.clone()));
        param_idx += 1;
    }

    if !query.severities.is_empty() {
        sql.push_str(" AND severity IN (");
        for (i, severity) in query.severities.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            write!(sql, "${param_idx}").unwrap();
            params.push(DatabaseValue::String(severity.clone()));
            param_idx += 1;
        }
        sql.push(')');
    }

    sql.push_str(" ORDER BY created_at DESC");

    write!(sql, " LIMIT ${param_idx}").unwrap();
    params.push(DatabaseValue::Int64(i64::from(query.limit)));
    param_idx += 1;

    write!(sql, " OFFSET ${param_idx}").unwrap();
    params.push(DatabaseValue::Int64(i64::from(query.offset)));

    let rows = db.query_raw_params(&sql, &params).await?;

    Ok(rows.iter().map(row_to_report).collect())
}

/// Updates a report's triage status.
///
/// Returns `false` if no row with the given id exists. Any transition is
/// permitted; the caller enforces authorization.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_report_status(
    db: &dyn Database,
    id: &str,
    status: ReportStatus,
) -> Result<bool, DbError> {
    let affected = db
        .exec_raw_params(
            "UPDATE reports SET status = $2 WHERE id = $1",
            &[
                DatabaseValue::String(id.to_string()),
                DatabaseValue::String(status.to_string()),
            ],
        )
        .await?;

    Ok(affected > 0)
}

/// Compare-and-swaps a report's upvote set.
///
/// The update only applies while the stored text still equals `observed`
/// (the value previously read via [`get_report_upvotes`]). Returns `false`
/// when the guard missed because a concurrent toggle won the race; the
/// caller re-reads and retries.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation or serialization fails.
pub async fn swap_report_upvotes(
    db: &dyn Database,
    id: &str,
    observed: &str,
    next: &[String],
) -> Result<bool, DbError> {
    let serialized = serde_json::to_string(next).map_err(|e| DbError::Conversion {
        message: format!("Failed to serialize upvotes: {e}"),
    })?;

    let affected = db
        .exec_raw_params(
            "UPDATE reports SET upvotes = $3 WHERE id = $1 AND upvotes = $2",
            &[
                DatabaseValue::String(id.to_string()),
                DatabaseValue::String(observed.to_string()),
                DatabaseValue::String(serialized),
            ],
        )
        .await?;

    Ok(affected > 0)
}

/// Converts a database row to a [`ReportRow`].
fn row_to_report(row: &switchy_database::Row) -> ReportRow {
    let created_at_naive: chrono::NaiveDateTime = row.to_value("created_at").unwrap_or_default();
    let created_at =
        chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(created_at_naive, chrono::Utc);

    let upvotes_text: String = row.to_value("upvotes").unwrap_or_default();

    ReportRow {
        id: row.to_value("id").unwrap_or_default(),
        image_url: row.to_value("image_url").unwrap_or_default(),
        latitude: row.to_value("latitude").unwrap_or(0.0),
        longitude: row.to_value("longitude").unwrap_or(0.0),
        category: row.to_value("category").unwrap_or_default(),
        severity: row.to_value("severity").unwrap_or_default(),
        description: row.to_value("description").unwrap_or_default(),
        created_at,
        user_id: row.to_value("user_id").unwrap_or_default(),
        status: row.to_value("status").unwrap_or(None),
        upvotes: parse_upvotes(&upvotes_text),
    }
}

/// Parses the stored upvote JSON array, tolerating legacy rows with
/// missing or malformed text.
fn parse_upvotes(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    serde_json::from_str(text).unwrap_or_else(|e| {
        log::warn!("Malformed upvotes text, treating as empty: {e}");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upvote_array() {
        assert_eq!(
            parse_upvotes(r#"["userA", "userB"]"#),
            vec!["userA".to_string(), "userB".to_string()]
        );
    }

    #[test]
    fn parses_empty_and_malformed_upvotes() {
        assert!(parse_upvotes("").is_empty());
        assert!(parse_upvotes("[]").is_empty());
        assert!(parse_upvotes("not json").is_empty());
    }
}
