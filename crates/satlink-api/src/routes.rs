//! Telemetry query handlers
//!
//! `GET /telemetry/satellite` and `GET /telemetry/satellite/:id`, with
//! optional `start`/`end` RFC3339 bounds on the received timestamp.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use tokio_postgres::types::ToSql;

pub type AppState = Pool;

#[derive(Serialize)]
pub struct TelemetryRow {
    pub id: i64,
    pub received_at: DateTime<Utc>,
    pub satellite_id: i64,
    pub temperature: f32,
    pub battery_voltage: f32,
    pub altitude: f32,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}

/// Build the SELECT with placeholders numbered in push order:
/// satellite id first, then start, then end
fn build_query(has_satellite: bool, has_start: bool, has_end: bool) -> String {
    let mut sql = String::from(
        "SELECT id, received_at, satellite_id, temperature, battery_voltage, altitude \
         FROM telemetry WHERE 1=1",
    );
    let mut n = 0;
    if has_satellite {
        n += 1;
        sql.push_str(&format!(" AND satellite_id = ${}", n));
    }
    if has_start {
        n += 1;
        sql.push_str(&format!(" AND received_at >= ${}", n));
    }
    if has_end {
        n += 1;
        sql.push_str(&format!(" AND received_at <= ${}", n));
    }
    sql.push_str(" ORDER BY id");
    sql
}

async fn query_telemetry(
    pool: &Pool,
    satellite_id: Option<i64>,
    range: &RangeQuery,
) -> Result<Json<Vec<TelemetryRow>>, ApiError> {
    let start = match &range.start {
        Some(s) => Some(parse_time(s).map_err(|_| bad_request("Invalid start time"))?),
        None => None,
    };
    let end = match &range.end {
        Some(s) => Some(parse_time(s).map_err(|_| bad_request("Invalid end time"))?),
        None => None,
    };

    let sql = build_query(satellite_id.is_some(), start.is_some(), end.is_some());
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
    if let Some(ref id) = satellite_id {
        params.push(id);
    }
    if let Some(ref ts) = start {
        params.push(ts);
    }
    if let Some(ref ts) = end {
        params.push(ts);
    }

    let client = pool.get().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to get database connection");
        internal_error()
    })?;

    let rows = client.query(sql.as_str(), &params).await.map_err(|e| {
        tracing::error!(error = %e, "Telemetry query failed");
        internal_error()
    })?;

    let records = rows
        .iter()
        .map(|row| TelemetryRow {
            id: row.get("id"),
            received_at: row.get("received_at"),
            satellite_id: row.get("satellite_id"),
            temperature: row.get("temperature"),
            battery_voltage: row.get("battery_voltage"),
            altitude: row.get("altitude"),
        })
        .collect();

    Ok(Json(records))
}

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Failed to retrieve records".into(),
        }),
    )
}

pub async fn get_telemetry(
    State(pool): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<TelemetryRow>>, ApiError> {
    query_telemetry(&pool, None, &range).await
}

pub async fn get_telemetry_for_satellite(
    State(pool): State<AppState>,
    Path(id): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<TelemetryRow>>, ApiError> {
    let satellite_id: i64 = id.parse().map_err(|_| bad_request("Invalid satellite ID"))?;
    query_telemetry(&pool, Some(satellite_id), &range).await
}
