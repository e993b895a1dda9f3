//! Crowd statistics HTTP handlers.
//!
//! ```text
//! GET /api/data/chart?start_date=2025-01-01&end_date=2025-01-31&models=gpt-4o,claude-3
//! ```

use actix_web::{HttpResponse, get, web};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::ChartRequest;
use crate::domain::{ChartReport, ChartRow, DateRange, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, date_range_error, parse_model_filter, parse_optional_date,
};

/// Days before `end_date` covered when `start_date` is omitted.
pub const DEFAULT_CHART_DAYS: u64 = 30;

/// Query parameters for the submissions chart.
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChartQuery {
    /// First day, `YYYY-MM-DD`. Defaults to 30 days before `end_date`.
    pub start_date: Option<String>,
    /// Last day, `YYYY-MM-DD`. Defaults to today (UTC).
    pub end_date: Option<String>,
    /// Comma-separated model ids to count.
    pub models: Option<String>,
}

/// Response payload for the submissions chart.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChartResponseBody {
    /// One entry per day: `{"date": "2025-01-01", "<model>": <count>, ...}`.
    /// A model whose id is literally `date` is counted in `models` and
    /// `total_submissions` but has no per-day entry.
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Map<String, Value>>,
    /// Every model seen in range, regardless of the filter.
    pub models: Vec<String>,
    pub total_submissions: u64,
    /// Some files were not scanned because a listing cap was reached.
    pub truncated: bool,
}

const DATE_FIELD: &str = "date";

fn chart_row(row: ChartRow) -> Map<String, Value> {
    let mut entry = Map::with_capacity(row.counts.len() + 1);
    entry.insert(
        DATE_FIELD.to_owned(),
        Value::from(row.date.format("%Y-%m-%d").to_string()),
    );
    for (model, count) in row.counts {
        if model == DATE_FIELD {
            continue;
        }
        entry.insert(model, Value::from(count));
    }
    entry
}

impl From<ChartReport> for ChartResponseBody {
    fn from(value: ChartReport) -> Self {
        Self {
            data: value.rows.into_iter().map(chart_row).collect(),
            models: value.models,
            total_submissions: value.total_submissions,
            truncated: value.truncated,
        }
    }
}

fn resolve_range(query: &ChartQuery, today: NaiveDate, max_days: u32) -> Result<DateRange, Error> {
    let end = parse_optional_date(query.end_date.as_deref(), FieldName::new("end_date"))?
        .unwrap_or(today);
    let start_date =
        parse_optional_date(query.start_date.as_deref(), FieldName::new("start_date"))?;
    let start = match start_date {
        Some(start) => start,
        None => end
            .checked_sub_days(Days::new(DEFAULT_CHART_DAYS))
            .ok_or_else(|| Error::invalid_request("end_date is out of range"))?,
    };
    DateRange::new(start, end, max_days).map_err(|err| date_range_error(&err))
}

/// Daily submission counts per model.
///
/// Aggregates over every stored submission in range, anonymous ones
/// included. Rows are ordered by date; days without submissions are omitted.
#[utoipa::path(
    get,
    path = "/api/data/chart",
    params(ChartQuery),
    responses(
        (status = 200, description = "Chart data", body = ChartResponseBody),
        (status = 400, description = "Invalid date range", body = ErrorSchema),
        (status = 429, description = "Rate limit exceeded", body = ErrorSchema),
        (status = 503, description = "Object storage unavailable", body = ErrorSchema)
    ),
    tags = ["data"],
    operation_id = "chart",
    security([])
)]
#[get("/data/chart")]
pub async fn chart(
    state: web::Data<HttpState>,
    query: web::Query<ChartQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let today = state.clock.utc().date_naive();
    let range = resolve_range(&query, today, state.max_range_days)?;
    let report = state
        .stats
        .chart(ChartRequest {
            range,
            models: parse_model_filter(query.models.as_deref()),
        })
        .await?;
    Ok(HttpResponse::Ok().json(ChartResponseBody::from(report)))
}
