//! Per-user HTTP handlers: personal statistics and data-rights requests.
//!
//! ```text
//! GET    /api/user/me/stats
//! DELETE /api/user/me?anonymize_only=true
//! ```
//!
//! Both endpoints require a bearer token; the caller can only see or act on
//! their own submissions.

use actix_web::http::header;
use actix_web::{HttpResponse, delete, get, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{DataRightsAction, DataRightsOutcome};
use crate::domain::{UserId, UserStats};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Personal data must not be stored by shared caches.
const PRIVATE_NO_STORE: &str = "private, no-store";

/// Response payload for a user's submission statistics.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UserStatsResponseBody {
    pub user_id: String,
    pub total_submissions: u64,
    pub models_tested: Vec<String>,
    pub models_count: usize,
    #[schema(format = "date-time")]
    pub last_submission: Option<String>,
    /// The listing cap was reached; some files were not scanned.
    pub truncated: bool,
}

impl From<UserStats> for UserStatsResponseBody {
    fn from(value: UserStats) -> Self {
        Self {
            models_count: value.models_count(),
            user_id: value.user_id.to_string(),
            total_submissions: value.total_submissions,
            models_tested: value.models,
            last_submission: value.last_submission.map(|at| at.to_rfc3339()),
            truncated: value.truncated,
        }
    }
}

/// Query parameters for `DELETE /api/user/me`.
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteAccountQuery {
    /// Keep submissions in crowd statistics but detach them from the user.
    #[serde(default)]
    pub anonymize_only: bool,
}

/// Response payload for a data-rights request.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DeleteAccountResponseBody {
    #[schema(example = "deleted")]
    pub status: String,
    pub user_id: String,
    pub files_affected: usize,
    pub files_failed: usize,
    /// Some files may remain because the listing cap was reached.
    pub truncated: bool,
    pub message: String,
}

fn outcome_message(action: DataRightsAction) -> &'static str {
    match action {
        DataRightsAction::Deleted => "All your data has been permanently deleted",
        DataRightsAction::Anonymized => {
            "Your submissions are now anonymous but still contribute to crowd statistics"
        }
    }
}

impl DeleteAccountResponseBody {
    fn new(user: &UserId, outcome: DataRightsOutcome) -> Self {
        Self {
            status: outcome.action.as_str().to_owned(),
            user_id: user.to_string(),
            files_affected: outcome.files_affected,
            files_failed: outcome.files_failed,
            truncated: outcome.truncated,
            message: outcome_message(outcome.action).to_owned(),
        }
    }
}

/// Submission statistics for the authenticated user.
#[utoipa::path(
    get,
    path = "/api/user/me/stats",
    responses(
        (status = 200, description = "User statistics", body = UserStatsResponseBody),
        (status = 401, description = "Authentication required", body = ErrorSchema),
        (status = 429, description = "Rate limit exceeded", body = ErrorSchema),
        (status = 503, description = "Object storage unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUserStats",
    security(("BearerToken" = []))
)]
#[get("/user/me/stats")]
pub async fn current_user_stats(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<HttpResponse> {
    let user = caller.require_user()?;
    let stats = state.stats.user_stats(&user).await?;
    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, PRIVATE_NO_STORE))
        .json(UserStatsResponseBody::from(stats)))
}

/// Delete or anonymise every submission of the authenticated user.
///
/// With `anonymize_only=true` the submissions move to the anonymous partition
/// and keep counting towards crowd statistics; otherwise they are deleted.
/// A user with no stored submissions gets a successful response with
/// `files_affected = 0`.
#[utoipa::path(
    delete,
    path = "/api/user/me",
    params(DeleteAccountQuery),
    responses(
        (status = 200, description = "Data-rights request completed", body = DeleteAccountResponseBody),
        (status = 401, description = "Authentication required", body = ErrorSchema),
        (status = 429, description = "Rate limit exceeded", body = ErrorSchema),
        (status = 503, description = "Object storage unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "deleteCurrentUserData",
    security(("BearerToken" = []))
)]
#[delete("/user/me")]
pub async fn delete_current_user_data(
    state: web::Data<HttpState>,
    caller: Caller,
    query: web::Query<DeleteAccountQuery>,
) -> ApiResult<HttpResponse> {
    let user = caller.require_user()?;
    let outcome = if query.anonymize_only {
        state.data_rights.anonymize(&user).await?
    } else {
        state.data_rights.erase(&user).await?
    };
    info!(
        user = %user,
        action = outcome.action.as_str(),
        files_affected = outcome.files_affected,
        files_failed = outcome.files_failed,
        "data-rights request completed"
    );
    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, PRIVATE_NO_STORE))
        .json(DeleteAccountResponseBody::new(&user, outcome)))
}

#[cfg(test)]
#[path = "users_tests.rs"]
mod tests;
