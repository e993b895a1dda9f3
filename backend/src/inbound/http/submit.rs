//! Submission HTTP handlers.
//!
//! ```text
//! POST /api/submit        {"model_id":"gpt-4o","prompt_id":"p1","output":"..."}
//! POST /api/submit/batch  {"suite_version":"1.2","results":[{...},{...}]}
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::domain::ports::{
    BatchItemOutcome, BatchReceipt, SubmissionReceipt, SubmitBatchRequest, SubmitRequest,
};
use crate::domain::{Error, SubmissionDraft};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_metadata;

/// One model output for one prompt.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitRequestBody {
    #[schema(example = "gpt-4o")]
    pub model_id: String,
    #[schema(example = "reasoning-042")]
    pub prompt_id: String,
    /// Raw model output, at most 512 KiB.
    pub output: String,
    /// Free-form JSON object stored alongside the output.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl SubmitRequestBody {
    fn into_draft(self, index: Option<usize>) -> Result<SubmissionDraft, Error> {
        Ok(SubmissionDraft {
            metadata: parse_metadata(self.metadata, index)?,
            model_id: self.model_id,
            prompt_id: self.prompt_id,
            output: self.output,
        })
    }
}

/// A test-suite run: shared run context plus one entry per prompt.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct SubmitBatchRequestBody {
    pub suite_version: Option<String>,
    pub suite_hash: Option<String>,
    pub model_id: Option<String>,
    pub temperature: Option<f64>,
    pub seed: Option<i64>,
    #[schema(format = "date-time")]
    pub timestamp: Option<String>,
    /// Between 1 and 1000 submissions.
    pub results: Vec<SubmitRequestBody>,
}

impl SubmitBatchRequestBody {
    /// Run-level fields copied into each item's metadata.
    fn context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        let mut insert = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                context.insert(key.to_owned(), value);
            }
        };
        insert("suite_version", self.suite_version.clone().map(Value::from));
        insert("suite_hash", self.suite_hash.clone().map(Value::from));
        insert("model_id", self.model_id.clone().map(Value::from));
        insert("temperature", self.temperature.map(Value::from));
        insert("seed", self.seed.map(Value::from));
        insert("timestamp", self.timestamp.clone().map(Value::from));
        context
    }
}

/// Response payload for a stored submission.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitResponseBody {
    #[schema(example = "accepted")]
    pub status: String,
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(example = "sha256:a52dd81bfd5e4e66d96b9f598382f6cbf8c5c3897654e6ae9055e03620fcf38e")]
    pub hash: String,
}

impl From<SubmissionReceipt> for SubmitResponseBody {
    fn from(value: SubmissionReceipt) -> Self {
        Self {
            status: value.status.as_str().to_owned(),
            id: value.id.to_string(),
            hash: value.hash.to_string(),
        }
    }
}

/// Per-item batch outcome: either `id` and `hash`, or `error`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BatchItemBody {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(format = "uuid")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BatchItemOutcome> for BatchItemBody {
    fn from(value: BatchItemOutcome) -> Self {
        match value {
            BatchItemOutcome::Accepted { index, id, hash } => Self {
                index,
                id: Some(id.to_string()),
                hash: Some(hash.to_string()),
                error: None,
            },
            BatchItemOutcome::Rejected { index, error } => Self {
                index,
                id: None,
                hash: None,
                error: Some(error.to_string()),
            },
        }
    }
}

/// Response payload for a batch submission.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitBatchResponseBody {
    #[schema(example = "completed")]
    pub status: String,
    /// Items stored.
    pub submitted: usize,
    pub results: Vec<BatchItemBody>,
}

impl From<BatchReceipt> for SubmitBatchResponseBody {
    fn from(value: BatchReceipt) -> Self {
        Self {
            status: value.status.as_str().to_owned(),
            submitted: value.submitted,
            results: value.results.into_iter().map(BatchItemBody::from).collect(),
        }
    }
}

/// Store one model output.
///
/// Anonymous submissions are accepted; a bearer token attributes the
/// submission to its user.
#[utoipa::path(
    post,
    path = "/api/submit",
    request_body = SubmitRequestBody,
    responses(
        (status = 200, description = "Submission stored", body = SubmitResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid bearer token", body = ErrorSchema),
        (status = 429, description = "Rate limit exceeded", body = ErrorSchema),
        (status = 503, description = "Object storage unavailable", body = ErrorSchema)
    ),
    tags = ["submissions"],
    operation_id = "submit",
    security((), ("BearerToken" = []))
)]
#[post("/submit")]
pub async fn submit(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<SubmitRequestBody>,
) -> ApiResult<HttpResponse> {
    let draft = payload.into_inner().into_draft(None)?;
    let receipt = state
        .submissions
        .submit(SubmitRequest {
            submitter: caller.into_submitter(),
            draft,
        })
        .await?;
    Ok(HttpResponse::Ok().json(SubmitResponseBody::from(receipt)))
}

/// Store every valid item of a suite run as one batch file.
///
/// Invalid items are reported per index and do not block the rest; the batch
/// status is `partial` when any item was rejected.
#[utoipa::path(
    post,
    path = "/api/submit/batch",
    request_body = SubmitBatchRequestBody,
    responses(
        (status = 200, description = "Batch processed", body = SubmitBatchResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid bearer token", body = ErrorSchema),
        (status = 429, description = "Rate limit exceeded", body = ErrorSchema),
        (status = 503, description = "Object storage unavailable", body = ErrorSchema)
    ),
    tags = ["submissions"],
    operation_id = "submitBatch",
    security((), ("BearerToken" = []))
)]
#[post("/submit/batch")]
pub async fn submit_batch(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<SubmitBatchRequestBody>,
) -> ApiResult<HttpResponse> {
    let mut body = payload.into_inner();
    let context = body.context();
    let items = std::mem::take(&mut body.results)
        .into_iter()
        .enumerate()
        .map(|(index, item)| item.into_draft(Some(index)))
        .collect::<Result<Vec<_>, _>>()?;
    let receipt = state
        .submissions
        .submit_batch(SubmitBatchRequest {
            submitter: caller.into_submitter(),
            context,
            items,
        })
        .await?;
    Ok(HttpResponse::Ok().json(SubmitBatchResponseBody::from(receipt)))
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
