//! Bearer-token authentication for HTTP handlers.
//!
//! Handlers take a [`Caller`] argument instead of reading headers. A request
//! without an `Authorization` header is anonymous; a header that is present
//! must carry a bearer token the [`TokenVerifier`](crate::domain::ports::TokenVerifier)
//! accepts.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::domain::ports::TokenVerifierError;
use crate::domain::{Error, Submitter, UserId};
use crate::inbound::http::state::HttpState;

const BEARER: &str = "bearer";

/// The identity behind the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(Submitter);

impl Caller {
    pub fn submitter(&self) -> &Submitter {
        &self.0
    }

    pub fn into_submitter(self) -> Submitter {
        self.0
    }

    /// Require an authenticated user or fail with `401 Unauthorized`.
    pub fn require_user(self) -> Result<UserId, Error> {
        match self.0 {
            Submitter::User(user) => Ok(user),
            Submitter::Anonymous => Err(Error::unauthorized("authentication required")),
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; anything other than a
/// non-empty bearer token is rejected.
fn bearer_token(header: &str) -> Result<&str, Error> {
    let malformed = || Error::unauthorized("authorization header must be a bearer token");
    let (scheme, token) = header.trim().split_once(' ').ok_or_else(malformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case(BEARER) || token.is_empty() {
        return Err(malformed());
    }
    Ok(token)
}

fn map_verifier_error(err: TokenVerifierError) -> Error {
    match err {
        TokenVerifierError::Rejected => Error::unauthorized("invalid or expired token"),
        TokenVerifierError::Unavailable { message } => {
            warn!(error = %message, "token verifier unavailable");
            Error::service_unavailable("authentication is temporarily unavailable")
        }
    }
}

impl FromRequest for Caller {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .map(|value| value.to_str().map(str::to_owned));
        let verifier = req
            .app_data::<web::Data<HttpState>>()
            .map(|state| state.tokens.clone());

        Box::pin(async move {
            let Some(header) = header else {
                return Ok(Caller(Submitter::Anonymous));
            };
            let header = header
                .map_err(|_| Error::unauthorized("authorization header must be a bearer token"))?;
            let token = bearer_token(&header)?;
            let verifier =
                verifier.ok_or_else(|| Error::internal("HTTP state is not configured"))?;
            let user = verifier.verify(token).await.map_err(map_verifier_error)?;
            debug!(user = %user, "request authenticated");
            Ok(Caller(Submitter::User(user)))
        })
    }
}
