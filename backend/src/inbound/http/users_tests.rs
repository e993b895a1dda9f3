//! Tests for per-user HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, test as actix_test};
use chrono::{TimeZone, Utc};
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    MockDataRightsCommand, MockSubmissionStatsQuery, MockTokenVerifier, TokenVerifierError,
};
use crate::inbound::http::state::HttpStatePorts;

const TOKEN: &str = "Bearer alice-token";

fn alice() -> UserId {
    UserId::new("alice").expect("valid user")
}

fn tokens() -> MockTokenVerifier {
    let mut tokens = MockTokenVerifier::new();
    tokens.expect_verify().returning(|token| match token {
        "alice-token" => Ok(alice()),
        _ => Err(TokenVerifierError::rejected()),
    });
    tokens
}

fn test_app(
    ports: HttpStatePorts,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = HttpState::new(HttpStatePorts {
        tokens: Arc::new(tokens()),
        ..ports
    });
    App::new().app_data(web::Data::new(state)).service(
        web::scope("/api")
            .service(current_user_stats)
            .service(delete_current_user_data),
    )
}

#[rstest]
#[actix_web::test]
async fn stats_report_the_callers_submissions() {
    let mut stats = MockSubmissionStatsQuery::new();
    stats
        .expect_user_stats()
        .withf(|user| user.as_ref() == "alice")
        .times(1)
        .returning(|user| {
            Ok(UserStats {
                user_id: user.clone(),
                total_submissions: 3,
                models: vec!["claude-3".to_owned(), "gpt-4o".to_owned()],
                last_submission: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).single(),
                truncated: false,
            })
        });
    let app = actix_test::init_service(test_app(HttpStatePorts {
        stats: Arc::new(stats),
        ..HttpStatePorts::default()
    }))
    .await;

    let request = actix_test::TestRequest::get()
        .uri("/api/user/me/stats")
        .insert_header((AUTHORIZATION, TOKEN))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
        Some(PRIVATE_NO_STORE)
    );
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body,
        json!({
            "user_id": "alice",
            "total_submissions": 3,
            "models_tested": ["claude-3", "gpt-4o"],
            "models_count": 2,
            "last_submission": "2025-01-02T03:04:05+00:00",
            "truncated": false
        })
    );
}

#[rstest]
#[case::stats(actix_test::TestRequest::get().uri("/api/user/me/stats"))]
#[case::delete(actix_test::TestRequest::delete().uri("/api/user/me"))]
#[actix_web::test]
async fn anonymous_callers_are_unauthorised(#[case] request: actix_test::TestRequest) {
    let mut stats = MockSubmissionStatsQuery::new();
    stats.expect_user_stats().never();
    let mut data_rights = MockDataRightsCommand::new();
    data_rights.expect_erase().never();
    let app = actix_test::init_service(test_app(HttpStatePorts {
        stats: Arc::new(stats),
        data_rights: Arc::new(data_rights),
        ..HttpStatePorts::default()
    }))
    .await;

    let response = actix_test::call_service(&app, request.to_request()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case("/api/user/me", DataRightsAction::Deleted, "All your data has been permanently deleted")]
#[case(
    "/api/user/me?anonymize_only=true",
    DataRightsAction::Anonymized,
    "Your submissions are now anonymous but still contribute to crowd statistics"
)]
#[actix_web::test]
async fn delete_dispatches_on_anonymize_only(
    #[case] uri: &str,
    #[case] action: DataRightsAction,
    #[case] message: &str,
) {
    let outcome = DataRightsOutcome {
        action,
        files_affected: 4,
        files_failed: 1,
        truncated: false,
    };
    let mut data_rights = MockDataRightsCommand::new();
    match action {
        DataRightsAction::Deleted => {
            data_rights
                .expect_erase()
                .times(1)
                .returning(move |_| Ok(outcome));
            data_rights.expect_anonymize().never();
        }
        DataRightsAction::Anonymized => {
            data_rights
                .expect_anonymize()
                .times(1)
                .returning(move |_| Ok(outcome));
            data_rights.expect_erase().never();
        }
    }
    let app = actix_test::init_service(test_app(HttpStatePorts {
        data_rights: Arc::new(data_rights),
        ..HttpStatePorts::default()
    }))
    .await;

    let request = actix_test::TestRequest::delete()
        .uri(uri)
        .insert_header((AUTHORIZATION, TOKEN))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: DeleteAccountResponseBody = actix_test::read_body_json(response).await;
    assert_eq!(body.status, action.as_str());
    assert_eq!(body.user_id, "alice");
    assert_eq!(body.files_affected, 4);
    assert_eq!(body.files_failed, 1);
    assert_eq!(body.message, message);
}

#[rstest]
#[actix_web::test]
async fn storage_outage_surfaces_as_503() {
    let mut data_rights = MockDataRightsCommand::new();
    data_rights
        .expect_erase()
        .returning(|_| {
            Err(crate::domain::Error::service_unavailable(
                "object storage is unavailable",
            ))
        });
    let app = actix_test::init_service(test_app(HttpStatePorts {
        data_rights: Arc::new(data_rights),
        ..HttpStatePorts::default()
    }))
    .await;

    let request = actix_test::TestRequest::delete()
        .uri("/api/user/me")
        .insert_header((AUTHORIZATION, TOKEN))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
