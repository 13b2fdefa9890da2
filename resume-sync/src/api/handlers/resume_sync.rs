//! The HubSpot webhook receiver.
//!
//! A delivery is rejected as a whole only when the caller is not authorized, the HubSpot token
//! is not configured, or the body does not decode. Past that point the response is always 200 and
//! each event's outcome is reported in its own result record.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::{info, instrument};

use crate::{
    AppState,
    api::models::{events::parse_events, results::SyncResponse},
    errors::{Error, Result},
    sync::EventDispatcher,
};

/// Header names the shared secret is accepted under (matched case-insensitively).
pub const API_KEY_HEADERS: [&str; 2] = ["resume-sync-api-key", "resume_sync_api_key"];

/// Marks a base64-encoded body.
pub const TRANSFER_ENCODING_HEADER: &str = "content-transfer-encoding";

const INVALID_PAYLOAD: &str = "Invalid JSON payload";

/// `POST /resume-sync`
#[instrument(skip_all, fields(body_len = body.len()))]
pub async fn resume_sync(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<SyncResponse>> {
    authorize(state.config.api_key.as_deref(), &headers)?;

    let hubspot_token = state
        .config
        .hubspot
        .access_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Configuration {
            message: "Missing HUBSPOT_PRIVATE_APP_TOKEN".to_string(),
        })?;

    let body = decode_body(&headers, body)?;
    let events = parse_events(&body).map_err(|_| Error::BadRequest {
        message: INVALID_PAYLOAD.to_string(),
    })?;

    if events.is_empty() {
        return Ok(Json(SyncResponse::no_events()));
    }

    info!(count = events.len(), "Processing webhook delivery");
    let dispatcher = EventDispatcher::from_config(&state.config, state.http.clone(), state.no_redirect.clone(), hubspot_token);
    let results = dispatcher.process_events(&events).await;

    Ok(Json(SyncResponse::Results { results }))
}

/// Any other method on the webhook path.
pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        return Err(Error::Unauthenticated {
            message: "Missing RESUME_SYNC_API_KEY configuration".to_string(),
        });
    };

    let provided = API_KEY_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match provided {
        None => Err(Error::Unauthenticated {
            message: "Missing RESUME_SYNC_API_KEY header".to_string(),
        }),
        Some(key) if key != expected => Err(Error::Unauthenticated {
            message: "Invalid API key".to_string(),
        }),
        Some(_) => Ok(()),
    }
}

fn decode_body(headers: &HeaderMap, body: Bytes) -> Result<Bytes> {
    let base64_flagged = headers
        .get(TRANSFER_ENCODING_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("base64"));

    if !base64_flagged {
        return Ok(body);
    }

    let trimmed: Vec<u8> = body.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
    STANDARD.decode(trimmed).map(Bytes::from).map_err(|_| Error::BadRequest {
        message: INVALID_PAYLOAD.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_API_KEY, create_test_app, create_test_config};
    use axum::http::StatusCode;
    use serde_json::json;
    use wiremock::MockServer;

    #[test]
    fn test_authorize() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            authorize(None, &headers).unwrap_err().to_string(),
            "Missing RESUME_SYNC_API_KEY configuration"
        );
        assert_eq!(
            authorize(Some("s3cret"), &headers).unwrap_err().to_string(),
            "Missing RESUME_SYNC_API_KEY header"
        );

        headers.insert("resume_sync_api_key", "nope".parse().unwrap());
        assert_eq!(authorize(Some("s3cret"), &headers).unwrap_err().to_string(), "Invalid API key");

        headers.insert("Resume-Sync-Api-Key", "s3cret".parse().unwrap());
        authorize(Some("s3cret"), &headers).unwrap();
    }

    #[test]
    fn test_decode_body() {
        let mut headers = HeaderMap::new();
        let plain = Bytes::from_static(b"[]");
        assert_eq!(decode_body(&headers, plain.clone()).unwrap(), plain);

        headers.insert(TRANSFER_ENCODING_HEADER, "BASE64".parse().unwrap());
        let encoded = Bytes::from(STANDARD.encode(br#"[{"objectId":1}]"#) + "\n");
        assert_eq!(&decode_body(&headers, encoded).unwrap()[..], br#"[{"objectId":1}]"#);

        let err = decode_body(&headers, Bytes::from_static(b"%%%")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_rejects_other_methods() {
        let mock_server = MockServer::start().await;
        let server = create_test_app(create_test_config(&mock_server));

        let response = server.get("/resume-sync").await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.json::<serde_json::Value>(), json!({"error": "Method not allowed"}));
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let mock_server = MockServer::start().await;
        let server = create_test_app(create_test_config(&mock_server));

        let response = server.post("/resume-sync").json(&json!([])).await;
        response.assert_status_unauthorized();
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({"error": "Missing RESUME_SYNC_API_KEY header"})
        );

        let response = server
            .post("/resume-sync")
            .add_header("resume-sync-api-key", "wrong")
            .json(&json!([]))
            .await;
        response.assert_status_unauthorized();
        assert_eq!(response.json::<serde_json::Value>(), json!({"error": "Invalid API key"}));
    }

    #[tokio::test]
    async fn test_unconfigured_api_key_rejects_everything() {
        let mock_server = MockServer::start().await;
        let mut config = create_test_config(&mock_server);
        config.api_key = None;
        let server = create_test_app(config);

        let response = server
            .post("/resume-sync")
            .add_header("resume-sync-api-key", TEST_API_KEY)
            .json(&json!([]))
            .await;
        response.assert_status_unauthorized();
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({"error": "Missing RESUME_SYNC_API_KEY configuration"})
        );
    }

    #[tokio::test]
    async fn test_missing_hubspot_token() {
        let mock_server = MockServer::start().await;
        let mut config = create_test_config(&mock_server);
        config.hubspot.access_token = None;
        let server = create_test_app(config);

        let response = server
            .post("/resume-sync")
            .add_header("resume-sync-api-key", TEST_API_KEY)
            .json(&json!([]))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({"error": "Missing HUBSPOT_PRIVATE_APP_TOKEN"})
        );
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let mock_server = MockServer::start().await;
        let server = create_test_app(create_test_config(&mock_server));

        let response = server
            .post("/resume-sync")
            .add_header("resume-sync-api-key", TEST_API_KEY)
            .text("{not json")
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<serde_json::Value>(), json!({"error": "Invalid JSON payload"}));
    }

    #[tokio::test]
    async fn test_empty_delivery() {
        let mock_server = MockServer::start().await;
        let server = create_test_app(create_test_config(&mock_server));

        for body in ["", "[]"] {
            let response = server
                .post("/resume-sync")
                .add_header("resume-sync-api-key", TEST_API_KEY)
                .text(body)
                .await;
            response.assert_status_ok();
            assert_eq!(response.json::<serde_json::Value>(), json!({"message": "No events to process"}));
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_untracked_events_give_empty_results() {
        let mock_server = MockServer::start().await;
        let server = create_test_app(create_test_config(&mock_server));

        let response = server
            .post("/resume-sync")
            .add_header("resume-sync-api-key", TEST_API_KEY)
            .json(&json!([
                {"subscriptionType": "object.propertyChange", "objectId": 42, "propertyName": "phone"},
                {"subscriptionType": "contact.creation", "objectId": 43}
            ]))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>(), json!({"results": []}));
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_base64_single_event() {
        let mock_server = MockServer::start().await;
        let server = create_test_app(create_test_config(&mock_server));
        let payload = STANDARD.encode(br#"{"subscriptionType":"object.propertyChange","propertyName":"resume"}"#);

        let response = server
            .post("/resume-sync")
            .add_header("resume-sync-api-key", TEST_API_KEY)
            .add_header(TRANSFER_ENCODING_HEADER, "base64")
            .text(payload)
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({"results": [{"skipped": true, "reason": "Missing contact id"}]})
        );
    }
}
