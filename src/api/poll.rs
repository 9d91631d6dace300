//! Public ballot endpoints
//!
//! Endpoints:
//!   GET  /        -> ballot form
//!   POST /        -> vote submission (form-encoded)
//!   GET  /thanks  -> acknowledgment page
//!   GET  /health  -> liveness check
//!
//! The submission handler is a thin wrapper: it derives the caller's
//! address and descriptor, hands the candidate to `VoteService`, and
//! maps the outcome onto HTTP. All admission logic lives behind the
//! service.

use axum::{
    Form, Json, Router,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::admission::{CandidateVote, SubmissionOutcome, SubmitError, VoteService};

const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Cast your vote</title>
</head>
<body>
    <h1>Cast your vote</h1>
    <form method="post" action="/">
        <p>
            <label for="first_vote">First choice</label>
            <input type="text" id="first_vote" name="first_vote" required>
        </p>
        <p>
            <label for="second_vote">Second choice</label>
            <input type="text" id="second_vote" name="second_vote" required>
        </p>
        <button type="submit">Vote</button>
    </form>
</body>
</html>
"#;

const THANKS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Thank you</title>
</head>
<body>
    <h1>Thank you for your vote!</h1>
</body>
</html>
"#;

#[derive(Clone)]
pub struct PollApiState {
    pub service: Arc<VoteService>,
}

#[derive(Debug, Deserialize)]
pub struct BallotForm {
    pub first_vote: String,
    pub second_vote: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Submit(e) => {
                error!(error = %e, "Vote submission failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Your vote could not be recorded. Please try again later.",
                )
                    .into_response()
            }
        }
    }
}

pub async fn home_page() -> Html<&'static str> {
    Html(HOME_PAGE)
}

pub async fn thanks_page() -> Html<&'static str> {
    Html(THANKS_PAGE)
}

pub async fn submit_ballot(
    State(state): State<PollApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(ballot): Form<BallotForm>,
) -> Result<Response, ApiError> {
    let address = client_address(&headers, &addr);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let outcome = state
        .service
        .submit_vote(CandidateVote {
            ip_address: address,
            user_agent,
            first_vote: ballot.first_vote,
            second_vote: ballot.second_vote,
        })
        .await?;

    Ok(match outcome {
        SubmissionOutcome::Accepted(_) => Redirect::to("/thanks").into_response(),
        SubmissionOutcome::RejectedDuplicate { next_eligible } => duplicate_response(next_eligible),
        SubmissionOutcome::RejectedAnonymized => (
            StatusCode::FORBIDDEN,
            "You appear to be connecting through a VPN, proxy or Tor. \
             Disable it and cast your vote again.",
        )
            .into_response(),
        SubmissionOutcome::RejectedLookupUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Could not verify your address right now. Please try again in a moment.",
        )
            .into_response(),
    })
}

fn duplicate_response(next_eligible: DateTime<Utc>) -> Response {
    let retry_secs = (next_eligible - Utc::now()).num_seconds().max(0) as u64;

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        format!(
            "I already have your vote ;) You can vote again at {} UTC.",
            next_eligible.format("%Y-%m-%d %H:%M:%S")
        ),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));

    response
}

/// Caller address: first comma-separated entry of X-Forwarded-For,
/// trimmed, when the header is present; else the transport address.
/// Entries beyond the first are ignored.
pub fn client_address(headers: &HeaderMap, addr: &SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip) = value.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    addr.ip().to_string()
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

pub fn create_router(state: PollApiState) -> Router {
    Router::new()
        .route("/", get(home_page).post(submit_ballot))
        .route("/thanks", get(thanks_page))
        .route("/health", get(health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryVoteStore;
    use crate::intel::{IntelLookup, IntelReport, LocationInfo, LookupError, SecuritySignals};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct QueuedIntel {
        responses: Mutex<VecDeque<Result<IntelReport, LookupError>>>,
    }

    impl QueuedIntel {
        fn new(responses: Vec<Result<IntelReport, LookupError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl IntelLookup for QueuedIntel {
        async fn lookup(&self, _address: &str) -> Result<IntelReport, LookupError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no queued intelligence response")
        }
    }

    fn clean_report() -> IntelReport {
        IntelReport {
            security: SecuritySignals {
                vpn: Some(false),
                proxy: Some(false),
                tor: Some(false),
            },
            location: LocationInfo {
                country: Some("Poland".to_string()),
                city: Some("Warsaw".to_string()),
            },
        }
    }

    fn state_with(intel: Arc<QueuedIntel>) -> (PollApiState, Arc<MemoryVoteStore>) {
        let store = Arc::new(MemoryVoteStore::new());
        let state = PollApiState {
            service: Arc::new(VoteService::new(store.clone(), intel)),
        };
        (state, store)
    }

    fn ballot_form() -> Form<BallotForm> {
        Form(BallotForm {
            first_vote: "Alpha".to_string(),
            second_vote: "Beta".to_string(),
        })
    }

    fn socket() -> SocketAddr {
        "10.1.2.3:4567".parse().unwrap()
    }

    #[test]
    fn test_client_address_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));

        assert_eq!(client_address(&headers, &socket()), "1.2.3.4");
    }

    #[test]
    fn test_client_address_takes_first_entry_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 1.2.3.4 , 10.0.0.1, 172.16.0.1"),
        );

        assert_eq!(client_address(&headers, &socket()), "1.2.3.4");
    }

    #[test]
    fn test_client_address_falls_back_to_socket() {
        let headers = HeaderMap::new();
        assert_eq!(client_address(&headers, &socket()), "10.1.2.3");
    }

    #[test]
    fn test_client_address_ipv6_socket() {
        let headers = HeaderMap::new();
        let addr: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        assert_eq!(client_address(&headers, &addr), "2001:db8::1");
    }

    #[test]
    fn test_client_address_non_utf8_header_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap(),
        );

        assert_eq!(client_address(&headers, &socket()), "10.1.2.3");
    }

    #[tokio::test]
    async fn test_accepted_submission_redirects_to_thanks() {
        let (state, store) = state_with(QueuedIntel::new(vec![Ok(clean_report())]));

        let response = submit_ballot(
            State(state),
            ConnectInfo(socket()),
            HeaderMap::new(),
            ballot_form(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/thanks");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_anonymized_submission_returns_forbidden() {
        let mut report = clean_report();
        report.security.vpn = Some(true);
        let (state, store) = state_with(QueuedIntel::new(vec![Ok(report)]));

        let response = submit_ballot(
            State(state),
            ConnectInfo(socket()),
            HeaderMap::new(),
            ballot_form(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_lookup_outage_returns_service_unavailable() {
        let (state, store) = state_with(QueuedIntel::new(vec![Err(LookupError::Status(500))]));

        let response = submit_ballot(
            State(state),
            ConnectInfo(socket()),
            HeaderMap::new(),
            ballot_form(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_form_field_is_rejected_client_side() {
        // Extraction fails before the handler runs; no store or lookup
        // is even constructed.
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("first_vote=Alpha"))
            .unwrap();

        let rejection = Form::<BallotForm>::from_request(request, &())
            .await
            .unwrap_err();

        assert!(rejection.into_response().status().is_client_error());
    }

    #[test]
    fn test_duplicate_response_sets_retry_after() {
        let next_eligible = Utc::now() + chrono::Duration::hours(23);
        let response = duplicate_response(next_eligible);

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry: u64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry > 0);
        assert!(retry <= 23 * 3600);
    }

    #[test]
    fn test_duplicate_response_in_the_past_clamps_to_zero() {
        let response = duplicate_response(Utc::now() - chrono::Duration::hours(1));

        let retry: u64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(retry, 0);
    }
}
