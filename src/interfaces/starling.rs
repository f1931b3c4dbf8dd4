use crate::domain::ports::SavingsGoalClient;
use crate::domain::transfer::MinorAmount;
use crate::error::{Result, RoundUpError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "https://api.starlingbank.com";

/// Longest slice of an error body carried into logs and outcomes.
const MAX_ERROR_DETAIL: usize = 200;

#[derive(Debug, Serialize)]
struct TopUpRequest<'a> {
    amount: &'a MinorAmount,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct TopUpResponse {
    transfer_uid: Option<String>,
    success: Option<bool>,
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ErrorDetail {
    message: Option<String>,
}

/// Savings-goal client for the Starling public API, authenticated with a personal access token.
pub struct StarlingClient {
    base_url: String,
    token: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl StarlingClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    fn add_money_url(&self, goal: &str, transfer_uid: &Uuid) -> String {
        format!(
            "{}/api/v1/savings-goals/{}/add-money/{}",
            self.base_url, goal, transfer_uid
        )
    }
}

impl std::fmt::Debug for StarlingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarlingClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl SavingsGoalClient for StarlingClient {
    async fn add_money(&self, goal: &str, amount: &MinorAmount) -> Result<String> {
        let transfer_uid = Uuid::new_v4();
        let url = self.add_money_url(goal, &transfer_uid);
        tracing::debug!(%transfer_uid, amount = amount.minor_units, "requesting savings goal top-up");

        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(&TopUpRequest { amount })
            .timeout(self.timeout)
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                let status = r.status().as_u16();
                let text = r.text().await.unwrap_or_default();
                let body: TopUpResponse = if text.trim().is_empty() {
                    TopUpResponse::default()
                } else {
                    serde_json::from_str(&text).unwrap_or_else(|err| {
                        tracing::warn!(error = %err, "unreadable top-up response body");
                        TopUpResponse::default()
                    })
                };
                if body.success == Some(false) {
                    let detail = body
                        .errors
                        .iter()
                        .filter_map(|e| e.message.as_deref())
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(RoundUpError::DownstreamTransfer {
                        status: Some(status),
                        detail: if detail.is_empty() {
                            "transfer reported unsuccessful".to_string()
                        } else {
                            detail
                        },
                    });
                }
                Ok(body
                    .transfer_uid
                    .filter(|uid| !uid.is_empty())
                    .unwrap_or_else(|| transfer_uid.to_string()))
            }
            Ok(r) => {
                let status = r.status();
                let text = r.text().await.unwrap_or_default();
                let detail: String = text.chars().take(MAX_ERROR_DETAIL).collect();
                Err(RoundUpError::DownstreamTransfer {
                    status: Some(status.as_u16()),
                    detail: if detail.is_empty() {
                        status.canonical_reason().unwrap_or("error").to_string()
                    } else {
                        detail
                    },
                })
            }
            Err(e) if e.is_timeout() => Err(RoundUpError::DownstreamTransfer {
                status: None,
                detail: "savings goal API timeout".to_string(),
            }),
            Err(e) => Err(RoundUpError::DownstreamTransfer {
                status: None,
                detail: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::put;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct SeenRequest {
        goal: String,
        transfer_uid: String,
        authorization: Option<String>,
        body: Value,
    }

    #[derive(Clone)]
    struct MockBank {
        seen: Arc<Mutex<Vec<SeenRequest>>>,
        status: StatusCode,
        reply: Value,
    }

    async fn add_money(
        State(bank): State<MockBank>,
        Path((goal, transfer_uid)): Path<(String, String)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        bank.seen.lock().unwrap().push(SeenRequest {
            goal,
            transfer_uid,
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            body,
        });
        (bank.status, Json(bank.reply.clone()))
    }

    async fn spawn_bank(status: StatusCode, reply: Value) -> (SocketAddr, MockBank) {
        let bank = MockBank {
            seen: Arc::new(Mutex::new(Vec::new())),
            status,
            reply,
        };
        let app = Router::new()
            .route(
                "/api/v1/savings-goals/:goal/add-money/:transfer_uid",
                put(add_money),
            )
            .with_state(bank.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });
        (addr, bank)
    }

    fn gbp(minor_units: i64) -> MinorAmount {
        MinorAmount {
            currency: "GBP".to_string(),
            minor_units,
        }
    }

    #[tokio::test]
    async fn test_add_money_sends_amount_and_token() {
        let (addr, bank) = spawn_bank(
            StatusCode::OK,
            json!({"transferUid": "bank-ref", "success": true, "errors": []}),
        )
        .await;
        let client = StarlingClient::new(
            format!("http://{addr}/"),
            "token-1",
            Duration::from_secs(5),
        );

        let reference = client.add_money("goal-1", &gbp(37)).await.unwrap();
        assert_eq!(reference, "bank-ref");

        let seen = bank.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].goal, "goal-1");
        assert!(Uuid::parse_str(&seen[0].transfer_uid).is_ok());
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer token-1"));
        assert_eq!(
            seen[0].body,
            json!({"amount": {"currency": "GBP", "minorUnits": 37}})
        );
    }

    #[tokio::test]
    async fn test_add_money_falls_back_to_sent_transfer_uid() {
        let (addr, bank) = spawn_bank(StatusCode::OK, json!({})).await;
        let client = StarlingClient::new(format!("http://{addr}"), "t", Duration::from_secs(5));

        let reference = client.add_money("goal-1", &gbp(1)).await.unwrap();
        assert_eq!(reference, bank.seen.lock().unwrap()[0].transfer_uid);
    }

    #[tokio::test]
    async fn test_add_money_maps_http_error() {
        let (addr, _bank) = spawn_bank(
            StatusCode::FORBIDDEN,
            json!({"errors": [{"message": "insufficient scope"}]}),
        )
        .await;
        let client = StarlingClient::new(format!("http://{addr}"), "t", Duration::from_secs(5));

        match client.add_money("goal-1", &gbp(1)).await {
            Err(RoundUpError::DownstreamTransfer { status, detail }) => {
                assert_eq!(status, Some(403));
                assert!(detail.contains("insufficient scope"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_money_unsuccessful_body_is_failure() {
        let (addr, _bank) = spawn_bank(
            StatusCode::OK,
            json!({"success": false, "errors": [{"message": "goal locked"}]}),
        )
        .await;
        let client = StarlingClient::new(format!("http://{addr}"), "t", Duration::from_secs(5));

        match client.add_money("goal-1", &gbp(1)).await {
            Err(RoundUpError::DownstreamTransfer { status, detail }) => {
                assert_eq!(status, Some(200));
                assert_eq!(detail, "goal locked");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_money_transport_error_has_no_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = StarlingClient::new(format!("http://{addr}"), "t", Duration::from_secs(5));

        match client.add_money("goal-1", &gbp(1)).await {
            Err(RoundUpError::DownstreamTransfer { status, .. }) => assert_eq!(status, None),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = StarlingClient::new(DEFAULT_BASE_URL, "very-secret", Duration::from_secs(1));
        assert!(!format!("{client:?}").contains("very-secret"));
    }
}
