//! Instant payout routes.
//!
//! Thin adapters over [`InstantPayoutService`]: parse the request, call the
//! engine, render the result or the error envelope.
//!
//! [`InstantPayoutService`]: payout_core::instant_payout::InstantPayoutService

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use payout_core::instant_payout::{
    CreateInstantPayout, Eligibility, InstantPayoutReceipt, PayoutStreamItem,
};
use payout_shared::AppError;
use payout_shared::types::{OffsetPage, PayoutAccountId, PayoutMethodId, StreamPage};
use serde::Deserialize;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the instant payout routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/payout-accounts/{account_id}/instant-payouts",
            get(list_instant_payouts).post(create_instant_payout),
        )
        .route(
            "/payout-accounts/{account_id}/instant-payouts/eligibility",
            get(check_eligibility),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Query for the eligibility check.
#[derive(Debug, Deserialize)]
pub struct EligibilityQuery {
    /// Start of the caller's local day, RFC 3339.
    pub local_start_of_day: DateTime<Utc>,
}

/// Request body for creating an instant payout.
#[derive(Debug, Deserialize)]
pub struct CreateInstantPayoutRequest {
    /// Requested amount in minor units; must equal the unpaid balance.
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Destination card; defaults to the account's default card.
    pub payout_card_id: Option<PayoutMethodId>,
    /// Start of the caller's local day, RFC 3339.
    pub local_start_of_day: DateTime<Utc>,
}

/// Paging query for the payout stream.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Page size.
    pub limit: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
}

impl StreamQuery {
    fn page(&self) -> OffsetPage {
        let default = OffsetPage::default();
        OffsetPage::new(
            self.limit.unwrap_or(default.limit),
            self.offset.unwrap_or(default.offset),
        )
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/payout-accounts/{account_id}/instant-payouts/eligibility`
async fn check_eligibility(
    State(state): State<AppState>,
    Path(account_id): Path<PayoutAccountId>,
    query: Result<Query<EligibilityQuery>, QueryRejection>,
) -> Result<Json<Eligibility>, ApiError> {
    let Query(query) = query?;
    let eligibility = state
        .payouts
        .check_eligibility(account_id, query.local_start_of_day)
        .await?;
    Ok(Json(eligibility))
}

/// POST `/payout-accounts/{account_id}/instant-payouts`
async fn create_instant_payout(
    State(state): State<AppState>,
    Path(account_id): Path<PayoutAccountId>,
    body: Result<Json<CreateInstantPayoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InstantPayoutReceipt>), ApiError> {
    let Json(body) = body?;
    let request = CreateInstantPayout {
        payout_account_id: account_id,
        amount: body.amount,
        currency: body.currency,
        payout_card_id: body.payout_card_id,
        local_start_of_day: body.local_start_of_day,
    };
    // Runs detached from the connection: once the payout exists the attempt
    // must finish even if the client goes away.
    let payouts = state.payouts.clone();
    let receipt = tokio::spawn(async move { payouts.create_and_submit(request).await })
        .await
        .map_err(|e| AppError::Internal(format!("instant payout task failed: {e}")))??;

    info!(
        payout_id = %receipt.payout_id,
        payout_account_id = %account_id,
        status = %receipt.status,
        "Instant payout created"
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET `/payout-accounts/{account_id}/instant-payouts`
async fn list_instant_payouts(
    State(state): State<AppState>,
    Path(account_id): Path<PayoutAccountId>,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> Result<Json<StreamPage<PayoutStreamItem>>, ApiError> {
    let Query(query) = query?;
    let page = state
        .payouts
        .list_payout_stream(account_id, query.page())
        .await?;
    Ok(Json(page))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use http_body_util::BodyExt;
    use payout_core::domain::{
        EntityType, LedgerTransaction, PaymentGatewayProvider, PayoutAccount, PayoutCard,
        PayoutMethod, PayoutMethodType, PayoutStatus, PgpSubAccount,
    };
    use payout_core::instant_payout::{InstantPayoutService, InstantPayoutSettings};
    use payout_core::lock::{InMemoryLocker, LockCoordinator, LockStrategy};
    use payout_core::psp::{
        PayoutRequest, PspError, PspErrorKind, PspGateway, PspPayout, PspTransfer,
        TransferRequest,
    };
    use payout_core::store::LedgerStores;
    use payout_core::store::memory::InMemoryLedger;
    use payout_shared::LockConfig;
    use payout_shared::types::{LedgerTransactionId, PgpSubAccountId};
    use rstest::rstest;
    use serde_json::{Value, json};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use super::*;
    use crate::create_router;

    /// Provider double with a fixed balance and a fixed payout outcome.
    struct StubGateway {
        balance: i64,
        payout_error: Option<PspErrorKind>,
    }

    #[async_trait]
    impl PspGateway for StubGateway {
        async fn retrieve_balance(&self, _: &str, _: &str) -> Result<i64, PspError> {
            Ok(self.balance)
        }

        async fn create_transfer(&self, request: &TransferRequest) -> Result<PspTransfer, PspError> {
            Ok(PspTransfer {
                id: "tr_stub".to_string(),
                amount: request.amount,
                currency: request.currency.clone(),
                destination: request.destination.clone(),
            })
        }

        async fn create_payout(&self, request: &PayoutRequest) -> Result<PspPayout, PspError> {
            if let Some(kind) = self.payout_error {
                return Err(PspError::new(kind, "stubbed failure"));
            }
            Ok(PspPayout {
                id: "po_stub".to_string(),
                status: "pending".to_string(),
                amount: request.amount,
                currency: request.currency.clone(),
                destination: request.destination.clone(),
                raw: Value::Null,
            })
        }
    }

    /// Provider double whose payout call waits until the test lets it go.
    struct GatedGateway {
        inner: StubGateway,
        entered: Arc<Notify>,
        proceed: Arc<Notify>,
    }

    #[async_trait]
    impl PspGateway for GatedGateway {
        async fn retrieve_balance(&self, account: &str, country: &str) -> Result<i64, PspError> {
            self.inner.retrieve_balance(account, country).await
        }

        async fn create_transfer(&self, request: &TransferRequest) -> Result<PspTransfer, PspError> {
            self.inner.create_transfer(request).await
        }

        async fn create_payout(&self, request: &PayoutRequest) -> Result<PspPayout, PspError> {
            self.entered.notify_one();
            self.proceed.notified().await;
            self.inner.create_payout(request).await
        }
    }

    async fn seeded_ledger() -> Arc<InMemoryLedger> {
        let ledger = Arc::new(InMemoryLedger::new());
        let long_ago = Utc::now() - Duration::days(30);
        ledger
            .insert_sub_account(PgpSubAccount {
                id: PgpSubAccountId::new(10),
                external_account_id: "acct_sub".to_string(),
                country: "US".to_string(),
                verification_disabled_reason: None,
                created_at: long_ago,
            })
            .await;
        ledger
            .insert_account(PayoutAccount {
                id: PayoutAccountId::new(1),
                entity: EntityType::IndividualContractor,
                pgp_sub_account_id: Some(PgpSubAccountId::new(10)),
                pgp_provider: Some(PaymentGatewayProvider::Stripe),
                created_at: long_ago,
            })
            .await;
        ledger
            .insert_method(
                PayoutMethod {
                    id: PayoutMethodId::new(100),
                    payout_account_id: PayoutAccountId::new(1),
                    method_type: PayoutMethodType::Card,
                    is_default: true,
                    currency: "usd".to_string(),
                    country: "US".to_string(),
                    created_at: long_ago,
                    deleted_at: None,
                },
                Some(PayoutCard {
                    id: PayoutMethodId::new(100),
                    external_card_id: "card_100".to_string(),
                    last4: "4242".to_string(),
                    brand: "visa".to_string(),
                    exp_month: 12,
                    exp_year: 2030,
                    fingerprint: "fp_100".to_string(),
                    created_at: long_ago,
                }),
            )
            .await;
        for (id, amount) in [(1000, 600), (1001, 799)] {
            ledger
                .insert_transaction(LedgerTransaction {
                    id: LedgerTransactionId::new(id),
                    payout_account_id: PayoutAccountId::new(1),
                    amount,
                    state: None,
                    payout_id: None,
                    transfer_id: None,
                    created_at: long_ago,
                })
                .await;
        }
        ledger
    }

    fn app(ledger: Arc<InMemoryLedger>, gateway: impl PspGateway + 'static) -> Router {
        let locks = Arc::new(LockCoordinator::new(
            Arc::new(InMemoryLocker::new(LockStrategy::Row, StdDuration::from_millis(100))),
            Arc::new(InMemoryLocker::new(
                LockStrategy::Distributed,
                StdDuration::from_millis(100),
            )),
            Arc::new(LockConfig::default()),
        ));
        let service = InstantPayoutService::new(
            LedgerStores::from_shared(ledger),
            Arc::new(gateway),
            locks,
            InstantPayoutSettings {
                platform_account_id: "acct_platform".to_string(),
                ..InstantPayoutSettings::default()
            },
        );
        create_router(AppState::new(Arc::new(service)))
    }

    fn healthy_gateway() -> StubGateway {
        StubGateway {
            balance: 0,
            payout_error: None,
        }
    }

    fn start_of_day() -> String {
        (Utc::now() - Duration::hours(1)).to_rfc3339()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn create_request(amount: i64) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/payout-accounts/1/instant-payouts")
            .header("Content-Type", "application/json")
            .body(Body::from(
                json!({
                    "amount": amount,
                    "currency": "USD",
                    "local_start_of_day": start_of_day(),
                })
                .to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(seeded_ledger().await, healthy_gateway())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_eligibility_reports_balance() {
        let uri = format!(
            "/api/v1/payout-accounts/1/instant-payouts/eligibility?local_start_of_day={}",
            start_of_day().replace('+', "%2B")
        );
        let response = app(seeded_ledger().await, healthy_gateway())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["eligible"], true);
        assert_eq!(body["balance"], 1399);
        assert_eq!(body["fee"], 199);
        assert_eq!(body["currency"], "usd");
    }

    #[tokio::test]
    async fn test_eligibility_requires_start_of_day() {
        let response = app(seeded_ledger().await, healthy_gateway())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/payout-accounts/1/instant-payouts/eligibility")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_returns_receipt() {
        let response = app(seeded_ledger().await, healthy_gateway())
            .oneshot(create_request(1399))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["amount"], 1200);
        assert_eq!(body["fee"], 199);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["card"]["last4"], "4242");
    }

    #[rstest]
    #[case(1000, StatusCode::BAD_REQUEST, "AMOUNT_BALANCE_MISMATCH")]
    #[case(5000, StatusCode::BAD_REQUEST, "AMOUNT_BALANCE_MISMATCH")]
    #[tokio::test]
    async fn test_create_rejects_wrong_amount(
        #[case] amount: i64,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = app(seeded_ledger().await, healthy_gateway())
            .oneshot(create_request(amount))
            .await
            .unwrap();

        assert_eq!(response.status(), status);
        assert_eq!(body_json(response).await["error"], code);
    }

    #[tokio::test]
    async fn test_create_surfaces_provider_failure() {
        let gateway = StubGateway {
            balance: 5000,
            payout_error: Some(PspErrorKind::CardDeclined),
        };
        let response = app(seeded_ledger().await, gateway)
            .oneshot(create_request(1399))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"], "PSP_CARD_DECLINED");
    }

    #[tokio::test]
    async fn test_create_completes_after_client_disconnects() {
        let ledger = seeded_ledger().await;
        let entered = Arc::new(Notify::new());
        let proceed = Arc::new(Notify::new());
        let gateway = GatedGateway {
            inner: StubGateway {
                balance: 5000,
                payout_error: None,
            },
            entered: entered.clone(),
            proceed: proceed.clone(),
        };

        let mut request = Box::pin(app(ledger.clone(), gateway).oneshot(create_request(1399)));
        tokio::select! {
            _ = &mut request => panic!("request finished before the provider answered"),
            () = entered.notified() => {}
        }
        drop(request);
        proceed.notify_one();

        let status = tokio::time::timeout(StdDuration::from_secs(1), async {
            loop {
                if let Some(payout) = ledger.payouts().await.first() {
                    if payout.status != PayoutStatus::New {
                        return payout.status;
                    }
                }
                tokio::time::sleep(StdDuration::from_millis(5)).await;
            }
        })
        .await
        .expect("payout was abandoned with the connection");
        assert_eq!(status, PayoutStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_body() {
        let response = app(seeded_ledger().await, healthy_gateway())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/payout-accounts/1/instant-payouts")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"amount":"lots"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stream_lists_created_payout() {
        let ledger = seeded_ledger().await;
        let router = app(ledger, healthy_gateway());

        let created = router.clone().oneshot(create_request(1399)).await.unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/payout-accounts/1/instant-payouts?limit=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["next_offset"], 1);
        assert_eq!(body["items"][0]["status"], "pending");
        assert_eq!(body["items"][0]["psp_payout_request"]["psp_payout_id"], "po_stub");
    }

    #[test]
    fn test_stream_query_clamps_limit() {
        let query = StreamQuery {
            limit: Some(10_000),
            offset: None,
        };
        let page = query.page();
        assert_eq!(page.limit, payout_shared::types::pagination::MAX_PAGE_LIMIT);
        assert_eq!(page.offset, 0);
    }
}
