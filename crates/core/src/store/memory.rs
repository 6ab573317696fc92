//! In-memory ledger implementing every store trait.
//!
//! Backed by one `RwLock` so multi-row writes (payout creation plus
//! transaction stamping) are atomic exactly like a storage transaction.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use payout_shared::types::{
    LedgerTransactionId, PayoutAccountId, PayoutId, PayoutMethodId, PgpSubAccountId,
    PspPayoutRequestId, TopUpTransferId,
};
use tokio::sync::RwLock;

use super::{
    PayoutAccountStore, PayoutMethodStore, PayoutStore, PspPayoutRequestStore, StoreError,
    StoreResult, TopUpTransferStore, TransactionStore,
};
use crate::domain::{
    LedgerTransaction, NewPayout, NewPspPayoutRequest, NewTopUpTransfer, Payout, PayoutAccount,
    PayoutCard, PayoutMethod, PayoutPatch, PayoutQuery, PayoutStatus, PgpSubAccount,
    PspPayoutRequest, PspPayoutRequestPatch, TopUpTransfer,
};

#[derive(Default)]
struct LedgerState {
    next_id: i64,
    accounts: HashMap<PayoutAccountId, PayoutAccount>,
    sub_accounts: HashMap<PgpSubAccountId, PgpSubAccount>,
    methods: BTreeMap<PayoutMethodId, PayoutMethod>,
    cards: BTreeMap<PayoutMethodId, PayoutCard>,
    transactions: BTreeMap<LedgerTransactionId, LedgerTransaction>,
    payouts: BTreeMap<PayoutId, Payout>,
    psp_requests: BTreeMap<PspPayoutRequestId, PspPayoutRequest>,
    topups: BTreeMap<TopUpTransferId, TopUpTransfer>,
}

impl LedgerState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A thread-safe in-memory ledger.
///
/// Cloning shares the same underlying state.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new, empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a payout account.
    pub async fn insert_account(&self, account: PayoutAccount) {
        self.state.write().await.accounts.insert(account.id, account);
    }

    /// Inserts or replaces a PSP sub-account.
    pub async fn insert_sub_account(&self, sub_account: PgpSubAccount) {
        self.state
            .write()
            .await
            .sub_accounts
            .insert(sub_account.id, sub_account);
    }

    /// Inserts a payout method, and its card when given.
    ///
    /// Setting `is_default` unsets the flag on the account's other methods.
    pub async fn insert_method(&self, method: PayoutMethod, card: Option<PayoutCard>) {
        let mut state = self.state.write().await;
        if method.is_default {
            for other in state.methods.values_mut() {
                if other.payout_account_id == method.payout_account_id {
                    other.is_default = false;
                }
            }
        }
        if let Some(card) = card {
            state.cards.insert(card.id, card);
        }
        state.methods.insert(method.id, method);
    }

    /// Inserts or replaces a ledger transaction.
    pub async fn insert_transaction(&self, transaction: LedgerTransaction) {
        self.state
            .write()
            .await
            .transactions
            .insert(transaction.id, transaction);
    }

    /// Returns a transaction snapshot.
    pub async fn transaction(&self, id: LedgerTransactionId) -> Option<LedgerTransaction> {
        self.state.read().await.transactions.get(&id).cloned()
    }

    /// Returns a payout snapshot.
    pub async fn payout(&self, id: PayoutId) -> Option<Payout> {
        self.state.read().await.payouts.get(&id).cloned()
    }

    /// Returns every payout, oldest first.
    pub async fn payouts(&self) -> Vec<Payout> {
        self.state.read().await.payouts.values().cloned().collect()
    }

    /// Rewrites a payout's creation time.
    pub async fn set_payout_created_at(&self, id: PayoutId, created_at: DateTime<Utc>) {
        if let Some(payout) = self.state.write().await.payouts.get_mut(&id) {
            payout.created_at = created_at;
        }
    }

    /// Returns the audit rows recorded for a payout, oldest first.
    pub async fn psp_requests_for(&self, payout_id: PayoutId) -> Vec<PspPayoutRequest> {
        self.state
            .read()
            .await
            .psp_requests
            .values()
            .filter(|row| row.payout_id == payout_id)
            .cloned()
            .collect()
    }

    /// Returns the top-up transfers recorded for a payout, oldest first.
    pub async fn topups_for(&self, payout_id: PayoutId) -> Vec<TopUpTransfer> {
        self.state
            .read()
            .await
            .topups
            .values()
            .filter(|row| row.payout_id == payout_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PayoutAccountStore for InMemoryLedger {
    async fn get_payout_account(&self, id: PayoutAccountId) -> StoreResult<Option<PayoutAccount>> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn get_pgp_sub_account(&self, id: PgpSubAccountId) -> StoreResult<Option<PgpSubAccount>> {
        Ok(self.state.read().await.sub_accounts.get(&id).cloned())
    }
}

#[async_trait]
impl PayoutMethodStore for InMemoryLedger {
    async fn list_payout_methods(
        &self,
        payout_account_id: PayoutAccountId,
    ) -> StoreResult<Vec<PayoutMethod>> {
        Ok(self
            .state
            .read()
            .await
            .methods
            .values()
            .filter(|m| m.payout_account_id == payout_account_id && m.is_active())
            .cloned()
            .collect())
    }

    async fn list_payout_cards(&self, ids: &[PayoutMethodId]) -> StoreResult<Vec<PayoutCard>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.cards.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl TransactionStore for InMemoryLedger {
    async fn get_unpaid_transactions(
        &self,
        payout_account_id: PayoutAccountId,
    ) -> StoreResult<Vec<LedgerTransaction>> {
        Ok(self
            .state
            .read()
            .await
            .transactions
            .values()
            .filter(|t| t.payout_account_id == payout_account_id && t.is_payable())
            .cloned()
            .collect())
    }

    async fn detach_transactions(
        &self,
        ids: &[LedgerTransactionId],
        payout_id: PayoutId,
    ) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for id in ids {
            if let Some(transaction) = state.transactions.get_mut(id) {
                if transaction.payout_id == Some(payout_id) {
                    transaction.payout_id = None;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl PayoutStore for InMemoryLedger {
    async fn create_payout_and_attach(&self, new: NewPayout) -> StoreResult<Payout> {
        let mut state = self.state.write().await;

        for id in &new.transaction_ids {
            match state.transactions.get(id) {
                None => return Err(StoreError::not_found("transaction", *id)),
                Some(t) if t.payout_id.is_some() => {
                    return Err(StoreError::Conflict(format!(
                        "transaction {id} is already attached to a payout"
                    )));
                }
                Some(_) => {}
            }
        }

        let id = PayoutId::new(state.next_id());
        let now = Utc::now();
        let payout = Payout {
            id,
            payout_account_id: new.payout_account_id,
            amount: new.amount,
            fee: new.fee,
            currency: new.currency,
            status: PayoutStatus::New,
            idempotency_key: new.idempotency_key,
            payout_method_id: new.payout_method_id,
            transaction_ids: new.transaction_ids,
            error: None,
            created_at: now,
            updated_at: now,
        };
        for transaction_id in &payout.transaction_ids {
            if let Some(transaction) = state.transactions.get_mut(transaction_id) {
                transaction.payout_id = Some(id);
            }
        }
        state.payouts.insert(id, payout.clone());
        Ok(payout)
    }

    async fn get_payout(&self, id: PayoutId) -> StoreResult<Option<Payout>> {
        Ok(self.state.read().await.payouts.get(&id).cloned())
    }

    async fn update_payout(&self, id: PayoutId, patch: PayoutPatch) -> StoreResult<Payout> {
        let mut state = self.state.write().await;
        let payout = state
            .payouts
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("payout", id))?;
        if let Some(status) = patch.status {
            payout.status = status;
        }
        if let Some(error) = patch.error {
            payout.error = Some(error);
        }
        payout.updated_at = Utc::now();
        Ok(payout.clone())
    }

    async fn list_payouts(&self, query: &PayoutQuery) -> StoreResult<Vec<Payout>> {
        let state = self.state.read().await;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(state
            .payouts
            .values()
            .rev()
            .filter(|p| query.matches(p))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PspPayoutRequestStore for InMemoryLedger {
    async fn create_psp_payout_request(
        &self,
        request: NewPspPayoutRequest,
    ) -> StoreResult<PspPayoutRequest> {
        let mut state = self.state.write().await;
        let id = PspPayoutRequestId::new(state.next_id());
        let now = Utc::now();
        let row = PspPayoutRequest {
            id,
            payout_id: request.payout_id,
            idempotency_key: request.idempotency_key,
            psp_payout_id: None,
            status: PayoutStatus::New,
            request: request.request,
            response: None,
            received_at: None,
            created_at: now,
            updated_at: now,
        };
        state.psp_requests.insert(id, row.clone());
        Ok(row)
    }

    async fn update_psp_payout_request(
        &self,
        id: PspPayoutRequestId,
        patch: PspPayoutRequestPatch,
    ) -> StoreResult<PspPayoutRequest> {
        let mut state = self.state.write().await;
        let row = state
            .psp_requests
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("psp payout request", id))?;
        let now = Utc::now();
        row.status = patch.status;
        if patch.psp_payout_id.is_some() {
            row.psp_payout_id = patch.psp_payout_id;
        }
        row.response = patch.response;
        row.received_at = Some(now);
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn list_psp_payout_requests(
        &self,
        payout_ids: &[PayoutId],
    ) -> StoreResult<Vec<PspPayoutRequest>> {
        Ok(self
            .state
            .read()
            .await
            .psp_requests
            .values()
            .filter(|row| payout_ids.contains(&row.payout_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TopUpTransferStore for InMemoryLedger {
    async fn create_topup_transfer(&self, transfer: NewTopUpTransfer) -> StoreResult<TopUpTransfer> {
        let mut state = self.state.write().await;
        let id = TopUpTransferId::new(state.next_id());
        let row = TopUpTransfer {
            id,
            payout_id: transfer.payout_id,
            amount: transfer.amount,
            currency: transfer.currency,
            source_account_id: transfer.source_account_id,
            destination_account_id: transfer.destination_account_id,
            idempotency_key: transfer.idempotency_key,
            external_transfer_id: None,
            created_at: Utc::now(),
        };
        state.topups.insert(id, row.clone());
        Ok(row)
    }

    async fn mark_topup_transfer_submitted(
        &self,
        id: TopUpTransferId,
        external_transfer_id: &str,
    ) -> StoreResult<TopUpTransfer> {
        let mut state = self.state.write().await;
        let row = state
            .topups
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("top-up transfer", id))?;
        row.external_transfer_id = Some(external_transfer_id.to_string());
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(id: i64, account: i64, amount: i64) -> LedgerTransaction {
        LedgerTransaction {
            id: LedgerTransactionId::new(id),
            payout_account_id: PayoutAccountId::new(account),
            amount,
            state: None,
            payout_id: None,
            transfer_id: None,
            created_at: Utc::now(),
        }
    }

    fn new_payout(transaction_ids: &[i64]) -> NewPayout {
        NewPayout {
            payout_account_id: PayoutAccountId::new(1),
            amount: 100,
            fee: 10,
            currency: "usd".to_string(),
            idempotency_key: "key".to_string(),
            payout_method_id: PayoutMethodId::new(1),
            transaction_ids: transaction_ids
                .iter()
                .copied()
                .map(LedgerTransactionId::new)
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_payout_attaches_transactions() {
        let ledger = InMemoryLedger::new();
        ledger.insert_transaction(transaction(1, 1, 60)).await;
        ledger.insert_transaction(transaction(2, 1, 50)).await;

        let payout = ledger.create_payout_and_attach(new_payout(&[1, 2])).await.unwrap();

        assert_eq!(payout.status, PayoutStatus::New);
        for id in [1, 2] {
            let t = ledger.transaction(LedgerTransactionId::new(id)).await.unwrap();
            assert_eq!(t.payout_id, Some(payout.id));
        }
        assert!(
            ledger
                .get_unpaid_transactions(PayoutAccountId::new(1))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_create_payout_rejects_attached_transaction_atomically() {
        let ledger = InMemoryLedger::new();
        ledger.insert_transaction(transaction(1, 1, 60)).await;
        let mut taken = transaction(2, 1, 50);
        taken.payout_id = Some(PayoutId::new(99));
        ledger.insert_transaction(taken).await;

        let result = ledger.create_payout_and_attach(new_payout(&[1, 2])).await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(ledger.payouts().await.is_empty());
        let untouched = ledger.transaction(LedgerTransactionId::new(1)).await.unwrap();
        assert_eq!(untouched.payout_id, None);
    }

    #[tokio::test]
    async fn test_detach_only_clears_matching_payout() {
        let ledger = InMemoryLedger::new();
        let mut mine = transaction(1, 1, 60);
        mine.payout_id = Some(PayoutId::new(5));
        let mut other = transaction(2, 1, 50);
        other.payout_id = Some(PayoutId::new(6));
        ledger.insert_transaction(mine).await;
        ledger.insert_transaction(other).await;

        let ids = [LedgerTransactionId::new(1), LedgerTransactionId::new(2)];
        let changed = ledger.detach_transactions(&ids, PayoutId::new(5)).await.unwrap();
        let again = ledger.detach_transactions(&ids, PayoutId::new(5)).await.unwrap();

        assert_eq!(changed, 1);
        assert_eq!(again, 0);
        let other = ledger.transaction(LedgerTransactionId::new(2)).await.unwrap();
        assert_eq!(other.payout_id, Some(PayoutId::new(6)));
    }

    #[tokio::test]
    async fn test_list_payouts_newest_first_with_paging() {
        let ledger = InMemoryLedger::new();
        for id in 1..=3 {
            ledger.insert_transaction(transaction(id, 1, 10)).await;
            ledger.create_payout_and_attach(new_payout(&[id])).await.unwrap();
        }

        let query = PayoutQuery {
            payout_account_id: Some(PayoutAccountId::new(1)),
            offset: 1,
            limit: Some(5),
            ..PayoutQuery::default()
        };
        let page = ledger.list_payouts(&query).await.unwrap();

        assert_eq!(page.len(), 2);
        assert!(page[0].id > page[1].id);
    }
}
