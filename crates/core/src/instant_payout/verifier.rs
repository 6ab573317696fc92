//! Transaction verifier.

use std::sync::Arc;

use payout_shared::types::{LedgerTransactionId, PayoutAccountId};

use super::error::PayoutError;
use crate::domain::LedgerTransaction;
use crate::store::TransactionStore;

/// Validates the unpaid transaction set against a requested amount.
pub struct TransactionVerifier {
    transactions: Arc<dyn TransactionStore>,
}

impl TransactionVerifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(transactions: Arc<dyn TransactionStore>) -> Self {
        Self { transactions }
    }

    /// Re-reads the account's unpaid transactions and returns their ids.
    ///
    /// Must run under the account lock so the ids stay unreserved until the
    /// payout is created.
    pub async fn verify(
        &self,
        account_id: PayoutAccountId,
        amount: i64,
    ) -> Result<Vec<LedgerTransactionId>, PayoutError> {
        let transactions = self.transactions.get_unpaid_transactions(account_id).await?;
        verify_transactions(&transactions, amount)
    }
}

/// Checks every transaction is payable and the total equals `amount` exactly.
pub fn verify_transactions(
    transactions: &[LedgerTransaction],
    amount: i64,
) -> Result<Vec<LedgerTransactionId>, PayoutError> {
    let mut balance: i64 = 0;
    for t in transactions {
        if !t.has_payable_state() {
            return Err(PayoutError::TransactionStateInvalid { transaction_id: t.id });
        }
        if t.transfer_id.is_some() {
            return Err(PayoutError::TransactionAlreadyTransferred { transaction_id: t.id });
        }
        if t.payout_id.is_some() {
            return Err(PayoutError::TransactionAlreadyPaidOut { transaction_id: t.id });
        }
        balance = balance.saturating_add(t.amount);
    }
    if balance != amount {
        return Err(PayoutError::AmountBalanceMismatch {
            requested: amount,
            balance,
        });
    }
    Ok(transactions.iter().map(|t| t.id).collect())
}
