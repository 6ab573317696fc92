//! Payout stream read model.

use std::sync::Arc;

use payout_shared::types::{OffsetPage, PayoutAccountId, StreamPage};
use serde::{Deserialize, Serialize};

use super::error::PayoutError;
use crate::domain::{Payout, PayoutQuery, PspPayoutRequest};
use crate::store::{PayoutStore, PspPayoutRequestStore};

/// A payout with its latest provider submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutStreamItem {
    /// The payout.
    #[serde(flatten)]
    pub payout: Payout,
    /// Audit row with the highest id for this payout, if any.
    pub psp_payout_request: Option<PspPayoutRequest>,
}

/// Pages through an account's payouts, newest first.
pub struct PayoutStreamReader {
    payouts: Arc<dyn PayoutStore>,
    psp_requests: Arc<dyn PspPayoutRequestStore>,
}

impl PayoutStreamReader {
    /// Creates a reader.
    #[must_use]
    pub fn new(
        payouts: Arc<dyn PayoutStore>,
        psp_requests: Arc<dyn PspPayoutRequestStore>,
    ) -> Self {
        Self {
            payouts,
            psp_requests,
        }
    }

    /// Returns one page of the account's payouts.
    pub async fn list(
        &self,
        account_id: PayoutAccountId,
        page: OffsetPage,
    ) -> Result<StreamPage<PayoutStreamItem>, PayoutError> {
        let payouts = self
            .payouts
            .list_payouts(&PayoutQuery {
                payout_account_id: Some(account_id),
                offset: page.offset,
                limit: Some(page.limit),
                ..PayoutQuery::default()
            })
            .await?;
        let ids: Vec<_> = payouts.iter().map(|p| p.id).collect();
        let requests = if ids.is_empty() {
            Vec::new()
        } else {
            self.psp_requests.list_psp_payout_requests(&ids).await?
        };
        Ok(StreamPage::new(merge_latest_requests(payouts, requests), page))
    }
}

/// Pairs each payout with its highest-id audit row.
///
/// `payouts` must be ordered by id descending. Audit rows are sorted by
/// `(payout_id desc, id desc)` and walked once with a cursor that only moves
/// forward, so the merge is linear in payouts plus audit rows.
#[must_use]
pub fn merge_latest_requests(
    payouts: Vec<Payout>,
    mut requests: Vec<PspPayoutRequest>,
) -> Vec<PayoutStreamItem> {
    requests.sort_unstable_by(|a, b| b.payout_id.cmp(&a.payout_id).then(b.id.cmp(&a.id)));

    let mut cursor = 0;
    payouts
        .into_iter()
        .map(|payout| {
            while cursor < requests.len() && requests[cursor].payout_id > payout.id {
                cursor += 1;
            }
            let latest = requests
                .get(cursor)
                .filter(|r| r.payout_id == payout.id)
                .cloned();
            PayoutStreamItem {
                payout,
                psp_payout_request: latest,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "stream_props.rs"]
mod props;
