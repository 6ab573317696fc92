//! Property-based tests for the payout stream merge.

use std::collections::BTreeMap;

use chrono::Utc;
use payout_shared::types::{PayoutAccountId, PayoutId, PayoutMethodId, PspPayoutRequestId};
use proptest::prelude::*;
use serde_json::Value;

use super::*;
use crate::domain::PayoutStatus;

fn payout(id: i64) -> Payout {
    let now = Utc::now();
    Payout {
        id: PayoutId::new(id),
        payout_account_id: PayoutAccountId::new(1),
        amount: 1000,
        fee: 199,
        currency: "usd".to_string(),
        status: PayoutStatus::Pending,
        idempotency_key: format!("key-{id}"),
        payout_method_id: PayoutMethodId::new(1),
        transaction_ids: Vec::new(),
        error: None,
        created_at: now,
        updated_at: now,
    }
}

fn request(id: i64, payout_id: i64) -> PspPayoutRequest {
    let now = Utc::now();
    PspPayoutRequest {
        id: PspPayoutRequestId::new(id),
        payout_id: PayoutId::new(payout_id),
        idempotency_key: format!("key-{payout_id}"),
        psp_payout_id: None,
        status: PayoutStatus::New,
        request: Value::Null,
        response: None,
        received_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Distinct payout ids plus audit rows pointing at a subset of them.
fn arb_stream() -> impl Strategy<Value = (Vec<i64>, Vec<(i64, i64)>)> {
    prop::collection::btree_set(1_i64..200, 0..30).prop_flat_map(|ids| {
        let ids: Vec<i64> = ids.into_iter().collect();
        let pick = if ids.is_empty() {
            Just(Vec::new()).boxed()
        } else {
            prop::collection::vec(prop::sample::select(ids.clone()), 0..60).boxed()
        };
        (Just(ids), pick).prop_map(|(ids, targets)| {
            let rows = targets
                .into_iter()
                .enumerate()
                .map(|(i, payout_id)| (i64::try_from(i).unwrap() + 1, payout_id))
                .collect();
            (ids, rows)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every payout gets the highest-id audit row sharing its payout id.
    #[test]
    fn prop_merge_picks_latest_row((ids, rows) in arb_stream()) {
        let mut payouts: Vec<Payout> = ids.iter().copied().map(payout).collect();
        payouts.sort_by(|a, b| b.id.cmp(&a.id));
        let requests: Vec<_> = rows.iter().map(|&(id, p)| request(id, p)).collect();

        let mut expected: BTreeMap<i64, i64> = BTreeMap::new();
        for &(id, p) in &rows {
            let best = expected.entry(p).or_insert(id);
            *best = (*best).max(id);
        }

        let items = merge_latest_requests(payouts.clone(), requests);

        prop_assert_eq!(items.len(), payouts.len());
        for (item, original) in items.iter().zip(&payouts) {
            prop_assert_eq!(item.payout.id, original.id);
            let got = item.psp_payout_request.as_ref().map(|r| r.id.into_inner());
            prop_assert_eq!(got, expected.get(&original.id.into_inner()).copied());
        }
    }

    /// A next offset is present exactly when the page came back full.
    #[test]
    fn prop_next_offset_iff_full_page(count in 0_u64..20, limit in 1_u64..20, offset in 0_u64..100) {
        let count = count.min(limit);
        let items: Vec<u64> = (0..count).collect();
        let page = StreamPage::new(items, OffsetPage::new(limit, offset));

        prop_assert_eq!(page.count, count);
        if count == limit {
            prop_assert_eq!(page.next_offset, Some(offset + count));
        } else {
            prop_assert_eq!(page.next_offset, None);
        }
    }
}

#[test]
fn test_merge_handles_rows_for_payouts_outside_page() {
    let payouts = vec![payout(5), payout(3)];
    let requests = vec![request(1, 3), request(2, 9), request(3, 4), request(4, 3)];

    let items = merge_latest_requests(payouts, requests);

    assert!(items[0].psp_payout_request.is_none());
    assert_eq!(
        items[1].psp_payout_request.as_ref().map(|r| r.id),
        Some(PspPayoutRequestId::new(4))
    );
}
