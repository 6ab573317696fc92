//! Payout ledger schema.
//!
//! Creates accounts, sub-accounts, payout methods and cards, ledger
//! transactions, payouts and their audit tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(LEDGER_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS psp_payout_requests CASCADE;
DROP TABLE IF EXISTS topup_transfers CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS payouts CASCADE;
DROP TABLE IF EXISTS payout_cards CASCADE;
DROP TABLE IF EXISTS payout_methods CASCADE;
DROP TABLE IF EXISTS payout_accounts CASCADE;
DROP TABLE IF EXISTS pgp_sub_accounts CASCADE;
",
        )
        .await?;
        Ok(())
    }
}

const LEDGER_SQL: &str = r"
-- PSP-held sub-accounts funds are paid out from
CREATE TABLE pgp_sub_accounts (
    id BIGSERIAL PRIMARY KEY,
    external_account_id VARCHAR(255) NOT NULL UNIQUE,
    country CHAR(2) NOT NULL,
    verification_disabled_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE payout_accounts (
    id BIGSERIAL PRIMARY KEY,
    entity VARCHAR(50) NOT NULL,
    pgp_sub_account_id BIGINT REFERENCES pgp_sub_accounts(id),
    pgp_provider VARCHAR(50),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE payout_methods (
    id BIGSERIAL PRIMARY KEY,
    payout_account_id BIGINT NOT NULL REFERENCES payout_accounts(id),
    type VARCHAR(50) NOT NULL,
    is_default BOOLEAN NOT NULL DEFAULT false,
    currency VARCHAR(3) NOT NULL,
    country CHAR(2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);

-- At most one active default method per account
CREATE UNIQUE INDEX idx_payout_methods_default
    ON payout_methods(payout_account_id)
    WHERE is_default AND deleted_at IS NULL;

CREATE INDEX idx_payout_methods_account
    ON payout_methods(payout_account_id) WHERE deleted_at IS NULL;

CREATE TABLE payout_cards (
    id BIGINT PRIMARY KEY REFERENCES payout_methods(id),
    external_card_id VARCHAR(255) NOT NULL,
    last4 VARCHAR(4) NOT NULL,
    brand VARCHAR(50) NOT NULL,
    exp_month INTEGER NOT NULL,
    exp_year INTEGER NOT NULL,
    fingerprint VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE payouts (
    id BIGSERIAL PRIMARY KEY,
    payout_account_id BIGINT NOT NULL REFERENCES payout_accounts(id),
    amount BIGINT NOT NULL,
    fee BIGINT NOT NULL,
    currency VARCHAR(3) NOT NULL,
    status VARCHAR(20) NOT NULL,
    idempotency_key VARCHAR(255) NOT NULL UNIQUE,
    payout_method_id BIGINT NOT NULL REFERENCES payout_methods(id),
    transaction_ids JSONB NOT NULL DEFAULT '[]'::jsonb,
    error JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payouts_amount CHECK (amount >= 0 AND fee >= 0),
    CONSTRAINT chk_payouts_status CHECK (
        status IN ('new', 'pending', 'paid', 'cancelled', 'canceled', 'failed', 'error')
    )
);

-- Daily limit and stream reads
CREATE INDEX idx_payouts_account_created ON payouts(payout_account_id, created_at DESC);

-- Retry scan
CREATE INDEX idx_payouts_new_created ON payouts(created_at) WHERE status = 'new';

-- Ledger transactions owed to an account
CREATE TABLE transactions (
    id BIGSERIAL PRIMARY KEY,
    payout_account_id BIGINT NOT NULL REFERENCES payout_accounts(id),
    amount BIGINT NOT NULL,
    state VARCHAR(20),
    payout_id BIGINT REFERENCES payouts(id),
    transfer_id BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_transactions_unpaid
    ON transactions(payout_account_id, id)
    WHERE payout_id IS NULL AND transfer_id IS NULL;

CREATE INDEX idx_transactions_payout ON transactions(payout_id) WHERE payout_id IS NOT NULL;

CREATE TABLE topup_transfers (
    id BIGSERIAL PRIMARY KEY,
    payout_id BIGINT NOT NULL REFERENCES payouts(id),
    amount BIGINT NOT NULL,
    currency VARCHAR(3) NOT NULL,
    source_account_id VARCHAR(255) NOT NULL,
    destination_account_id VARCHAR(255) NOT NULL,
    idempotency_key VARCHAR(255) NOT NULL UNIQUE,
    external_transfer_id VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_topup_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_topup_transfers_payout ON topup_transfers(payout_id);

-- One row per provider submission; highest id is authoritative
CREATE TABLE psp_payout_requests (
    id BIGSERIAL PRIMARY KEY,
    payout_id BIGINT NOT NULL REFERENCES payouts(id),
    idempotency_key VARCHAR(255) NOT NULL,
    psp_payout_id VARCHAR(255),
    status VARCHAR(20) NOT NULL,
    request JSONB NOT NULL,
    response JSONB,
    received_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_psp_payout_requests_payout ON psp_payout_requests(payout_id, id DESC);
";
