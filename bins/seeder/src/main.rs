//! Database seeder for instant payout development and testing.
//!
//! Seeds a demo contractor account with a Stripe sub-account, a default
//! debit card old enough to pass the card-change cooldown, and a few unpaid
//! transactions. Re-running skips rows that already exist.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::{Duration, Utc};
use payout_db::entities::{
    payout_accounts, payout_cards, payout_methods, pgp_sub_accounts, transactions,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set};

/// Demo sub-account id (consistent for all seeds)
const DEMO_SUB_ACCOUNT_ID: i64 = 1;
/// Demo payout account id (consistent for all seeds)
const DEMO_ACCOUNT_ID: i64 = 1;
/// Demo card method id (consistent for all seeds)
const DEMO_CARD_ID: i64 = 1;

/// Unpaid transaction amounts in cents.
const DEMO_TRANSACTIONS: [(i64, i64); 3] = [(1, 650), (2, 1_200), (3, 349)];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = payout_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    println!("Seeding PSP sub-account...");
    seed_sub_account(&db).await?;

    println!("Seeding payout account...");
    seed_payout_account(&db).await?;

    println!("Seeding default card...");
    seed_card(&db).await?;

    println!("Seeding unpaid transactions...");
    seed_transactions(&db).await?;

    println!("Advancing id sequences...");
    sync_sequences(&db).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Seeds the Stripe sub-account the demo account pays out from.
async fn seed_sub_account(db: &DatabaseConnection) -> anyhow::Result<()> {
    if pgp_sub_accounts::Entity::find_by_id(DEMO_SUB_ACCOUNT_ID)
        .one(db)
        .await?
        .is_some()
    {
        println!("  Sub-account already exists, skipping...");
        return Ok(());
    }

    pgp_sub_accounts::ActiveModel {
        id: Set(DEMO_SUB_ACCOUNT_ID),
        external_account_id: Set("acct_demo_contractor".to_string()),
        country: Set("US".to_string()),
        verification_disabled_reason: Set(None),
        created_at: Set((Utc::now() - Duration::days(90)).into()),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Seeds an individual contractor account linked to the sub-account.
async fn seed_payout_account(db: &DatabaseConnection) -> anyhow::Result<()> {
    if payout_accounts::Entity::find_by_id(DEMO_ACCOUNT_ID)
        .one(db)
        .await?
        .is_some()
    {
        println!("  Payout account already exists, skipping...");
        return Ok(());
    }

    payout_accounts::ActiveModel {
        id: Set(DEMO_ACCOUNT_ID),
        entity: Set("individual_contractor".to_string()),
        pgp_sub_account_id: Set(Some(DEMO_SUB_ACCOUNT_ID)),
        pgp_provider: Set(Some("stripe".to_string())),
        created_at: Set((Utc::now() - Duration::days(90)).into()),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Seeds a default debit card added 30 days ago.
async fn seed_card(db: &DatabaseConnection) -> anyhow::Result<()> {
    if payout_methods::Entity::find_by_id(DEMO_CARD_ID)
        .one(db)
        .await?
        .is_some()
    {
        println!("  Card already exists, skipping...");
        return Ok(());
    }

    let added = (Utc::now() - Duration::days(30)).into();
    payout_methods::ActiveModel {
        id: Set(DEMO_CARD_ID),
        payout_account_id: Set(DEMO_ACCOUNT_ID),
        method_type: Set("card".to_string()),
        is_default: Set(true),
        currency: Set("usd".to_string()),
        country: Set("US".to_string()),
        created_at: Set(added),
        deleted_at: Set(None),
    }
    .insert(db)
    .await?;

    payout_cards::ActiveModel {
        id: Set(DEMO_CARD_ID),
        external_card_id: Set("card_demo_visa".to_string()),
        last4: Set("4242".to_string()),
        brand: Set("visa".to_string()),
        exp_month: Set(12),
        exp_year: Set(2030),
        fingerprint: Set("fp_demo_visa".to_string()),
        created_at: Set(added),
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Seeds unpaid transactions owed to the demo account.
async fn seed_transactions(db: &DatabaseConnection) -> anyhow::Result<()> {
    let mut inserted = 0;
    for (id, amount) in DEMO_TRANSACTIONS {
        let transaction = transactions::ActiveModel {
            id: Set(id),
            payout_account_id: Set(DEMO_ACCOUNT_ID),
            amount: Set(amount),
            state: Set(Some("active".to_string())),
            payout_id: Set(None),
            transfer_id: Set(None),
            created_at: Set((Utc::now() - Duration::days(2)).into()),
        };

        if let Err(e) = transaction.insert(db).await {
            if !e.to_string().contains("duplicate key") {
                eprintln!("Failed to insert transaction {id}: {e}");
            }
        } else {
            inserted += 1;
        }
    }
    println!("  Inserted {inserted} transactions");
    Ok(())
}

/// Moves each id sequence past the fixed ids inserted above.
async fn sync_sequences(db: &DatabaseConnection) -> anyhow::Result<()> {
    for table in [
        "pgp_sub_accounts",
        "payout_accounts",
        "payout_methods",
        "transactions",
    ] {
        db.execute_unprepared(&format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             GREATEST((SELECT MAX(id) FROM {table}), 1))"
        ))
        .await?;
    }
    Ok(())
}
