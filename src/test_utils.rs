//! Shared test utilities for the series engine.
//!
//! This module provides common helpers for setting up test databases and
//! building obligation definitions with sensible defaults.

use crate::{
    core::{
        definition::{ObligationDefinition, RecurringDuration, Terms},
        store::SeaOrmStore,
    },
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all store-backed tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Wraps a fresh in-memory database in a [`SeaOrmStore`].
pub async fn setup_test_store() -> Result<SeaOrmStore> {
    Ok(SeaOrmStore::new(setup_test_db().await?))
}

/// Builds a calendar date, panicking on invalid input.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A loan of 250.00 per installment starting on 2024-01-15.
pub fn loan_definition(total_installments: u32, installments_paid: u32) -> ObligationDefinition {
    ObligationDefinition::new(
        Terms::Loan {
            total_installments,
            installments_paid,
        },
        "Car loan",
        dec!(250.00),
        date(2024, 1, 15),
    )
}

/// A savings goal with nothing saved before entry, starting on 2024-03-01.
pub fn savings_definition(
    target_months: u32,
    months_saved: u32,
    monthly: Decimal,
) -> ObligationDefinition {
    ObligationDefinition::new(
        Terms::SavingsGoal {
            target_months,
            months_saved,
            amount_saved: Decimal::ZERO,
        },
        "Emergency fund",
        monthly,
        date(2024, 3, 1),
    )
}

/// A monthly expense of 75.50 covering `months` months from 2024-01-15.
pub fn monthly_expense(months: u32) -> ObligationDefinition {
    ObligationDefinition::new(
        Terms::RecurringExpense {
            duration: RecurringDuration::Months(months),
        },
        "Internet",
        dec!(75.50),
        date(2024, 1, 15),
    )
}

/// An open-ended monthly expense due on the 31st, starting 2024-01-31.
pub fn open_expense() -> ObligationDefinition {
    ObligationDefinition::new(
        Terms::RecurringExpense {
            duration: RecurringDuration::Open,
        },
        "Rent",
        dec!(950),
        date(2024, 1, 31),
    )
}
