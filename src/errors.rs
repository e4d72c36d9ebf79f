//! Unified error type for the series engine.
//!
//! Validation variants are raised before any storage call is made, so a failed
//! request never leaves a partial series behind. `StorageFailure` is the only
//! variant that originates below the engine and is passed through unchanged.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// All errors produced by the engine
#[derive(Debug, Error)]
pub enum Error {
    /// Bad day-of-month, frequency, concept or date ordering
    #[error("Invalid schedule parameter: {message}")]
    InvalidScheduleParameter {
        /// What was wrong with the schedule
        message: String,
    },

    /// Loan progress out of range (`0 <= paid < total` is required)
    #[error("Invalid installment count: {paid} already paid of {total}")]
    InvalidInstallmentCount {
        /// Installments reported as already paid
        paid: u32,
        /// Total installments of the loan
        total: u32,
    },

    /// Savings progress out of range (`0 <= saved < target` is required)
    #[error("Invalid goal progress: {saved} months saved of {target}")]
    InvalidGoalProgress {
        /// Months reported as already saved
        saved: u32,
        /// Target month count of the goal
        target: u32,
    },

    /// Nothing is left to materialize for a bounded series
    #[error("Series already complete: {completed} of {total}")]
    SeriesAlreadyComplete {
        /// Count already completed before entry
        completed: u32,
        /// Total count of the series
        total: u32,
    },

    /// Amount not strictly positive, or a negative saved amount
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Payment recorded after the current date
    #[error("Invalid payment date {paid_date}: later than {today}")]
    InvalidPaymentDate {
        /// The rejected payment date
        paid_date: NaiveDate,
        /// Current date supplied by the caller
        today: NaiveDate,
    },

    /// Occurrence id unknown
    #[error("Occurrence not found: {id}")]
    NotFound {
        /// The requested occurrence id
        id: i64,
    },

    /// No occurrence belongs to the series
    #[error("Series not found: {series_id}")]
    SeriesNotFound {
        /// The requested series id
        series_id: i64,
    },

    /// The store aborted the operation
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] sea_orm::DbErr),

    /// Settings file could not be parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Parser message
        message: String,
    },

    /// Settings file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
