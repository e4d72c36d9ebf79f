//! Obligation definitions - the user-entered request a series is expanded from.
//!
//! A definition is never persisted as-is. The kind-specific part lives in
//! [`Terms`], a tagged union, so a loan can never carry a savings balance and a
//! recurring expense can never carry an installment count.

use crate::entities::ObligationKind;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Duration of a recurring expense or income
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringDuration {
    /// Covers a fixed number of months from the start date
    Months(u32),
    /// No end date, the series grows one occurrence at a time
    Open,
}

/// Kind-specific terms of a definition
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Terms {
    /// Repeating outflow
    RecurringExpense {
        /// How long the expense repeats
        duration: RecurringDuration,
    },
    /// Repeating inflow
    RecurringIncome {
        /// How long the income repeats
        duration: RecurringDuration,
    },
    /// Installment series
    Loan {
        /// Total number of installments of the loan
        total_installments: u32,
        /// Installments already paid before the loan was entered
        #[serde(default)]
        installments_paid: u32,
    },
    /// Monthly contribution series
    SavingsGoal {
        /// Number of monthly contributions needed to reach the goal
        target_months: u32,
        /// Months already saved before the goal was entered
        #[serde(default)]
        months_saved: u32,
        /// Amount already saved before the goal was entered, display only
        #[serde(default)]
        amount_saved: Decimal,
    },
}

impl Terms {
    #[must_use]
    pub const fn kind(&self) -> ObligationKind {
        match self {
            Self::RecurringExpense { .. } => ObligationKind::RecurringExpense,
            Self::RecurringIncome { .. } => ObligationKind::RecurringIncome,
            Self::Loan { .. } => ObligationKind::Loan,
            Self::SavingsGoal { .. } => ObligationKind::SavingsGoal,
        }
    }

    /// Whether the series has no fixed end
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(
            self,
            Self::RecurringExpense {
                duration: RecurringDuration::Open
            } | Self::RecurringIncome {
                duration: RecurringDuration::Open
            }
        )
    }
}

fn default_frequency() -> u32 {
    1
}

/// A request to create a series of occurrences
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationDefinition {
    #[serde(flatten)]
    pub terms: Terms,
    /// Free-text concept shown on every occurrence
    pub concept: String,
    /// Amount of each occurrence
    pub amount: Decimal,
    /// Due date of the first occurrence
    pub start_date: NaiveDate,
    /// Months between occurrences
    #[serde(default = "default_frequency")]
    pub frequency_months: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ObligationDefinition {
    /// Creates a definition with a monthly frequency and no pass-through attributes.
    #[must_use]
    pub fn new(
        terms: Terms,
        concept: impl Into<String>,
        amount: Decimal,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            terms,
            concept: concept.into(),
            amount,
            start_date,
            frequency_months: default_frequency(),
            category: None,
            account_id: None,
            note: None,
        }
    }

    /// A non-recurring expense: a series of exactly one occurrence.
    #[must_use]
    pub fn one_off(concept: impl Into<String>, amount: Decimal, date: NaiveDate) -> Self {
        Self::new(
            Terms::RecurringExpense {
                duration: RecurringDuration::Months(1),
            },
            concept,
            amount,
            date,
        )
    }

    #[must_use]
    pub const fn with_frequency(mut self, frequency_months: u32) -> Self {
        self.frequency_months = frequency_months;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub const fn with_account(mut self, account_id: i64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ObligationKind {
        self.terms.kind()
    }
}
