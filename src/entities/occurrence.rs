//! Occurrence entity - One dated, independently payable instance of an obligation.
//!
//! Every occurrence belongs to exactly one series. The first occurrence created for
//! a series is its root: its `series_id` equals its own `id`, and every sibling's
//! `root_id` points at it. `sequence_index`/`sequence_total` are only populated for
//! loans and savings goals, where they drive the `"Cuota X/N"` and `"Mes X/N"` labels.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The four obligation kinds understood by the engine
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ObligationKind {
    /// Repeating outflow (rent, subscriptions)
    #[sea_orm(string_value = "recurring_expense")]
    RecurringExpense,
    /// Repeating inflow (salary)
    #[sea_orm(string_value = "recurring_income")]
    RecurringIncome,
    /// Fixed number of installments
    #[sea_orm(string_value = "loan")]
    Loan,
    /// Fixed number of monthly contributions
    #[sea_orm(string_value = "savings_goal")]
    SavingsGoal,
}

/// Payment state of a single occurrence. `Paid` iff `paid_date` is set.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum OccurrenceState {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
}

/// Occurrence database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "occurrences")]
pub struct Model {
    /// Unique identifier for the occurrence
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Shared by all occurrences generated from one definition (the root's id)
    #[sea_orm(indexed)]
    pub series_id: i64,
    /// Id of the current root of the series
    pub root_id: i64,
    /// Whether this occurrence is the root of its series
    pub is_root: bool,
    pub kind: ObligationKind,
    /// Free-text concept entered by the user (e.g. "Rent", "Car loan")
    pub concept: String,
    /// Display label, the concept composed with the sequence marker when bounded
    pub label: String,
    /// 1-based position for loans and savings goals
    pub sequence_index: Option<i32>,
    /// Total installments or months for loans and savings goals
    pub sequence_total: Option<i32>,
    /// Date the occurrence becomes payable
    pub due_date: Date,
    /// Day-of-month the series was scheduled on, kept for lazy growth
    pub day_of_month: i32,
    /// Months between consecutive occurrences
    pub frequency_months: i32,
    /// Whether the series has no fixed end and grows one occurrence at a time
    pub open_ended: bool,
    /// Amount due, fixed at materialization time
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub state: OccurrenceState,
    /// When the occurrence was paid, set only while `state` is `Paid`
    pub paid_date: Option<Date>,
    /// Soft-disable flag, independent of payment state
    pub active: bool,
    pub category: Option<String>,
    pub account_id: Option<i64>,
    pub note: Option<String>,
    /// Amount saved before the goal was entered, display only
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub amount_already_saved: Option<Decimal>,
}

/// Occurrences have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the occurrence has been paid
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.state == OccurrenceState::Paid
    }
}
