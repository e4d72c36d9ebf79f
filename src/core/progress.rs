//! Series progress - how much of a series has been paid and what is still pending.
//!
//! This is the per-series view the display layer groups occurrences by. It only
//! reads already materialized occurrences and never changes them.

use crate::{
    core::store::OccurrenceStore,
    entities::{ObligationKind, occurrence},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Progress summary of one series
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeriesProgress {
    pub series_id: i64,
    pub kind: ObligationKind,
    /// Occurrences currently stored for the series
    pub occurrence_count: usize,
    /// Occurrences marked paid
    pub paid_count: usize,
    /// Occurrences still pending, active or not
    pub pending_count: usize,
    /// Sum of paid amounts
    pub paid_amount: Decimal,
    /// Sum of pending amounts
    pub pending_amount: Decimal,
    /// Total installments or months, for loans and savings goals
    pub sequence_total: Option<i32>,
    /// Installments or months completed before the earliest stored occurrence
    pub completed_before_entry: Option<i32>,
    /// Amount saved before a savings goal was entered
    pub amount_already_saved: Option<Decimal>,
    /// Due date of the earliest active pending occurrence
    pub next_due_date: Option<NaiveDate>,
}

/// Summarizes a series given its occurrences in due-date order.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn summarize(occurrences: &[occurrence::Model]) -> Option<SeriesProgress> {
    let first = occurrences.first()?;

    let (paid, pending): (Vec<_>, Vec<_>) = occurrences.iter().partition(|o| o.is_paid());

    Some(SeriesProgress {
        series_id: first.series_id,
        kind: first.kind,
        occurrence_count: occurrences.len(),
        paid_count: paid.len(),
        pending_count: pending.len(),
        paid_amount: paid.iter().map(|o| o.amount).sum(),
        pending_amount: pending.iter().map(|o| o.amount).sum(),
        sequence_total: first.sequence_total,
        completed_before_entry: first.sequence_index.map(|index| index - 1),
        amount_already_saved: occurrences.iter().find_map(|o| o.amount_already_saved),
        next_due_date: pending
            .iter()
            .filter(|o| o.active)
            .map(|o| o.due_date)
            .min(),
    })
}

/// Loads a series and summarizes it.
///
/// # Errors
/// `SeriesNotFound` when no occurrence belongs to the series.
pub async fn series_progress<S: OccurrenceStore>(
    store: &S,
    series_id: i64,
) -> Result<SeriesProgress> {
    let occurrences = store.get_series(series_id).await?;
    summarize(&occurrences).ok_or(Error::SeriesNotFound { series_id })
}
