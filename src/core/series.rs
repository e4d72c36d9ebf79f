//! Series controller - creates, pays, edits and deletes occurrences of a series.
//!
//! Every operation validates its input before the first store call, so a
//! rejected request never leaves a partial write behind. The controller never
//! reads a clock: callers pass `today` explicitly wherever a default date is
//! needed.
//!
//! Root policy: deleting the root with [`delete_one`] promotes the earliest
//! remaining occurrence to root, so every non-empty series always has exactly
//! one root.

use crate::{
    core::{
        definition::ObligationDefinition,
        kind::strategy_for,
        materializer::{materialize, materialize_next},
        store::{OccurrencePatch, OccurrenceStore},
    },
    entities::{OccurrenceState, occurrence},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DbErr;
use tracing::{debug, info, instrument, warn};

/// Result of materializing and persisting a definition
#[derive(Clone, Debug, PartialEq)]
pub struct CreatedSeries {
    /// Id shared by every occurrence of the series
    pub series_id: i64,
    /// Occurrences in due-date order, the root first
    pub occurrences: Vec<occurrence::Model>,
}

/// Edits applied to a single occurrence. They never propagate to siblings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccurrenceEdit {
    /// New amount, must be positive
    pub amount: Option<Decimal>,
    /// New due date, must stay between the neighbouring occurrences
    pub due_date: Option<NaiveDate>,
    /// New concept, trimmed and non-empty
    pub concept: Option<String>,
    /// `Some(None)` clears the category
    pub category: Option<Option<String>>,
    /// `Some(None)` clears the account reference
    pub account_id: Option<Option<i64>>,
    /// `Some(None)` clears the note
    pub note: Option<Option<String>>,
}

async fn require<S: OccurrenceStore>(store: &S, id: i64) -> Result<occurrence::Model> {
    store
        .get_occurrence(id)
        .await?
        .ok_or(Error::NotFound { id })
}

fn sequence_of(occurrence: &occurrence::Model) -> Option<(u32, u32)> {
    let index = u32::try_from(occurrence.sequence_index?).ok()?;
    let total = u32::try_from(occurrence.sequence_total?).ok()?;
    Some((index, total))
}

/// Expands a definition and persists the whole series in one atomic batch.
///
/// # Arguments
/// * `store` - Occurrence store
/// * `definition` - The obligation to expand
///
/// # Errors
/// Any validation error from [`materialize`], or `StorageFailure` if the batch
/// could not be written.
#[instrument(skip(store, definition), fields(kind = ?definition.kind()))]
pub async fn create_series<S: OccurrenceStore>(
    store: &S,
    definition: &ObligationDefinition,
) -> Result<CreatedSeries> {
    let specs = materialize(definition)?;
    debug!(count = specs.len(), "Materialized definition");

    let occurrences = store.create_occurrences(specs).await?;
    let series_id = occurrences
        .first()
        .map(|root| root.series_id)
        .ok_or(Error::StorageFailure(DbErr::RecordNotInserted))?;

    info!(series_id, count = occurrences.len(), "Created series");
    Ok(CreatedSeries {
        series_id,
        occurrences,
    })
}

/// Marks an occurrence as paid.
///
/// `paid_date` defaults to `today` and may be backdated, but never later than
/// `today`. Paying an already paid occurrence only replaces its `paid_date`.
///
/// # Arguments
/// * `store` - Occurrence store
/// * `occurrence_id` - ID of the occurrence to pay
/// * `paid_date` - Payment date, `None` for `today`
/// * `today` - Current date supplied by the caller
///
/// # Errors
/// `InvalidPaymentDate` for a future `paid_date`, `NotFound` for an unknown id.
#[instrument(skip(store))]
pub async fn mark_paid<S: OccurrenceStore>(
    store: &S,
    occurrence_id: i64,
    paid_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<occurrence::Model> {
    let paid_date = paid_date.unwrap_or(today);
    if paid_date > today {
        return Err(Error::InvalidPaymentDate { paid_date, today });
    }

    let paid = store
        .update_occurrence(
            occurrence_id,
            OccurrencePatch {
                state: Some(OccurrenceState::Paid),
                paid_date: Some(Some(paid_date)),
                ..Default::default()
            },
        )
        .await?;
    info!(occurrence_id, %paid_date, "Marked occurrence paid");
    Ok(paid)
}

/// Returns an occurrence to pending and clears its payment date.
#[instrument(skip(store))]
pub async fn mark_pending<S: OccurrenceStore>(
    store: &S,
    occurrence_id: i64,
) -> Result<occurrence::Model> {
    let pending = store
        .update_occurrence(
            occurrence_id,
            OccurrencePatch {
                state: Some(OccurrenceState::Pending),
                paid_date: Some(None),
                ..Default::default()
            },
        )
        .await?;
    info!(occurrence_id, "Marked occurrence pending");
    Ok(pending)
}

/// Edits amount, date or pass-through attributes of one occurrence.
///
/// A new due date must stay strictly between the neighbouring occurrences of
/// the series. A new concept also refreshes the label.
#[instrument(skip(store, edit))]
pub async fn edit_occurrence<S: OccurrenceStore>(
    store: &S,
    occurrence_id: i64,
    edit: OccurrenceEdit,
) -> Result<occurrence::Model> {
    if let Some(amount) = edit.amount.filter(|amount| *amount <= Decimal::ZERO) {
        return Err(Error::InvalidAmount { amount });
    }
    let concept = match edit.concept {
        Some(concept) if concept.trim().is_empty() => {
            return Err(Error::InvalidScheduleParameter {
                message: "concept cannot be empty".to_string(),
            });
        }
        Some(concept) => Some(concept.trim().to_string()),
        None => None,
    };

    let target = require(store, occurrence_id).await?;

    if let Some(due_date) = edit.due_date {
        let series = store.get_series(target.series_id).await?;
        let position = series
            .iter()
            .position(|o| o.id == target.id)
            .ok_or(Error::NotFound { id: occurrence_id })?;
        let after_previous = position == 0 || series[position - 1].due_date < due_date;
        let before_next = series
            .get(position + 1)
            .is_none_or(|next| due_date < next.due_date);
        if !(after_previous && before_next) {
            return Err(Error::InvalidScheduleParameter {
                message: format!(
                    "due date {due_date} would break the order of series {}",
                    target.series_id
                ),
            });
        }
    }

    let label = concept
        .as_deref()
        .map(|concept| strategy_for(target.kind).label.compose(concept, sequence_of(&target)));

    let edited = store
        .update_occurrence(
            occurrence_id,
            OccurrencePatch {
                amount: edit.amount,
                due_date: edit.due_date,
                concept,
                label,
                category: edit.category,
                account_id: edit.account_id,
                note: edit.note,
                ..Default::default()
            },
        )
        .await?;
    info!(occurrence_id, "Edited occurrence");
    Ok(edited)
}

/// Enables or disables an occurrence without touching its payment state.
#[instrument(skip(store))]
pub async fn set_active<S: OccurrenceStore>(
    store: &S,
    occurrence_id: i64,
    active: bool,
) -> Result<occurrence::Model> {
    store
        .update_occurrence(
            occurrence_id,
            OccurrencePatch {
                active: Some(active),
                ..Default::default()
            },
        )
        .await
}

/// Returns the whole series an occurrence belongs to.
pub async fn get_series_for<S: OccurrenceStore>(
    store: &S,
    occurrence_id: i64,
) -> Result<Vec<occurrence::Model>> {
    let target = require(store, occurrence_id).await?;
    store.get_series(target.series_id).await
}

/// Deletes exactly one occurrence.
///
/// Deleting the root promotes the earliest remaining sibling to root in the same
/// atomic store call.
///
/// # Arguments
/// * `store` - Occurrence store
/// * `occurrence_id` - ID of the occurrence to remove
#[instrument(skip(store))]
pub async fn delete_one<S: OccurrenceStore>(store: &S, occurrence_id: i64) -> Result<()> {
    let target = require(store, occurrence_id).await?;

    match store.delete_occurrence(occurrence_id).await? {
        Some(new_root) => info!(
            occurrence_id,
            series_id = target.series_id,
            new_root,
            "Deleted root occurrence and promoted successor"
        ),
        None => info!(occurrence_id, series_id = target.series_id, "Deleted occurrence"),
    }
    Ok(())
}

/// Deletes an occurrence and every later occurrence of its series.
///
/// Occurrences due before the target are left untouched. Returns the number of
/// rows removed.
#[instrument(skip(store))]
pub async fn delete_series_from<S: OccurrenceStore>(store: &S, occurrence_id: i64) -> Result<u64> {
    let target = require(store, occurrence_id).await?;
    let removed = store
        .delete_series_from(target.series_id, target.due_date)
        .await?;
    info!(
        occurrence_id,
        series_id = target.series_id,
        from = %target.due_date,
        removed,
        "Deleted series from occurrence"
    );
    Ok(removed)
}

/// Grows an open-ended series by one occurrence once its latest one is consumed.
///
/// The latest occurrence counts as consumed when it is paid or due on or before
/// `today`. A deactivated latest occurrence stops the series from growing.
/// Returns the new occurrence, or `None` when nothing was due.
///
/// # Errors
/// `SeriesNotFound` for an unknown series, `InvalidScheduleParameter` for a
/// series with a fixed duration.
#[instrument(skip(store))]
pub async fn extend_open_series<S: OccurrenceStore>(
    store: &S,
    series_id: i64,
    today: NaiveDate,
) -> Result<Option<occurrence::Model>> {
    let series = store.get_series(series_id).await?;
    let latest = series.last().ok_or(Error::SeriesNotFound { series_id })?;

    let spec = materialize_next(latest)?;
    if !latest.active || !(latest.is_paid() || latest.due_date <= today) {
        debug!(series_id, latest = latest.id, "Open series not due to grow");
        return Ok(None);
    }

    let appended = store.append_occurrence(series_id, spec).await?;
    info!(
        series_id,
        occurrence_id = appended.id,
        due_date = %appended.due_date,
        "Extended open series"
    );
    Ok(Some(appended))
}

/// Runs one growth step over every open-ended series.
///
/// A series that fails to grow is logged and skipped so the rest of the sweep
/// still runs.
///
/// # Arguments
/// * `store` - Occurrence store
/// * `today` - Date the sweep runs for
///
/// # Returns
/// The occurrences created by this sweep
///
/// # Errors
/// Only when the open series themselves cannot be listed.
pub async fn extend_all_open_series<S: OccurrenceStore>(
    store: &S,
    today: NaiveDate,
) -> Result<Vec<occurrence::Model>> {
    let mut created = Vec::new();
    for root in store.open_series_roots().await? {
        match extend_open_series(store, root.series_id, today).await {
            Ok(Some(next)) => created.push(next),
            Ok(None) => {}
            Err(e) => warn!(series_id = root.series_id, error = %e, "Skipping open series"),
        }
    }
    Ok(created)
}
