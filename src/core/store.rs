//! Occurrence store - the persistence seam the series engine depends on.
//!
//! [`OccurrenceStore`] is the whole surface the engine needs from storage. Bulk
//! creation, cascade deletion and root reassignment are required to be atomic:
//! either every row of the batch is written or removed, or none is.
//! [`SeaOrmStore`] implements the contract on top of a `SeaORM` connection,
//! running each multi-row operation inside a database transaction.

use crate::{
    core::materializer::OccurrenceSpec,
    entities::{Occurrence, OccurrenceState, occurrence},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DbErr, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::debug;

/// Field-level changes applied to one occurrence. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccurrencePatch {
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub concept: Option<String>,
    pub label: Option<String>,
    /// `Some(None)` clears the category
    pub category: Option<Option<String>>,
    /// `Some(None)` clears the account reference
    pub account_id: Option<Option<i64>>,
    /// `Some(None)` clears the note
    pub note: Option<Option<String>>,
    pub state: Option<OccurrenceState>,
    /// `Some(None)` clears the payment date
    pub paid_date: Option<Option<NaiveDate>>,
    pub active: Option<bool>,
}

/// Storage operations required by the series engine
#[allow(async_fn_in_trait)]
pub trait OccurrenceStore {
    /// Persists a whole batch atomically. The first spec becomes the root, and its
    /// id becomes the `series_id` and `root_id` of every row in the batch.
    async fn create_occurrences(&self, batch: Vec<OccurrenceSpec>)
    -> Result<Vec<occurrence::Model>>;

    /// Adds one derived member to an existing series.
    async fn append_occurrence(
        &self,
        series_id: i64,
        spec: OccurrenceSpec,
    ) -> Result<occurrence::Model>;

    async fn get_occurrence(&self, id: i64) -> Result<Option<occurrence::Model>>;

    /// Returns every occurrence of a series ordered by due date.
    async fn get_series(&self, series_id: i64) -> Result<Vec<occurrence::Model>>;

    /// Returns the root occurrence of every open-ended series.
    async fn open_series_roots(&self) -> Result<Vec<occurrence::Model>>;

    async fn update_occurrence(
        &self,
        id: i64,
        patch: OccurrencePatch,
    ) -> Result<occurrence::Model>;

    /// Removes one occurrence. Removing a root promotes the earliest remaining
    /// sibling and repoints every sibling to it in the same transaction.
    ///
    /// Returns the id of the promoted root, or `None` when no promotion happened.
    async fn delete_occurrence(&self, id: i64) -> Result<Option<i64>>;

    /// Atomically removes every occurrence of the series due on or after `from`,
    /// returning how many rows were removed.
    async fn delete_series_from(&self, series_id: i64, from: NaiveDate) -> Result<u64>;
}

fn to_column(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidScheduleParameter {
        message: format!("{field} {value} is out of range"),
    })
}

fn active_model(
    spec: OccurrenceSpec,
    series_id: i64,
    root_id: i64,
    is_root: bool,
) -> Result<occurrence::ActiveModel> {
    Ok(occurrence::ActiveModel {
        series_id: Set(series_id),
        root_id: Set(root_id),
        is_root: Set(is_root),
        kind: Set(spec.kind),
        concept: Set(spec.concept),
        label: Set(spec.label),
        sequence_index: Set(spec
            .sequence_index
            .map(|v| to_column(v, "sequence index"))
            .transpose()?),
        sequence_total: Set(spec
            .sequence_total
            .map(|v| to_column(v, "sequence total"))
            .transpose()?),
        due_date: Set(spec.due_date),
        day_of_month: Set(to_column(spec.day_of_month, "day of month")?),
        frequency_months: Set(to_column(spec.frequency_months, "frequency")?),
        open_ended: Set(spec.open_ended),
        amount: Set(spec.amount),
        state: Set(OccurrenceState::Pending),
        paid_date: Set(None),
        active: Set(true),
        category: Set(spec.category),
        account_id: Set(spec.account_id),
        note: Set(spec.note),
        amount_already_saved: Set(spec.amount_already_saved),
        ..Default::default()
    })
}

/// [`OccurrenceStore`] backed by a `SeaORM` database connection
#[derive(Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl OccurrenceStore for SeaOrmStore {
    async fn create_occurrences(
        &self,
        batch: Vec<OccurrenceSpec>,
    ) -> Result<Vec<occurrence::Model>> {
        let mut specs = batch.into_iter();
        let Some(first) = specs.next() else {
            return Ok(Vec::new());
        };

        // Dropping the transaction on an early return rolls the batch back
        let txn = self.db.begin().await?;

        // The root's id is only known after insert, link it to itself afterwards
        let inserted = active_model(first, 0, 0, true)?.insert(&txn).await?;
        let root_id = inserted.id;
        let mut root: occurrence::ActiveModel = inserted.into();
        root.series_id = Set(root_id);
        root.root_id = Set(root_id);
        let root = root.update(&txn).await?;

        let mut created = Vec::with_capacity(specs.len() + 1);
        created.push(root);
        for spec in specs {
            created.push(active_model(spec, root_id, root_id, false)?.insert(&txn).await?);
        }

        txn.commit().await?;
        debug!(series_id = root_id, count = created.len(), "Inserted series batch");
        Ok(created)
    }

    async fn append_occurrence(
        &self,
        series_id: i64,
        spec: OccurrenceSpec,
    ) -> Result<occurrence::Model> {
        let member = Occurrence::find()
            .filter(occurrence::Column::SeriesId.eq(series_id))
            .one(&self.db)
            .await?
            .ok_or(Error::SeriesNotFound { series_id })?;

        active_model(spec, series_id, member.root_id, false)?
            .insert(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_occurrence(&self, id: i64) -> Result<Option<occurrence::Model>> {
        Occurrence::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn get_series(&self, series_id: i64) -> Result<Vec<occurrence::Model>> {
        Occurrence::find()
            .filter(occurrence::Column::SeriesId.eq(series_id))
            .order_by_asc(occurrence::Column::DueDate)
            .order_by_asc(occurrence::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn open_series_roots(&self) -> Result<Vec<occurrence::Model>> {
        Occurrence::find()
            .filter(occurrence::Column::OpenEnded.eq(true))
            .filter(occurrence::Column::IsRoot.eq(true))
            .order_by_asc(occurrence::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn update_occurrence(
        &self,
        id: i64,
        patch: OccurrencePatch,
    ) -> Result<occurrence::Model> {
        let existing = Occurrence::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(Error::NotFound { id })?;

        let mut model: occurrence::ActiveModel = existing.into();
        if let Some(amount) = patch.amount {
            model.amount = Set(amount);
        }
        if let Some(due_date) = patch.due_date {
            model.due_date = Set(due_date);
        }
        if let Some(concept) = patch.concept {
            model.concept = Set(concept);
        }
        if let Some(label) = patch.label {
            model.label = Set(label);
        }
        if let Some(category) = patch.category {
            model.category = Set(category);
        }
        if let Some(account_id) = patch.account_id {
            model.account_id = Set(account_id);
        }
        if let Some(note) = patch.note {
            model.note = Set(note);
        }
        if let Some(state) = patch.state {
            model.state = Set(state);
        }
        if let Some(paid_date) = patch.paid_date {
            model.paid_date = Set(paid_date);
        }
        if let Some(active) = patch.active {
            model.active = Set(active);
        }

        model.update(&self.db).await.map_err(Into::into)
    }

    async fn delete_occurrence(&self, id: i64) -> Result<Option<i64>> {
        let txn = self.db.begin().await?;

        let target = Occurrence::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(Error::NotFound { id })?;
        let series_id = target.series_id;
        let was_root = target.is_root;
        target.delete(&txn).await?;

        let new_root = if was_root {
            Occurrence::find()
                .filter(occurrence::Column::SeriesId.eq(series_id))
                .order_by_asc(occurrence::Column::DueDate)
                .order_by_asc(occurrence::Column::Id)
                .one(&txn)
                .await?
                .map(|successor| successor.id)
        } else {
            None
        };

        if let Some(new_root) = new_root {
            let promoted = Occurrence::update_many()
                .col_expr(occurrence::Column::IsRoot, Expr::value(true))
                .filter(occurrence::Column::Id.eq(new_root))
                .filter(occurrence::Column::SeriesId.eq(series_id))
                .exec(&txn)
                .await?;
            if promoted.rows_affected != 1 {
                return Err(Error::StorageFailure(DbErr::RecordNotUpdated));
            }
            Occurrence::update_many()
                .col_expr(occurrence::Column::RootId, Expr::value(new_root))
                .filter(occurrence::Column::SeriesId.eq(series_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(new_root)
    }

    async fn delete_series_from(&self, series_id: i64, from: NaiveDate) -> Result<u64> {
        let txn = self.db.begin().await?;
        let result = Occurrence::delete_many()
            .filter(occurrence::Column::SeriesId.eq(series_id))
            .filter(occurrence::Column::DueDate.gte(from))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(result.rows_affected)
    }
}
