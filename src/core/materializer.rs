//! Series materializer - expands a definition into ordered occurrence specs.
//!
//! Due dates are produced by walking the date cursor forward from the start date
//! by the definition's frequency, always re-applying the start date's
//! day-of-month. Amounts are never split: every spec repeats the entered amount.
//! Validation happens up front so a rejected definition never reaches storage.

use crate::{
    core::{
        definition::{ObligationDefinition, RecurringDuration, Terms},
        kind::strategy_for,
        schedule::{next_due_date, validate_schedule},
    },
    entities::{ObligationKind, OccurrenceModel},
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Upper bound on the number of occurrences a single definition may describe
pub const MAX_SERIES_LENGTH: u32 = 1200;

/// One occurrence ready to be persisted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccurrenceSpec {
    /// Kind of the definition the spec came from
    pub kind: ObligationKind,
    /// Trimmed concept
    pub concept: String,
    /// Concept composed with the sequence marker of the kind
    pub label: String,
    /// 1-based position, bounded kinds only
    pub sequence_index: Option<u32>,
    /// Sequence length, bounded kinds only
    pub sequence_total: Option<u32>,
    pub due_date: NaiveDate,
    /// Entered amount, never split
    pub amount: Decimal,
    /// Day-of-month of the start date
    pub day_of_month: u32,
    /// Months between occurrences
    pub frequency_months: u32,
    /// Whether the series grows lazily
    pub open_ended: bool,
    /// Pass-through category
    pub category: Option<String>,
    /// Pass-through account reference
    pub account_id: Option<i64>,
    /// Pass-through note
    pub note: Option<String>,
    /// Only carried by the first spec of a savings goal
    pub amount_already_saved: Option<Decimal>,
}

/// How many specs to emit and where the sequence numbering starts
struct Plan {
    count: u32,
    /// `(first index, total)` for bounded kinds
    sequence: Option<(u32, u32)>,
    amount_already_saved: Option<Decimal>,
}

fn plan(terms: &Terms, frequency_months: u32) -> Result<Plan> {
    match *terms {
        Terms::RecurringExpense { duration } | Terms::RecurringIncome { duration } => {
            let count = match duration {
                RecurringDuration::Months(0) => {
                    return Err(Error::InvalidScheduleParameter {
                        message: "duration must be at least one month".to_string(),
                    });
                }
                RecurringDuration::Months(months) => months.div_ceil(frequency_months),
                RecurringDuration::Open => 1,
            };
            Ok(Plan {
                count,
                sequence: None,
                amount_already_saved: None,
            })
        }
        Terms::Loan {
            total_installments,
            installments_paid,
        } => {
            if total_installments == 0 || installments_paid > total_installments {
                return Err(Error::InvalidInstallmentCount {
                    paid: installments_paid,
                    total: total_installments,
                });
            }
            if installments_paid == total_installments {
                return Err(Error::SeriesAlreadyComplete {
                    completed: installments_paid,
                    total: total_installments,
                });
            }
            Ok(Plan {
                count: total_installments - installments_paid,
                sequence: Some((installments_paid + 1, total_installments)),
                amount_already_saved: None,
            })
        }
        Terms::SavingsGoal {
            target_months,
            months_saved,
            amount_saved,
        } => {
            if target_months == 0 || months_saved > target_months {
                return Err(Error::InvalidGoalProgress {
                    saved: months_saved,
                    target: target_months,
                });
            }
            if months_saved == target_months {
                return Err(Error::SeriesAlreadyComplete {
                    completed: months_saved,
                    total: target_months,
                });
            }
            if amount_saved < Decimal::ZERO {
                return Err(Error::InvalidAmount {
                    amount: amount_saved,
                });
            }
            Ok(Plan {
                count: target_months - months_saved,
                sequence: Some((months_saved + 1, target_months)),
                amount_already_saved: Some(amount_saved),
            })
        }
    }
}

/// Expands a definition into its ordered list of occurrence specs.
///
/// # Errors
/// * `InvalidScheduleParameter` - empty concept, zero frequency, zero duration
///   or a series longer than [`MAX_SERIES_LENGTH`]
/// * `InvalidAmount` - non-positive amount or negative saved amount
/// * `InvalidInstallmentCount` / `InvalidGoalProgress` - progress out of range
/// * `SeriesAlreadyComplete` - everything was already paid or saved
pub fn materialize(definition: &ObligationDefinition) -> Result<Vec<OccurrenceSpec>> {
    let concept = definition.concept.trim();
    if concept.is_empty() {
        return Err(Error::InvalidScheduleParameter {
            message: "concept cannot be empty".to_string(),
        });
    }
    if definition.amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: definition.amount,
        });
    }

    let day_of_month = definition.start_date.day();
    let frequency_months = definition.frequency_months;
    validate_schedule(day_of_month, frequency_months)?;

    let plan = plan(&definition.terms, frequency_months)?;
    if plan.count > MAX_SERIES_LENGTH {
        return Err(Error::InvalidScheduleParameter {
            message: format!("a series cannot exceed {MAX_SERIES_LENGTH} occurrences"),
        });
    }

    let kind = definition.kind();
    let strategy = strategy_for(kind);
    let open_ended = definition.terms.is_open();

    let mut specs = Vec::with_capacity(plan.count as usize);
    let mut due_date = definition.start_date;
    for k in 0..plan.count {
        let sequence = plan.sequence.map(|(first, total)| (first + k, total));
        specs.push(OccurrenceSpec {
            kind,
            concept: concept.to_string(),
            label: strategy.label.compose(concept, sequence),
            sequence_index: sequence.map(|(index, _)| index),
            sequence_total: sequence.map(|(_, total)| total),
            due_date,
            amount: definition.amount,
            day_of_month,
            frequency_months,
            open_ended,
            category: definition.category.clone(),
            account_id: definition.account_id,
            note: definition.note.clone(),
            amount_already_saved: if k == 0 {
                plan.amount_already_saved
            } else {
                None
            },
        });
        if k + 1 < plan.count {
            due_date = next_due_date(due_date, day_of_month, frequency_months)?;
        }
    }

    Ok(specs)
}

/// Produces the occurrence that follows `latest` in an open-ended series.
///
/// The new spec copies the latest occurrence's amount and pass-through
/// attributes, since edits on one occurrence are treated as the current terms.
///
/// # Errors
/// `InvalidScheduleParameter` when `latest` does not belong to an open series or
/// carries schedule values outside the valid range.
pub fn materialize_next(latest: &OccurrenceModel) -> Result<OccurrenceSpec> {
    if !latest.open_ended {
        return Err(Error::InvalidScheduleParameter {
            message: format!("series {} has a fixed duration", latest.series_id),
        });
    }
    let day_of_month = u32::try_from(latest.day_of_month).map_err(|_| invalid_stored(latest))?;
    let frequency_months =
        u32::try_from(latest.frequency_months).map_err(|_| invalid_stored(latest))?;

    Ok(OccurrenceSpec {
        kind: latest.kind,
        concept: latest.concept.clone(),
        label: strategy_for(latest.kind).label.compose(&latest.concept, None),
        sequence_index: None,
        sequence_total: None,
        due_date: next_due_date(latest.due_date, day_of_month, frequency_months)?,
        amount: latest.amount,
        day_of_month,
        frequency_months,
        open_ended: true,
        category: latest.category.clone(),
        account_id: latest.account_id,
        note: latest.note.clone(),
        amount_already_saved: None,
    })
}

fn invalid_stored(occurrence: &OccurrenceModel) -> Error {
    Error::InvalidScheduleParameter {
        message: format!(
            "occurrence {} has an invalid stored schedule (day {}, every {} months)",
            occurrence.id, occurrence.day_of_month, occurrence.frequency_months
        ),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::definition::RecurringDuration;
    use crate::entities::OccurrenceState;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loan(total_installments: u32, installments_paid: u32) -> ObligationDefinition {
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

    fn assert_strictly_increasing(specs: &[OccurrenceSpec]) {
        for pair in specs.windows(2) {
            assert!(pair[0].due_date < pair[1].due_date);
        }
    }

    #[test]
    fn test_loan_resumes_after_paid_installments() -> Result<()> {
        let specs = materialize(&loan(12, 5))?;
        assert_eq!(specs.len(), 7);

        let indices: Vec<u32> = specs.iter().filter_map(|s| s.sequence_index).collect();
        assert_eq!(indices, (6..=12).collect::<Vec<_>>());
        assert!(specs.iter().all(|s| s.sequence_total == Some(12)));
        assert_eq!(specs[0].label, "Car loan (Cuota 6/12)");
        assert_eq!(specs[6].label, "Car loan (Cuota 12/12)");
        assert!(specs.iter().all(|s| s.amount == dec!(250.00)));
        assert_eq!(specs[0].due_date, date(2024, 1, 15));
        assert_eq!(specs[6].due_date, date(2024, 7, 15));
        assert_strictly_increasing(&specs);
        Ok(())
    }

    #[test]
    fn test_loan_fully_paid_is_complete() {
        assert!(matches!(
            materialize(&loan(12, 12)),
            Err(Error::SeriesAlreadyComplete {
                completed: 12,
                total: 12
            })
        ));
    }

    #[test]
    fn test_loan_overpaid_is_invalid() {
        assert!(matches!(
            materialize(&loan(12, 13)),
            Err(Error::InvalidInstallmentCount { paid: 13, total: 12 })
        ));
        assert!(matches!(
            materialize(&loan(0, 0)),
            Err(Error::InvalidInstallmentCount { .. })
        ));
    }

    #[test]
    fn test_savings_goal_from_scratch() -> Result<()> {
        let definition = ObligationDefinition::new(
            Terms::SavingsGoal {
                target_months: 12,
                months_saved: 0,
                amount_saved: Decimal::ZERO,
            },
            "House",
            dec!(100000),
            date(2024, 3, 1),
        );
        let specs = materialize(&definition)?;
        assert_eq!(specs.len(), 12);
        for (k, spec) in specs.iter().enumerate() {
            assert_eq!(spec.amount, dec!(100000));
            assert_eq!(spec.sequence_index, Some(u32::try_from(k).unwrap() + 1));
            assert_eq!(spec.sequence_total, Some(12));
        }
        assert_eq!(specs[4].label, "House (Mes 5/12)");
        assert_eq!(specs[0].amount_already_saved, Some(Decimal::ZERO));
        assert!(specs[1..].iter().all(|s| s.amount_already_saved.is_none()));
        Ok(())
    }

    #[test]
    fn test_savings_goal_saved_amount_is_display_only() -> Result<()> {
        let definition = ObligationDefinition::new(
            Terms::SavingsGoal {
                target_months: 24,
                months_saved: 4,
                amount_saved: dec!(2000),
            },
            "Trip",
            dec!(500),
            date(2024, 1, 10),
        );
        let specs = materialize(&definition)?;
        assert_eq!(specs.len(), 20);
        assert_eq!(specs[0].label, "Trip (Mes 5/24)");
        assert_eq!(specs[0].amount_already_saved, Some(dec!(2000)));
        assert!(specs.iter().all(|s| s.amount == dec!(500)));

        // Already saved plus what remains covers the whole goal
        let remaining: Decimal = specs.iter().map(|s| s.amount).sum();
        assert_eq!(remaining + dec!(2000), dec!(500) * dec!(24));
        Ok(())
    }

    #[test]
    fn test_savings_goal_progress_bounds() {
        let goal = |target_months, months_saved| {
            ObligationDefinition::new(
                Terms::SavingsGoal {
                    target_months,
                    months_saved,
                    amount_saved: Decimal::ZERO,
                },
                "Goal",
                dec!(10),
                date(2024, 1, 1),
            )
        };
        assert!(matches!(
            materialize(&goal(6, 6)),
            Err(Error::SeriesAlreadyComplete { .. })
        ));
        assert!(matches!(
            materialize(&goal(6, 7)),
            Err(Error::InvalidGoalProgress { saved: 7, target: 6 })
        ));
    }

    #[test]
    fn test_recurring_fixed_duration_with_frequency() -> Result<()> {
        let definition = ObligationDefinition::new(
            Terms::RecurringExpense {
                duration: RecurringDuration::Months(12),
            },
            "Insurance",
            dec!(80),
            date(2024, 1, 31),
        )
        .with_frequency(5);
        let specs = materialize(&definition)?;
        // ceil(12 / 5) = 3
        assert_eq!(specs.len(), 3);
        assert_eq!(
            specs.iter().map(|s| s.due_date).collect::<Vec<_>>(),
            vec![date(2024, 1, 31), date(2024, 6, 30), date(2024, 11, 30)]
        );
        assert!(specs.iter().all(|s| s.sequence_index.is_none()));
        assert!(specs.iter().all(|s| s.label == "Insurance"));
        assert!(specs.iter().all(|s| !s.open_ended));
        Ok(())
    }

    #[test]
    fn test_monthly_on_the_31st_keeps_its_day() -> Result<()> {
        let definition = ObligationDefinition::new(
            Terms::RecurringIncome {
                duration: RecurringDuration::Months(4),
            },
            "Salary",
            dec!(3000),
            date(2024, 1, 31),
        );
        let dates: Vec<NaiveDate> = materialize(&definition)?
            .into_iter()
            .map(|s| s.due_date)
            .collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 29),
                date(2024, 3, 31),
                date(2024, 4, 30)
            ]
        );
        Ok(())
    }

    #[test]
    fn test_open_recurring_emits_one() -> Result<()> {
        let definition = ObligationDefinition::new(
            Terms::RecurringExpense {
                duration: RecurringDuration::Open,
            },
            "Streaming",
            dec!(9.99),
            date(2024, 2, 10),
        );
        let specs = materialize(&definition)?;
        assert_eq!(specs.len(), 1);
        assert!(specs[0].open_ended);
        assert_eq!(specs[0].due_date, date(2024, 2, 10));
        Ok(())
    }

    #[test]
    fn test_one_off_is_single_occurrence() -> Result<()> {
        let specs = materialize(&ObligationDefinition::one_off(
            "Dentist",
            dec!(120),
            date(2024, 5, 2),
        ))?;
        assert_eq!(specs.len(), 1);
        assert!(!specs[0].open_ended);
        Ok(())
    }

    #[test]
    fn test_validation_errors() {
        let base = loan(12, 0);

        let mut empty_concept = base.clone();
        empty_concept.concept = "   ".to_string();
        assert!(matches!(
            materialize(&empty_concept),
            Err(Error::InvalidScheduleParameter { .. })
        ));

        let mut zero_amount = base.clone();
        zero_amount.amount = Decimal::ZERO;
        assert!(matches!(
            materialize(&zero_amount),
            Err(Error::InvalidAmount { .. })
        ));

        assert!(matches!(
            materialize(&base.clone().with_frequency(0)),
            Err(Error::InvalidScheduleParameter { .. })
        ));

        let zero_duration = ObligationDefinition::new(
            Terms::RecurringExpense {
                duration: RecurringDuration::Months(0),
            },
            "Gym",
            dec!(30),
            date(2024, 1, 1),
        );
        assert!(matches!(
            materialize(&zero_duration),
            Err(Error::InvalidScheduleParameter { .. })
        ));

        assert!(matches!(
            materialize(&loan(MAX_SERIES_LENGTH + 1, 0)),
            Err(Error::InvalidScheduleParameter { .. })
        ));
    }

    #[test]
    fn test_length_cap_counts_remaining_occurrences() -> Result<()> {
        // A long loan with one installment left is only one occurrence
        let specs = materialize(&loan(1500, 1499))?;
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].label, "Car loan (Cuota 1500/1500)");

        assert_eq!(materialize(&loan(1500, 300))?.len(), 1200);
        assert!(matches!(
            materialize(&loan(1500, 299)),
            Err(Error::InvalidScheduleParameter { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_concept_is_trimmed_and_attributes_pass_through()-> Result<()> {
        let mut definition = loan(2, 0)
            .with_category("vehicles")
            .with_account(7)
            .with_note("dealer financing");
        definition.concept = "  Car loan  ".to_string();
        let specs = materialize(&definition)?;
        assert_eq!(specs[0].concept, "Car loan");
        assert_eq!(specs[1].label, "Car loan (Cuota 2/2)");
        assert!(specs.iter().all(|s| s.category.as_deref() == Some("vehicles")));
        assert!(specs.iter().all(|s| s.account_id == Some(7)));
        assert!(specs.iter().all(|s| s.note.as_deref() == Some("dealer financing")));
        Ok(())
    }

    fn open_occurrence(day_of_month: i32, due_date: NaiveDate) -> OccurrenceModel {
        OccurrenceModel {
            id: 3,
            series_id: 1,
            root_id: 1,
            is_root: false,
            kind: ObligationKind::RecurringExpense,
            concept: "Rent".to_string(),
            label: "Rent".to_string(),
            sequence_index: None,
            sequence_total: None,
            due_date,
            day_of_month,
            frequency_months: 1,
            open_ended: true,
            amount: dec!(950),
            state: OccurrenceState::Paid,
            paid_date: Some(due_date),
            active: true,
            category: Some("housing".to_string()),
            account_id: None,
            note: None,
            amount_already_saved: None,
        }
    }

    #[test]
    fn test_materialize_next_restores_day_of_month() -> Result<()> {
        let spec = materialize_next(&open_occurrence(31, date(2024, 2, 29)))?;
        assert_eq!(spec.due_date, date(2024, 3, 31));
        assert_eq!(spec.amount, dec!(950));
        assert_eq!(spec.category.as_deref(), Some("housing"));
        assert!(spec.open_ended);
        Ok(())
    }

    #[test]
    fn test_materialize_next_rejects_bounded_series() {
        let mut bounded = open_occurrence(1, date(2024, 1, 1));
        bounded.open_ended = false;
        assert!(matches!(
            materialize_next(&bounded),
            Err(Error::InvalidScheduleParameter { .. })
        ));

        assert!(matches!(
            materialize_next(&open_occurrence(-1, date(2024, 1, 1))),
            Err(Error::InvalidScheduleParameter { .. })
        ));
    }
}
