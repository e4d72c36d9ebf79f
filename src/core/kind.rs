//! Kind strategies - the per-kind configuration table read by the materializer.
//!
//! The four obligation kinds share the same series mechanics and differ only in
//! a handful of data points, so each kind maps to a plain `KindStrategy` value
//! instead of a trait object.

use crate::entities::ObligationKind;

/// How the display label of an occurrence is composed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LabelRule {
    /// The concept alone
    Concept,
    /// `"{concept} (Cuota X/N)"`
    Installment,
    /// `"{concept} (Mes X/N)"`
    Month,
}

/// How the entered amount is spread over the occurrences
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AmountRule {
    /// Every occurrence repeats the entered amount unchanged
    FixedPerOccurrence,
}

/// Data describing how a kind is materialized
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KindStrategy {
    /// Whether the kind always has a fixed sequence total
    pub bounded: bool,
    /// Label composition for each occurrence
    pub label: LabelRule,
    /// Amount spreading rule
    pub amount: AmountRule,
}

/// Looks up the strategy for a kind.
#[must_use]
pub const fn strategy_for(kind: ObligationKind) -> KindStrategy {
    match kind {
        ObligationKind::RecurringExpense | ObligationKind::RecurringIncome => KindStrategy {
            bounded: false,
            label: LabelRule::Concept,
            amount: AmountRule::FixedPerOccurrence,
        },
        ObligationKind::Loan => KindStrategy {
            bounded: true,
            label: LabelRule::Installment,
            amount: AmountRule::FixedPerOccurrence,
        },
        ObligationKind::SavingsGoal => KindStrategy {
            bounded: true,
            label: LabelRule::Month,
            amount: AmountRule::FixedPerOccurrence,
        },
    }
}

impl LabelRule {
    /// Returns the sequence marker alone, e.g. `"Cuota 3/12"`.
    #[must_use]
    pub fn marker(self, index: u32, total: u32) -> Option<String> {
        match self {
            Self::Concept => None,
            Self::Installment => Some(format!("Cuota {index}/{total}")),
            Self::Month => Some(format!("Mes {index}/{total}")),
        }
    }

    /// Composes the full display label for one occurrence.
    ///
    /// The sequence is ignored for `Concept`, and a bounded rule without a
    /// sequence falls back to the concept.
    #[must_use]
    pub fn compose(self, concept: &str, sequence: Option<(u32, u32)>) -> String {
        match sequence.and_then(|(index, total)| self.marker(index, total)) {
            Some(marker) => format!("{concept} ({marker})"),
            None => concept.to_string(),
        }
    }
}
