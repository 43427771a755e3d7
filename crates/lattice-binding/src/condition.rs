//! Tri-state evaluation of mixed AND/OR expression chains.
//!
//! A [`Condition`] is an ordered list of [`Expression`]s, each combining a
//! [`Logic`] connective, a [`Comparison`] and a [`PropertyReference`]. The
//! chain is evaluated as a strict left-to-right fold over three states:
//!
//! | state      | OR, test true | OR, test false | AND, test true | AND, test false |
//! |------------|---------------|----------------|----------------|-----------------|
//! | `Floating` | `True`        | `Floating`     | `True`         | `False`         |
//! | `False`    | `True`        | `Floating`     | `False`        | `False`         |
//! | `True`     | result `true` | result `true`  | `True`         | `False`         |
//!
//! An OR seen while the state is `True` ends evaluation with `true` without
//! testing its own expression. The final result is `true` only if the state
//! ends as `True`.
//!
//! This is not conventional boolean precedence. The outcome depends on
//! order; for example `[OR true, AND false, OR true]` is `true`, because the
//! AND forces `False` and the final OR moves `False` back to `True`. Widgets
//! rely on exactly this fold, so it must not be simplified.

use crate::accessor::PropertyReference;
use crate::comparison::Comparison;
use crate::logging::{WarnOnce, targets};

/// How an expression combines with the state accumulated so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    /// Can raise the state to `True`; never forces `False`.
    #[default]
    Or,
    /// Can force the state to `False`; raises to `True` only from `Floating`.
    And,
}

/// The accumulator of the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    /// Nothing determined yet.
    #[default]
    Floating,
    /// Forced false by an AND.
    False,
    /// Determined true.
    True,
}

impl TriState {
    /// Apply one expression. Returns `None` when an OR short-circuits the
    /// whole chain to `true`; `test` is not called in that case.
    pub fn step(self, logic: Logic, test: impl FnOnce() -> bool) -> Option<TriState> {
        match logic {
            Logic::Or => {
                if self == TriState::True {
                    return None;
                }
                Some(if test() {
                    TriState::True
                } else {
                    TriState::Floating
                })
            }
            Logic::And => Some(if test() {
                if self == TriState::Floating {
                    TriState::True
                } else {
                    self
                }
            } else {
                TriState::False
            }),
        }
    }
}

/// Fold `(logic, test)` pairs left to right. Tests are evaluated lazily.
pub fn fold<I, F>(steps: I) -> bool
where
    I: IntoIterator<Item = (Logic, F)>,
    F: FnOnce() -> bool,
{
    let mut state = TriState::Floating;
    for (logic, test) in steps {
        match state.step(logic, test) {
            Some(next) => state = next,
            None => return true,
        }
    }
    state == TriState::True
}

/// One term of a condition.
#[derive(Debug, Clone)]
pub struct Expression {
    /// Connective with the preceding terms.
    pub logic: Logic,
    /// Predicate applied to the property's value.
    pub comparison: Comparison,
    /// The property to test.
    pub property: PropertyReference,
}

impl Expression {
    /// Create an expression.
    pub fn new(logic: Logic, comparison: Comparison, property: PropertyReference) -> Self {
        Self {
            logic,
            comparison,
            property,
        }
    }

    /// Test the property. An unreadable property or an inapplicable
    /// comparison counts as `false`.
    pub fn test(&self) -> bool {
        self.property.try_test(&self.comparison).unwrap_or(false)
    }
}

/// Outcome of [`Condition::setup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetupReport {
    /// Expressions whose property reference is not valid.
    pub invalid: usize,
    /// Invalid expressions logged for the first time by this call.
    pub warned: usize,
}

/// An ordered chain of expressions evaluated with the tri-state fold.
#[derive(Debug, Clone, Default)]
pub struct Condition {
    expressions: Vec<Expression>,
    reported: WarnOnce,
}

impl Condition {
    /// Create an empty condition. An empty condition evaluates to `false`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a condition from expressions.
    pub fn from_expressions(expressions: impl IntoIterator<Item = Expression>) -> Self {
        Self {
            expressions: expressions.into_iter().collect(),
            reported: WarnOnce::new(),
        }
    }

    /// Append an expression.
    pub fn push(&mut self, expression: Expression) {
        self.expressions.push(expression);
    }

    /// The expressions, in evaluation order.
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Mutable access, for reconfiguration. Call [`setup`](Self::setup) after.
    pub fn expressions_mut(&mut self) -> &mut Vec<Expression> {
        &mut self.expressions
    }

    /// Returns true if there are no expressions.
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Invalidate every property reference and report invalid ones.
    ///
    /// Each distinct invalid configuration is logged once per `context`;
    /// calling this again with nothing changed logs nothing. Safe to call any
    /// number of times.
    pub fn setup(&mut self, context: &str) -> SetupReport {
        let mut report = SetupReport::default();
        for (index, expression) in self.expressions.iter().enumerate() {
            expression.property.invalidate();
            let Some(reason) = expression.property.invalid_reason() else {
                continue;
            };
            report.invalid += 1;

            let key = format!(
                "{context}#{index}:{}:{reason}",
                expression.property.describe()
            );
            if self.reported.first(key) {
                report.warned += 1;
                tracing::warn!(
                    target: targets::CONDITION,
                    context,
                    index,
                    property = %expression.property.describe(),
                    %reason,
                    "condition expression has an invalid property and will test false"
                );
            }
        }
        report
    }

    /// Evaluate the chain.
    pub fn evaluate(&self) -> bool {
        fold(
            self.expressions
                .iter()
                .map(|expression| (expression.logic, move || expression.test())),
        )
    }
}
