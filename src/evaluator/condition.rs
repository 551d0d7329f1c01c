use crate::core::execution_context::ExecutionContext;
use crate::domain::model::{Condition, ConditionMode, ConditionOperator};
use crate::template::{resolve, resolve_operand};

use super::type_coercion::{is_null_or_empty, normalize, numeric_pair, strict_equals, string_pair};

/// Evaluate a single condition against the context. Never fails: operands
/// of the wrong type make the comparison `false`.
pub fn evaluate(cond: &Condition, ctx: &ExecutionContext) -> bool {
    let left = normalize(resolve(&cond.variable, ctx));
    let right = || normalize(Some(resolve_operand(&cond.value, ctx)));

    match cond.operator {
        ConditionOperator::IsEmpty => is_null_or_empty(&left),
        ConditionOperator::IsNotEmpty => !is_null_or_empty(&left),

        ConditionOperator::Equals => strict_equals(&left, &right()),
        ConditionOperator::NotEquals => !strict_equals(&left, &right()),

        ConditionOperator::GreaterThan => numeric_pair(&left, &right()).is_some_and(|(a, b)| a > b),
        ConditionOperator::LessThan => numeric_pair(&left, &right()).is_some_and(|(a, b)| a < b),
        ConditionOperator::GreaterOrEqual => {
            numeric_pair(&left, &right()).is_some_and(|(a, b)| a >= b)
        }
        ConditionOperator::LessOrEqual => {
            numeric_pair(&left, &right()).is_some_and(|(a, b)| a <= b)
        }

        ConditionOperator::Contains => {
            string_pair(&left, &right()).is_some_and(|(a, b)| a.contains(b))
        }
        ConditionOperator::NotContains => {
            string_pair(&left, &right()).is_some_and(|(a, b)| !a.contains(b))
        }
        ConditionOperator::StartsWith => {
            string_pair(&left, &right()).is_some_and(|(a, b)| a.starts_with(b))
        }
        ConditionOperator::EndsWith => {
            string_pair(&left, &right()).is_some_and(|(a, b)| a.ends_with(b))
        }
    }
}

/// Evaluate each condition independently, in order.
pub fn evaluate_each(conditions: &[Condition], ctx: &ExecutionContext) -> Vec<bool> {
    conditions.iter().map(|c| evaluate(c, ctx)).collect()
}

/// Combine per-condition results under `mode`.
///
/// No results is `true` under [`ConditionMode::All`] and `false` under
/// [`ConditionMode::Any`].
pub fn combine(results: impl IntoIterator<Item = bool>, mode: ConditionMode) -> bool {
    let mut results = results.into_iter();
    match mode {
        ConditionMode::All => results.all(|r| r),
        ConditionMode::Any => results.any(|r| r),
    }
}

/// Combine conditions under `mode`, short-circuiting.
pub fn evaluate_all(conditions: &[Condition], mode: ConditionMode, ctx: &ExecutionContext) -> bool {
    combine(conditions.iter().map(|c| evaluate(c, ctx)), mode)
}
