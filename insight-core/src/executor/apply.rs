//! APPLY stage: compute one synthetic record per group.

use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};
use tracing::debug;

use super::grouping::Group;
use super::helpers::{get_field, number_from_f64, round_to_cents, value_key};
use crate::ast::{AggregateOp, ApplyRule};
use crate::error::{InsightError, InsightResult};

/// Aggregate every group into a synthetic record.
///
/// Each record carries the group fields (under their full names) followed by
/// one entry per apply rule, in rule order.
pub fn process_apply_rules(
    groups: &[Group<'_>],
    rules: &[ApplyRule],
    group_fields: &[String],
) -> InsightResult<Vec<Value>> {
    let mut results = Vec::with_capacity(groups.len());

    for group in groups {
        let mut row = Map::new();
        for (field, value) in group_fields.iter().zip(&group.values) {
            row.insert(field.clone(), value.clone());
        }
        for rule in rules {
            row.insert(rule.name.clone(), compute_aggregate(rule, &group.members)?);
        }
        results.push(Value::Object(row));
    }

    debug!("Applied {} rules over {} groups", rules.len(), groups.len());
    Ok(results)
}

/// Compute one apply rule over a group's members.
fn compute_aggregate(rule: &ApplyRule, members: &[&Value]) -> InsightResult<Value> {
    match rule.op {
        AggregateOp::Count => count_distinct(rule, members),
        AggregateOp::Max => {
            let values = numeric_values(rule, members)?;
            let max = values.into_iter().fold(f64::NEG_INFINITY, f64::max);
            Ok(Value::Number(number_from_f64(max)))
        }
        AggregateOp::Min => {
            let values = numeric_values(rule, members)?;
            let min = values.into_iter().fold(f64::INFINITY, f64::min);
            Ok(Value::Number(number_from_f64(min)))
        }
        AggregateOp::Sum => {
            let sum: f64 = numeric_values(rule, members)?.into_iter().sum();
            finite_number(rule, round_to_cents(sum))
        }
        AggregateOp::Avg => {
            let values = numeric_values(rule, members)?;
            let avg = decimal_mean(&values).unwrap_or_else(|| float_mean(&values));
            finite_number(rule, avg)
        }
    }
}

/// Mean in `Decimal`, rounded half away from zero to two places. `None` when
/// a value or the running total leaves Decimal's range.
fn decimal_mean(values: &[f64]) -> Option<f64> {
    let mut total = Decimal::ZERO;
    for v in values {
        total = total.checked_add(Decimal::try_from(*v).ok()?)?;
    }
    total
        .checked_div(Decimal::from(values.len()))?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
}

/// Mean of values too large for `Decimal`. Each term is divided first so the
/// running sum stays finite.
fn float_mean(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    round_to_cents(values.iter().map(|v| v / n).sum())
}

fn finite_number(rule: &ApplyRule, n: f64) -> InsightResult<Value> {
    if !n.is_finite() {
        return Err(InsightError::query(format!(
            "{} of {} is out of numeric range",
            rule.op, rule.field
        )));
    }
    Ok(Value::Number(number_from_f64(n)))
}

/// Numeric source values of every member. The first member decides whether
/// the field is usable at all; later non-numeric members are rejected too.
fn numeric_values(rule: &ApplyRule, members: &[&Value]) -> InsightResult<Vec<f64>> {
    let invalid = || {
        InsightError::query(format!(
            "Invalid key for {} operation: {}",
            rule.op, rule.field
        ))
    };

    let first = members.first().ok_or_else(invalid)?;
    if !get_field(first, &rule.field).is_some_and(Value::is_number) {
        return Err(invalid());
    }

    members
        .iter()
        .map(|record| get_field(record, &rule.field).and_then(Value::as_f64).ok_or_else(invalid))
        .collect()
}

/// Number of distinct values of the source field in the group.
fn count_distinct(rule: &ApplyRule, members: &[&Value]) -> InsightResult<Value> {
    let present = members
        .first()
        .is_some_and(|first| get_field(first, &rule.field).is_some());
    if !present {
        return Err(InsightError::query(format!(
            "Key does not exist in the dataset: {}",
            rule.field
        )));
    }

    let distinct: HashSet<String> = members
        .iter()
        .filter_map(|record| get_field(record, &rule.field))
        .map(value_key)
        .collect();
    Ok(Value::from(distinct.len()))
}
