//! Structural validation of filter trees and transformation clauses.
//!
//! Validation is purely shape-and-whitelist driven: it never touches record
//! content. A node that passes comes back as its typed [`Filter`] form, so the
//! evaluator never has to re-inspect raw JSON.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::ast::{AggregateOp, ApplyRule, Filter, NumericOp, StringPattern};
use crate::error::{InsightError, InsightResult};
use crate::schema::DatasetSchema;

/// Validates WHERE filter nodes and GROUP/APPLY clauses against one dataset
/// schema.
#[derive(Debug, Clone)]
pub struct FilterValidator<'a> {
    schema: &'a DatasetSchema,
}

impl<'a> FilterValidator<'a> {
    pub fn new(schema: &'a DatasetSchema) -> Self {
        Self { schema }
    }

    /// Returns true when `node` is a valid non-empty filter node.
    pub fn validate(&self, node: &Value) -> bool {
        self.parse(node).is_ok()
    }

    /// Parse the WHERE clause root. Unlike nested nodes, the root may be the
    /// empty object, which matches every record.
    pub fn parse_where(&self, clause: &Value) -> InsightResult<Filter> {
        match clause {
            Value::Object(obj) if obj.is_empty() => Ok(Filter::All),
            Value::Object(_) => self.parse(clause),
            _ => Err(InsightError::query("WHERE clause must be an object")),
        }
    }

    /// Validate a single filter node and convert it to its typed form.
    pub fn parse(&self, node: &Value) -> InsightResult<Filter> {
        let obj = node
            .as_object()
            .ok_or_else(|| InsightError::query("Filter must be an object"))?;
        let (key, value) = single_entry(obj, "Filter")?;

        match key.as_str() {
            "AND" => Ok(Filter::And(self.parse_logic(key, value)?)),
            "OR" => Ok(Filter::Or(self.parse_logic(key, value)?)),
            "NOT" => Ok(Filter::Not(Box::new(self.parse(value)?))),
            "IS" => self.parse_is(value),
            other => match NumericOp::from_token(other) {
                Some(op) => self.parse_compare(op, other, value),
                None => Err(InsightError::query(format!("Invalid filter key: {}", other))),
            },
        }
    }

    fn parse_logic(&self, key: &str, value: &Value) -> InsightResult<Vec<Filter>> {
        let children = value
            .as_array()
            .ok_or_else(|| InsightError::query(format!("{} must be an array", key)))?;
        if children.is_empty() {
            return Err(InsightError::query(format!("{} must be a non-empty array", key)));
        }
        children.iter().map(|child| self.parse(child)).collect()
    }

    fn parse_compare(&self, op: NumericOp, key: &str, value: &Value) -> InsightResult<Filter> {
        let obj = value
            .as_object()
            .ok_or_else(|| InsightError::query(format!("{} must be an object", key)))?;
        let (field, operand) = single_entry(obj, key)?;

        if !self.schema.is_numeric_field(field) {
            return Err(InsightError::query(format!(
                "Invalid key {} in {}",
                field, key
            )));
        }
        let bound = operand.as_f64().ok_or_else(|| {
            InsightError::query(format!("Invalid value type in {}, should be number", key))
        })?;

        Ok(Filter::Compare {
            op,
            field: field.clone(),
            value: bound,
        })
    }

    fn parse_is(&self, value: &Value) -> InsightResult<Filter> {
        let obj = value
            .as_object()
            .ok_or_else(|| InsightError::query("IS must be an object"))?;
        let (field, operand) = single_entry(obj, "IS")?;

        if !self.schema.is_string_field(field) {
            return Err(InsightError::query(format!("Invalid key {} in IS", field)));
        }
        let raw = operand
            .as_str()
            .ok_or_else(|| InsightError::query("Invalid value type in IS, should be string"))?;
        let pattern = StringPattern::parse(raw).ok_or_else(|| {
            InsightError::query(
                "Asterisks (*) can only be the first or last characters of input strings",
            )
        })?;

        Ok(Filter::Is {
            field: field.clone(),
            pattern,
        })
    }

    /// Validate a GROUP clause: a non-empty array of whitelisted fields.
    pub fn parse_group(&self, value: &Value) -> InsightResult<Vec<String>> {
        let keys = value
            .as_array()
            .ok_or_else(|| InsightError::query("GROUP must be an array"))?;
        if keys.is_empty() {
            return Err(InsightError::query("GROUP must be a non-empty array"));
        }

        keys.iter()
            .map(|key| match key.as_str() {
                Some(field) if self.schema.is_field(field) => Ok(field.to_string()),
                Some(field) => Err(InsightError::query(format!("Invalid key {} in GROUP", field))),
                None => Err(InsightError::query("GROUP keys must be strings")),
            })
            .collect()
    }

    /// Validate an APPLY clause: a non-empty array of uniquely named rules,
    /// with numeric operators restricted to numeric fields.
    pub fn parse_apply(&self, value: &Value) -> InsightResult<Vec<ApplyRule>> {
        let rules = value
            .as_array()
            .ok_or_else(|| InsightError::query("APPLY must be an array"))?;
        if rules.is_empty() {
            return Err(InsightError::query("APPLY must be a non-empty array"));
        }

        let mut seen = HashSet::new();
        let mut parsed = Vec::with_capacity(rules.len());
        for rule in rules {
            let rule = self.parse_apply_rule(rule)?;
            if !seen.insert(rule.name.clone()) {
                return Err(InsightError::query(format!(
                    "Duplicate APPLY key {}",
                    rule.name
                )));
            }
            parsed.push(rule);
        }
        Ok(parsed)
    }

    fn parse_apply_rule(&self, rule: &Value) -> InsightResult<ApplyRule> {
        let obj = rule
            .as_object()
            .ok_or_else(|| InsightError::query("APPLY rule must be an object"))?;
        let (name, body) = single_entry(obj, "APPLY rule")?;

        if name.is_empty() || name.contains('_') {
            return Err(InsightError::query(format!(
                "Cannot have underscore or be empty in applyKey: {:?}",
                name
            )));
        }

        let body = body
            .as_object()
            .ok_or_else(|| InsightError::query("APPLY body must be an object"))?;
        let (token, field) = single_entry(body, "APPLY body")?;

        let op = AggregateOp::from_token(token)
            .ok_or_else(|| {
                InsightError::query(format!("Invalid transformation operator {}", token))
            })?;
        let field = field
            .as_str()
            .ok_or_else(|| InsightError::query(format!("Invalid key type in {}", op)))?;

        let valid = if op.requires_numeric() {
            self.schema.is_numeric_field(field)
        } else {
            self.schema.is_field(field)
        };
        if !valid {
            return Err(InsightError::query(format!("Invalid key {} in {}", field, op)));
        }

        Ok(ApplyRule {
            name: name.clone(),
            op,
            field: field.to_string(),
        })
    }
}

/// The one key/value pair of an object that must have exactly one entry.
fn single_entry<'v>(
    obj: &'v Map<String, Value>,
    what: &str,
) -> InsightResult<(&'v String, &'v Value)> {
    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(InsightError::query(format!(
            "{} should only have 1 key, has {}",
            what,
            obj.len()
        ))),
    }
}
