//! GROUP stage: partition records into buckets by a composite key.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::helpers::{get_field, value_key};
use crate::error::{InsightError, InsightResult};

const KEY_SEPARATOR: &str = "\u{1f}";

/// One bucket of records sharing the same group-field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<'r> {
    /// Composite identity of the bucket
    pub key: String,
    /// Group-field values, position-matched with the requested fields
    pub values: Vec<Value>,
    /// Member records in input order
    pub members: Vec<&'r Value>,
}

/// Group `records` by the values of `group_fields`.
///
/// Groups come back in first-encountered order. Every group field must be
/// present on the first record. With no group fields every record forms its
/// own group, keyed by its position.
pub fn group_by_keys<'r>(
    records: &[&'r Value],
    group_fields: &[String],
) -> InsightResult<Vec<Group<'r>>> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };

    for field in group_fields {
        if get_field(first, field).is_none() {
            return Err(InsightError::query(format!("Invalid group key: {}", field)));
        }
    }

    let mut groups: Vec<Group<'r>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (position, &record) in records.iter().enumerate() {
        if group_fields.is_empty() {
            groups.push(Group {
                key: position.to_string(),
                values: Vec::new(),
                members: vec![record],
            });
            continue;
        }

        let values: Vec<Value> = group_fields
            .iter()
            .map(|field| get_field(record, field).cloned().unwrap_or(Value::Null))
            .collect();
        let key = values
            .iter()
            .map(value_key)
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR);

        match index.get(&key) {
            Some(&slot) => groups[slot].members.push(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    values,
                    members: vec![record],
                });
            }
        }
    }

    debug!(
        "Grouped {} records into {} groups by {:?}",
        records.len(),
        groups.len(),
        group_fields
    );
    Ok(groups)
}
