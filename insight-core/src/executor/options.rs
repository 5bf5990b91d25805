//! OPTIONS stage: column projection and ordering.
//!
//! Validation here covers COLUMNS and ORDER, and also the TRANSFORMATIONS
//! clause, because whether a column is legal depends on the GROUP fields and
//! APPLY names declared next to it.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::debug;

use super::helpers::{compare_values, get_field};
use crate::ast::{Direction, Options, Order, Transformations};
use crate::error::{InsightError, InsightResult};
use crate::schema::DatasetSchema;
use crate::validator::FilterValidator;

/// Raw OPTIONS and TRANSFORMATIONS clauses awaiting validation.
#[derive(Debug, Clone)]
pub struct OptionsStage<'a> {
    schema: &'a DatasetSchema,
    columns: Vec<String>,
    order: Option<Value>,
    group: Option<Value>,
    apply: Option<Value>,
}

impl<'a> OptionsStage<'a> {
    /// Build the stage from the raw clauses.
    ///
    /// Fails when OPTIONS is not an object, has keys other than `COLUMNS` and
    /// `ORDER`, or COLUMNS is not an array of strings; and when
    /// TRANSFORMATIONS is present but not an object with only `GROUP` and
    /// `APPLY` keys.
    pub fn new(
        schema: &'a DatasetSchema,
        options: &Value,
        transformations: Option<&Value>,
    ) -> InsightResult<Self> {
        let options = options
            .as_object()
            .ok_or_else(|| InsightError::query("OPTIONS must be an object"))?;
        reject_unknown_keys(options, &["COLUMNS", "ORDER"], "OPTIONS")?;

        let columns = options
            .get("COLUMNS")
            .and_then(Value::as_array)
            .ok_or_else(|| InsightError::query("OPTIONS missing COLUMNS array"))?
            .iter()
            .map(|column| {
                column
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| InsightError::query("All elements in COLUMNS must be strings"))
            })
            .collect::<InsightResult<Vec<String>>>()?;

        let (group, apply) = match transformations {
            None => (None, None),
            Some(Value::Object(obj)) => {
                reject_unknown_keys(obj, &["GROUP", "APPLY"], "TRANSFORMATIONS")?;
                (obj.get("GROUP").cloned(), obj.get("APPLY").cloned())
            }
            Some(_) => return Err(InsightError::query("TRANSFORMATIONS must be an object")),
        };

        Ok(Self {
            schema,
            columns,
            order: options.get("ORDER").cloned(),
            group,
            apply,
        })
    }

    /// Validate every clause and return their typed forms.
    pub fn validate(&self) -> InsightResult<(Options, Option<Transformations>)> {
        if self.columns.is_empty() {
            return Err(InsightError::query("COLUMNS must be a non-empty array"));
        }

        let transformations = self.validate_transformations()?;
        self.validate_columns(transformations.as_ref())?;
        let order = self.validate_order()?;

        Ok((
            Options {
                columns: self.columns.clone(),
                order,
            },
            transformations,
        ))
    }

    fn validate_transformations(&self) -> InsightResult<Option<Transformations>> {
        let validator = FilterValidator::new(self.schema);
        match (&self.group, &self.apply) {
            (None, None) => Ok(None),
            (Some(group), Some(apply)) => {
                let group = validator.parse_group(group)?;
                let apply = validator.parse_apply(apply)?;

                if let Some(missing) = group.iter().find(|g| !self.columns.contains(g)) {
                    return Err(InsightError::query(format!(
                        "GROUP key {} must appear in COLUMNS",
                        missing
                    )));
                }
                if let Some(missing) = apply.iter().find(|r| !self.columns.contains(&r.name)) {
                    return Err(InsightError::query(format!(
                        "APPLY key {} must appear in COLUMNS",
                        missing.name
                    )));
                }
                Ok(Some(Transformations { group, apply }))
            }
            (Some(_), None) => Err(InsightError::query("TRANSFORMATIONS missing APPLY")),
            (None, Some(_)) => Err(InsightError::query("TRANSFORMATIONS missing GROUP")),
        }
    }

    fn validate_columns(&self, transformations: Option<&Transformations>) -> InsightResult<()> {
        for column in &self.columns {
            let valid = match transformations {
                Some(t) => {
                    t.group.contains(column)
                        || t.apply_names().any(|name| name == column.as_str())
                }
                None => self.schema.is_field(column),
            };
            if !valid {
                return Err(match transformations {
                    Some(_) => InsightError::query(format!(
                        "Keys in COLUMNS must be in GROUP or APPLY when TRANSFORMATIONS \
                         is present: {}",
                        column
                    )),
                    None => InsightError::query(format!("Invalid key {} in COLUMNS", column)),
                });
            }
        }
        Ok(())
    }

    fn validate_order(&self) -> InsightResult<Option<Order>> {
        let Some(order) = &self.order else {
            return Ok(None);
        };

        match order {
            Value::String(key) => {
                self.require_in_columns(key)?;
                Ok(Some(Order::Single(key.clone())))
            }
            Value::Object(obj) => {
                reject_unknown_keys(obj, &["dir", "keys"], "ORDER")?;
                let dir = obj
                    .get("dir")
                    .and_then(Value::as_str)
                    .and_then(Direction::from_token)
                    .ok_or_else(|| InsightError::query("Invalid ORDER direction"))?;
                let keys = obj
                    .get("keys")
                    .and_then(Value::as_array)
                    .filter(|keys| !keys.is_empty())
                    .ok_or_else(|| InsightError::query("ORDER keys must be a non-empty array"))?;

                let keys = keys
                    .iter()
                    .map(|key| {
                        let key = key
                            .as_str()
                            .ok_or_else(|| InsightError::query("ORDER keys must be strings"))?;
                        self.require_in_columns(key)?;
                        Ok(key.to_string())
                    })
                    .collect::<InsightResult<Vec<String>>>()?;
                Ok(Some(Order::Multi { dir, keys }))
            }
            _ => Err(InsightError::query("Invalid ORDER type")),
        }
    }

    fn require_in_columns(&self, key: &str) -> InsightResult<()> {
        if self.columns.iter().any(|c| c == key) {
            Ok(())
        } else {
            Err(InsightError::query(format!(
                "ORDER key {} must be in COLUMNS",
                key
            )))
        }
    }
}

impl Options {
    /// Project every record onto COLUMNS, then apply ORDER if present.
    pub fn evaluate<'r, I>(&self, records: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'r Value>,
    {
        let mut results: Vec<Value> = records.into_iter().map(|r| self.project(r)).collect();

        if let Some(order) = &self.order {
            sort_results(&mut results, order);
        }

        debug!("Projected {} records onto {} columns", results.len(), self.columns.len());
        results
    }

    fn project(&self, record: &Value) -> Value {
        let mut row = Map::new();
        for column in &self.columns {
            if let Some(value) = get_field(record, column) {
                row.insert(column.clone(), value.clone());
            }
        }
        Value::Object(row)
    }
}

/// Stable sort of projected rows.
fn sort_results(results: &mut [Value], order: &Order) {
    match order {
        Order::Single(key) => {
            results.sort_by(|a, b| compare_values(a.get(key), b.get(key)));
        }
        Order::Multi { dir, keys } => {
            results.sort_by(|a, b| {
                for key in keys {
                    let ordering = compare_values(a.get(key), b.get(key));
                    if ordering != Ordering::Equal {
                        return match dir {
                            Direction::Up => ordering,
                            Direction::Down => ordering.reverse(),
                        };
                    }
                }
                Ordering::Equal
            });
        }
    }
}

fn reject_unknown_keys(
    obj: &Map<String, Value>,
    allowed: &[&str],
    clause: &str,
) -> InsightResult<()> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(InsightError::query(format!(
            "Invalid key {} in {}",
            key, clause
        ))),
        None => Ok(()),
    }
}
