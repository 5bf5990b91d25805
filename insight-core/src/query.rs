//! Query lifecycle: construction, validation, evaluation.
//!
//! A [`Query`] is only a parsed-but-unchecked request. Evaluation is defined on
//! [`ValidatedQuery`], which can only be obtained from [`Query::validate`], so
//! an invalid query can never reach the evaluation stages.

use serde_json::Value;
use tracing::debug;

use crate::ast::{Filter, Options, Transformations};
use crate::error::{InsightError, InsightResult};
use crate::executor::{
    group_by_keys, process_apply_rules, FilterEvaluator, OptionsStage, QueryLimits,
};
use crate::schema::DatasetSchema;
use crate::validator::FilterValidator;

/// A constructed query against one dataset schema.
#[derive(Debug, Clone)]
pub struct Query<'s> {
    schema: &'s DatasetSchema,
    where_clause: Value,
    options: OptionsStage<'s>,
}

impl<'s> Query<'s> {
    /// Construct a query from its JSON form.
    ///
    /// Fails immediately when the root is not an object, when WHERE or
    /// OPTIONS is missing, or when either clause is structurally unusable.
    pub fn new(raw: &Value, schema: &'s DatasetSchema) -> InsightResult<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| InsightError::query("Query must be an object"))?;

        if let Some(key) = obj
            .keys()
            .find(|k| !matches!(k.as_str(), "WHERE" | "OPTIONS" | "TRANSFORMATIONS"))
        {
            return Err(InsightError::query(format!("Invalid key {} in query", key)));
        }

        let (Some(where_clause), Some(options)) = (obj.get("WHERE"), obj.get("OPTIONS")) else {
            return Err(InsightError::query(
                "Query must contain both a WHERE and an OPTIONS clause",
            ));
        };
        if !where_clause.is_object() {
            return Err(InsightError::query("WHERE clause must be an object"));
        }

        let options = OptionsStage::new(schema, options, obj.get("TRANSFORMATIONS"))?;

        Ok(Self {
            schema,
            where_clause: where_clause.clone(),
            options,
        })
    }

    /// Validate WHERE and OPTIONS (with TRANSFORMATIONS).
    pub fn validate(&self) -> InsightResult<ValidatedQuery> {
        let filter = FilterValidator::new(self.schema).parse_where(&self.where_clause)?;
        let (options, transformations) = self.options.validate()?;
        debug!("Validated query against dataset '{}'", self.schema.id());

        Ok(ValidatedQuery {
            filter,
            options,
            transformations,
        })
    }
}

/// A query that passed validation and is ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub filter: Filter,
    pub options: Options,
    pub transformations: Option<Transformations>,
}

impl ValidatedQuery {
    /// Run the query against one dataset snapshot.
    ///
    /// WHERE first; then GROUP + APPLY when present, in which case projection
    /// runs over the synthetic group records instead of the filtered ones.
    pub fn evaluate(&self, records: &[Value], limits: QueryLimits) -> InsightResult<Vec<Value>> {
        let filtered = FilterEvaluator::new(limits).evaluate(&self.filter, records)?;

        match &self.transformations {
            Some(t) => {
                let groups = group_by_keys(&filtered, &t.group)?;
                let aggregated = process_apply_rules(&groups, &t.apply, &t.group)?;
                Ok(self.options.evaluate(&aggregated))
            }
            None => Ok(self.options.evaluate(filtered)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DatasetKind;
    use serde_json::json;

    fn sections() -> DatasetSchema {
        DatasetSchema::new("sections", DatasetKind::Sections)
    }

    fn records() -> Vec<Value> {
        vec![
            json!({"sections_avg": 95, "sections_dept": "cpsc", "sections_title": "310"}),
            json!({"sections_avg": 85, "sections_dept": "math", "sections_title": "210"}),
            json!({"sections_avg": 75, "sections_dept": "bio", "sections_title": "310"}),
        ]
    }

    #[test]
    fn test_construction_requires_where_and_options() {
        let schema = sections();
        assert!(Query::new(&json!({"OPTIONS": {"COLUMNS": ["sections_avg"]}}), &schema).is_err());
        assert!(Query::new(&json!({"WHERE": {}}), &schema).is_err());
        assert!(Query::new(&json!("WHERE"), &schema).is_err());
        assert!(Query::new(
            &json!({"WHERE": null, "OPTIONS": {"COLUMNS": ["sections_avg"]}}),
            &schema
        )
        .is_err());
        assert!(Query::new(
            &json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["sections_avg"]}, "LIMIT": 3}),
            &schema
        )
        .is_err());
    }

    #[test]
    fn test_construct_validate_evaluate() {
        let schema = sections();
        let raw = json!({
            "WHERE": {"GT": {"sections_avg": 80}},
            "OPTIONS": {"COLUMNS": ["sections_dept", "sections_avg"], "ORDER": "sections_avg"}
        });
        let query = Query::new(&raw, &schema).unwrap().validate().unwrap();
        let results = query.evaluate(&records(), QueryLimits::default()).unwrap();
        assert_eq!(
            results,
            vec![
                json!({"sections_dept": "math", "sections_avg": 85}),
                json!({"sections_dept": "cpsc", "sections_avg": 95}),
            ]
        );
    }

    #[test]
    fn test_invalid_filter_fails_validation_not_construction() {
        let schema = sections();
        let raw = json!({
            "WHERE": {"GT": {"sections_avg": "high"}},
            "OPTIONS": {"COLUMNS": ["sections_avg"]}
        });
        let query = Query::new(&raw, &schema).unwrap();
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_transformations_project_synthetic_records() {
        let schema = sections();
        let raw = json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_title", "maxAvg"]},
            "TRANSFORMATIONS": {
                "GROUP": ["sections_title"],
                "APPLY": [{"maxAvg": {"MAX": "sections_avg"}}]
            }
        });
        let query = Query::new(&raw, &schema).unwrap().validate().unwrap();
        let results = query.evaluate(&records(), QueryLimits::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["sections_title"], "310");
        assert_eq!(results[0]["maxAvg"].as_f64(), Some(95.0));
        assert_eq!(results[1]["sections_title"], "210");
        assert_eq!(results[1]["maxAvg"].as_f64(), Some(85.0));
    }

    #[test]
    fn test_transformations_over_empty_match() {
        let schema = sections();
        let raw = json!({
            "WHERE": {"GT": {"sections_avg": 100}},
            "OPTIONS": {"COLUMNS": ["sections_title", "n"]},
            "TRANSFORMATIONS": {
                "GROUP": ["sections_title"],
                "APPLY": [{"n": {"COUNT": "sections_dept"}}]
            }
        });
        let query = Query::new(&raw, &schema).unwrap().validate().unwrap();
        assert!(query.evaluate(&records(), QueryLimits::default()).unwrap().is_empty());
    }
}
