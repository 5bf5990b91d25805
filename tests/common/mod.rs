//! Common test utilities for query tests
//!
//! Provides shared helper functions for:
//! - Building facades seeded with section and room datasets
//! - Executing queries and unwrapping results

#![allow(dead_code)]

use insightql::{AppError, DatasetKind, InsightFacade};
use serde_json::{json, Value};

pub fn three_sections() -> Vec<Value> {
    vec![
        json!({"avg": 95, "dept": "cpsc", "instructor": "smith", "title": "310"}),
        json!({"avg": 85, "dept": "math", "instructor": "jones", "title": "210"}),
        json!({"avg": 75, "dept": "bio", "instructor": "brown", "title": "310"}),
    ]
}

pub fn eight_sections() -> Vec<Value> {
    let rows = [
        ("310", 90), ("210", 74), ("310", 80), ("210", 78),
        ("310", 95), ("210", 72), ("310", 85), ("210", 85),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (title, avg))| {
            json!({
                "uuid": format!("{}", 1000 + i),
                "title": title,
                "avg": avg,
                "dept": if i % 2 == 0 { "cpsc" } else { "math" },
                "pass": 10 + i,
                "year": 2015
            })
        })
        .collect()
}

pub fn rooms() -> Vec<Value> {
    vec![
        json!({"name": "DMP_110", "shortname": "DMP", "seats": 120, "furniture": "Tables"}),
        json!({"name": "DMP_201", "shortname": "DMP", "seats": 40, "furniture": "Chairs"}),
        json!({"name": "ANGU_098", "shortname": "ANGU", "seats": 260, "furniture": "Tables"}),
    ]
}

pub fn create_facade(sections: Vec<Value>) -> InsightFacade {
    let mut facade = InsightFacade::new();
    facade
        .add_dataset("sections", DatasetKind::Sections, sections)
        .expect("Failed to add sections");
    facade
        .add_dataset("rooms", DatasetKind::Rooms, rooms())
        .expect("Failed to add rooms");
    facade
}

pub fn run(facade: &InsightFacade, query: Value) -> Vec<Value> {
    facade
        .perform_query(&query)
        .unwrap_or_else(|e| panic!("Failed to execute {}: {}", query, e))
}

pub fn run_err(facade: &InsightFacade, query: Value) -> AppError {
    match facade.perform_query(&query) {
        Ok(results) => panic!("Expected {} to fail, got {} results", query, results.len()),
        Err(e) => e,
    }
}
