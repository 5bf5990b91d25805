//! Dataset kinds and the attribute whitelist each kind exposes to queries.
//!
//! A field reference in a query is always `<datasetId>_<attribute>`. The
//! schema knows the dataset id and kind, and answers whether a reference is
//! legal and which type it carries. It never looks at record content.

use std::fmt;

use serde::{Deserialize, Serialize};

const SECTION_NUMERIC: &[&str] = &["avg", "pass", "fail", "audit", "year"];
const SECTION_STRING: &[&str] = &["uuid", "id", "title", "instructor", "dept"];

const ROOM_NUMERIC: &[&str] = &["lat", "lon", "seats"];
const ROOM_STRING: &[&str] = &[
    "fullname",
    "shortname",
    "number",
    "name",
    "address",
    "type",
    "furniture",
    "href",
];

/// Kind of records stored in a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Sections,
    Rooms,
}

impl DatasetKind {
    fn numeric_attributes(self) -> &'static [&'static str] {
        match self {
            DatasetKind::Sections => SECTION_NUMERIC,
            DatasetKind::Rooms => ROOM_NUMERIC,
        }
    }

    fn string_attributes(self) -> &'static [&'static str] {
        match self {
            DatasetKind::Sections => SECTION_STRING,
            DatasetKind::Rooms => ROOM_STRING,
        }
    }

    /// Type of an unprefixed attribute, if the kind defines it.
    pub fn attribute_type(self, attribute: &str) -> Option<FieldType> {
        if self.numeric_attributes().contains(&attribute) {
            Some(FieldType::Numeric)
        } else if self.string_attributes().contains(&attribute) {
            Some(FieldType::String)
        } else {
            None
        }
    }

    /// All attributes of this kind, numeric first.
    pub fn attributes(self) -> impl Iterator<Item = &'static str> {
        self.numeric_attributes()
            .iter()
            .chain(self.string_attributes().iter())
            .copied()
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Sections => write!(f, "sections"),
            DatasetKind::Rooms => write!(f, "rooms"),
        }
    }
}

/// Value type of a whitelisted field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Numeric,
    String,
}

/// Field whitelist for one dataset id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSchema {
    id: String,
    kind: DatasetKind,
}

impl DatasetSchema {
    pub fn new(id: impl Into<String>, kind: DatasetKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Type of a fully qualified field, or `None` when the field is not
    /// whitelisted for this dataset (wrong prefix or unknown attribute).
    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        let (prefix, attribute) = field.split_once('_')?;
        if prefix != self.id {
            return None;
        }
        self.kind.attribute_type(attribute)
    }

    pub fn is_field(&self, field: &str) -> bool {
        self.field_type(field).is_some()
    }

    pub fn is_numeric_field(&self, field: &str) -> bool {
        self.field_type(field) == Some(FieldType::Numeric)
    }

    pub fn is_string_field(&self, field: &str) -> bool {
        self.field_type(field) == Some(FieldType::String)
    }

    /// Fully qualified names of every whitelisted field.
    pub fn fields(&self) -> Vec<String> {
        self.kind
            .attributes()
            .map(|attr| format!("{}_{}", self.id, attr))
            .collect()
    }
}

/// Drop the `<datasetId>_` prefix from a field name. Names without an
/// underscore are returned unchanged.
pub fn strip_prefix(field: &str) -> &str {
    match field.split_once('_') {
        Some((_, rest)) => rest,
        None => field,
    }
}

/// Dataset id part of a field reference, if the reference has one.
pub fn dataset_prefix(field: &str) -> Option<&str> {
    field
        .split_once('_')
        .map(|(prefix, _)| prefix)
        .filter(|prefix| !prefix.is_empty())
}
