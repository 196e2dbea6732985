//! Feature schema fixed at training time
//!
//! The training step persists the model's input columns as an ordered list
//! of names (`Hour`, `Temperature`, `Machine_Status_Off`, ...). Here that list
//! is parsed once into typed columns so the encoder never has to guess
//! which columns exist from the values of a single request.

use crate::error::ArtifactError;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Numeric observation fields passed through unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NumericField {
    Hour,
    Temperature,
}

impl NumericField {
    pub const ALL: [NumericField; 2] = [NumericField::Hour, NumericField::Temperature];

    pub fn name(&self) -> &'static str {
        match self {
            NumericField::Hour => "Hour",
            NumericField::Temperature => "Temperature",
        }
    }
}

/// Categorical observation fields expanded into indicator columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CategoricalField {
    MachineStatus,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 1] = [CategoricalField::MachineStatus];

    pub fn name(&self) -> &'static str {
        match self {
            CategoricalField::MachineStatus => "Machine_Status",
        }
    }

    /// Name of the indicator column for `category`
    pub fn indicator(&self, category: &str) -> String {
        format!("{}_{}", self.name(), category)
    }
}

/// How a schema column is filled from an observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Numeric(NumericField),
    Indicator {
        field: CategoricalField,
        category: String,
    },
    /// A column no observation field maps to; always encoded as zero
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    fn classify(name: &str) -> ColumnKind {
        if let Some(field) = NumericField::ALL.into_iter().find(|f| f.name() == name) {
            return ColumnKind::Numeric(field);
        }
        for field in CategoricalField::ALL {
            if let Some(category) = name
                .strip_prefix(field.name())
                .and_then(|rest| rest.strip_prefix('_'))
            {
                return ColumnKind::Indicator {
                    field,
                    category: category.to_string(),
                };
            }
        }
        ColumnKind::Unmapped
    }
}

/// Ordered, immutable list of the columns a trained model expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<Column>,
}

impl FeatureSchema {
    /// Build a schema from column names in training order
    pub fn from_names<I, S>(names: I) -> Result<Self, ArtifactError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(ArtifactError::Schema("empty column name".to_string()));
            }
            if !seen.insert(name.clone()) {
                return Err(ArtifactError::Schema(format!("duplicate column `{}`", name)));
            }
            let kind = Column::classify(&name);
            columns.push(Column { name, kind });
        }
        if columns.is_empty() {
            return Err(ArtifactError::Schema("schema has no columns".to_string()));
        }
        Ok(Self { columns })
    }

    /// Load a schema persisted as a JSON array of column names
    pub fn from_json_file(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let names: Vec<String> =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_names(names)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Category labels known for `field`, in schema order
    pub fn categories(&self, field: CategoricalField) -> Vec<&str> {
        self.columns
            .iter()
            .filter_map(|c| match &c.kind {
                ColumnKind::Indicator { field: f, category } if *f == field => {
                    Some(category.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Columns that no observation field will ever fill
    pub fn unmapped(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Unmapped)
            .map(|c| c.name.as_str())
            .collect()
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names().collect::<Vec<_>>().join(", "))
    }
}
