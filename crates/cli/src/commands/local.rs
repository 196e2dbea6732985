//! Offline commands working directly on artifact files

use anyhow::{Context, Result};
use colored::Colorize;
use energy_core::{
    predictor::{FeatureEncoder, UnseenCategoryPolicy},
    schema::{CategoricalField, ColumnKind},
    ArtifactPaths, FeatureSchema, ModelArtifact, RawObservation,
};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    format_timestamp, print_info, print_json, print_success, print_table, print_warning,
    OutputFormat,
};

/// Row for the encoded vector table
#[derive(Tabled, Serialize)]
struct EncodedRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Value")]
    value: f64,
}

fn kind_label(kind: &ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Numeric(_) => "numeric",
        ColumnKind::Indicator { .. } => "indicator",
        ColumnKind::Unmapped => "unmapped",
    }
}

/// Show how an observation is encoded against a schema file
pub fn encode(
    schema_path: &Path,
    observation: &RawObservation,
    policy: UnseenCategoryPolicy,
    format: OutputFormat,
) -> Result<()> {
    let schema = FeatureSchema::from_json_file(schema_path)
        .with_context(|| format!("Failed to load schema {}", schema_path.display()))?;
    let vector = FeatureEncoder::with_policy(policy).encode(observation, &schema)?;

    let rows: Vec<EncodedRow> = schema
        .columns()
        .iter()
        .zip(vector.values())
        .enumerate()
        .map(|(index, (column, value))| EncodedRow {
            index,
            column: column.name.clone(),
            kind: kind_label(&column.kind),
            value: *value,
        })
        .collect();

    print_table(&rows, format);

    if let OutputFormat::Table = format {
        let hot = schema
            .columns()
            .iter()
            .zip(vector.values())
            .any(|(c, v)| matches!(c.kind, ColumnKind::Indicator { .. }) && *v != 0.0);
        if !hot && !schema.categories(CategoricalField::MachineStatus).is_empty() {
            print_warning("Machine status matched no trained category; all indicators are zero");
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ArtifactReport {
    kind: &'static str,
    fingerprint: String,
    loaded_at: i64,
    n_features: usize,
    columns: Vec<String>,
    categories: Vec<String>,
    unmapped: Vec<String>,
}

/// Load an artifact the way the server does and report what was found
pub fn inspect(paths: &ArtifactPaths, format: OutputFormat) -> Result<()> {
    let artifact = ModelArtifact::load(paths).context("Model artifact would be unavailable")?;
    let schema = artifact.schema();

    let report = ArtifactReport {
        kind: artifact.kind(),
        fingerprint: artifact.fingerprint().to_string(),
        loaded_at: artifact.loaded_at(),
        n_features: artifact.regressor().n_features(),
        columns: schema.names().map(String::from).collect(),
        categories: schema
            .categories(CategoricalField::MachineStatus)
            .into_iter()
            .map(String::from)
            .collect(),
        unmapped: schema.unmapped().into_iter().map(String::from).collect(),
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            print_success("Model artifact loads");
            println!();
            println!("Kind:               {}", report.kind.cyan());
            println!("Fingerprint:        {}", report.fingerprint);
            println!("Loaded at:          {}", format_timestamp(report.loaded_at));
            println!("Features:           {}", report.n_features);
            println!("Columns:            {}", report.columns.join(", "));
            print_info(&format!(
                "Known machine statuses: {}",
                report.categories.join(", ")
            ));
            if !report.unmapped.is_empty() {
                print_warning(&format!(
                    "Columns always encoded as zero: {}",
                    report.unmapped.join(", ")
                ));
            }
        }
    }

    Ok(())
}
