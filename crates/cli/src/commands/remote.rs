//! Commands that talk to a running energy server

use anyhow::Result;
use colored::Colorize;
use energy_core::{RawObservation, ServiceState};

use crate::client::ApiClient;
use crate::output::{
    color_status, format_currency, format_kwh, format_timestamp, print_json, print_success, print_warning,
    OutputFormat,
};

/// Request a prediction for one observation
pub async fn predict(
    client: &ApiClient,
    observation: &RawObservation,
    format: OutputFormat,
) -> Result<()> {
    let result = client.predict(observation).await?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => {
            print_success("Prediction complete");
            println!();
            println!("Predicted energy:   {}", format_kwh(result.predicted_energy_kwh).cyan());
            println!(
                "Estimated bill:     {}",
                format_currency(result.estimated_bill).green()
            );
            println!("Rate per kWh:       {}", result.rate_used);
        }
    }

    Ok(())
}

/// Show server status and the configured billing rate
pub async fn status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;

    match format {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Table => {
            let label = match status.status {
                ServiceState::Ok => "ok",
                ServiceState::Degraded => "degraded",
            };
            println!("{}", "Energy Server Status".bold());
            println!("{}", "=".repeat(50));
            println!("Status:             {}", color_status(label));
            println!("Rate per kWh:       {}", status.rate);
            println!(
                "Model:              {}",
                status.model_kind.as_deref().unwrap_or("none")
            );
            if let Some(fingerprint) = &status.model_fingerprint {
                println!("Fingerprint:        {}", fingerprint);
            }
            if let Some(loaded_at) = status.model_loaded_at {
                println!("Loaded at:          {}", format_timestamp(loaded_at));
            }
            if let Some(columns) = &status.schema_columns {
                println!("Columns:            {}", columns.join(", "));
            }
            if let Some(reason) = &status.reason {
                println!();
                print_warning(&format!("Predictions disabled: {}", reason));
            }
        }
    }

    Ok(())
}
