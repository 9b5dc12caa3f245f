//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::TelemetryConfig;
use ingestion::{SET_EMAIL_EVENT, SET_USER_ID_EVENT};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    tenant_id: u32,
    event_count: usize,
    realtime_event_count: usize,
    sink_count: usize,
    durable: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    tenant_id: config.tenant_id,
                    event_count: config.events.len(),
                    realtime_event_count: config.events.values().filter(|s| s.realtime).count(),
                    sink_count: config.sinks.len(),
                    durable: config.store.path.is_some(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &TelemetryConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.events.is_empty() {
        warnings.push("No events configured - every report will be rejected".to_string());
    }

    for special in [SET_USER_ID_EVENT, SET_EMAIL_EVENT] {
        if !config.events.contains_key(special) {
            warnings.push(format!(
                "'{special}' is not configured - reports of it will be rejected"
            ));
        }
    }

    for (name, schema) in &config.events {
        let limit = config.max_parameters_for(schema);
        if schema.parameters.len() > limit {
            warnings.push(format!(
                "Event '{name}' declares {} parameters but accepts at most {limit}",
                schema.parameters.len()
            ));
        }
        if schema.realtime && !config.dispatch.realtime_enabled {
            warnings.push(format!(
                "Event '{name}' is realtime but dispatch.realtime_enabled is false"
            ));
        }
    }

    if config.dispatch.interval().is_none() && !config.dispatch.realtime_enabled {
        warnings.push(
            "Timer and realtime dispatch are both disabled - events leave only on dispatch-now"
                .to_string(),
        );
    }

    if config.store.path.is_none() {
        warnings.push("store.path is unset - queued events do not survive a restart".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Tenant: {}", summary.tenant_id);
            println!(
                "  Events: {} ({} realtime)",
                summary.event_count, summary.realtime_event_count
            );
            println!("  Sinks: {}", summary.sink_count);
            println!("  Durable queue: {}", summary.durable);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
