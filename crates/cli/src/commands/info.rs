//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::TelemetryConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    tenant_id: u32,
    limits: LimitsInfo,
    dispatch: DispatchInfo,
    decoration: DecorationInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<String>,
    events: Vec<EventInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct LimitsInfo {
    max_parameters: usize,
    legal_parameter_length: usize,
    legal_user_id_length: usize,
}

#[derive(Serialize)]
struct DispatchInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    interval_s: Option<f64>,
    batch_size: usize,
    realtime_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    flush_interval_s: Option<f64>,
}

#[derive(Serialize)]
struct DecorationInfo {
    category: String,
    origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
}

#[derive(Serialize)]
struct EventInfo {
    name: String,
    realtime: bool,
    max_parameters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<ParameterInfo>,
}

#[derive(Serialize)]
struct ParameterInfo {
    key: String,
    param_type: String,
    mandatory: bool,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &TelemetryConfig, args: &InfoArgs) -> ConfigInfo {
    let events = config
        .events
        .values()
        .map(|schema| EventInfo {
            name: schema.name.clone(),
            realtime: schema.realtime,
            max_parameters: config.max_parameters_for(schema),
            category: schema.category.clone(),
            parameters: if args.events {
                schema
                    .parameters
                    .iter()
                    .map(|(key, spec)| ParameterInfo {
                        key: key.clone(),
                        param_type: spec.param_type.as_str().to_string(),
                        mandatory: spec.mandatory,
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    let sinks = if args.sinks {
        config
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    let dispatch = &config.dispatch;
    ConfigInfo {
        tenant_id: config.tenant_id,
        limits: LimitsInfo {
            max_parameters: config.limits.max_parameters,
            legal_parameter_length: config.limits.legal_parameter_length,
            legal_user_id_length: config.limits.legal_user_id_length,
        },
        dispatch: DispatchInfo {
            interval_s: dispatch.interval().map(|d| d.as_secs_f64()),
            batch_size: dispatch.batch_size,
            realtime_enabled: dispatch.realtime_enabled,
            flush_interval_s: dispatch.flush_interval().map(|d| d.as_secs_f64()),
        },
        decoration: DecorationInfo {
            category: config.decoration.category.clone(),
            origin: config.decoration.origin.clone(),
            channel: config.decoration.channel.clone(),
        },
        store: config.store.path.as_ref().map(|p| p.display().to_string()),
        events,
        sinks,
    }
}

fn print_config_info(config: &TelemetryConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Telemetry Configuration                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🏷  Tenant {}", config.tenant_id);
    println!(
        "   ├─ Decoration: category={} origin={} channel={}",
        config.decoration.category,
        config.decoration.origin,
        config.decoration.channel.as_deref().unwrap_or("-")
    );
    match &config.store.path {
        Some(path) => println!("   └─ Queue store: {}", path.display()),
        None => println!("   └─ Queue store: in-memory"),
    }

    let limits = &config.limits;
    println!("\n📏 Limits");
    println!("   ├─ Max parameters: {}", limits.max_parameters);
    println!("   ├─ Parameter length: {}", limits.legal_parameter_length);
    println!("   └─ User id length: {}", limits.legal_user_id_length);

    let dispatch = &config.dispatch;
    println!("\n⚙️  Dispatch");
    match dispatch.interval() {
        Some(period) => println!("   ├─ Interval: {:.1}s", period.as_secs_f64()),
        None => println!("   ├─ Interval: disabled"),
    }
    println!("   ├─ Batch size: {}", dispatch.batch_size);
    println!("   ├─ Realtime: {}", dispatch.realtime_enabled);
    match dispatch.flush_interval() {
        Some(period) => println!("   └─ Flush interval: {:.1}s", period.as_secs_f64()),
        None => println!("   └─ Flush interval: disabled"),
    }

    println!("\n📨 Events ({})", config.events.len());
    let count = config.events.len();
    for (i, schema) in config.events.values().enumerate() {
        let is_last = i + 1 == count;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let realtime = if schema.realtime { " [realtime]" } else { "" };

        println!(
            "   {} {} (max {} params){}",
            prefix,
            schema.name,
            config.max_parameters_for(schema),
            realtime
        );

        if args.events {
            let params = schema.parameters.len();
            for (j, (key, spec)) in schema.parameters.iter().enumerate() {
                let param_prefix = if j + 1 == params { "└─" } else { "├─" };
                let mandatory = if spec.mandatory { ", mandatory" } else { "" };
                println!(
                    "   {}  {} {} ({}{})",
                    child_prefix,
                    param_prefix,
                    key,
                    spec.param_type.as_str(),
                    mandatory
                );
            }
        }
    }

    if args.sinks && !config.sinks.is_empty() {
        println!("\n📤 Sinks ({})", config.sinks.len());
        for (i, sink) in config.sinks.iter().enumerate() {
            let prefix = if i + 1 == config.sinks.len() { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, capacity {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}
