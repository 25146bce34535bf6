//! Minimal HEIMDALL walkthrough: two agents, one failing, and the monitor
//! reacting with alerts, quarantine, and gating.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use heimdall_alerts::{AlertCondition, AlertRule, AlertSeverity, MetricOp};
use heimdall_config::MonitorConfig;
use heimdall_kernel::HeimdallKernel;
use heimdall_primitives::{AgentName, OperationOutcome, TelemetrySpan};
use heimdall_store::{FileSnapshotStore, SnapshotStore};
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Run a small HEIMDALL monitoring scenario")]
struct Args {
    /// Optional TOML monitor configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of failing operations the unlucky agent performs.
    #[arg(long, default_value_t = 6)]
    failures: u32,

    /// Optional NDJSON file to persist the final snapshot into.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    if config.rules.is_empty() {
        config.rules.push(AlertRule::new(
            "error-rate-emergency",
            "agent error rate runaway",
            AlertCondition::Threshold {
                metric: "error_rate".into(),
                op: MetricOp::Ge,
                value: 0.5,
            },
            AlertSeverity::Emergency,
            Duration::from_secs(300),
        )?);
    }

    let kernel = Arc::new(HeimdallKernel::new(config).await?);
    let odin = AgentName::new("odin")?;
    let loki = AgentName::new("loki")?;

    info!("--- recording operations ---");
    for i in 0..10 {
        kernel
            .record_agent_operation(
                TelemetrySpan::builder(odin.clone(), "sync-runes")
                    .detail(format!("batch {i}"))
                    .build()?,
            )
            .await;
    }
    for i in 0..args.failures {
        let fired = kernel
            .record_agent_operation(
                TelemetrySpan::builder(loki.clone(), "divinate")
                    .outcome(OperationOutcome::Error)
                    .detail(format!("attempt {i}: upstream returned 500"))
                    .build()?,
            )
            .await;
        for alert in fired {
            info!(severity = ?alert.severity(), message = alert.message(), "alert fired");
        }
    }

    info!("--- gate decisions ---");
    info!(agent = %odin, decision = ?kernel.should_allow_operation(&odin).await);
    info!(agent = %loki, decision = ?kernel.should_allow_operation(&loki).await);

    for instruction in kernel.drain_remediation(10).await {
        info!(
            agent = %instruction.agent,
            directive = %instruction.directive,
            "remediation pending"
        );
    }

    let dashboard = kernel.dashboard().await;
    println!("{}", serde_json::to_string_pretty(&dashboard)?);

    if let Some(path) = args.snapshot {
        let store = FileSnapshotStore::open(&path).await?;
        store.persist(&kernel.snapshot().await).await?;
        info!(path = %path.display(), "snapshot persisted");
    }

    Ok(())
}
