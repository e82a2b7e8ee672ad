// FILE: crates/cli/src/commands.rs

use anyhow::{bail, Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use syncguard_config::{Config, ConfigManager};
use syncguard_core::{AlertOutcome, CycleOutcome, CycleReport, EngineStats};
use syncguard_engine::{
    client_from_config, maintenance, ArtifactKind, LockDetector, NullClient, SourceWatcher,
    SyncEngine, SyncWorker,
};
use syncguard_resilience::{CancelToken, Clock, SystemClock};

/// Write a default config file
pub fn init(manager: &ConfigManager) -> Result<()> {
    let created = manager
        .initialize()
        .context("Failed to write default config")?;
    let path = manager.config_path();

    if created {
        println!("{} Config written to {}", style("✓").green().bold(), path.display());
        println!("  Set paths.source and paths.destination before running.");
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

/// Check the config file and the tracked paths
pub fn validate(manager: &ConfigManager) -> Result<()> {
    let config = manager
        .load_with_env_overrides()
        .context("Failed to load config")?;
    let problems = collect_problems(&config);

    if problems.is_empty() {
        println!(
            "{} {} is valid",
            style("✓").green().bold(),
            manager.config_path().display()
        );
        println!("  Source:      {}", config.paths.source.display());
        println!("  Destination: {}", config.paths.destination.display());
        return Ok(());
    }

    println!("\n{}", style("Config problems").bold().red());
    println!("{}", "=".repeat(80));
    for problem in &problems {
        println!("  - {}", problem);
    }
    bail!("{} problem(s) in {}", problems.len(), manager.config_path().display())
}

/// Watch the source and sync until Ctrl-C
pub async fn run(config: Config) -> Result<()> {
    if config.maintenance.sweep_on_start {
        match maintenance::sweep(&config.paths.destination, &config.maintenance, SystemTime::now()) {
            Ok(report) if report.removed() > 0 => {
                log::info!("Start-up cleanup removed {} file(s)", report.removed())
            }
            Ok(_) => {}
            Err(e) => log::warn!("Start-up cleanup failed: {}", e),
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let client = client_from_config(&config.client, Arc::clone(&clock));
    let engine = SyncEngine::new(&config, clock, client).context("Failed to start the sync engine")?;
    let source = engine.source().to_path_buf();

    let mut worker = SyncWorker::start(engine).context("Failed to start the sync worker")?;
    let watcher = SourceWatcher::start(&source, config.engine.debounce(), worker.sender())
        .context("Failed to watch the source file")?;

    println!(
        "{} Watching {} -> {}",
        style("▶").green().bold(),
        source.display(),
        config.paths.destination.display()
    );
    println!("  Press Ctrl-C to stop.");

    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.app.status_report_interval_secs));
    ticker.tick().await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = ticker.tick() => log_status(&worker.stats()),
        }
    }

    println!("\nStopping...");
    drop(watcher);
    worker.stop();

    let stats = worker.stats();
    log_status(&stats);
    print_stats(&stats);
    Ok(())
}

/// Run one cycle for the current source file
pub async fn sync_once(config: Config, json: bool) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let client = client_from_config(&config.client, Arc::clone(&clock));
    let mut engine =
        SyncEngine::new(&config, clock, client).context("Failed to start the sync engine")?;
    let event = engine
        .current_event()
        .context("Failed to read the source file")?;

    let cancel = CancelToken::new();
    let cycle_cancel = cancel.clone();
    let mut cycle = tokio::task::spawn_blocking(move || engine.run_cycle(event, &cycle_cancel));

    let report = tokio::select! {
        joined = &mut cycle => joined.context("Sync cycle panicked")?,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            cycle.await.context("Sync cycle panicked")?
        }
    };

    if json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    match &report.outcome {
        CycleOutcome::Failed(e) => bail!("Sync failed: {}", e.user_message()),
        _ => Ok(()),
    }
}

/// Evaluate the policy for the current on-disk state
pub fn decide(config: &Config) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let engine = SyncEngine::new(config, clock, Arc::new(NullClient))
        .context("Failed to start the sync engine")?;
    let event = engine
        .current_event()
        .context("Failed to read the source file")?;
    let (context, decision) = engine.evaluate(&event);

    println!("\n{}", style("Decision").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("File: {} ({})", event.file_name(), format_size(event.size));
    println!("  Source editing:      {}", yes_no(context.source_editing));
    println!("  Destination editing: {}", yes_no(context.dest_editing));
    println!("  Critical file:       {}", yes_no(context.is_critical_file));
    println!("  Business hours:      {}", yes_no(context.is_business_hours));
    println!(
        "  Last sync:           {}",
        context
            .last_sync_minutes_ago
            .map(|m| format!("{:.0} min ago", m))
            .unwrap_or_else(|| "never".to_string())
    );
    println!();
    println!(
        "{} {} in {}",
        style("→").bold(),
        style(decision.action).bold(),
        format_delay(decision.delay_seconds)
    );
    println!(
        "  Confidence {}% | Impact {} | Rule {}",
        decision.confidence, decision.impact, decision.rule
    );
    println!("  {}", decision.reasoning);
    Ok(())
}

/// List lock artifacts next to both ends
pub fn locks(config: &Config) -> Result<()> {
    if !config.paths.is_configured() {
        bail!("paths.source and paths.destination must be set");
    }
    let detector = LockDetector::new();

    for (label, path) in [
        ("Source", config.paths.source.as_path()),
        ("Destination", config.paths.destination.as_path()),
    ] {
        let artifacts = detector.artifacts(path);
        println!("\n{} {}", style(label).bold().cyan(), path.display());
        if artifacts.is_empty() {
            println!("  {} not being edited", style("✓").green());
            continue;
        }
        for artifact in artifacts {
            println!(
                "  {} {} ({})",
                style("🔒").yellow(),
                display_name(&artifact.path),
                artifact_label(artifact.kind)
            );
        }
    }
    Ok(())
}

/// Remove old blocked markers and leftover nudge files
pub fn cleanup(config: &Config) -> Result<()> {
    if config.paths.destination.as_os_str().is_empty() {
        bail!("paths.destination must be set");
    }
    let report = maintenance::sweep(&config.paths.destination, &config.maintenance, SystemTime::now())
        .context("Failed to scan the destination directory")?;

    for path in report.blocked_markers.iter().chain(&report.nudge_artifacts) {
        println!("  removed {}", display_name(path));
    }
    for (path, reason) in &report.failures {
        println!("  {} {}: {}", style("✗").red(), display_name(path), reason);
    }
    println!(
        "{} Removed {} blocked marker(s) and {} nudge file(s)",
        style("✓").green().bold(),
        report.blocked_markers.len(),
        report.nudge_artifacts.len()
    );
    Ok(())
}

fn collect_problems(config: &Config) -> Vec<String> {
    let mut problems = Vec::new();
    if let Err(errors) = config.validate() {
        problems.extend(errors.iter().map(|e| e.to_string()));
    }
    if let Err(errors) = config.paths.check_runnable() {
        problems.extend(errors.iter().map(|e| e.to_string()));
    }
    problems
}

fn print_report(report: &CycleReport) {
    println!("\n{}", style(format!("Cycle {}", report.cycle_id)).bold().cyan());
    println!("{}", "=".repeat(80));
    println!(
        "Decision: {} in {} ({}% confidence, rule {})",
        report.decision.action,
        format_delay(report.decision.delay_seconds),
        report.decision.confidence,
        report.decision.rule
    );
    println!("  {}", report.decision.reasoning);

    for attempt in &report.attempts {
        println!(
            "  Attempt {}: {:?} ({} -> {})",
            attempt.attempt_number,
            attempt.outcome,
            format_size(attempt.bytes_source),
            format_size(attempt.bytes_dest)
        );
    }
    if let Some(backup) = &report.backup_path {
        println!("  Backup: {}", backup.display());
    }
    let nudges = report.nudges_total();
    if nudges.attempted > 0 {
        println!("  Nudges: {}/{} succeeded", nudges.succeeded, nudges.attempted);
    }
    if let AlertOutcome::Stray(alert) = &report.alert {
        println!("  {} Alert marker left behind: {}", style("!").yellow(), alert.path.display());
    }
    if let Some(verification) = &report.verification {
        println!(
            "  Verification: {}/5 signals, {}% {}",
            verification.score,
            verification.confidence_pct,
            confidence_bar(verification.confidence_pct)
        );
    }
    for warning in &report.degraded {
        println!("  {} {}", style("!").yellow(), warning);
    }
    if let Some(marker) = &report.blocked_marker {
        println!("  Blocked marker: {}", marker.display());
    }

    println!();
    match &report.outcome {
        CycleOutcome::Synced => println!("{} {}", style("✓").green().bold(), outcome_summary(report)),
        CycleOutcome::Failed(_) => println!("{} {}", style("✗").red().bold(), outcome_summary(report)),
        _ => println!("{} {}", style("•").yellow().bold(), outcome_summary(report)),
    }
}

fn print_stats(stats: &EngineStats) {
    println!("\n{}", style("Session Statistics").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("Changes detected:    {}", style(stats.changes_detected).bold());
    println!("Cycles synced:       {}", stats.cycles_succeeded);
    println!("Cycles failed:       {}", stats.cycles_failed);
    println!("Cycles cancelled:    {}", stats.cycles_cancelled);
    println!("Conflicts detected:  {}", stats.conflicts_detected);
    println!("Success rate:        {:.1}%", stats.success_rate());
    println!("Resolution rate:     {:.1}%", stats.resolution_rate());
    println!("Average confidence:  {:.1}%", stats.average_confidence);
    if let Some(last) = stats.last_sync_at {
        println!("Last sync:           {}", last);
    }
}

fn log_status(stats: &EngineStats) {
    log::info!(
        "Status: {} change(s), {} synced, {} failed, {} conflict(s), success {:.1}%, resolution {:.1}%, avg confidence {:.1}%",
        stats.changes_detected,
        stats.cycles_succeeded,
        stats.cycles_failed,
        stats.conflicts_detected,
        stats.success_rate(),
        stats.resolution_rate(),
        stats.average_confidence
    );
}

fn outcome_summary(report: &CycleReport) -> String {
    match &report.outcome {
        CycleOutcome::Synced => format!(
            "Synced after {} attempt(s)",
            report.attempts.len()
        ),
        CycleOutcome::Failed(e) => format!("Failed [{}]: {}", e.code(), e),
        CycleOutcome::Cancelled => "Cancelled before completion".to_string(),
        CycleOutcome::Deferred => "Alert raised, nothing copied".to_string(),
    }
}

fn artifact_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::OfficeOwner => "Office owner file",
        ArtifactKind::LibreOfficeLock => "LibreOffice lock",
        ArtifactKind::StemTemp => "temporary file",
        ArtifactKind::WordRecovery => "Word recovery file",
        ArtifactKind::ExcelScratch => "Excel scratch file",
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn format_delay(seconds: u64) -> String {
    match seconds {
        0 => "0s (now)".to_string(),
        s if s < 60 => format!("{}s", s),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{}m {}s", s / 60, s % 60),
    }
}

fn confidence_bar(pct: u8) -> String {
    let filled = usize::from(pct.min(100)) / 10;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(10 - filled))
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
