// ambari-state/src/cli/watch.rs

use crate::config::SyncConfig;
use crate::fetch::{HttpTransport, SnapshotFetcher};
use crate::mappers::mapper_for;
use crate::scheduler::{CycleOutcome, PollEvent, Scheduler};
use crate::store::{ChangeEvent, RecordStore};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Build the scheduler for `config`, with one mapper per polled resource.
pub fn build_scheduler(config: &SyncConfig) -> Result<Scheduler> {
    let transport = HttpTransport::from_config(config.server())
        .context("Failed to build the HTTP client")?;
    let fetcher = SnapshotFetcher::new(Arc::new(transport), config.url_vars());
    let mut scheduler = Scheduler::new(RecordStore::create(), fetcher, config.groups().to_vec());

    for resource in config.resources() {
        if scheduler.mapper(resource).is_some() {
            continue;
        }
        let mapper = mapper_for(resource)?;
        scheduler
            .register(mapper)
            .with_context(|| format!("Failed to register the mapper for {}", resource))?;
    }
    Ok(scheduler)
}

/// Poll the configured cluster and log changes until interrupted
pub fn watch_cluster(config_path: &Path) -> Result<()> {
    let config = SyncConfig::try_from(config_path)?;
    println!("✓ Loaded configuration");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(watch(config))
}

async fn watch(config: SyncConfig) -> Result<()> {
    let scheduler = Arc::new(build_scheduler(&config)?);
    let mut changes = scheduler.store().lock().subscribe();
    let mut polls = scheduler.subscribe();

    println!(
        "Watching cluster {} at {} ({} poll groups, Ctrl-C to stop)",
        config.cluster(),
        config.server().url(),
        config.groups().len()
    );
    let handles = scheduler.spawn();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            change = changes.recv() => match change {
                Ok(event) => log_change(&event),
                Err(RecvError::Lagged(missed)) => warn!("Missed {} change events", missed),
                Err(RecvError::Closed) => break,
            },
            poll = polls.recv() => match poll {
                Ok(event) => log_poll(&event),
                Err(RecvError::Lagged(missed)) => warn!("Missed {} poll events", missed),
                Err(RecvError::Closed) => break,
            },
        }
    }

    println!("Stopping...");
    scheduler.shutdown();
    for handle in handles {
        handle.await.context("Poll task panicked")?;
    }
    scheduler.store().lock().teardown();
    println!("✓ Stopped");
    Ok(())
}

fn log_change(event: &ChangeEvent) {
    info!("batch {}: {}", event.batch, event.summary());
}

fn log_poll(event: &PollEvent) {
    match &event.outcome {
        CycleOutcome::Success => info!(
            "{} cycle {} ({}) fresh at {}",
            event.group,
            event.generation,
            event.mode,
            event.finished_at.to_rfc3339()
        ),
        CycleOutcome::Failure { errors } => {
            for (resource, error) in errors {
                warn!(
                    "{} cycle {}: {} failed: {}",
                    event.group, event.generation, resource, error
                );
            }
        }
    }
}
