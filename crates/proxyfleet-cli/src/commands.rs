//! Subcommand bodies. Each takes ownership of the coordinator, does its
//! work, and prints the operator-facing outcome; errors bubble up to
//! `main` for uniform reporting.

use std::path::Path;

use proxyfleet_control::{PublishCoordinator, PublishError, PublishOptions, PublishReport};
use proxyfleet_rollout::GroupStatus;

pub async fn create_version(
    mut coordinator: PublishCoordinator,
    file: &Path,
    version: &str,
    publish: bool,
    gradual: bool,
) -> Result<(), PublishError> {
    println!("Loading configuration file from '{}'...", file.display());
    let source = std::fs::read_to_string(file)
        .map_err(|e| PublishError::abort(format!("Could not read '{}': {e}", file.display())))?;

    let artifact = coordinator.create_version(&source, version).await?;
    println!("Created version '{version}' successfully.");

    if publish {
        // A freshly created version is never the current one, but force
        // keeps the chained publish from refusing an overwrite-recreate
        // of the running version.
        let report = coordinator
            .publish(
                version,
                Some(artifact),
                PublishOptions {
                    gradual,
                    force: true,
                },
            )
            .await?;
        print_report(&report);
    }
    Ok(())
}

pub async fn publish(
    mut coordinator: PublishCoordinator,
    version: &str,
    force: bool,
    gradual: bool,
) -> Result<(), PublishError> {
    let report = coordinator
        .publish(version, None, PublishOptions { gradual, force })
        .await?;
    print_report(&report);
    Ok(())
}

pub fn list_versions(coordinator: &PublishCoordinator) -> Result<(), PublishError> {
    let versions = coordinator.list_versions();
    if versions.is_empty() {
        println!("No versions have been created yet.");
        return Ok(());
    }
    let current = coordinator.state().current_version.clone();
    for version in versions {
        if current.as_deref() == Some(version.as_str()) {
            println!("{version} (current)");
        } else {
            println!("{version}");
        }
    }
    Ok(())
}

pub async fn add_group(
    mut coordinator: PublishCoordinator,
    name: &str,
    count: u32,
) -> Result<(), PublishError> {
    coordinator.add_group(name, count).await?;
    println!("Registered server group '{name}' with {count} nginx servers.");
    Ok(())
}

fn print_report(report: &PublishReport) {
    if report.fully_completed() {
        println!("Published version '{}' successfully!", report.version);
        return;
    }
    println!(
        "Publish of version '{}' finished with incomplete groups:",
        report.version
    );
    for (group, outcome) in &report.outcomes {
        let status = match outcome.status {
            GroupStatus::Completed => "completed",
            GroupStatus::Running => "incomplete",
            GroupStatus::Pending => "never started",
        };
        println!(
            "  {group}: {status} ({}/{} servers reported success)",
            outcome.done_count, outcome.server_count
        );
    }
}
