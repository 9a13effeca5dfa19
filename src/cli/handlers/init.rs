use std::error::Error;

use crate::cli::output::PruneJson;
use crate::io::store::HealthStatus;

use super::Context;

pub fn cmd_init(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let report = ctx.store.initialize()?;
    let dir = ctx.store.data_dir().display();

    if ctx.json {
        let json = serde_json::json!({
            "dataDir": ctx.store.data_dir(),
            "createdTasks": report.created_tasks,
            "createdProjects": report.created_projects,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if !report.created_tasks && !report.created_projects {
        println!("already initialized in {}", dir);
    } else {
        println!("initialized {}", dir);
        if report.created_tasks {
            println!("  tasks.json");
        }
        if report.created_projects {
            println!("  projects.json");
        }
    }
    Ok(())
}

pub fn cmd_health(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let report = ctx.store.health();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match report.status {
            HealthStatus::Healthy => {
                println!("healthy");
                if let Some(path) = &report.tasks_file {
                    println!("  tasks:    {}", path.display());
                }
                if let Some(path) = &report.projects_file {
                    println!("  projects: {}", path.display());
                }
            }
            HealthStatus::Unhealthy => {
                println!("unhealthy: {}", report.error.as_deref().unwrap_or("unknown error"));
            }
        }
    }

    match report.status {
        HealthStatus::Healthy => Ok(()),
        HealthStatus::Unhealthy => Err("data files are not usable".into()),
    }
}

pub fn cmd_backup_prune(ctx: &Context, days: Option<i64>) -> Result<(), Box<dyn Error>> {
    let days = days.unwrap_or(ctx.config.storage.retention_days);
    if days < 0 {
        return Err(format!("--days must not be negative (got {})", days).into());
    }
    let removed = ctx.store.prune_backups(days)?;

    if ctx.json {
        let json = PruneJson {
            removed: removed.iter().map(|p| p.display().to_string()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if removed.is_empty() {
        println!("no backups older than {} days", days);
    } else {
        for path in &removed {
            println!("removed {}", path.display());
        }
    }
    Ok(())
}
