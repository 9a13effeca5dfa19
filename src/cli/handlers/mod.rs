mod init;
pub use init::{cmd_backup_prune, cmd_health, cmd_init};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigError};
use crate::io::store::{FileStore, TaskStore};
use crate::model::config::AppConfig;
use crate::model::project::{Project, ProjectType};
use crate::ops::access::{self, Actor};
use crate::ops::aggregate;
use crate::ops::task_ops::{FieldUpdate, Outcome, TaskError};
use crate::session::Session;

type CmdResult = Result<(), Box<dyn Error>>;

/// Everything a handler needs besides its own arguments
pub struct Context {
    pub config: AppConfig,
    pub store: Arc<FileStore>,
    pub user: String,
    pub json: bool,
}

impl Context {
    fn actor(&self) -> Result<Actor, Box<dyn Error>> {
        Ok(Actor::login(&self.user)?)
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.config.autosave.debounce_ms)
    }
}

/// Config file, then environment, then `--data-dir`.
pub fn load_settings(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = config_io::load_config(cli.config.as_deref())?;
    config_io::apply_env(&mut config, |key| std::env::var(key).ok());
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli, config: AppConfig) -> CmdResult {
    let ctx = Context {
        store: Arc::new(FileStore::from_config(&config.storage)),
        config,
        user: cli.user,
        json: cli.json,
    };

    match cli.command {
        Commands::Init => cmd_init(&ctx),
        Commands::Health => cmd_health(&ctx),
        Commands::Backup(BackupCmd {
            action: BackupAction::Prune { days },
        }) => cmd_backup_prune(&ctx, days),

        // Read commands
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Stats(args) => cmd_stats(&ctx, args),
        Commands::Projects => cmd_projects(&ctx),

        // Write commands
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Sub(args) => cmd_sub(&ctx, args),
        Commands::Set(args) => cmd_set(&ctx, args),
        Commands::Rm(args) => cmd_rm(&ctx, args),
        Commands::Lock(args) => cmd_lock(&ctx, args),
        Commands::Expand(args) => cmd_expand(&ctx, args),
        Commands::Project(args) => cmd_project(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_project(s: &str) -> Result<ProjectType, Box<dyn Error>> {
    Ok(s.parse::<ProjectType>()?)
}

fn project_meta(ctx: &Context, project: ProjectType) -> Result<Option<Project>, Box<dyn Error>> {
    Ok(ctx
        .store
        .load_projects()?
        .into_iter()
        .find(|p| p.project_type == project))
}

/// Run one mutation through a session, report the outcome, and flush.
/// `describe` renders the confirmation line for an applied change.
fn run_mutation<F, D>(ctx: &Context, project: &str, target: &str, op: F, describe: D) -> CmdResult
where
    F: FnOnce(&mut Session) -> Result<Outcome, TaskError>,
    D: FnOnce(&Session) -> String,
{
    let project = parse_project(project)?;
    let actor = ctx.actor()?;
    let store: Arc<dyn TaskStore> = ctx.store.clone();
    let mut session = Session::open(store, project, actor, ctx.debounce())?;

    let result = op(&mut session);
    let message = match &result {
        Ok(Outcome::Denied) => format!("no change: {}", denial_reason(&session, target)),
        Ok(Outcome::Created(id)) => id.clone(),
        Ok(Outcome::Applied) => describe(&session),
        Err(_) => String::new(),
    };
    let report = session.close();
    let outcome = result?;

    if report.failures > 0 {
        eprintln!("warning: change applied but could not be saved (see log)");
    }

    if ctx.json {
        let json = MutationJson {
            project,
            id: target.to_string(),
            changed: outcome.changed(),
            created: match outcome {
                Outcome::Created(id) => Some(id),
                _ => None,
            },
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", message);
    }
    Ok(())
}

/// Why a gated mutation was a no-op
fn denial_reason(session: &Session, target: &str) -> String {
    let actor = session.actor();
    if !access::can_administer(actor.role) {
        return format!("{} is read-only", actor.name);
    }
    let locked = session.tasks().iter().any(|m| {
        (m.task.id == target && m.task.locked) || m.subtask(target).is_some_and(|s| s.locked)
    });
    if locked {
        format!("{} is locked", target)
    } else {
        format!("{} was not changed", target)
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(ctx: &Context, args: ProjectArg) -> CmdResult {
    let project = parse_project(&args.project)?;
    let tasks = ctx.store.load_tasks(project)?;
    let meta = project_meta(ctx, project)?;

    if ctx.json {
        let stats = aggregate::schedule_stats(&tasks);
        let json = list_json(project, meta.as_ref(), &tasks, stats);
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for line in format_listing(project, meta.as_ref(), &tasks) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_stats(ctx: &Context, args: ProjectArg) -> CmdResult {
    let project = parse_project(&args.project)?;
    let tasks = ctx.store.load_tasks(project)?;
    let stats = aggregate::schedule_stats(&tasks);

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        for line in format_stats(&stats) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_projects(ctx: &Context) -> CmdResult {
    let projects = ctx.store.load_projects()?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
    } else if projects.is_empty() {
        println!("no projects (run `dp init`)");
    } else {
        for project in &projects {
            println!("{}", format_project(project));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    run_mutation(ctx, &args.project, "", |s| s.add_main_task(&args.title), |_| String::new())
}

fn cmd_sub(ctx: &Context, args: SubArgs) -> CmdResult {
    run_mutation(
        ctx,
        &args.project,
        &args.parent,
        |s| s.add_subtask(&args.parent),
        |_| String::new(),
    )
}

fn cmd_set(ctx: &Context, args: SetArgs) -> CmdResult {
    let update = FieldUpdate::parse(&args.field, &args.value)?;
    run_mutation(
        ctx,
        &args.project,
        &args.id,
        |s| s.update_field(&args.id, args.parent.as_deref(), update),
        |_| {
            let value = if args.value.is_empty() { "(cleared)" } else { args.value.as_str() };
            format!("{} {} → {}", args.id, args.field, value)
        },
    )
}

fn cmd_rm(ctx: &Context, args: TaskRef) -> CmdResult {
    run_mutation(
        ctx,
        &args.project,
        &args.id,
        |s| s.delete_task(&args.id, args.parent.as_deref()),
        |_| format!("deleted {}", args.id),
    )
}

fn cmd_lock(ctx: &Context, args: TaskRef) -> CmdResult {
    run_mutation(
        ctx,
        &args.project,
        &args.id,
        |s| s.toggle_locked(&args.id, args.parent.as_deref()),
        |s| {
            let locked = s
                .tree()
                .find(&args.id, args.parent.as_deref())
                .is_some_and(|t| t.locked);
            format!("{} is {}", args.id, if locked { "locked" } else { "unlocked" })
        },
    )
}

fn cmd_expand(ctx: &Context, args: ExpandArgs) -> CmdResult {
    run_mutation(
        ctx,
        &args.project,
        &args.id,
        |s| s.toggle_expanded(&args.id),
        |s| {
            let expanded = s.tree().find_main(&args.id).is_some_and(|m| m.is_expanded);
            format!("{} is {}", args.id, if expanded { "expanded" } else { "collapsed" })
        },
    )
}

fn cmd_project(ctx: &Context, args: ProjectUpdateArgs) -> CmdResult {
    let project = parse_project(&args.project)?;
    let actor = ctx.actor()?;
    let date = args
        .date
        .as_deref()
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", d))
        })
        .transpose()?;

    if !access::can_administer(actor.role) {
        println!("no change: {} is read-only", actor.name);
        return Ok(());
    }

    let saved = ctx.store.save_project(project, args.title.as_deref(), date)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&saved)?);
    } else {
        println!("{}", format_project(&saved));
    }
    Ok(())
}
