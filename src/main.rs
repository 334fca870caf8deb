use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use goalmeme_lib::{
    db::{format_date, DailyGoal, Urgency},
    meme::{share_text, ImageContent, RewardState},
    progress::{compute_stats, is_goal_today, CompletionSnapshot},
    AppState,
};

#[derive(Parser, Debug)]
#[command(name = "goalmeme", version, about = "One goal a day, and a meme to show for it")]
struct Cli {
    /// Where the goal store and settings live.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set or show today's goal.
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Manage the goal's activities.
    #[command(subcommand)]
    Activity(ActivityCommand),
    /// Manage an activity's checklist.
    #[command(subcommand)]
    Sub(SubCommand),
    /// Move today's goal into history.
    CompleteDay,
    /// List past goals, newest first.
    History,
    /// Completion statistics across history.
    Stats,
    /// Delete every goal.
    Clear,
    /// Generate today's reward meme.
    Meme {
        /// Directory to save the PNG into.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Seed for reproducible picks.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum GoalCommand {
    Set {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    Show,
}

#[derive(Subcommand, Debug)]
enum ActivityCommand {
    Add {
        title: String,
        #[arg(long, default_value = "medium", value_parser = parse_urgency)]
        urgency: Urgency,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = parse_urgency)]
        urgency: Option<Urgency>,
    },
    Toggle {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    Add {
        activity: String,
        title: String,
    },
    Toggle {
        id: String,
    },
    Delete {
        id: String,
    },
}

fn parse_urgency(value: &str) -> Result<Urgency, String> {
    Urgency::parse(value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    goalmeme_lib::init_logging();
    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .ok_or_else(|| anyhow!("no platform data directory; pass --data-dir"))?
            .join("goalmeme"),
    };
    let today = Local::now().date_naive();
    let state = AppState::open(&data_dir, today).await?;

    match cli.cmd {
        Command::Goal(GoalCommand::Set { title, description }) => {
            let goal = state.db.set_goal(title, description, today).await?;
            print_goal(&goal);
        }
        Command::Goal(GoalCommand::Show) => match state.db.current_goal().await? {
            Some(goal) => print_goal(&goal),
            None => println!("No goal set for today. Try `goalmeme goal set \"...\"`."),
        },
        Command::Activity(cmd) => run_activity(&state, cmd).await?,
        Command::Sub(cmd) => run_sub(&state, cmd).await?,
        Command::CompleteDay => match state.db.complete_day().await? {
            Some(goal) => {
                let snapshot = CompletionSnapshot::from_activities(&goal.activities);
                println!("Archived \"{}\" at {}%", goal.title, snapshot.percent());
            }
            None => println!("Nothing to complete."),
        },
        Command::History => {
            let history = state.db.history().await?;
            if history.is_empty() {
                println!("No history yet.");
            }
            for goal in history {
                let snapshot = CompletionSnapshot::from_activities(&goal.activities);
                println!(
                    "{}  {:>3}%  {}",
                    format_date(goal.date),
                    snapshot.percent(),
                    goal.title
                );
            }
        }
        Command::Stats => {
            let current = state.db.current_goal().await?;
            let history = state.db.history().await?;
            let stats = compute_stats(current.as_ref(), &history);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Clear => {
            state.db.clear_all().await?;
            println!("All goals deleted.");
        }
        Command::Meme { out, seed } => run_meme(&state, &data_dir, out, seed).await?,
    }

    Ok(())
}

async fn run_activity(state: &AppState, cmd: ActivityCommand) -> Result<()> {
    match cmd {
        ActivityCommand::Add { title, urgency } => {
            let activity = state.db.add_activity(title, urgency).await?;
            println!("Added {} [{}]", activity.id, activity.urgency.as_str());
        }
        ActivityCommand::Edit { id, title, urgency } => {
            let id = resolve_activity(state, &id).await?;
            state.db.update_activity(id, title, urgency).await?;
        }
        ActivityCommand::Toggle { id } => {
            let id = resolve_activity(state, &id).await?;
            let done = state.db.toggle_activity(id).await?;
            println!("{}", if done { "Done." } else { "Reopened." });
        }
        ActivityCommand::Delete { id } => {
            let id = resolve_activity(state, &id).await?;
            state.db.delete_activity(id).await?;
        }
    }
    Ok(())
}

async fn run_sub(state: &AppState, cmd: SubCommand) -> Result<()> {
    match cmd {
        SubCommand::Add { activity, title } => {
            let activity = resolve_activity(state, &activity).await?;
            let sub = state.db.add_sub_activity(activity, title).await?;
            println!("Added {}", sub.id);
        }
        SubCommand::Toggle { id } => {
            let id = resolve_sub(state, &id).await?;
            let done = state.db.toggle_sub_activity(id).await?;
            println!("{}", if done { "Done." } else { "Reopened." });
        }
        SubCommand::Delete { id } => {
            let id = resolve_sub(state, &id).await?;
            state.db.delete_sub_activity(id).await?;
        }
    }
    Ok(())
}

async fn run_meme(state: &AppState, data_dir: &Path, out: Option<PathBuf>, seed: Option<u64>) -> Result<()> {
    let today = Local::now().date_naive();
    let goal = state
        .db
        .current_goal()
        .await?
        .filter(|goal| is_goal_today(Some(goal), today))
        .context("set today's goal before asking for a meme")?;
    let snapshot = CompletionSnapshot::from_activities(&goal.activities);

    let controller = state.reward_controller(data_dir, seed)?;
    match controller
        .regenerate(snapshot.completed, snapshot.total, &goal)
        .await
    {
        RewardState::Ready { reward, .. } => {
            println!("{}", share_text(&reward, &snapshot));
            println!("({} via {})", reward.source.tone.as_str(), reward.method.as_str());
            if let ImageContent::RemoteUrl(url) = &reward.content {
                println!("{url}");
            }
        }
        RewardState::Failed { message, .. } => bail!(message),
        other => bail!("reward generation did not settle: {other:?}"),
    }

    let out = out.unwrap_or_else(|| data_dir.join("memes"));
    if let Some(path) = controller.save_current(&out, today).await? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

/// Full id or unique prefix of an activity in today's goal.
async fn resolve_activity(state: &AppState, id: &str) -> Result<String> {
    let goal = current(state).await?;
    unique_match(goal.activities.iter().map(|a| a.id.as_str()), id, "activity")
}

async fn resolve_sub(state: &AppState, id: &str) -> Result<String> {
    let goal = current(state).await?;
    let ids = goal
        .activities
        .iter()
        .flat_map(|a| a.sub_activities.iter().map(|s| s.id.as_str()));
    unique_match(ids, id, "sub-activity")
}

async fn current(state: &AppState) -> Result<DailyGoal> {
    state
        .db
        .current_goal()
        .await?
        .context("no goal set for today")
}

fn unique_match<'a>(ids: impl Iterator<Item = &'a str>, needle: &str, entity: &str) -> Result<String> {
    let matches: Vec<&str> = ids.filter(|id| id.starts_with(needle)).collect();
    match matches.as_slice() {
        [only] => Ok(only.to_string()),
        [] => bail!("no {entity} matches '{needle}'"),
        _ => bail!("'{needle}' matches several {entity} ids; use more characters"),
    }
}

fn print_goal(goal: &DailyGoal) {
    let snapshot = CompletionSnapshot::from_activities(&goal.activities);
    println!(
        "{} ({}) - {}/{} done",
        goal.title,
        format_date(goal.date),
        snapshot.completed,
        snapshot.total
    );
    if let Some(description) = &goal.description {
        println!("  {description}");
    }
    for activity in &goal.activities {
        let mark = if activity.completed { "x" } else { " " };
        println!(
            "  [{mark}] {} {} ({})",
            &activity.id[..8.min(activity.id.len())],
            activity.title,
            activity.urgency.as_str()
        );
        for sub in &activity.sub_activities {
            let mark = if sub.completed { "x" } else { " " };
            println!("      [{mark}] {} {}", &sub.id[..8.min(sub.id.len())], sub.title);
        }
    }
}
