//! task-master - command line entry point.
//!
//! Parses arguments, loads configuration from the environment and runs one
//! command against the tasks document.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskmaster::commands::{self, ExpandOptions, SubtaskSource};
use taskmaster::config::Config;
use taskmaster::ingest::Generator;
use taskmaster::task::complexity::DEFAULT_REPORT_PATH;
use taskmaster::task::{Priority, SubtaskDraft, Task, TaskRef, TaskStatus};
use taskmaster::util::{env_var_bool, truncate};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TITLE_WIDTH: usize = 60;

/// Manage a project's task graph, with AI-assisted task generation.
#[derive(Parser)]
#[command(name = "task-master", version, about)]
struct Cli {
    /// Path to the tasks document.
    #[arg(long, short, global = true, default_value = "tasks/tasks.json")]
    file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate tasks from a PRD, replacing the tasks document.
    ParsePrd {
        /// PRD text file.
        input: PathBuf,
        #[arg(long, short, default_value_t = 10)]
        num_tasks: usize,
    },

    /// Rewrite unfinished tasks from an id onward to reflect new context.
    Update {
        #[arg(long, default_value_t = 1)]
        from: u64,
        #[arg(long, short)]
        prompt: String,
        #[arg(long, short)]
        research: bool,
    },

    /// Set the status of tasks or subtasks, e.g. `--id 3,4.1`.
    SetStatus {
        #[arg(long, short)]
        id: String,
        #[arg(long, short)]
        status: TaskStatus,
    },

    /// List tasks with a progress summary.
    List {
        #[arg(long, short)]
        status: Option<TaskStatus>,
    },

    /// Show the next task to work on.
    Next,

    /// Break a task into subtasks.
    Expand {
        #[arg(long, short)]
        id: u64,
        /// Subtask count; defaults to the complexity report, then DEFAULT_SUBTASKS.
        #[arg(long, short)]
        num: Option<usize>,
        #[arg(long, short)]
        research: bool,
        /// Extra context for the model.
        #[arg(long, short, default_value = "")]
        prompt: String,
        #[arg(long, default_value = DEFAULT_REPORT_PATH)]
        report: PathBuf,
    },

    /// Expand every unfinished task.
    ExpandAll {
        #[arg(long, short)]
        num: Option<usize>,
        #[arg(long, short)]
        research: bool,
        #[arg(long, short, default_value = "")]
        prompt: String,
        /// Replace existing subtasks.
        #[arg(long)]
        force: bool,
        #[arg(long, default_value = DEFAULT_REPORT_PATH)]
        report: PathBuf,
    },

    /// Remove all subtasks from the given tasks.
    ClearSubtasks {
        #[arg(long, short, value_delimiter = ',', required = true)]
        id: Vec<u64>,
    },

    /// Generate a new task from a description.
    AddTask {
        #[arg(long, short)]
        prompt: String,
        #[arg(long, short, value_delimiter = ',')]
        dependencies: Vec<u64>,
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
    },

    /// Score task complexity and write the report.
    Analyze {
        #[arg(long, short, default_value = DEFAULT_REPORT_PATH)]
        output: PathBuf,
        /// Score from which expansion is recommended.
        #[arg(long, short, default_value_t = 5.0)]
        threshold: f64,
        #[arg(long, short)]
        research: bool,
    },

    /// Add a subtask, or convert an existing task into one.
    AddSubtask {
        #[arg(long, short)]
        parent: u64,
        /// Existing task to convert.
        #[arg(long, short = 'i', conflicts_with = "title")]
        task_id: Option<u64>,
        #[arg(long, short, required_unless_present = "task_id")]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long)]
        details: Option<String>,
        #[arg(long, value_delimiter = ',')]
        dependencies: Vec<u64>,
        #[arg(long, short)]
        status: Option<TaskStatus>,
    },

    /// Remove a subtask, optionally turning it into a task.
    RemoveSubtask {
        /// Subtask to remove, as `parentId.subtaskId`.
        #[arg(long, short)]
        id: TaskRef,
        #[arg(long, short)]
        convert: bool,
    },

    /// Report invalid dependencies.
    ValidateDependencies,

    /// Remove invalid dependencies.
    FixDependencies,
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| {
        format!(
            "invalid priority '{}'; expected high, medium or low",
            value
        )
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> anyhow::Result<()> {
    let default_filter = if env_var_bool("DEBUG", false) {
        "taskmaster=debug"
    } else {
        "taskmaster=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    tracing::debug!(
        "Loaded configuration: model={}, research model={}",
        config.generation.model,
        config.generation.research_model
    );

    let generator = || -> anyhow::Result<Generator> {
        Ok(Generator::new(config.client()?, config.generation.clone()))
    };
    let file = cli.file.as_path();

    match cli.command {
        Command::ParsePrd { input, num_tasks } => {
            let document = commands::parse_prd(
                &generator()?,
                &input,
                file,
                num_tasks,
                &config.project_name,
            )
            .await?;
            println!("Generated {} tasks in {}", document.tasks.len(), file.display());
            print_tasks(&document.tasks);
        }
        Command::Update {
            from,
            prompt,
            research,
        } => {
            let updated =
                commands::update_tasks(&generator()?, file, from, &prompt, research).await?;
            println!("Updated {} tasks", updated.len());
        }
        Command::SetStatus { id, status } => {
            for change in commands::set_status(file, &id, status)? {
                println!("{}: {} -> {}", change.target, change.previous, change.status);
            }
        }
        Command::List { status } => {
            let (tasks, summary) = commands::list_tasks(file, status)?;
            print_tasks(&tasks);
            println!();
            println!(
                "Tasks: {}/{} done ({:.0}%), {} in progress, {} pending, {} blocked, {} deferred",
                summary.done,
                summary.total,
                summary.completion_percent,
                summary.in_progress,
                summary.pending,
                summary.blocked,
                summary.deferred
            );
            println!(
                "Subtasks: {}/{} done ({:.0}%)",
                summary.done_subtasks, summary.total_subtasks, summary.subtask_completion_percent
            );
            println!(
                "Ready to work on: {}, waiting on dependencies: {}, avg dependencies: {:.1}",
                summary.ready, summary.blocked_by_dependencies, summary.avg_dependencies
            );
            if let Some((id, count)) = summary.most_depended_on {
                println!("Most depended-on task: {} ({} dependents)", id, count);
            }
        }
        Command::Next => match commands::next_task(file)? {
            Some(task) => print_task_details(&task),
            None => println!("No eligible tasks found. All tasks are done or blocked."),
        },
        Command::Expand {
            id,
            num,
            research,
            prompt,
            report,
        } => {
            let options = ExpandOptions {
                num_subtasks: num,
                use_research: research,
                context: &prompt,
                report_path: Some(&report),
            };
            let subtasks = commands::expand_task(&generator()?, file, id, &options).await?;
            for sub in &subtasks {
                println!("{}.{} {}", id, sub.id, truncate(&sub.title, TITLE_WIDTH));
            }
        }
        Command::ExpandAll {
            num,
            research,
            prompt,
            force,
            report,
        } => {
            let options = ExpandOptions {
                num_subtasks: num,
                use_research: research,
                context: &prompt,
                report_path: Some(&report),
            };
            let summary = commands::expand_all(&generator()?, file, &options, force).await?;
            println!(
                "Expanded {} tasks ({} skipped, {} failed)",
                summary.expanded, summary.skipped, summary.failed
            );
        }
        Command::ClearSubtasks { id } => {
            let cleared = commands::clear_subtasks(file, &id)?;
            println!("Cleared subtasks from {} tasks", cleared);
        }
        Command::AddTask {
            prompt,
            dependencies,
            priority,
        } => {
            let id =
                commands::add_task(&generator()?, file, &prompt, &dependencies, priority).await?;
            println!("Added task {}", id);
        }
        Command::Analyze {
            output,
            threshold,
            research,
        } => {
            let report = commands::analyze_complexity(
                &generator()?,
                file,
                &output,
                threshold,
                research,
                &config.project_name,
            )
            .await?;
            for entry in report.complexity_analysis {
                println!(
                    "{:>4} score {:>2}  subtasks {:>2}  {}",
                    entry.task_id,
                    entry.complexity_score,
                    entry.recommended_subtasks,
                    truncate(&entry.title, TITLE_WIDTH)
                );
            }
        }
        Command::AddSubtask {
            parent,
            task_id,
            title,
            description,
            details,
            dependencies,
            status,
        } => {
            let source = match (task_id, title) {
                (Some(task_id), _) => SubtaskSource::Existing(task_id),
                (None, Some(title)) => SubtaskSource::New(SubtaskDraft {
                    title,
                    description,
                    details,
                    status,
                    dependencies,
                }),
                (None, None) => anyhow::bail!("either --task-id or --title is required"),
            };
            let target = commands::add_subtask(file, parent, source)?;
            println!("Added subtask {}", target);
        }
        Command::RemoveSubtask { id, convert } => {
            match commands::remove_subtask(file, &id, convert)? {
                Some(new_id) => println!("Subtask {} converted to task {}", id, new_id),
                None => println!("Removed subtask {}", id),
            }
        }
        Command::ValidateDependencies => {
            let issues = commands::validate_dependencies(file)?;
            for issue in &issues {
                println!(
                    "{} -> {}: {:?}",
                    issue.owner, issue.dependency, issue.kind
                );
            }
            if issues.is_empty() {
                println!("All dependencies are valid");
            }
        }
        Command::FixDependencies => {
            let repairs = commands::fix_dependencies(file)?;
            println!(
                "Removed {} invalid dependencies ({} self, {} missing, {} duplicate)",
                repairs.total(),
                repairs.self_references,
                repairs.missing_targets,
                repairs.duplicates
            );
        }
    }

    Ok(())
}

fn print_tasks(tasks: &[Task]) {
    for task in tasks {
        let deps = task
            .dependencies
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:>4} [{:<11}] {:<6} {}{}",
            task.id,
            task.status.as_str(),
            task.priority.as_str(),
            truncate(&task.title, TITLE_WIDTH),
            if deps.is_empty() {
                String::new()
            } else {
                format!("  (deps: {})", deps)
            }
        );
    }
}

fn print_task_details(task: &Task) {
    println!("Next task: {} - {}", task.id, task.title);
    println!("Priority: {}  Status: {}", task.priority, task.status);
    if !task.description.is_empty() {
        println!("\n{}", task.description);
    }
    if !task.details.is_empty() {
        println!("\nDetails:\n{}", task.details);
    }
    if !task.test_strategy.is_empty() {
        println!("\nTest strategy:\n{}", task.test_strategy);
    }
    for sub in &task.subtasks {
        println!("  {}.{} [{}] {}", task.id, sub.id, sub.status, sub.title);
    }
}
