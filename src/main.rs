use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskdeck::api::HttpRecordStore;
use taskdeck::console::{self, parse_token, ConsoleNotifier};
use taskdeck::config;
use taskdeck_core::metrics::DashboardSummary;
use taskdeck_core::models::*;
use taskdeck_core::notify::{Notice, Notifier};
use taskdeck_core::store::RecordId;
use taskdeck_core::{BoardController, BoardEntity, Error, Picklist, Services, Transition};

#[derive(Parser)]
#[command(name = "tdeck")]
#[command(about = "Projects, tasks and sales pipeline on a remote record service")]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project and task totals with per-project progress
    Dashboard,
    /// Manage projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Sales pipeline board
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommand,
    },
    /// Quotes board
    Quotes {
        #[command(subcommand)]
        command: QuoteCommand,
    },
    /// Contacts board
    Contacts {
        #[command(subcommand)]
        command: ContactCommand,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// List all projects, newest first
    List,
    /// Show one project with its tasks
    Show { id: RecordId },
    /// Create a project
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Hex colour, e.g. #2563eb
        #[arg(long)]
        color: Option<String>,
    },
    /// Edit a project's name, description or colour
    #[command(group(ArgGroup::new("fields").required(true).multiple(true)))]
    Update {
        id: RecordId,
        #[arg(long, group = "fields")]
        name: Option<String>,
        #[arg(long, group = "fields")]
        description: Option<String>,
        #[arg(long, group = "fields")]
        color: Option<String>,
    },
    /// Delete a project and all of its tasks
    Delete { id: RecordId },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// List tasks, optionally filtered
    List {
        #[arg(long)]
        project: Option<RecordId>,
        #[arg(long, value_parser = parse_token::<TaskStatus>)]
        status: Option<TaskStatus>,
        #[arg(long, value_parser = parse_token::<TaskPriority>)]
        priority: Option<TaskPriority>,
    },
    /// List completed tasks
    Completed,
    /// Create a task
    Create {
        #[arg(long)]
        project: RecordId,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_token::<TaskStatus>)]
        status: Option<TaskStatus>,
        #[arg(long, value_parser = parse_token::<TaskPriority>)]
        priority: Option<TaskPriority>,
        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Edit a task; the completion stamp only changes with --status
    #[command(group(ArgGroup::new("fields").required(true).multiple(true)))]
    Update {
        id: RecordId,
        /// Move the task to another project
        #[arg(long, group = "fields")]
        project: Option<RecordId>,
        #[arg(long, group = "fields")]
        title: Option<String>,
        #[arg(long, group = "fields")]
        description: Option<String>,
        #[arg(long, group = "fields", value_parser = parse_token::<TaskStatus>)]
        status: Option<TaskStatus>,
        #[arg(long, group = "fields", value_parser = parse_token::<TaskPriority>)]
        priority: Option<TaskPriority>,
        /// Due date as YYYY-MM-DD
        #[arg(long, group = "fields")]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long, group = "fields", conflicts_with = "due")]
        clear_due: bool,
    },
    /// Change a task's status
    Status {
        id: RecordId,
        #[arg(value_parser = parse_token::<TaskStatus>)]
        status: TaskStatus,
    },
    /// Delete a task
    Delete { id: RecordId },
}

#[derive(Subcommand)]
enum PipelineCommand {
    /// Show the board with pipeline figures
    Show,
    /// List opportunities, optionally only one stage
    List {
        #[arg(long, value_parser = parse_token::<OpportunityStage>)]
        stage: Option<OpportunityStage>,
    },
    /// Add an opportunity
    Create {
        #[arg(long)]
        name: String,
        /// Company the opportunity belongs to
        #[arg(long)]
        company: String,
        #[arg(long)]
        deal_size: f64,
        #[arg(long, value_parser = parse_token::<OpportunityStage>)]
        stage: Option<OpportunityStage>,
        #[arg(long)]
        probability: Option<u8>,
        #[arg(long)]
        tags: Option<String>,
    },
    /// Edit an opportunity
    #[command(group(ArgGroup::new("fields").required(true).multiple(true)))]
    Update {
        id: RecordId,
        #[arg(long, group = "fields")]
        name: Option<String>,
        #[arg(long, group = "fields")]
        company: Option<String>,
        #[arg(long, group = "fields")]
        deal_size: Option<f64>,
        #[arg(long, group = "fields", value_parser = parse_token::<OpportunityStage>)]
        stage: Option<OpportunityStage>,
        #[arg(long, group = "fields")]
        probability: Option<u8>,
        #[arg(long, group = "fields")]
        tags: Option<String>,
    },
    /// Move an opportunity to another stage
    Move {
        id: RecordId,
        #[arg(value_parser = parse_token::<OpportunityStage>)]
        stage: OpportunityStage,
    },
    /// Delete an opportunity
    Delete { id: RecordId },
}

#[derive(Subcommand)]
enum QuoteCommand {
    /// Show the board with quote figures
    Show,
    /// List quotes, optionally only one status
    List {
        #[arg(long, value_parser = parse_token::<QuoteStatus>)]
        status: Option<QuoteStatus>,
    },
    /// Add a quote
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        value: f64,
        /// Expected close date as YYYY-MM-DD
        #[arg(long)]
        close_date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_token::<QuoteStatus>)]
        status: Option<QuoteStatus>,
        #[arg(long)]
        tags: Option<String>,
    },
    /// Edit a quote
    #[command(group(ArgGroup::new("fields").required(true).multiple(true)))]
    Update {
        id: RecordId,
        #[arg(long, group = "fields")]
        name: Option<String>,
        #[arg(long, group = "fields")]
        description: Option<String>,
        #[arg(long, group = "fields")]
        value: Option<f64>,
        /// Expected close date as YYYY-MM-DD
        #[arg(long, group = "fields")]
        close_date: Option<NaiveDate>,
        #[arg(long, group = "fields", value_parser = parse_token::<QuoteStatus>)]
        status: Option<QuoteStatus>,
        #[arg(long, group = "fields")]
        tags: Option<String>,
    },
    /// Move a quote to another status
    Move {
        id: RecordId,
        #[arg(value_parser = parse_token::<QuoteStatus>)]
        status: QuoteStatus,
    },
    /// Delete a quote
    Delete { id: RecordId },
}

#[derive(Subcommand)]
enum ContactCommand {
    /// Show the board with contact figures
    Show,
    /// Add a contact
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long, value_parser = parse_token::<ContactStatus>)]
        status: Option<ContactStatus>,
    },
    /// Edit a contact
    #[command(group(ArgGroup::new("fields").required(true).multiple(true)))]
    Update {
        id: RecordId,
        #[arg(long, group = "fields")]
        first_name: Option<String>,
        #[arg(long, group = "fields")]
        last_name: Option<String>,
        #[arg(long, group = "fields")]
        email: Option<String>,
        #[arg(long, group = "fields")]
        phone: Option<String>,
        #[arg(long, group = "fields")]
        company: Option<String>,
        #[arg(long, group = "fields", value_parser = parse_token::<ContactStatus>)]
        status: Option<ContactStatus>,
    },
    /// Move a contact to another status
    Move {
        id: RecordId,
        #[arg(value_parser = parse_token::<ContactStatus>)]
        status: ContactStatus,
    },
    /// Delete a contact
    Delete { id: RecordId },
}

/// The operations every board command shares.
enum BoardAction<K, C, U> {
    Show,
    Create(C),
    Update { id: RecordId, input: U },
    Move { id: RecordId, to: K },
    Delete(RecordId),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "taskdeck=info,taskdeck_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    config.ensure_complete()?;
    let store = HttpRecordStore::from_config(&config).context("failed to build HTTP client")?;
    tracing::debug!(backend = store.base_url(), "using record service");

    let services = Services::new(Arc::new(store), config.picklist_mode());
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => {
            let projects = services.projects.list().await?;
            let tasks = services.tasks.list().await?;
            console::print_dashboard(&DashboardSummary::build(&projects, &tasks));
        }
        Commands::Projects { command } => run_projects(&services, notifier.as_ref(), command).await?,
        Commands::Tasks { command } => run_tasks(&services, notifier.as_ref(), command).await?,
        Commands::Pipeline { command } => {
            let action = match command {
                PipelineCommand::Show => BoardAction::Show,
                PipelineCommand::List { stage } => {
                    let opportunities = match stage {
                        Some(stage) => services.opportunities.list_by_stage(stage).await?,
                        None => services.opportunities.list().await?,
                    };
                    console::print_opportunities(&opportunities);
                    return Ok(());
                }
                PipelineCommand::Create {
                    name,
                    company,
                    deal_size,
                    stage,
                    probability,
                    tags,
                } => BoardAction::Create(CreateOpportunityInput {
                    name,
                    pipeline_name: company,
                    deal_size,
                    stage,
                    probability,
                    tags,
                }),
                PipelineCommand::Update {
                    id,
                    name,
                    company,
                    deal_size,
                    stage,
                    probability,
                    tags,
                } => BoardAction::Update {
                    id,
                    input: UpdateOpportunityInput {
                        name,
                        pipeline_name: company,
                        deal_size,
                        stage,
                        probability,
                        tags,
                    },
                },
                PipelineCommand::Move { id, stage } => BoardAction::Move { id, to: stage },
                PipelineCommand::Delete { id } => BoardAction::Delete(id),
            };
            let mut board = BoardController::new(services.opportunities.clone(), notifier);
            run_board(&mut board, action, console::print_pipeline).await?;
        }
        Commands::Quotes { command } => {
            let action = match command {
                QuoteCommand::Show => BoardAction::Show,
                QuoteCommand::List { status } => {
                    let quotes = match status {
                        Some(status) => services.quotes.list_by_status(status).await?,
                        None => services.quotes.list().await?,
                    };
                    console::print_quote_list(&quotes);
                    return Ok(());
                }
                QuoteCommand::Create {
                    name,
                    description,
                    value,
                    close_date,
                    status,
                    tags,
                } => BoardAction::Create(CreateQuoteInput {
                    name,
                    description,
                    value,
                    expected_close_date: close_date,
                    status,
                    tags,
                }),
                QuoteCommand::Update {
                    id,
                    name,
                    description,
                    value,
                    close_date,
                    status,
                    tags,
                } => BoardAction::Update {
                    id,
                    input: UpdateQuoteInput {
                        name,
                        description,
                        value,
                        expected_close_date: close_date,
                        status,
                        tags,
                    },
                },
                QuoteCommand::Move { id, status } => BoardAction::Move { id, to: status },
                QuoteCommand::Delete { id } => BoardAction::Delete(id),
            };
            let mut board = BoardController::new(services.quotes.clone(), notifier);
            run_board(&mut board, action, console::print_quotes).await?;
        }
        Commands::Contacts { command } => {
            let action = match command {
                ContactCommand::Show => BoardAction::Show,
                ContactCommand::Create {
                    first_name,
                    last_name,
                    email,
                    phone,
                    company,
                    status,
                } => BoardAction::Create(CreateContactInput {
                    first_name,
                    last_name,
                    email,
                    phone,
                    company,
                    status,
                }),
                ContactCommand::Update {
                    id,
                    first_name,
                    last_name,
                    email,
                    phone,
                    company,
                    status,
                } => BoardAction::Update {
                    id,
                    input: UpdateContactInput {
                        first_name,
                        last_name,
                        email,
                        phone,
                        company,
                        status,
                    },
                },
                ContactCommand::Move { id, status } => BoardAction::Move { id, to: status },
                ContactCommand::Delete { id } => BoardAction::Delete(id),
            };
            let mut board = BoardController::new(services.contacts.clone(), notifier);
            run_board(&mut board, action, console::print_contacts).await?;
        }
    }

    Ok(())
}

async fn run_board<E: BoardEntity>(
    board: &mut BoardController<E>,
    action: BoardAction<E::Key, E::Create, E::Update>,
    render: impl Fn(&BoardController<E>),
) -> anyhow::Result<()> {
    match action {
        BoardAction::Show => {
            board.load().await?;
            render(board);
        }
        BoardAction::Create(input) => {
            let created = board.create(&input).await.map_err(explain)?;
            println!("{} #{}", E::LABEL, created.id());
        }
        BoardAction::Update { id, input } => {
            board.update(id, &input).await?;
        }
        BoardAction::Move { id, to } => {
            board.load().await?;
            match board.move_to(id, to).await {
                Transition::Moved { .. } => render(board),
                Transition::Unchanged => {
                    if board.find(id).is_none() {
                        return Err(anyhow!("{} #{id} is not on the board", E::LABEL));
                    }
                    println!("{} #{id} is already {}", E::LABEL, to.title());
                }
                Transition::Failed { message } => return Err(anyhow!(message)),
            }
        }
        BoardAction::Delete(id) => board.remove(id).await?,
    }
    Ok(())
}

async fn run_projects(
    services: &Services,
    notifier: &dyn Notifier,
    command: ProjectCommand,
) -> anyhow::Result<()> {
    match command {
        ProjectCommand::List => console::print_projects(&services.projects.list().await?),
        ProjectCommand::Show { id } => {
            let project = services.projects.get(id).await?;
            let tasks = services.tasks.list_by_project(id).await?;
            console::print_project(&project, &tasks);
        }
        ProjectCommand::Create {
            name,
            description,
            color,
        } => {
            let input = CreateProjectInput {
                name,
                description,
                color,
            };
            let project = services.projects.create(&input).await.map_err(explain)?;
            notifier.notify(Notice::success("Project created successfully!"));
            println!("Project #{}", project.id);
        }
        ProjectCommand::Update {
            id,
            name,
            description,
            color,
        } => {
            let input = UpdateProjectInput {
                name,
                description,
                color,
            };
            match services.projects.update(id, &input).await {
                Ok(_) => notifier.notify(Notice::success("Project updated successfully!")),
                Err(err) => {
                    notifier.notify(Notice::error("Failed to save project"));
                    return Err(err.into());
                }
            }
        }
        ProjectCommand::Delete { id } => match services.delete_project(id).await {
            Ok(()) => notifier.notify(Notice::success("Project deleted successfully!")),
            Err(err) => {
                notifier.notify(Notice::error("Failed to delete project"));
                return Err(err.into());
            }
        },
    }
    Ok(())
}

async fn run_tasks(
    services: &Services,
    notifier: &dyn Notifier,
    command: TaskCommand,
) -> anyhow::Result<()> {
    match command {
        TaskCommand::List {
            project,
            status,
            priority,
        } => {
            let tasks = match project {
                Some(project_id) => services.tasks.list_by_project(project_id).await?,
                None => services.tasks.list().await?,
            };
            let filter = TaskFilter {
                project_id: project,
                status,
                priority,
            };
            let shown: Vec<Task> = filter.apply(&tasks).into_iter().cloned().collect();
            console::print_tasks(&shown);
        }
        TaskCommand::Completed => console::print_tasks(&services.tasks.list_completed().await?),
        TaskCommand::Create {
            project,
            title,
            description,
            status,
            priority,
            due,
        } => {
            let input = CreateTaskInput {
                project_id: Some(project),
                title,
                description,
                status,
                priority,
                due_date: due,
            };
            let task = services.tasks.create(&input).await.map_err(explain)?;
            notifier.notify(Notice::success("Task created successfully!"));
            println!("Task #{}", task.id);
        }
        TaskCommand::Update {
            id,
            project,
            title,
            description,
            status,
            priority,
            due,
            clear_due,
        } => {
            let input = UpdateTaskInput {
                project_id: project,
                title,
                description,
                status,
                priority,
                due_date: if clear_due { Some(None) } else { due.map(Some) },
            };
            match services.tasks.update(id, &input).await {
                Ok(_) => notifier.notify(Notice::success("Task updated successfully!")),
                Err(err) => {
                    notifier.notify(Notice::error("Failed to save task"));
                    return Err(err.into());
                }
            }
        }
        TaskCommand::Status { id, status } => match services.tasks.set_status(id, status).await {
            Ok(task) => notifier.notify(Notice::success(format!(
                "Status updated to {}",
                task.status.title()
            ))),
            Err(err) => {
                notifier.notify(Notice::error("Failed to update status"));
                return Err(err.into());
            }
        },
        TaskCommand::Delete { id } => match services.tasks.delete(id).await {
            Ok(()) => notifier.notify(Notice::success("Task deleted successfully!")),
            Err(err) => {
                notifier.notify(Notice::error("Failed to delete task"));
                return Err(err.into());
            }
        },
    }
    Ok(())
}

/// Spells out field errors one per line; other errors pass through.
fn explain(err: Error) -> anyhow::Error {
    match err {
        Error::Validation(errors) => {
            let lines: Vec<String> = errors
                .iter()
                .map(|(field, message)| format!("  {field}: {message}"))
                .collect();
            anyhow!("Please fix the form errors:\n{}", lines.join("\n"))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("tdeck").chain(args.iter().copied()))
    }

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn task_update_keeps_status_unless_asked() {
        let cli = parse(&["tasks", "update", "12", "--title", "Ship v2", "--priority", "high", "--clear-due"])
            .unwrap();
        match cli.command {
            Some(Commands::Tasks {
                command:
                    TaskCommand::Update {
                        id,
                        title,
                        status,
                        priority,
                        due,
                        clear_due,
                        ..
                    },
            }) => {
                assert_eq!(id, 12);
                assert_eq!(title.as_deref(), Some("Ship v2"));
                assert_eq!(status, None);
                assert_eq!(priority, Some(TaskPriority::High));
                assert_eq!(due, None);
                assert!(clear_due);
            }
            _ => panic!("expected tasks update"),
        }
    }

    #[test]
    fn update_needs_at_least_one_field() {
        assert!(parse(&["projects", "update", "3"]).is_err());
        assert!(parse(&["contacts", "update", "3", "--company", "Acme"]).is_ok());
    }

    #[test]
    fn due_and_clear_due_conflict() {
        assert!(parse(&["tasks", "update", "1", "--due", "2024-06-30", "--clear-due"]).is_err());
    }

    #[test]
    fn pipeline_list_takes_a_stage_token() {
        let cli = parse(&["pipeline", "list", "--stage", "closed_won"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Pipeline {
                command: PipelineCommand::List {
                    stage: Some(OpportunityStage::ClosedWon)
                }
            })
        ));
        assert!(parse(&["quotes", "list", "--status", "won"]).is_err());
    }
}
