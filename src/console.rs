//! Terminal rendering for the `tdeck` commands.

use chrono::{DateTime, Utc};
use taskdeck_core::metrics::{
    ContactSummary, DashboardSummary, PipelineSummary, QuoteSummary, TaskSummary,
};
use taskdeck_core::models::{Contact, Opportunity, Project, Quote, Task};
use taskdeck_core::notify::{Notice, NoticeLevel, Notifier};
use taskdeck_core::{BoardController, BoardEntity, Picklist};

/// Prints notices to stderr, keeping stdout for command output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => eprintln!("✓ {}", notice.message),
            NoticeLevel::Error => eprintln!("✗ {}", notice.message),
        }
    }
}

/// clap value parser for picklist tokens such as `in_progress` or `closed_won`.
pub fn parse_token<P: Picklist>(raw: &str) -> Result<P, String> {
    P::from_token(raw).ok_or_else(|| {
        let expected: Vec<&str> = P::ALL.iter().map(|v| v.as_str()).collect();
        format!("unknown {} '{raw}' (expected one of: {})", P::KIND, expected.join(", "))
    })
}

/// Whole-dollar amount with thousands separators: `$12,500`.
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn format_date(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".into())
}

pub fn print_dashboard(summary: &DashboardSummary) {
    println!("Projects: {}", summary.total_projects);
    print_task_summary(&summary.tasks);
    if summary.projects.is_empty() {
        return;
    }
    println!();
    for project in &summary.projects {
        println!(
            "  {:>5}  {:<32} {:>3}/{:<3} {}",
            project.project_id,
            project.name,
            project.tasks.completed,
            project.tasks.total,
            format_percent(project.percent_complete)
        );
    }
}

pub fn print_task_summary(summary: &TaskSummary) {
    println!(
        "Tasks: {} total, {} to do, {} in progress, {} completed",
        summary.total, summary.todo, summary.in_progress, summary.completed
    );
}

pub fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects yet.");
        return;
    }
    for project in projects {
        println!(
            "{:>5}  {:<32} {}  {}",
            project.id,
            project.name,
            project.color,
            format_date(project.created_at)
        );
    }
}

pub fn print_project(project: &Project, tasks: &[Task]) {
    println!("{} (#{})", project.name, project.id);
    if !project.description.is_empty() {
        println!("{}", project.description);
    }
    let summary = TaskSummary::from_tasks(tasks);
    println!(
        "Progress: {} ({}/{})",
        format_percent(summary.completion_rate()),
        summary.completed,
        summary.total
    );
    println!();
    print_tasks(tasks);
}

pub fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    let now = Utc::now();
    for task in tasks {
        let overdue = if task.is_overdue(now) { " overdue" } else { "" };
        println!(
            "{:>5}  [{:<11}] {:<8} {:<40} due {}{}",
            task.id,
            task.status.title(),
            task.priority.title(),
            task.title,
            format_date(task.due_date),
            overdue
        );
    }
}

fn print_columns<E: BoardEntity>(
    board: &BoardController<E>,
    header: impl Fn(E::Key) -> String,
    card: impl Fn(&E) -> String,
) {
    for bucket in board.buckets() {
        println!("== {} ({}) {}", bucket.key.title(), bucket.len(), header(bucket.key));
        for item in bucket.items {
            println!("   {}", card(item));
        }
    }
}

fn opportunity_card(o: &Opportunity) -> String {
    format!(
        "#{} {} ({}) {} {}%",
        o.id,
        o.name,
        o.pipeline_name,
        format_currency(o.deal_size),
        o.probability
    )
}

fn quote_card(q: &Quote) -> String {
    format!(
        "#{} {} {} closes {}",
        q.id,
        q.name,
        format_currency(q.value),
        format_date(q.expected_close_date)
    )
}

fn contact_card(c: &Contact) -> String {
    let company = if c.company.is_empty() {
        String::new()
    } else {
        format!(" @ {}", c.company)
    };
    format!("#{} {}{} <{}>", c.id, c.full_name(), company, c.email)
}

pub fn print_pipeline(board: &BoardController<Opportunity>) {
    let summary = PipelineSummary::from_opportunities(board.items());
    println!(
        "Pipeline: {} opportunities, {} open value, avg {}, conversion {}",
        summary.total_opportunities,
        format_currency(summary.total_value),
        format_currency(summary.average_deal_size),
        format_percent(summary.conversion_rate)
    );
    print_columns(
        board,
        |stage| format_currency(board.bucket_value(stage, |o| o.deal_size)),
        opportunity_card,
    );
}

pub fn print_opportunities(opportunities: &[Opportunity]) {
    if opportunities.is_empty() {
        println!("No opportunities found.");
        return;
    }
    for opportunity in opportunities {
        println!("{}", opportunity_card(opportunity));
    }
}

pub fn print_quotes(board: &BoardController<Quote>) {
    let summary = QuoteSummary::from_quotes(board.items());
    println!(
        "Quotes: {} total, {} value, avg {}, acceptance {}",
        summary.total_quotes,
        format_currency(summary.total_value),
        format_currency(summary.average_value),
        format_percent(summary.acceptance_rate)
    );
    print_columns(
        board,
        |status| format_currency(board.bucket_value(status, |q| q.value)),
        quote_card,
    );
}

pub fn print_quote_list(quotes: &[Quote]) {
    if quotes.is_empty() {
        println!("No quotes found.");
        return;
    }
    for quote in quotes {
        println!("{}", quote_card(quote));
    }
}

pub fn print_contacts(board: &BoardController<Contact>) {
    let summary = ContactSummary::from_contacts(board.items());
    println!(
        "Contacts: {} total, {} active, {} customers, conversion {}",
        summary.total_contacts,
        summary.active_contacts,
        summary.customers,
        format_percent(summary.conversion_rate)
    );
    print_columns(board, |_| String::new(), contact_card);
}
