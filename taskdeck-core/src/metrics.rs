//! Summary figures for the dashboard and board headers. Pure functions over
//! the currently loaded lists.

use serde::Serialize;

use crate::models::{
    Contact, ContactStatus, Opportunity, OpportunityStage, Project, Quote, QuoteStatus, Task,
    TaskStatus,
};
use crate::picklist::Picklist;
use crate::store::RecordId;

/// Count per key, one entry for every value of `K` in declared order.
pub fn count_by<K: Picklist, T>(items: &[T], key: impl Fn(&T) -> K) -> Vec<(K, usize)> {
    K::ALL
        .iter()
        .map(|&k| (k, items.iter().filter(|item| key(item) == k).count()))
        .collect()
}

pub fn count_where<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> usize {
    items.iter().filter(|item| predicate(item)).count()
}

/// Sum of `value` over items whose key is not in `excluded`.
pub fn sum_excluding<K: PartialEq, T>(
    items: &[T],
    key: impl Fn(&T) -> K,
    excluded: &[K],
    value: impl Fn(&T) -> f64,
) -> f64 {
    items
        .iter()
        .filter(|item| !excluded.contains(&key(item)))
        .map(value)
        .sum()
}

pub fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// `numerator / denominator * 100`, or 0 when the denominator is 0.
pub fn percentage(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub total_opportunities: usize,
    /// Deal size of everything not lost.
    pub total_value: f64,
    pub average_deal_size: f64,
    /// Won deals over all closed deals.
    pub conversion_rate: f64,
}

impl PipelineSummary {
    pub fn from_opportunities(opportunities: &[Opportunity]) -> Self {
        let total_value = sum_excluding(
            opportunities,
            |o| o.stage,
            &[OpportunityStage::ClosedLost],
            |o| o.deal_size,
        );
        let won = count_where(opportunities, |o| o.stage == OpportunityStage::ClosedWon);
        let closed = count_where(opportunities, |o| {
            matches!(
                o.stage,
                OpportunityStage::ClosedWon | OpportunityStage::ClosedLost
            )
        });
        Self {
            total_opportunities: opportunities.len(),
            total_value,
            average_deal_size: average(total_value, opportunities.len()),
            conversion_rate: percentage(won, closed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuoteSummary {
    pub total_quotes: usize,
    /// Value of everything not rejected.
    pub total_value: f64,
    pub average_value: f64,
    /// Accepted over accepted plus rejected.
    pub acceptance_rate: f64,
}

impl QuoteSummary {
    pub fn from_quotes(quotes: &[Quote]) -> Self {
        let total_value = sum_excluding(quotes, |q| q.status, &[QuoteStatus::Rejected], |q| q.value);
        let accepted = count_where(quotes, |q| q.status == QuoteStatus::Accepted);
        let closed = count_where(quotes, |q| {
            matches!(q.status, QuoteStatus::Accepted | QuoteStatus::Rejected)
        });
        Self {
            total_quotes: quotes.len(),
            total_value,
            average_value: average(total_value, quotes.len()),
            acceptance_rate: percentage(accepted, closed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContactSummary {
    pub total_contacts: usize,
    pub active_contacts: usize,
    pub customers: usize,
    /// Customers over prospects.
    pub conversion_rate: f64,
}

impl ContactSummary {
    pub fn from_contacts(contacts: &[Contact]) -> Self {
        let customers = count_where(contacts, |c| c.status == ContactStatus::Customer);
        let prospects = count_where(contacts, |c| c.status == ContactStatus::Prospect);
        Self {
            total_contacts: contacts.len(),
            active_contacts: count_where(contacts, |c| c.status == ContactStatus::Active),
            customers,
            conversion_rate: percentage(customers, prospects),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl TaskSummary {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut summary = Self::default();
        for task in tasks {
            summary.total += 1;
            match task.status {
                TaskStatus::Todo => summary.todo += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
            }
        }
        summary
    }

    pub fn completion_rate(&self) -> f64 {
        percentage(self.completed, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectProgress {
    pub project_id: RecordId,
    pub name: String,
    pub tasks: TaskSummary,
    pub percent_complete: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_projects: usize,
    pub tasks: TaskSummary,
    pub projects: Vec<ProjectProgress>,
}

impl DashboardSummary {
    pub fn build(projects: &[Project], tasks: &[Task]) -> Self {
        let progress = projects
            .iter()
            .map(|project| {
                let summary =
                    TaskSummary::from_tasks(tasks.iter().filter(|t| t.project_id == Some(project.id)));
                ProjectProgress {
                    project_id: project.id,
                    name: project.name.clone(),
                    percent_complete: summary.completion_rate(),
                    tasks: summary,
                }
            })
            .collect();
        Self {
            total_projects: projects.len(),
            tasks: TaskSummary::from_tasks(tasks),
            projects: progress,
        }
    }
}
