//! Entity-specific operations layered on the generic gateway, and the
//! [`Services`] bundle handed to views.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::gateway::{Entity, Gateway};
use crate::models::{
    Contact, ContactStatus, Opportunity, OpportunityStage, Project, Quote, QuoteStatus, Task,
    TaskStatus,
};
use crate::picklist::PicklistMode;
use crate::record::RecordReader;
use crate::store::{Condition, Query, RecordId, RecordStore, ID_FIELD};

const PROJECT_FIELD: &str = "project_id_c";

impl Gateway<Task> {
    pub async fn list_by_project(&self, project_id: RecordId) -> Result<Vec<Task>> {
        self.list_matching(vec![Condition::equal_to(PROJECT_FIELD, project_id)])
            .await
    }

    pub async fn list_completed(&self) -> Result<Vec<Task>> {
        self.list_by_key(TaskStatus::Completed).await
    }

    pub async fn set_status(&self, id: RecordId, status: TaskStatus) -> Result<Task> {
        self.set_key(id, status).await
    }

    /// Deletes every task of `project_id` in one bulk call.
    ///
    /// Returns the number of tasks removed. A failed lookup, or a row whose
    /// `Id` cannot be read, is an error so a project is never deleted while
    /// its tasks are unaccounted for.
    pub async fn delete_by_project(&self, project_id: RecordId) -> Result<usize> {
        let query = Query::select(&[ID_FIELD])
            .filter(Condition::equal_to(PROJECT_FIELD, project_id));
        let response = self.store().fetch(Task::COLLECTION, &query).await?;
        if !response.success {
            return Err(Error::backend(response.message, "Failed to fetch tasks"));
        }

        let ids = response
            .data
            .unwrap_or_default()
            .iter()
            .map(|r| RecordReader::new(r, Task::LABEL, self.mode()).id())
            .collect::<Result<Vec<RecordId>>>()?;
        let count = ids.len();
        self.delete_many(ids).await?;
        tracing::debug!(project_id, count, "deleted project tasks");
        Ok(count)
    }
}

impl Gateway<Project> {
    /// Deletes the project's tasks first, then the project.
    pub async fn delete_with_tasks(&self, id: RecordId, tasks: &Gateway<Task>) -> Result<()> {
        tasks.delete_by_project(id).await?;
        self.delete(id).await
    }
}

impl Gateway<Opportunity> {
    pub async fn list_by_stage(&self, stage: OpportunityStage) -> Result<Vec<Opportunity>> {
        self.list_by_key(stage).await
    }

    pub async fn update_stage(&self, id: RecordId, stage: OpportunityStage) -> Result<Opportunity> {
        self.set_key(id, stage).await
    }
}

impl Gateway<Quote> {
    pub async fn list_by_status(&self, status: QuoteStatus) -> Result<Vec<Quote>> {
        self.list_by_key(status).await
    }

    pub async fn update_status(&self, id: RecordId, status: QuoteStatus) -> Result<Quote> {
        self.set_key(id, status).await
    }
}

impl Gateway<Contact> {
    pub async fn update_status(&self, id: RecordId, status: ContactStatus) -> Result<Contact> {
        self.set_key(id, status).await
    }
}

/// One gateway per collection, sharing a store.
#[derive(Clone)]
pub struct Services {
    pub projects: Gateway<Project>,
    pub tasks: Gateway<Task>,
    pub contacts: Gateway<Contact>,
    pub opportunities: Gateway<Opportunity>,
    pub quotes: Gateway<Quote>,
}

impl Services {
    pub fn new(store: Arc<dyn RecordStore>, mode: PicklistMode) -> Self {
        Self {
            projects: Gateway::new(Arc::clone(&store)).with_mode(mode),
            tasks: Gateway::new(Arc::clone(&store)).with_mode(mode),
            contacts: Gateway::new(Arc::clone(&store)).with_mode(mode),
            opportunities: Gateway::new(Arc::clone(&store)).with_mode(mode),
            quotes: Gateway::new(store).with_mode(mode),
        }
    }

    pub async fn delete_project(&self, id: RecordId) -> Result<()> {
        self.projects.delete_with_tasks(id, &self.tasks).await
    }
}
