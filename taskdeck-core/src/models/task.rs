use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::{BoardEntity, Entity};
use crate::picklist::{Picklist, PicklistMode};
use crate::record::{date_to_timestamp, format_timestamp, RecordBuilder, RecordReader};
use crate::store::{OrderBy, Record, RecordId, ID_FIELD};
use crate::validation::{require, FieldErrors, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    pub project_id: Option<RecordId>,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Open tasks whose due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.due_date.is_some_and(|due| due < now)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl Picklist for TaskStatus {
    const KIND: &'static str = "task status";
    const ALL: &'static [Self] = &[Self::Todo, Self::InProgress, Self::Completed];
    const DEFAULT: Self = Self::Todo;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    fn label(&self) -> &'static str {
        self.as_str()
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Picklist for TaskPriority {
    const KIND: &'static str = "task priority";
    const ALL: &'static [Self] = &[Self::Low, Self::Medium, Self::High, Self::Urgent];
    const DEFAULT: Self = Self::Medium;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    fn label(&self) -> &'static str {
        self.as_str()
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub project_id: Option<RecordId>,
    pub title: String,
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub project_id: Option<RecordId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<NaiveDate>>,
}

impl Validate for CreateTaskInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.project_id.is_none() {
            errors.add("project_id_c", "Please select a project");
        }
        require(&mut errors, "title_c", &self.title, "Task title is required");
        errors.into_result()
    }
}

/// Status and completion stamp written together so that `completed_at_c`
/// is set exactly when the status is completed.
fn status_fields(builder: RecordBuilder, status: TaskStatus) -> RecordBuilder {
    let builder = builder.set("status_c", status.label());
    if status == TaskStatus::Completed {
        builder.set("completed_at_c", format_timestamp(Utc::now()))
    } else {
        builder.set_null("completed_at_c")
    }
}

impl Entity for Task {
    const COLLECTION: &'static str = "task_c";
    const LABEL: &'static str = "Task";
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "project_id_c",
        "title_c",
        "description_c",
        "status_c",
        "priority_c",
        "due_date_c",
        "created_at_c",
        "completed_at_c",
    ];

    type Create = CreateTaskInput;
    type Update = UpdateTaskInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn decode(record: &Record, mode: PicklistMode) -> Result<Self> {
        let r = RecordReader::new(record, Self::LABEL, mode);
        let status = r.picklist::<TaskStatus>("status_c")?;
        Ok(Self {
            id: r.id()?,
            project_id: r.reference("project_id_c"),
            title: r.text_or(&["title_c", "Name"]),
            description: r.text("description_c"),
            status,
            priority: r.picklist("priority_c")?,
            due_date: r.timestamp("due_date_c"),
            created_at: r.timestamp("created_at_c"),
            completed_at: r.timestamp("completed_at_c"),
        })
    }

    fn encode_create(input: &CreateTaskInput) -> Record {
        let title = input.title.trim();
        let builder = RecordBuilder::new()
            .set("Name", title)
            .set_some("project_id_c", input.project_id)
            .set("title_c", title)
            .set("description_c", input.description.as_str())
            .set(
                "priority_c",
                input.priority.unwrap_or(TaskPriority::DEFAULT).label(),
            )
            .set("created_at_c", format_timestamp(Utc::now()))
            .set_some("due_date_c", input.due_date.map(date_to_timestamp));
        status_fields(builder, input.status.unwrap_or(TaskStatus::DEFAULT)).build()
    }

    fn encode_update(input: &UpdateTaskInput) -> Record {
        let mut builder = RecordBuilder::new()
            .set_some("project_id_c", input.project_id)
            .set_some("Name", input.title.clone())
            .set_some("title_c", input.title.clone())
            .set_some("description_c", input.description.clone())
            .set_some("priority_c", input.priority.map(|p| p.label()));
        if let Some(status) = input.status {
            builder = status_fields(builder, status);
        }
        match input.due_date {
            Some(Some(date)) => builder.set("due_date_c", date_to_timestamp(date)),
            Some(None) => builder.set_null("due_date_c"),
            None => builder,
        }
        .build()
    }

    fn order_by() -> Option<OrderBy> {
        Some(OrderBy::desc(ID_FIELD))
    }
}

impl BoardEntity for Task {
    type Key = TaskStatus;
    const KEY_FIELD: &'static str = "status_c";
    const KEY_NOUN: &'static str = "status";

    fn key(&self) -> TaskStatus {
        self.status
    }

    fn key_patch(key: TaskStatus) -> Record {
        status_fields(RecordBuilder::new(), key).build()
    }
}

/// Status/priority filter of the project view. `None` means "all".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: Option<RecordId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.project_id.map_or(true, |p| task.project_id == Some(p))
            && self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn task(status: TaskStatus, due: Option<&str>) -> Task {
        Task {
            id: 1,
            project_id: Some(1),
            title: "Write copy".into(),
            description: String::new(),
            status,
            priority: TaskPriority::Medium,
            due_date: due.and_then(crate::record::parse_timestamp),
            created_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn create_defaults_to_todo_without_completion() {
        let input = CreateTaskInput {
            project_id: Some(2),
            title: " Draft brief ".into(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            ..CreateTaskInput::default()
        };
        let record = Task::encode_create(&input);
        assert_eq!(record["status_c"], "todo");
        assert_eq!(record["priority_c"], "medium");
        assert_eq!(record["completed_at_c"], Value::Null);
        assert_eq!(record["due_date_c"], "2024-03-15T00:00:00.000Z");
        assert_eq!(record["title_c"], "Draft brief");
        assert_eq!(record["project_id_c"], 2);
    }

    #[test]
    fn completing_stamps_and_reopening_clears() {
        let done = Task::key_patch(TaskStatus::Completed);
        assert!(done["completed_at_c"].is_string());

        let reopened = Task::encode_update(&UpdateTaskInput {
            status: Some(TaskStatus::InProgress),
            ..UpdateTaskInput::default()
        });
        assert_eq!(reopened["status_c"], "in_progress");
        assert_eq!(reopened["completed_at_c"], Value::Null);
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn update_can_clear_due_date() {
        let record = Task::encode_update(&UpdateTaskInput {
            due_date: Some(None),
            ..UpdateTaskInput::default()
        });
        assert_eq!(Value::Object(record), json!({"due_date_c": null}));
    }

    #[test]
    fn decode_reads_reference_project() {
        let record = json!({
            "Id": 9,
            "Name": "Fallback",
            "project_id_c": {"Id": 4, "Name": "Site"},
            "status_c": "completed",
            "priority_c": "urgent",
            "completed_at_c": "2024-04-01T12:00:00Z"
        })
        .as_object()
        .cloned()
        .unwrap();
        let task = Task::decode(&record, PicklistMode::Strict).unwrap();
        assert_eq!(task.project_id, Some(4));
        assert_eq!(task.title, "Fallback");
        assert_eq!(task.priority, TaskPriority::Urgent);
        assert!(task.is_completed());
    }

    #[test]
    fn overdue_ignores_completed_tasks() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert!(task(TaskStatus::Todo, Some("2024-04-01")).is_overdue(now));
        assert!(!task(TaskStatus::Completed, Some("2024-04-01")).is_overdue(now));
        assert!(!task(TaskStatus::Todo, Some("2024-06-01")).is_overdue(now));
        assert!(!task(TaskStatus::Todo, None).is_overdue(now));
    }

    #[test]
    fn filter_combines_status_and_priority() {
        let mut urgent = task(TaskStatus::Todo, None);
        urgent.priority = TaskPriority::Urgent;
        let tasks = vec![urgent, task(TaskStatus::Todo, None), task(TaskStatus::Completed, None)];

        let filter = TaskFilter {
            status: Some(TaskStatus::Todo),
            priority: Some(TaskPriority::Urgent),
            ..TaskFilter::default()
        };
        assert_eq!(filter.apply(&tasks).len(), 1);
        assert_eq!(TaskFilter::default().apply(&tasks).len(), 3);
    }

    #[test]
    fn validation_messages() {
        let errors = CreateTaskInput::default().validate().unwrap_err();
        assert_eq!(errors.get("project_id_c"), Some("Please select a project"));
        assert_eq!(errors.get("title_c"), Some("Task title is required"));
    }
}
