use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::Entity;
use crate::picklist::PicklistMode;
use crate::record::{format_timestamp, RecordBuilder, RecordReader};
use crate::store::{OrderBy, Record, RecordId, ID_FIELD};
use crate::validation::{require, FieldErrors, Validate};

pub const DEFAULT_PROJECT_COLOR: &str = "#2563eb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub color: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl Validate for CreateProjectInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "name_c", &self.name, "Project name is required");
        require(
            &mut errors,
            "description_c",
            &self.description,
            "Description is required",
        );
        errors.into_result()
    }
}

impl Entity for Project {
    const COLLECTION: &'static str = "project_c";
    const LABEL: &'static str = "Project";
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "name_c",
        "description_c",
        "color_c",
        "created_at_c",
        "updated_at_c",
    ];

    type Create = CreateProjectInput;
    type Update = UpdateProjectInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn decode(record: &Record, mode: PicklistMode) -> Result<Self> {
        let r = RecordReader::new(record, Self::LABEL, mode);
        let color = r.text("color_c");
        Ok(Self {
            id: r.id()?,
            name: r.text_or(&["name_c", "Name"]),
            description: r.text("description_c"),
            color: if color.is_empty() {
                DEFAULT_PROJECT_COLOR.to_string()
            } else {
                color
            },
            created_at: r.timestamp("created_at_c"),
            updated_at: r.timestamp("updated_at_c"),
        })
    }

    fn encode_create(input: &CreateProjectInput) -> Record {
        let now = format_timestamp(Utc::now());
        RecordBuilder::new()
            .set("Name", input.name.trim())
            .set("name_c", input.name.trim())
            .set("description_c", input.description.as_str())
            .set(
                "color_c",
                input.color.as_deref().unwrap_or(DEFAULT_PROJECT_COLOR),
            )
            .set("created_at_c", now.as_str())
            .set("updated_at_c", now)
            .build()
    }

    fn encode_update(input: &UpdateProjectInput) -> Record {
        let touched = input.name.is_some() || input.description.is_some() || input.color.is_some();
        RecordBuilder::new()
            .set_some("Name", input.name.clone())
            .set_some("name_c", input.name.clone())
            .set_some("description_c", input.description.clone())
            .set_some("color_c", input.color.clone())
            .set_some("updated_at_c", touched.then(|| format_timestamp(Utc::now())))
            .build()
    }

    fn order_by() -> Option<OrderBy> {
        Some(OrderBy::desc(ID_FIELD))
    }
}
