use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::{BoardEntity, Entity};
use crate::picklist::{Picklist, PicklistMode};
use crate::record::{date_to_timestamp, RecordBuilder, RecordReader};
use crate::store::{OrderBy, Record, RecordId, ID_FIELD};
use crate::validation::{require, require_positive, FieldErrors, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub value: f64,
    pub expected_close_date: Option<DateTime<Utc>>,
    pub status: QuoteStatus,
    pub tags: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    InReview,
    Approved,
    Sent,
    Accepted,
    Rejected,
}

impl Picklist for QuoteStatus {
    const KIND: &'static str = "quote status";
    const ALL: &'static [Self] = &[
        Self::Draft,
        Self::InReview,
        Self::Approved,
        Self::Sent,
        Self::Accepted,
        Self::Rejected,
    ];
    const DEFAULT: Self = Self::Draft;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::InReview => "In Review",
            Self::Approved => "Approved",
            Self::Sent => "Sent",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    fn title(&self) -> &'static str {
        self.label()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateQuoteInput {
    pub name: String,
    pub description: String,
    pub value: f64,
    pub expected_close_date: Option<NaiveDate>,
    pub status: Option<QuoteStatus>,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateQuoteInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<f64>,
    pub expected_close_date: Option<NaiveDate>,
    pub status: Option<QuoteStatus>,
    pub tags: Option<String>,
}

impl Validate for CreateQuoteInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "Name", &self.name, "Name is required");
        require_positive(&mut errors, "value_c", self.value);
        if self.expected_close_date.is_none() {
            errors.add("expected_close_date_c", "Expected close date is required");
        }
        errors.into_result()
    }
}

impl Entity for Quote {
    const COLLECTION: &'static str = "quote_c";
    const LABEL: &'static str = "Quote";
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "description_c",
        "value_c",
        "expected_close_date_c",
        "status_c",
        "Tags",
    ];

    type Create = CreateQuoteInput;
    type Update = UpdateQuoteInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn decode(record: &Record, mode: PicklistMode) -> Result<Self> {
        let r = RecordReader::new(record, Self::LABEL, mode);
        Ok(Self {
            id: r.id()?,
            name: r.text("Name"),
            description: r.text("description_c"),
            value: r.number("value_c").max(0.0),
            expected_close_date: r.timestamp("expected_close_date_c"),
            status: r.picklist("status_c")?,
            tags: r.text("Tags"),
        })
    }

    fn encode_create(input: &CreateQuoteInput) -> Record {
        RecordBuilder::new()
            .set("Name", input.name.trim())
            .set("description_c", input.description.as_str())
            .set("value_c", input.value)
            .set_some(
                "expected_close_date_c",
                input.expected_close_date.map(date_to_timestamp),
            )
            .set("status_c", input.status.unwrap_or(QuoteStatus::DEFAULT).label())
            .set("Tags", input.tags.clone().unwrap_or_default())
            .build()
    }

    fn encode_update(input: &UpdateQuoteInput) -> Record {
        RecordBuilder::new()
            .set_some("Name", input.name.clone())
            .set_some("description_c", input.description.clone())
            .set_some("value_c", input.value)
            .set_some(
                "expected_close_date_c",
                input.expected_close_date.map(date_to_timestamp),
            )
            .set_some("status_c", input.status.map(|s| s.label()))
            .set_some("Tags", input.tags.clone())
            .build()
    }

    fn order_by() -> Option<OrderBy> {
        Some(OrderBy::desc(ID_FIELD))
    }
}

impl BoardEntity for Quote {
    type Key = QuoteStatus;
    const KEY_FIELD: &'static str = "status_c";
    const KEY_NOUN: &'static str = "status";

    fn key(&self) -> QuoteStatus {
        self.status
    }
}
