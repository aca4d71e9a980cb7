use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::{BoardEntity, Entity};
use crate::picklist::{Picklist, PicklistMode};
use crate::record::{RecordBuilder, RecordReader};
use crate::store::{OrderBy, Record, RecordId};
use crate::validation::{is_valid_email, require, FieldErrors, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub status: ContactStatus,
    pub created_on: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Prospect,
    Active,
    Customer,
    Inactive,
}

impl Picklist for ContactStatus {
    const KIND: &'static str = "contact status";
    const ALL: &'static [Self] = &[Self::Prospect, Self::Active, Self::Customer, Self::Inactive];
    const DEFAULT: Self = Self::Prospect;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Prospect => "prospect",
            Self::Active => "active",
            Self::Customer => "customer",
            Self::Inactive => "inactive",
        }
    }

    fn label(&self) -> &'static str {
        self.as_str()
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Prospect => "Prospect",
            Self::Active => "Active",
            Self::Customer => "Customer",
            Self::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateContactInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: Option<ContactStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContactInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: Option<ContactStatus>,
}

impl Validate for CreateContactInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "first_name_c", &self.first_name, "First name is required");
        require(&mut errors, "last_name_c", &self.last_name, "Last name is required");
        require(&mut errors, "email_c", &self.email, "Email is required");
        if !self.email.trim().is_empty() && !is_valid_email(&self.email) {
            errors.add("email_c", "Invalid email format");
        }
        errors.into_result()
    }
}

impl Entity for Contact {
    const COLLECTION: &'static str = "contacts_c";
    const LABEL: &'static str = "Contact";
    const FIELDS: &'static [&'static str] = &[
        "Id",
        "Name",
        "first_name_c",
        "last_name_c",
        "email_c",
        "phone_c",
        "company_c",
        "status_c",
        "CreatedOn",
    ];

    type Create = CreateContactInput;
    type Update = UpdateContactInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn decode(record: &Record, mode: PicklistMode) -> Result<Self> {
        let r = RecordReader::new(record, Self::LABEL, mode);
        Ok(Self {
            id: r.id()?,
            first_name: r.text("first_name_c"),
            last_name: r.text("last_name_c"),
            email: r.text("email_c"),
            phone: r.text("phone_c"),
            company: r.text("company_c"),
            status: r.picklist("status_c")?,
            created_on: r.timestamp("CreatedOn"),
        })
    }

    fn encode_create(input: &CreateContactInput) -> Record {
        RecordBuilder::new()
            .set("first_name_c", input.first_name.trim())
            .set("last_name_c", input.last_name.trim())
            .set("email_c", input.email.trim())
            .set("phone_c", input.phone.clone().unwrap_or_default())
            .set("company_c", input.company.clone().unwrap_or_default())
            .set(
                "status_c",
                input.status.unwrap_or(ContactStatus::DEFAULT).label(),
            )
            .build()
    }

    fn encode_update(input: &UpdateContactInput) -> Record {
        RecordBuilder::new()
            .set_some("first_name_c", input.first_name.clone())
            .set_some("last_name_c", input.last_name.clone())
            .set_some("email_c", input.email.clone())
            .set_some("phone_c", input.phone.clone())
            .set_some("company_c", input.company.clone())
            .set_some("status_c", input.status.map(|s| s.label()))
            .build()
    }

    fn order_by() -> Option<OrderBy> {
        Some(OrderBy::desc("CreatedOn"))
    }
}

impl BoardEntity for Contact {
    type Key = ContactStatus;
    const KEY_FIELD: &'static str = "status_c";
    const KEY_NOUN: &'static str = "status";

    fn key(&self) -> ContactStatus {
        self.status
    }
}
