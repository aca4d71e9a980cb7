use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::{BoardEntity, Entity};
use crate::picklist::{Picklist, PicklistMode};
use crate::record::{RecordBuilder, RecordReader};
use crate::store::{Record, RecordId};
use crate::validation::{require, require_positive, FieldErrors, Validate};

/// A deal on the sales pipeline board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: RecordId,
    pub name: String,
    pub pipeline_name: String,
    pub deal_size: f64,
    pub stage: OpportunityStage,
    pub probability: u8,
    pub tags: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStage {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl Picklist for OpportunityStage {
    const KIND: &'static str = "opportunity stage";
    const ALL: &'static [Self] = &[
        Self::Lead,
        Self::Qualified,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];
    const DEFAULT: Self = Self::Lead;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Lead => "Prospecting",
            Self::Qualified => "Qualification",
            Self::Proposal => "Demo",
            Self::Negotiation => "Negotiation",
            Self::ClosedWon => "Closed Won",
            Self::ClosedLost => "Closed Lost",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Lead => "Lead",
            Self::Qualified => "Qualified",
            Self::Proposal => "Proposal",
            Self::Negotiation => "Negotiation",
            Self::ClosedWon => "Closed Won",
            Self::ClosedLost => "Closed Lost",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOpportunityInput {
    pub name: String,
    pub pipeline_name: String,
    pub deal_size: f64,
    pub stage: Option<OpportunityStage>,
    pub probability: Option<u8>,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOpportunityInput {
    pub name: Option<String>,
    pub pipeline_name: Option<String>,
    pub deal_size: Option<f64>,
    pub stage: Option<OpportunityStage>,
    pub probability: Option<u8>,
    pub tags: Option<String>,
}

impl Validate for CreateOpportunityInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "Name", &self.name, "Contact name is required");
        require(
            &mut errors,
            "pipeline_name_c",
            &self.pipeline_name,
            "Company name is required",
        );
        require_positive(&mut errors, "deal_size_c", self.deal_size);
        errors.into_result()
    }
}

fn clamp_probability(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

impl Entity for Opportunity {
    const COLLECTION: &'static str = "sales_pipeline_c";
    const LABEL: &'static str = "Opportunity";
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "pipeline_name_c",
        "deal_size_c",
        "stage_c",
        "probability_c",
        "Tags",
    ];

    type Create = CreateOpportunityInput;
    type Update = UpdateOpportunityInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn decode(record: &Record, mode: PicklistMode) -> Result<Self> {
        let r = RecordReader::new(record, Self::LABEL, mode);
        Ok(Self {
            id: r.id()?,
            name: r.text("Name"),
            pipeline_name: r.text("pipeline_name_c"),
            deal_size: r.number("deal_size_c").max(0.0),
            stage: r.picklist("stage_c")?,
            probability: clamp_probability(r.integer("probability_c")),
            tags: r.text("Tags"),
        })
    }

    fn encode_create(input: &CreateOpportunityInput) -> Record {
        RecordBuilder::new()
            .set("Name", input.name.trim())
            .set("pipeline_name_c", input.pipeline_name.trim())
            .set("deal_size_c", input.deal_size)
            .set(
                "stage_c",
                input.stage.unwrap_or(OpportunityStage::DEFAULT).label(),
            )
            .set("probability_c", input.probability.unwrap_or(0).min(100))
            .set("Tags", input.tags.clone().unwrap_or_default())
            .build()
    }

    fn encode_update(input: &UpdateOpportunityInput) -> Record {
        RecordBuilder::new()
            .set_some("Name", input.name.clone())
            .set_some("pipeline_name_c", input.pipeline_name.clone())
            .set_some("deal_size_c", input.deal_size)
            .set_some("stage_c", input.stage.map(|s| s.label()))
            .set_some("probability_c", input.probability.map(|p| p.min(100)))
            .set_some("Tags", input.tags.clone())
            .build()
    }
}

impl BoardEntity for Opportunity {
    type Key = OpportunityStage;
    const KEY_FIELD: &'static str = "stage_c";
    const KEY_NOUN: &'static str = "stage";

    fn key(&self) -> OpportunityStage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_translates_stage_and_coerces_numbers() {
        let record = json!({
            "Id": 5,
            "Name": "Acme renewal",
            "pipeline_name_c": "Acme",
            "deal_size_c": "12000",
            "stage_c": "Demo",
            "probability_c": 140
        })
        .as_object()
        .cloned()
        .unwrap();
        let opp = Opportunity::decode(&record, PicklistMode::Lenient).unwrap();
        assert_eq!(opp.stage, OpportunityStage::Proposal);
        assert_eq!(opp.deal_size, 12000.0);
        assert_eq!(opp.probability, 100);
        assert_eq!(opp.tags, "");
    }

    #[test]
    fn create_writes_backend_label() {
        let record = Opportunity::encode_create(&CreateOpportunityInput {
            name: "Acme".into(),
            pipeline_name: "Acme Corp".into(),
            deal_size: 500.0,
            stage: Some(OpportunityStage::ClosedWon),
            ..CreateOpportunityInput::default()
        });
        assert_eq!(record["stage_c"], "Closed Won");
        assert_eq!(record["probability_c"], 0);
    }

    #[test]
    fn stage_patch_is_only_the_stage() {
        let patch = Opportunity::key_patch(OpportunityStage::Qualified);
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["stage_c"], "Qualification");
    }

    #[test]
    fn validation_messages() {
        let errors = CreateOpportunityInput::default().validate().unwrap_err();
        assert_eq!(errors.get("Name"), Some("Contact name is required"));
        assert_eq!(errors.get("pipeline_name_c"), Some("Company name is required"));
        assert_eq!(errors.get("deal_size_c"), Some("Value must be greater than 0"));
    }
}
