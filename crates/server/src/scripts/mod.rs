//! Demo scripts
//!
//! Two small conversations registered through the public registration API:
//! a knowledge-base search with a numbered results list, and a CRM helper for
//! leads, opportunities and the day's calendar.

pub mod knowledge_base;
pub mod leads;

use std::collections::HashMap;

use serde_json::json;
use voice_intent_agent::{ConversationModel, InMemoryDataSource, ModelBuilder, ModelError};
use voice_intent_config::EngineSettings;
use voice_intent_core::Record;

/// Both scripts in one model. Knowledge-base bindings are declared first.
pub fn demo_model(settings: &EngineSettings) -> Result<ConversationModel, ModelError> {
    let builder = ModelBuilder::from_settings(settings);
    let builder = knowledge_base::register(builder);
    let builder = leads::register(builder);
    builder.build()
}

/// Fields the scripts read, per entity
pub fn fields_of_interest() -> HashMap<String, Vec<String>> {
    let mut fields = HashMap::new();
    for (entity, names) in knowledge_base::FIELDS_OF_INTEREST
        .iter()
        .chain(leads::FIELDS_OF_INTEREST.iter())
    {
        fields.insert(
            entity.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
    }
    fields
}

/// Sample records for running the scripts without a CRM
pub fn sample_data_source() -> InMemoryDataSource {
    let records = |value: serde_json::Value| -> Vec<Record> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default()
    };

    let today = chrono::Utc::now().date_naive();
    let at = |hour: u32| {
        today
            .and_hms_opt(hour, 0, 0)
            .map(|t| t.and_utc().to_rfc3339())
            .unwrap_or_default()
    };

    InMemoryDataSource::new()
        .with_entity(
            "KnowledgeArticleVersion",
            records(json!([
                {
                    "Id": "ka01", "Title": "Security basics for your org",
                    "Summary": "Turn on two-factor login and review sharing rules.",
                    "UrlName": "securing-your-org"
                },
                {
                    "Id": "ka02", "Title": "Security health check",
                    "Summary": "Compare your settings with the recommended baseline.",
                    "UrlName": "security-health-check"
                },
                {
                    "Id": "ka03", "Title": "Exporting data",
                    "Summary": "Schedule a weekly export from the setup menu.",
                    "UrlName": "exporting-data"
                }
            ])),
        )
        .with_entity("Lead", Vec::new())
        .with_entity(
            "Opportunity",
            records(json!([
                { "Id": "op01", "Name": "Jones", "StageName": "Prospecting", "Probability": 10, "Amount": 5000 },
                { "Id": "op02", "Name": "Edge S L A", "StageName": "Closed Won", "Probability": 100, "Amount": 60000 },
                { "Id": "op03", "Name": "United Oil Standby Generators", "StageName": "Negotiation", "Probability": 90, "Amount": 120000 }
            ])),
        )
        .with_view(
            "Lead",
            leads::NEW_LEADS_FILTER,
            records(json!([
                { "Id": "ld01", "Name": "Mike Smith", "Company": "Fresh Foods Packaging" },
                { "Id": "ld02", "Name": "Mary Stewart", "Company": "ABC Company" }
            ])),
        )
        .with_view(
            "Event",
            leads::TODAYS_EVENTS_FILTER,
            records(json!([
                { "Id": "ev01", "StartDateTime": at(9), "Subject": "Pipeline review" },
                { "Id": "ev02", "StartDateTime": at(14), "Subject": "Demo", "Who": { "Name": "Steve Jones" } }
            ])),
        )
}
