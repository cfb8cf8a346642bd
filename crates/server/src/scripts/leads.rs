//! Leads, opportunities and calendar
//!
//! Lead creation is a two-step goal: the name goal asks for the person and
//! pushes the company goal, which stores the lead.

use chrono::DateTime;
use serde_json::json;
use voice_intent_agent::{GoalSpec, Handler, ModelBuilder, Response, TurnError};
use voice_intent_core::{field_text, InputType, Record};

pub const FIELDS_OF_INTEREST: &[(&str, &[&str])] = &[
    ("Lead*", &["Name*", "Company*"]),
    ("Opportunity*", &["Name*", "StageName*", "Probability*", "Amount*"]),
    ("Event*", &["StartDateTime*", "Subject*", "Who*.Name*"]),
];

pub const NEW_LEADS_FILTER: &str = "CreatedDate = TODAY";
pub const TODAYS_EVENTS_FILTER: &str = "startdatetime = TODAY order by StartDateTime";

const HELP: &str = "You can ask to check for any new leads, your calendar for today, \
                    the status of a specific opportunity or, to create a new lead. \
                    What can I help you with?";

pub fn register(builder: ModelBuilder) -> ModelBuilder {
    builder
        .add_input_type(InputType::literal(
            "name",
            ["Jeff Douglas", "Steve Jones", "Mike Smith", "Mary Stewart"],
        ))
        .add_input_type(InputType::literal(
            "company",
            ["ACME Corp", "ABC Company", "Fresh Foods Packaging"],
        ))
        .add_input_type(InputType::literal(
            "opportunityName",
            ["Jones", "Edge S L A", "United Oil Standby Generators"],
        ))
        .respond_to(
            [
                "help {me|}",
                "what {commands|questions} can I {ask|say}",
                "what can I {do|ask you}",
                "what {do|can} I use you",
                "what {do|can} you do",
                "get help",
                "what can I use this for",
                "what can you tell me",
            ],
            Handler::sync(|r| {
                r.say(HELP);
                Ok(())
            }),
        )
        .respond_to(
            ["{to|} create a {new|} lead"],
            Handler::sync(|r| {
                r.say("OK, let's create a new lead.");
                r.add_goal("createLeadName")
            }),
        )
        .define_goal(
            GoalSpec::new("createLeadName")
                .prompt("What is the person's first and last name?")
                .respond_to(
                    ["[[name]]"],
                    Handler::sync(|r| {
                        r.say("Got it. the name is, [[name]].");
                        let name = r.require_str("name")?;
                        r.set("name", name);
                        r.add_goal("createLeadCompany")
                    }),
                ),
        )
        .define_goal(
            GoalSpec::new("createLeadCompany")
                .prompt("What is the company name?")
                .respond_to(
                    ["[[company]]"],
                    Handler::suspending(|r| Box::pin(create_lead(r))),
                ),
        )
        .respond_to(
            ["{for|} {any|my} new leads"],
            Handler::suspending(|r| Box::pin(new_leads(r))),
        )
        .respond_to(
            ["{for|about} opportunity [[opportunityName]]"],
            Handler::suspending(|r| Box::pin(opportunity_status(r))),
        )
        .respond_to(
            ["{for|} my calendar {for today|}"],
            Handler::suspending(|r| Box::pin(todays_calendar(r))),
        )
}

async fn create_lead(r: &mut Response) -> Result<(), TurnError> {
    let name = r.require_str("name")?;
    let company = r.require_str("company")?;
    let (first, last) = split_name(&name);

    let mut fields = Record::new();
    fields.insert("FirstName*".into(), json!(first));
    fields.insert("LastName*".into(), json!(last));
    fields.insert("Company*".into(), json!(company));
    r.store("Lead*", fields).await?;

    r.say("Bingo! I created a new lead for {{name}} with the company name [[company]]");
    Ok(())
}

async fn new_leads(r: &mut Response) -> Result<(), TurnError> {
    let results = r.load("Lead*", None, None, Some(NEW_LEADS_FILTER)).await?;
    if results.is_empty() {
        r.say("Sorry, you do not have any new leads for today.");
        return Ok(());
    }

    let listed: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, lead)| {
            format!(
                "{}, {} from {}",
                i + 1,
                field_text(lead, "Name"),
                field_text(lead, "Company")
            )
        })
        .collect();

    r.say(&format!(
        "You have {} new {}, {}. Go get them tiger!",
        results.len(),
        plural("lead", results.len()),
        join_spoken(&listed)
    ));
    Ok(())
}

async fn opportunity_status(r: &mut Response) -> Result<(), TurnError> {
    let name = r.require_str("opportunityName")?;
    let results = r.load("Opportunity*", Some("Name*"), Some(&name), None).await?;
    let Some(opp) = results.first() else {
        r.say("Sorry, I could not find an Opportunity named, [[opportunityName]]");
        return Ok(());
    };

    r.say(&format!(
        "I found Opportunity [[opportunityName]] for ${}, the stage is {} and the probability is {} %",
        field_text(opp, "Amount"),
        field_text(opp, "StageName"),
        field_text(opp, "Probability")
    ));
    Ok(())
}

async fn todays_calendar(r: &mut Response) -> Result<(), TurnError> {
    let results = r.load("Event*", None, None, Some(TODAYS_EVENTS_FILTER)).await?;

    let mut speech = format!(
        "You have {} {} for today.",
        results.len(),
        plural("event", results.len())
    );
    for event in &results {
        speech.push_str(&format!(
            " At {}, {}",
            spoken_time(&field_text(event, "StartDateTime")),
            field_text(event, "Subject")
        ));
        if let Some(who) = event.get("Who").and_then(|w| w.get("Name")).and_then(|n| n.as_str()) {
            speech.push_str(&format!(", with {}", who));
        }
        speech.push('.');
    }
    r.say(&speech);
    Ok(())
}

/// First word is the first name; everything after it is the last name
fn split_name(name: &str) -> (&str, &str) {
    name.split_once(' ').unwrap_or((name, ""))
}

fn plural(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// "a", "a and b", "a, b and c"
fn join_spoken(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn spoken_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
