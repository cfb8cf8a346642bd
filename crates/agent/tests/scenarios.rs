//! End-to-end turns against small scripts modelled on the knowledge-base and
//! leads conversations.

use std::sync::Arc;

use serde_json::{json, Value};
use voice_intent_agent::{
    ConversationEngine, ConversationModel, GoalSpec, Handler, InMemoryDataSource,
    InMemorySessionStore, ResultsList,
};
use voice_intent_core::{InputType, Record};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn articles() -> ResultsList {
    ResultsList::new("KnowledgeResults", "article", "articles", "Title")
}

fn knowledge_base() -> ConversationModel {
    let list = articles();
    let hear = list.clone();
    let search = list.clone();

    ConversationModel::builder()
        .add_input_type(InputType::number("articleNo"))
        .add_input_type(InputType::literal("searchTerm", ["security", "data"]))
        .define_goal(
            GoalSpec::new(list.interaction_goal())
                .prompt("Would you like to hear more from an article or have an article sent to you.")
                .respond_to(
                    ["{hear|} more about article [[articleNo]]"],
                    Handler::sync(move |r| {
                        let article = hear.item_at_slot(r, "articleNo")?;
                        r.say(&format!(
                            "Article {} has summary {}",
                            article["Title"].as_str().unwrap_or_default(),
                            article["Summary"].as_str().unwrap_or_default()
                        ));
                        Ok(())
                    }),
                ),
        )
        .respond_to(
            ["help"],
            Handler::sync(|r| {
                r.say("You can search for articles.");
                Ok(())
            }),
        )
        .respond_to(
            ["I am looking for {information on|} [[searchTerm]]"],
            Handler::suspending(move |r| {
                let list = search.clone();
                Box::pin(async move {
                    let term = r.require_str("searchTerm")?;
                    let results = r.search("KnowledgeArticleVersion*", &term).await?;
                    if results.is_empty() {
                        r.say("Sorry. I did not find any information on [[searchTerm]].");
                        return Ok(());
                    }
                    list.respond_with_items(r, results)
                })
            }),
        )
        .build()
        .unwrap()
}

fn leads() -> ConversationModel {
    ConversationModel::builder()
        .add_input_type(InputType::literal("name", ["Jeff Douglas", "Steve Jones"]))
        .add_input_type(InputType::literal("company", ["ACME Corp"]))
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
                    Handler::suspending(|r| {
                        Box::pin(async move {
                            r.say("Bingo! I created a new lead for {{name}} with the company name [[company]]");
                            let name = r.require_str("name")?;
                            let mut parts = name.splitn(2, ' ');
                            let mut fields = Record::new();
                            fields.insert("FirstName*".into(), json!(parts.next().unwrap_or_default()));
                            fields.insert("LastName*".into(), json!(parts.next().unwrap_or_default()));
                            fields.insert("Company*".into(), json!(r.require_str("company")?));
                            r.store("Lead*", fields).await?;
                            Ok(())
                        })
                    }),
                ),
        )
        .respond_to(
            ["{for|} {any|my} new leads"],
            Handler::suspending(|r| {
                Box::pin(async move {
                    let results = r.load("Lead*", None, None, Some("CreatedDate = TODAY")).await?;
                    if results.is_empty() {
                        r.say("Sorry, you do not have any new leads for today.");
                        return Ok(());
                    }
                    r.say(&format!("You have {} new leads.", results.len()));
                    Ok(())
                })
            }),
        )
        .build()
        .unwrap()
}

fn engine(model: ConversationModel, source: InMemoryDataSource) -> ConversationEngine {
    ConversationEngine::new(
        Arc::new(model),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(source),
    )
}

fn article_source() -> InMemoryDataSource {
    InMemoryDataSource::new().with_entity(
        "KnowledgeArticleVersion",
        vec![
            record(json!({ "Id": "ka1", "Title": "Security basics", "Summary": "Lock things down." })),
            record(json!({ "Id": "ka2", "Title": "Security audits", "Summary": "Check twice." })),
            record(json!({ "Id": "ka3", "Title": "Data export", "Summary": "CSV only." })),
        ],
    )
}

#[tokio::test]
async fn search_with_no_results_apologizes_without_goal() {
    let engine = engine(
        knowledge_base(),
        InMemoryDataSource::new().with_entity("KnowledgeArticleVersion", Vec::new()),
    );

    let turn = engine
        .handle_utterance("s1", "I am looking for information on security")
        .await
        .unwrap();
    assert_eq!(turn.spoken_output, "Sorry. I did not find any information on security.");

    let session = engine.session("s1").await.unwrap().unwrap();
    assert!(session.goal_stack.is_empty());
}

#[tokio::test]
async fn optional_phrase_matches_identically() {
    let with = engine(knowledge_base(), article_source());
    let without = engine(knowledge_base(), article_source());

    let a = with
        .handle_utterance("s1", "I am looking for information on security")
        .await
        .unwrap();
    let b = without
        .handle_utterance("s1", "I am looking for security")
        .await
        .unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn matching_ignores_case() {
    let lower = engine(knowledge_base(), article_source());
    let upper = engine(knowledge_base(), article_source());

    let a = lower.handle_utterance("s1", "i am looking for security").await.unwrap();
    let b = upper.handle_utterance("s1", "I AM LOOKING FOR Security").await.unwrap();
    assert_eq!(a.matched, b.matched);
    assert!(a.spoken_output.starts_with("I found 2 articles."));
    assert!(b.spoken_output.starts_with("I found 2 articles."));
}

#[tokio::test]
async fn results_list_then_article_reference() {
    let engine = engine(knowledge_base(), article_source());

    let turn = engine.handle_utterance("s1", "I am looking for security").await.unwrap();
    assert_eq!(
        turn.spoken_output,
        "I found 2 articles. Article 1, Security basics. Article 2, Security audits. \
         Would you like to hear more from an article or have an article sent to you."
    );

    let turn = engine.handle_utterance("s1", "hear more about article 2").await.unwrap();
    assert_eq!(turn.spoken_output, "Article Security audits has summary Check twice.");

    let session = engine.session("s1").await.unwrap().unwrap();
    assert!(session.goal_stack.is_empty());
}

#[tokio::test]
async fn article_out_of_range_is_spoken() {
    let engine = engine(knowledge_base(), article_source());
    engine.handle_utterance("s1", "I am looking for data").await.unwrap();

    let turn = engine.handle_utterance("s1", "more about article 5").await.unwrap();
    assert_eq!(turn.spoken_output, "Sorry, I could not find article 5.");
    assert!(!turn.session_updated);

    // the failed turn left the goal in place
    let session = engine.session("s1").await.unwrap().unwrap();
    assert_eq!(session.active_goal(), Some("interactionWithKnowledgeResults"));
}

#[tokio::test]
async fn active_goal_wins_over_global() {
    let model = ConversationModel::builder()
        .respond_to(
            ["yes"],
            Handler::sync(|r| {
                r.say("global");
                Ok(())
            }),
        )
        .respond_to(["confirm"], Handler::sync(|r| r.add_goal("confirming")))
        .define_goal(GoalSpec::new("confirming").respond_to(
            ["yes"],
            Handler::sync(|r| {
                r.say("goal");
                Ok(())
            }),
        ))
        .build()
        .unwrap();
    let engine = engine(model, InMemoryDataSource::new());

    engine.handle_utterance("s1", "confirm").await.unwrap();
    assert_eq!(engine.handle_utterance("s1", "yes").await.unwrap().spoken_output, "goal");
    assert_eq!(engine.handle_utterance("s1", "yes").await.unwrap().spoken_output, "global");
}

async fn goal_ids(engine: &ConversationEngine, session_id: &str) -> Vec<String> {
    let session = engine.session(session_id).await.unwrap().unwrap();
    session.goal_stack.ids().into_iter().map(str::to_string).collect()
}

#[tokio::test]
async fn add_goal_then_resolution_restores_stack() {
    let engine = engine(leads(), InMemoryDataSource::new().with_entity("Lead", Vec::new()));

    engine.handle_utterance("s1", "create a new lead").await.unwrap();
    assert_eq!(goal_ids(&engine, "s1").await, vec!["createLeadName"]);

    // the name step is finished once it hands over to the company step
    engine.handle_utterance("s1", "Jeff Douglas").await.unwrap();
    assert_eq!(goal_ids(&engine, "s1").await, vec!["createLeadCompany"]);

    engine.handle_utterance("s1", "ACME Corp").await.unwrap();
    assert!(goal_ids(&engine, "s1").await.is_empty());
}

#[tokio::test]
async fn suspended_goal_resumes_after_nested_goal() {
    let model = ConversationModel::builder()
        .respond_to(["start"], Handler::sync(|r| r.add_goal("outer")))
        .respond_to(["details"], Handler::sync(|r| r.add_goal("inner")))
        .define_goal(
            GoalSpec::new("outer")
                .prompt("Ready to finish?")
                .respond_to(["finish"], Handler::sync(|_| Ok(()))),
        )
        .define_goal(GoalSpec::new("inner").prompt("Which detail?").respond_to(
            ["this one"],
            Handler::sync(|r| {
                r.say("Noted.");
                Ok(())
            }),
        ))
        .build()
        .unwrap();
    let engine = engine(model, InMemoryDataSource::new());

    engine.handle_utterance("s1", "start").await.unwrap();
    engine.handle_utterance("s1", "details").await.unwrap();
    assert_eq!(goal_ids(&engine, "s1").await, vec!["outer", "inner"]);

    let turn = engine.handle_utterance("s1", "this one").await.unwrap();
    assert_eq!(turn.spoken_output, "Noted. Ready to finish?");
    assert_eq!(goal_ids(&engine, "s1").await, vec!["outer"]);
}

#[tokio::test]
async fn lead_flow_returns_to_global_bindings() {
    let source = Arc::new(
        InMemoryDataSource::new()
            .with_entity("Lead", Vec::new())
            .with_view("Lead", "CreatedDate = TODAY", Vec::new()),
    );
    let engine = ConversationEngine::new(
        Arc::new(leads()),
        Arc::new(InMemorySessionStore::new()),
        source.clone(),
    );

    let turn = engine.handle_utterance("s1", "to create a lead").await.unwrap();
    assert_eq!(
        turn.spoken_output,
        "OK, let's create a new lead. What is the person's first and last name?"
    );

    let turn = engine.handle_utterance("s1", "Jeff Douglas").await.unwrap();
    assert_eq!(
        turn.spoken_output,
        "Got it. the name is, Jeff Douglas. What is the company name?"
    );

    let session = engine.session("s1").await.unwrap().unwrap();
    assert_eq!(session.slot_values["name"], "Jeff Douglas");
    assert_eq!(session.active_goal(), Some("createLeadCompany"));

    let turn = engine.handle_utterance("s1", "ACME Corp").await.unwrap();
    assert_eq!(
        turn.spoken_output,
        "Bingo! I created a new lead for Jeff Douglas with the company name ACME Corp"
    );
    assert!(goal_ids(&engine, "s1").await.is_empty());

    let turn = engine.handle_utterance("s1", "for any new leads").await.unwrap();
    assert_eq!(turn.spoken_output, "Sorry, you do not have any new leads for today.");
    assert_eq!(source.records("Lead").len(), 1);
}

#[tokio::test]
async fn slot_value_keeps_punctuation() {
    let source = Arc::new(InMemoryDataSource::new().with_entity("Lead", Vec::new()));
    let engine = ConversationEngine::new(
        Arc::new(leads()),
        Arc::new(InMemorySessionStore::new()),
        source.clone(),
    );

    engine.handle_utterance("s1", "create a new lead").await.unwrap();
    engine.handle_utterance("s1", "Steve Jones.").await.unwrap();
    let turn = engine.handle_utterance("s1", "AT&T").await.unwrap();
    assert_eq!(
        turn.spoken_output,
        "Bingo! I created a new lead for Steve Jones with the company name AT&T"
    );
    assert_eq!(source.records("Lead")[0]["Company"], "AT&T");
}

#[tokio::test]
async fn no_new_leads_leaves_goals_alone() {
    let source = InMemoryDataSource::new().with_view("Lead", "CreatedDate = TODAY", Vec::new());
    let engine = engine(leads(), source);

    let turn = engine.handle_utterance("s1", "for any new leads").await.unwrap();
    assert_eq!(turn.spoken_output, "Sorry, you do not have any new leads for today.");

    let session = engine.session("s1").await.unwrap().unwrap();
    assert!(session.goal_stack.is_empty());
}

#[tokio::test]
async fn concurrent_turns_on_one_session_are_serialized() {
    let model = ConversationModel::builder()
        .respond_to(
            ["count"],
            Handler::suspending(|r| {
                Box::pin(async move {
                    let seen = r.get_i64("count").unwrap_or(0);
                    r.load("Lead*", None, None, None).await?;
                    r.set("count", seen + 1);
                    Ok(())
                })
            }),
        )
        .build()
        .unwrap();
    let source = InMemoryDataSource::new()
        .with_entity("Lead", Vec::new())
        .with_latency(std::time::Duration::from_millis(20));
    let engine = Arc::new(engine(model, source));

    let turns: Vec<_> = (0..5)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.handle_utterance("s1", "count").await })
        })
        .collect();
    for turn in turns {
        assert!(turn.await.unwrap().unwrap().session_updated);
    }

    // an overlapping turn would have read a stale count
    let session = engine.session("s1").await.unwrap().unwrap();
    assert_eq!(session.slot_values["count"], 5);
    assert_eq!(session.turn_count, 5);
}
