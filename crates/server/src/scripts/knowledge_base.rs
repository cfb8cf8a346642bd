//! Knowledge-base search
//!
//! "I am looking for information on security" searches articles and reads
//! out a numbered list; the list goal then answers "more about article 2" and
//! "send me article 2".

use voice_intent_agent::{GoalSpec, Handler, ModelBuilder, ResultsList};
use voice_intent_core::{field_text, InputType};

pub const FIELDS_OF_INTEREST: &[(&str, &[&str])] = &[(
    "KnowledgeArticleVersion*",
    &["Id*", "Title*", "Summary*", "UrlName*", "LastPublishedDate*"],
)];

pub fn results_list() -> ResultsList {
    ResultsList::new("KnowledgeResults", "article", "articles", "Title")
}

pub fn register(builder: ModelBuilder) -> ModelBuilder {
    let list = results_list();
    let hear = list.clone();
    let send = list.clone();

    builder
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
                            field_text(&article, "Title"),
                            field_text(&article, "Summary")
                        ));
                        Ok(())
                    }),
                )
                .respond_to(
                    ["send me article [[articleNo]]"],
                    Handler::sync(move |r| {
                        let article = send.item_at_slot(r, "articleNo")?;
                        tracing::info!(
                            session_id = r.session_id(),
                            article = %field_text(&article, "Id"),
                            "Article send requested"
                        );
                        r.say(&format!("Article {} has been sent", field_text(&article, "Title")));
                        Ok(())
                    }),
                ),
        )
        .respond_to(
            ["I am looking for {information on|} [[searchTerm]]"],
            Handler::suspending(move |r| {
                let list = list.clone();
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
}
