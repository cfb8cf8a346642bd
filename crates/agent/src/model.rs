//! Conversation model
//!
//! Everything a script registers at startup: input types, global bindings and
//! goals. Built once through [`ModelBuilder`], then shared read-only between
//! sessions behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use voice_intent_config::EngineSettings;
use voice_intent_core::{
    GoalCatalog, GoalError, InputType, InputTypeRegistry, InputTypeSpec,
};

use crate::pattern::{CompiledMatcher, DEFAULT_MAX_EXPANSIONS};
use crate::response::Response;
use crate::{ModelError, TurnError};

/// What a handler returns
pub type HandlerResult = Result<(), TurnError>;

type SyncFn = dyn Fn(&mut Response) -> HandlerResult + Send + Sync;
type SuspendingFn =
    dyn for<'a> Fn(&'a mut Response) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// Code run when a binding resolves.
///
/// Synchronous handlers finish inside the turn without yielding. Suspending
/// handlers may await data-source calls on the response:
///
/// ```ignore
/// Handler::suspending(|r| Box::pin(async move {
///     let results = r.search("KnowledgeArticleVersion*", &r.require_str("searchTerm")?).await?;
///     r.say(&format!("I found {} articles.", results.len()));
///     Ok(())
/// }))
/// ```
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<SyncFn>),
    Suspending(Arc<SuspendingFn>),
}

impl Handler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    pub fn suspending<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Response) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        Handler::Suspending(Arc::new(f))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Handler::Suspending(_))
    }

    /// Run against the turn's response context
    pub async fn run(&self, response: &mut Response) -> HandlerResult {
        match self {
            Handler::Sync(f) => f(response),
            Handler::Suspending(f) => f(response).await,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Suspending(_) => f.write_str("Handler::Suspending"),
        }
    }
}

/// Where a binding was registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingScope {
    Global,
    Goal(String),
}

impl BindingScope {
    pub fn goal(&self) -> Option<&str> {
        match self {
            BindingScope::Global => None,
            BindingScope::Goal(id) => Some(id),
        }
    }
}

impl fmt::Display for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingScope::Global => f.write_str("global"),
            BindingScope::Goal(id) => write!(f, "goal:{}", id),
        }
    }
}

/// A compiled template and the handler it triggers
#[derive(Debug, Clone)]
pub struct Binding {
    pub matcher: CompiledMatcher,
    pub handler: Handler,
}

/// A registered goal
#[derive(Debug, Clone)]
pub struct GoalDefinition {
    pub id: String,
    /// Prompt alternatives, issued in rotation
    pub prompts: Vec<String>,
    /// Bindings in declaration order
    pub bindings: Vec<Binding>,
}

impl GoalDefinition {
    /// Prompt for the given cycle. Empty when the goal has no alternatives.
    pub fn prompt(&self, cycle: usize) -> &str {
        if self.prompts.is_empty() {
            return "";
        }
        &self.prompts[cycle % self.prompts.len()]
    }
}

/// One `respondTo` entry: templates that all trigger the same handler
#[derive(Debug, Clone)]
pub struct Responder {
    pub expecting: Vec<String>,
    pub handler: Handler,
}

impl Responder {
    pub fn new<S: Into<String>>(expecting: impl IntoIterator<Item = S>, handler: Handler) -> Self {
        Self {
            expecting: expecting.into_iter().map(Into::into).collect(),
            handler,
        }
    }
}

/// Goal declaration before compilation
#[derive(Debug, Clone)]
pub struct GoalSpec {
    pub goal: String,
    pub prompt: Vec<String>,
    pub respond_to: Vec<Responder>,
}

impl GoalSpec {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            prompt: Vec::new(),
            respond_to: Vec::new(),
        }
    }

    /// Add a prompt alternative
    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.prompt.push(text.into());
        self
    }

    pub fn respond_to<S: Into<String>>(
        mut self,
        expecting: impl IntoIterator<Item = S>,
        handler: Handler,
    ) -> Self {
        self.respond_to.push(Responder::new(expecting, handler));
        self
    }
}

/// Immutable registrations shared by every session
#[derive(Debug)]
pub struct ConversationModel {
    input_types: InputTypeRegistry,
    global_bindings: Vec<Binding>,
    goals: HashMap<String, GoalDefinition>,
    /// Goal ids in declaration order
    goal_order: Vec<String>,
}

impl ConversationModel {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    pub fn input_types(&self) -> &InputTypeRegistry {
        &self.input_types
    }

    pub fn global_bindings(&self) -> &[Binding] {
        &self.global_bindings
    }

    pub fn goal(&self, goal_id: &str) -> Option<&GoalDefinition> {
        self.goals.get(goal_id)
    }

    /// Goal ids in declaration order
    pub fn goal_ids(&self) -> impl Iterator<Item = &str> {
        self.goal_order.iter().map(String::as_str)
    }
}

impl GoalCatalog for ConversationModel {
    fn has_goal(&self, goal_id: &str) -> bool {
        self.goals.contains_key(goal_id)
    }
}

/// Collects registrations and compiles them into a [`ConversationModel`].
///
/// Templates are compiled in [`ModelBuilder::build`], so input types may be
/// added in any order relative to the bindings that use them.
#[derive(Debug)]
pub struct ModelBuilder {
    input_types: InputTypeRegistry,
    global: Vec<Responder>,
    goals: Vec<GoalSpec>,
    max_expansions: usize,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self {
            input_types: InputTypeRegistry::new(),
            global: Vec::new(),
            goals: Vec::new(),
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }

    /// Builder configured from engine settings
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new().max_expansions(settings.max_template_expansions)
    }

    pub fn max_expansions(mut self, limit: usize) -> Self {
        self.max_expansions = limit;
        self
    }

    /// Register script-style input type declarations
    pub fn add_input_types<K: Into<String>>(
        mut self,
        specs: impl IntoIterator<Item = (K, InputTypeSpec)>,
    ) -> Self {
        self.input_types
            .add_specs(specs.into_iter().map(|(name, spec)| (name.into(), spec)));
        self
    }

    pub fn add_input_type(mut self, input_type: InputType) -> Self {
        self.input_types.add(input_type);
        self
    }

    /// Register a global binding, tried after the active goal's bindings
    pub fn respond_to<S: Into<String>>(
        mut self,
        expecting: impl IntoIterator<Item = S>,
        handler: Handler,
    ) -> Self {
        self.global.push(Responder::new(expecting, handler));
        self
    }

    pub fn define_goal(mut self, goal: GoalSpec) -> Self {
        self.goals.push(goal);
        self
    }

    pub fn build(self) -> Result<ConversationModel, ModelError> {
        let global_bindings =
            compile_responders(&self.global, &self.input_types, self.max_expansions)?;

        let mut goals = HashMap::with_capacity(self.goals.len());
        let mut goal_order = Vec::with_capacity(self.goals.len());
        for spec in &self.goals {
            if goals.contains_key(&spec.goal) {
                return Err(GoalError::Duplicate(spec.goal.clone()).into());
            }
            let bindings =
                compile_responders(&spec.respond_to, &self.input_types, self.max_expansions)?;

            tracing::debug!(
                goal = %spec.goal,
                bindings = bindings.len(),
                prompts = spec.prompt.len(),
                "Defined goal"
            );

            goal_order.push(spec.goal.clone());
            goals.insert(
                spec.goal.clone(),
                GoalDefinition {
                    id: spec.goal.clone(),
                    prompts: spec.prompt.clone(),
                    bindings,
                },
            );
        }

        tracing::info!(
            input_types = self.input_types.len(),
            global_bindings = global_bindings.len(),
            goals = goals.len(),
            "Conversation model built"
        );

        Ok(ConversationModel {
            input_types: self.input_types,
            global_bindings,
            goals,
            goal_order,
        })
    }
}

fn compile_responders(
    responders: &[Responder],
    input_types: &InputTypeRegistry,
    max_expansions: usize,
) -> Result<Vec<Binding>, ModelError> {
    let mut bindings = Vec::new();
    for responder in responders {
        for template in &responder.expecting {
            let matcher = CompiledMatcher::compile_with_limit(template, input_types, max_expansions)?;
            bindings.push(Binding {
                matcher,
                handler: responder.handler.clone(),
            });
        }
    }
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_intent_core::TemplateError;

    fn noop() -> Handler {
        Handler::sync(|_| Ok(()))
    }

    #[test]
    fn test_build_model() {
        let model = ConversationModel::builder()
            .add_input_type(InputType::literal("name", ["Jeff Douglas"]))
            .respond_to(["help {me|}", "get help"], noop())
            .define_goal(
                GoalSpec::new("createLeadName")
                    .prompt("What is the person's first and last name?")
                    .respond_to(["[[name]]"], noop()),
            )
            .build()
            .unwrap();

        assert_eq!(model.global_bindings().len(), 2);
        assert!(model.has_goal("createLeadName"));
        assert!(!model.has_goal("createLeadCompany"));
        assert_eq!(model.goal_ids().collect::<Vec<_>>(), vec!["createLeadName"]);
    }

    #[test]
    fn test_input_types_may_follow_bindings() {
        let model = ConversationModel::builder()
            .respond_to(["call [[name]]"], noop())
            .add_input_type(InputType::literal("name", Vec::<String>::new()))
            .build();
        assert!(model.is_ok());
    }

    #[test]
    fn test_unknown_slot_fails_build() {
        let err = ConversationModel::builder()
            .respond_to(["call [[name]]"], noop())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Template(TemplateError::UnknownSlot { .. })
        ));
    }

    #[test]
    fn test_duplicate_goal_fails_build() {
        let err = ConversationModel::builder()
            .define_goal(GoalSpec::new("g").respond_to(["yes"], noop()))
            .define_goal(GoalSpec::new("g").respond_to(["no"], noop()))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::Goal(GoalError::Duplicate(_))));
    }

    #[test]
    fn test_prompt_rotation() {
        let goal = GoalDefinition {
            id: "g".into(),
            prompts: vec!["first".into(), "second".into()],
            bindings: Vec::new(),
        };
        assert_eq!(goal.prompt(0), "first");
        assert_eq!(goal.prompt(1), "second");
        assert_eq!(goal.prompt(2), "first");

        let silent = GoalDefinition {
            id: "s".into(),
            prompts: Vec::new(),
            bindings: Vec::new(),
        };
        assert_eq!(silent.prompt(3), "");
    }

    #[test]
    fn test_binding_scope_display() {
        assert_eq!(BindingScope::Global.to_string(), "global");
        assert_eq!(BindingScope::Goal("g".into()).to_string(), "goal:g");
        assert_eq!(BindingScope::Goal("g".into()).goal(), Some("g"));
    }
}
