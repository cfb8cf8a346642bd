//! Pattern Compiler
//!
//! Turns an utterance template into a matcher. Templates mix literal words,
//! optional segments and slot placeholders:
//!
//! ```text
//! I am looking for {information on|} [[searchTerm]]
//! what {commands|questions} can I {ask|say}
//! ```
//!
//! `{a|b}` matches exactly one alternative, `{a|}` matches `a` or nothing, and
//! groups nest. `[[name]]` captures one or more words for the input type
//! registered under `name`.
//!
//! The template is parsed once into a small tree, expanded into every phrasing
//! it allows (first alternatives first), and each phrasing is compiled into an
//! anchored case-insensitive regex. A slot becomes a lazy capture, so it takes
//! the shortest span that still lets the trailing literal words match, or the
//! rest of the utterance when nothing follows it.

use std::collections::HashMap;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, terminated},
    IResult,
};
use regex::{Regex, RegexBuilder};
use unicode_segmentation::UnicodeSegmentation;

use voice_intent_core::{InputTypeRegistry, TemplateError};

/// Default bound on phrasings per template
pub const DEFAULT_MAX_EXPANSIONS: usize = 1024;

/// Raw captured text per slot name
pub type RawSlots = HashMap<String, String>;

/// Normalize an utterance: single spaces, case and punctuation preserved.
///
/// Literal words ignore punctuation at the edges of a token, and slot values
/// keep the text as spoken, so "AT&T" stays "AT&T".
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether the text holds at least one word, as opposed to bare punctuation
pub fn has_words(text: &str) -> bool {
    text.unicode_words().next().is_some()
}

/// Punctuation a token may carry around a literal word
const EDGE_PUNCTUATION: &str = r"[^\w\s]*";

/// Strip sentence punctuation around a captured value; "C++" and "$5" keep theirs.
fn trim_edge_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '.' | ',' | '?' | '!' | ';' | ':' | '"' | '(' | ')')
    })
}

// =============================================================================
// GRAMMAR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Word(String),
    Slot(String),
    Choice(Vec<Vec<Node>>),
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '{' | '}' | '|' | '[' | ']')
}

fn is_slot_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-'
}

fn word(input: &str) -> IResult<&str, Node> {
    map(take_while1(is_word_char), |w: &str| Node::Word(w.to_string()))(input)
}

fn slot(input: &str) -> IResult<&str, Node> {
    map(
        delimited(
            tag("[["),
            delimited(multispace0, take_while1(is_slot_char), multispace0),
            tag("]]"),
        ),
        |name: &str| Node::Slot(name.to_string()),
    )(input)
}

fn group(input: &str) -> IResult<&str, Node> {
    map(
        delimited(
            char('{'),
            separated_list1(char('|'), terminated(sequence, multispace0)),
            char('}'),
        ),
        Node::Choice,
    )(input)
}

fn element(input: &str) -> IResult<&str, Node> {
    alt((slot, group, word))(input)
}

fn sequence(input: &str) -> IResult<&str, Vec<Node>> {
    many0(preceded(multispace0, element))(input)
}

fn template(input: &str) -> IResult<&str, Vec<Node>> {
    all_consuming(terminated(sequence, multispace0))(input)
}

/// Catch unbalanced delimiters before parsing so the error names the problem.
fn check_delimiters(source: &str) -> Result<(), TemplateError> {
    let mut depth = 0usize;
    let mut rest = source;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("[[") {
            match rest[2..].find("]]") {
                Some(end) => {
                    rest = &rest[2 + end + 2..];
                    continue;
                }
                None => {
                    return Err(TemplateError::UnterminatedSlot {
                        template: source.to_string(),
                    })
                }
            }
        }
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => {
                return Err(TemplateError::Malformed {
                    template: source.to_string(),
                    offset: source.len() - rest.len(),
                })
            }
            '}' => depth -= 1,
            _ => {}
        }
        rest = &rest[c.len_utf8()..];
    }

    if depth > 0 {
        return Err(TemplateError::UnterminatedGroup {
            template: source.to_string(),
        });
    }
    Ok(())
}

fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    check_delimiters(source)?;
    match template(source) {
        Ok((_, nodes)) => Ok(nodes),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(TemplateError::Malformed {
            template: source.to_string(),
            offset: source.len() - e.input.len(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(TemplateError::Malformed {
            template: source.to_string(),
            offset: source.len(),
        }),
    }
}

// =============================================================================
// EXPANSION
// =============================================================================

/// One token of an expanded phrasing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Slot(String),
}

fn expand(
    nodes: &[Node],
    source: &str,
    limit: usize,
) -> Result<Vec<Vec<Token>>, TemplateError> {
    let mut phrasings: Vec<Vec<Token>> = vec![Vec::new()];

    for node in nodes {
        match node {
            Node::Word(raw) => {
                for w in raw.unicode_words() {
                    for phrasing in &mut phrasings {
                        phrasing.push(Token::Word(w.to_string()));
                    }
                }
            }
            Node::Slot(name) => {
                for phrasing in &mut phrasings {
                    phrasing.push(Token::Slot(name.clone()));
                }
            }
            Node::Choice(alternatives) => {
                let mut tails = Vec::new();
                for alternative in alternatives {
                    tails.extend(expand(alternative, source, limit)?);
                }

                if phrasings.len().saturating_mul(tails.len()) > limit {
                    return Err(TemplateError::TooManyExpansions {
                        template: source.to_string(),
                        limit,
                    });
                }

                let mut next = Vec::with_capacity(phrasings.len() * tails.len());
                for head in &phrasings {
                    for tail in &tails {
                        let mut phrasing = head.clone();
                        phrasing.extend(tail.iter().cloned());
                        next.push(phrasing);
                    }
                }
                phrasings = next;
            }
        }
    }

    Ok(phrasings)
}

// =============================================================================
// COMPILED MATCHER
// =============================================================================

/// One phrasing of a template with its compiled regex
#[derive(Debug, Clone)]
struct Expansion {
    tokens: Vec<Token>,
    regex: Regex,
    /// Slot name per capture group, in order
    slots: Vec<String>,
}

impl Expansion {
    fn compile(tokens: Vec<Token>, source: &str) -> Result<Self, TemplateError> {
        let mut pattern = String::from("^");
        let mut slots = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                pattern.push(' ');
            }
            match token {
                Token::Word(w) => {
                    pattern.push_str(EDGE_PUNCTUATION);
                    pattern.push_str(&regex::escape(w));
                    pattern.push_str(EDGE_PUNCTUATION);
                }
                Token::Slot(name) => {
                    pattern.push_str("(.+?)");
                    slots.push(name.clone());
                }
            }
        }
        pattern.push('$');

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| TemplateError::Compile {
                template: source.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { tokens, regex, slots })
    }

    fn captures(&self, normalized: &str) -> Option<RawSlots> {
        let caps = self.regex.captures(normalized)?;
        let mut raw = RawSlots::with_capacity(self.slots.len());
        for (i, name) in self.slots.iter().enumerate() {
            let text = caps.get(i + 1).map(|m| trim_edge_punctuation(m.as_str()))?;
            if text.is_empty() {
                return None;
            }
            raw.insert(name.clone(), text.to_string());
        }
        Some(raw)
    }
}

/// Immutable matcher compiled from one template
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    template: String,
    expansions: Vec<Expansion>,
}

impl CompiledMatcher {
    /// Compile with the default expansion bound
    pub fn compile(template: &str, input_types: &InputTypeRegistry) -> Result<Self, TemplateError> {
        Self::compile_with_limit(template, input_types, DEFAULT_MAX_EXPANSIONS)
    }

    pub fn compile_with_limit(
        template: &str,
        input_types: &InputTypeRegistry,
        max_expansions: usize,
    ) -> Result<Self, TemplateError> {
        let nodes = parse(template)?;
        let phrasings = expand(&nodes, template, max_expansions)?;

        let mut expansions: Vec<Expansion> = Vec::with_capacity(phrasings.len());
        for tokens in phrasings {
            if tokens.is_empty() || expansions.iter().any(|e| e.tokens == tokens) {
                continue;
            }
            for token in &tokens {
                if let Token::Slot(name) = token {
                    if !input_types.contains(name) {
                        return Err(TemplateError::UnknownSlot {
                            template: template.to_string(),
                            slot: name.clone(),
                        });
                    }
                }
            }
            expansions.push(Expansion::compile(tokens, template)?);
        }

        if expansions.is_empty() {
            return Err(TemplateError::Empty {
                template: template.to_string(),
            });
        }

        tracing::trace!(template, expansions = expansions.len(), "Compiled template");

        Ok(Self {
            template: template.to_string(),
            expansions,
        })
    }

    /// Source template
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of distinct phrasings
    pub fn expansion_count(&self) -> usize {
        self.expansions.len()
    }

    /// Phrasings in match order, slots written as `[[name]]`
    pub fn phrasings(&self) -> Vec<String> {
        self.expansions
            .iter()
            .map(|e| {
                e.tokens
                    .iter()
                    .map(|t| match t {
                        Token::Word(w) => w.clone(),
                        Token::Slot(s) => format!("[[{}]]", s),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// Distinct slot names in first-use order
    pub fn slot_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for expansion in &self.expansions {
            for name in &expansion.slots {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Whether any phrasing matches the utterance
    pub fn is_match(&self, utterance: &str) -> bool {
        let normalized = normalize(utterance);
        self.expansions.iter().any(|e| e.regex.is_match(&normalized))
    }

    /// Slots captured by the first matching phrasing
    pub fn extract(&self, utterance: &str) -> Option<RawSlots> {
        self.candidates(&normalize(utterance)).next()
    }

    /// Captures of every matching phrasing, in phrasing order.
    ///
    /// Expects text already passed through [`normalize`].
    pub fn candidates<'a>(&'a self, normalized: &'a str) -> impl Iterator<Item = RawSlots> + 'a {
        self.expansions.iter().filter_map(move |e| e.captures(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_intent_core::InputType;

    fn registry() -> InputTypeRegistry {
        let mut registry = InputTypeRegistry::new();
        registry.add(InputType::number("articleNo"));
        registry.add(InputType::literal("searchTerm", ["security", "data"]));
        registry.add(InputType::literal("name", ["Jeff Douglas"]));
        registry.add(InputType::literal("company", ["ACME Corp"]));
        registry
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Jeff   Douglas. "), "Jeff Douglas.");
        assert_eq!(normalize("what's new?"), "what's new?");
        assert_eq!(normalize(""), "");
        assert!(has_words("what's new?"));
        assert!(!has_words(" ?! "));
    }

    #[test]
    fn test_literal_words_ignore_edge_punctuation() {
        let matcher = CompiledMatcher::compile("{for|} {any|my} new leads", &registry()).unwrap();
        assert!(matcher.is_match("Any new leads?"));
        assert!(matcher.is_match("\"my new leads\""));
        assert!(!matcher.is_match("any new-leads"));
    }

    #[test]
    fn test_slot_keeps_inner_punctuation() {
        let mut types = registry();
        types.add(InputType::literal("email", Vec::<String>::new()));
        let matcher = CompiledMatcher::compile("[[company]] at [[email]]", &types).unwrap();

        let slots = matcher.extract("AT&T, at jeff@acme.com.").unwrap();
        assert_eq!(slots["company"], "AT&T");
        assert_eq!(slots["email"], "jeff@acme.com");
    }

    #[test]
    fn test_punctuation_alone_fills_no_slot() {
        let matcher = CompiledMatcher::compile("[[name]]", &registry()).unwrap();
        assert!(matcher.extract("?!").is_none());
        assert_eq!(matcher.extract("Jeff Douglas.").unwrap()["name"], "Jeff Douglas");
        assert_eq!(matcher.extract("C++").unwrap()["name"], "C++");
    }

    #[test]
    fn test_expansion_order() {
        let matcher =
            CompiledMatcher::compile("what {commands|questions} can I {ask|say}", &registry())
                .unwrap();
        assert_eq!(
            matcher.phrasings(),
            vec![
                "what commands can I ask",
                "what commands can I say",
                "what questions can I ask",
                "what questions can I say",
            ]
        );
    }

    #[test]
    fn test_nested_groups() {
        let matcher = CompiledMatcher::compile("{tell me {more|}|} about it", &registry()).unwrap();
        assert_eq!(
            matcher.phrasings(),
            vec!["tell me more about it", "tell me about it", "about it"]
        );
    }

    #[test]
    fn test_empty_alternative_law() {
        let matcher =
            CompiledMatcher::compile("I am looking for {information on|} [[searchTerm]]", &registry())
                .unwrap();

        let with = matcher.extract("I am looking for information on security").unwrap();
        let without = matcher.extract("I am looking for security").unwrap();
        assert_eq!(with, without);
        assert_eq!(with["searchTerm"], "security");
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = CompiledMatcher::compile("{for|} {any|my} new leads", &registry()).unwrap();
        assert!(matcher.is_match("For Any New Leads"));
        assert!(matcher.is_match("my new leads"));
        assert!(!matcher.is_match("any old leads"));
    }

    #[test]
    fn test_slot_bounded_by_trailing_literal() {
        let mut types = registry();
        types.add(InputType::literal("city", Vec::<String>::new()));
        let matcher = CompiledMatcher::compile("fly from [[city]] to [[name]]", &types).unwrap();

        let slots = matcher.extract("fly from New York to Los Angeles").unwrap();
        assert_eq!(slots["city"], "New York");
        assert_eq!(slots["name"], "Los Angeles");
    }

    #[test]
    fn test_slot_takes_minimal_span() {
        let mut types = registry();
        types.add(InputType::literal("thing", Vec::<String>::new()));
        let matcher = CompiledMatcher::compile("[[thing]] to go", &types).unwrap();

        let slots = matcher.extract("coffee to go to go").unwrap();
        assert_eq!(slots["thing"], "coffee to go");

        let slots = matcher.extract("tea to go").unwrap();
        assert_eq!(slots["thing"], "tea");
    }

    #[test]
    fn test_slot_only_template_keeps_case() {
        let matcher = CompiledMatcher::compile("[[name]]", &registry()).unwrap();
        let slots = matcher.extract("Jeff Douglas").unwrap();
        assert_eq!(slots["name"], "Jeff Douglas");
    }

    #[test]
    fn test_slot_requires_a_word() {
        let matcher = CompiledMatcher::compile("send me article [[articleNo]]", &registry()).unwrap();
        assert!(!matcher.is_match("send me article"));
        assert!(matcher.is_match("send me article 3"));
    }

    #[test]
    fn test_unknown_slot_is_rejected() {
        let err = CompiledMatcher::compile("call [[person]]", &registry()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownSlot {
                template: "call [[person]]".to_string(),
                slot: "person".to_string(),
            }
        );
    }

    #[test]
    fn test_unterminated_group() {
        let err = CompiledMatcher::compile("{hear|more about article", &registry()).unwrap_err();
        assert!(matches!(err, TemplateError::UnterminatedGroup { .. }));
    }

    #[test]
    fn test_unterminated_slot() {
        let err = CompiledMatcher::compile("article [[articleNo", &registry()).unwrap_err();
        assert!(matches!(err, TemplateError::UnterminatedSlot { .. }));
    }

    #[test]
    fn test_stray_characters_are_malformed() {
        assert!(matches!(
            CompiledMatcher::compile("help } me", &registry()),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            CompiledMatcher::compile("help | me", &registry()),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn test_empty_template() {
        assert!(matches!(
            CompiledMatcher::compile("{|}", &registry()),
            Err(TemplateError::Empty { .. })
        ));
    }

    #[test]
    fn test_expansion_limit() {
        let err = CompiledMatcher::compile_with_limit("{a|b} {c|d} {e|f}", &registry(), 4)
            .unwrap_err();
        assert!(matches!(err, TemplateError::TooManyExpansions { limit: 4, .. }));
    }

    #[test]
    fn test_duplicate_phrasings_collapse() {
        let matcher = CompiledMatcher::compile("help {me|me}", &registry()).unwrap();
        assert_eq!(matcher.expansion_count(), 1);
    }

    #[test]
    fn test_slot_names() {
        let matcher = CompiledMatcher::compile(
            "{hear|} more about article [[articleNo]]",
            &registry(),
        )
        .unwrap();
        assert_eq!(matcher.slot_names(), vec!["articleNo"]);
    }
}
