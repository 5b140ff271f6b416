//! Rule-matching response engine
//!
//! An utterance is run through an ordered table of [`Rule`]s. Each rule pairs
//! a [`Matcher`] (the predicate) with a [`Handler`] (the response strategy).
//! The first rule whose matcher fires *and* whose handler produces a reply
//! wins; a handler may decline (an unknown definition, a malformed `learn`
//! sentence) and the cascade moves on. When nothing answers, a reply is drawn
//! from the fallback pool.
//!
//! Position in the table is the only notion of priority. There is no scoring.
//!
//! The engine holds no conversation state. Apart from the randomized handlers
//! every reply is a function of the utterance and the dictionary it is given.

use crate::dictionary::Dictionary;
use crate::rules;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;

/// Recognized category of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Identity,
    Authorship,
    Feelings,
    NameMeaning,
    Sadness,
    Happiness,
    Joke,
    Definition,
    DictionarySize,
    Learn,
    HappyEmoji,
    SadEmoji,
    AffectionEmoji,
    Greeting,
    Farewell,
    Thanks,
    Fallback,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Intent::Identity => "identity",
            Intent::Authorship => "authorship",
            Intent::Feelings => "feelings",
            Intent::NameMeaning => "name_meaning",
            Intent::Sadness => "sadness",
            Intent::Happiness => "happiness",
            Intent::Joke => "joke",
            Intent::Definition => "definition",
            Intent::DictionarySize => "dictionary_size",
            Intent::Learn => "learn",
            Intent::HappyEmoji => "happy_emoji",
            Intent::SadEmoji => "sad_emoji",
            Intent::AffectionEmoji => "affection_emoji",
            Intent::Greeting => "greeting",
            Intent::Farewell => "farewell",
            Intent::Thanks => "thanks",
            Intent::Fallback => "fallback",
        };
        write!(f, "{}", name)
    }
}

/// One input, in the two forms the rules need
#[derive(Debug, Clone)]
pub struct Utterance<'a> {
    /// Trimmed input with the user's casing
    pub raw: &'a str,
    /// Lowercased `raw`
    pub lowered: String,
}

impl<'a> Utterance<'a> {
    pub fn new(input: &'a str) -> Self {
        let raw = input.trim();
        Self {
            raw,
            lowered: raw.to_lowercase(),
        }
    }

    /// Lowercased text after the first `chars` characters
    fn lowered_after(&self, chars: usize) -> &str {
        skip_chars(&self.lowered, chars)
    }

    /// Text in the user's casing after the first `chars` characters
    fn raw_after(&self, chars: usize) -> &str {
        skip_chars(self.raw, chars)
    }
}

fn skip_chars(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}

/// Predicate half of a rule, evaluated on the lowercased utterance
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Any phrase occurs anywhere
    Contains(Vec<String>),
    /// The utterance starts with one of the prefixes
    StartsWith(Vec<String>),
    /// The regex matches
    Pattern(Regex),
}

/// What a successful match captured
#[derive(Debug, Clone, Copy, Default)]
struct Matched {
    /// Characters consumed by a `StartsWith` prefix
    prefix_chars: usize,
}

impl Matcher {
    pub fn contains(phrases: &[&str]) -> Self {
        Matcher::Contains(phrases.iter().map(|p| p.to_string()).collect())
    }

    pub fn starts_with(prefixes: &[&str]) -> Self {
        Matcher::StartsWith(prefixes.iter().map(|p| p.to_string()).collect())
    }

    pub fn pattern(regex: Regex) -> Self {
        Matcher::Pattern(regex)
    }

    fn check(&self, utterance: &Utterance<'_>) -> Option<Matched> {
        let text = utterance.lowered.as_str();
        match self {
            Matcher::Contains(phrases) => phrases
                .iter()
                .any(|p| text.contains(p.as_str()))
                .then(Matched::default),
            Matcher::StartsWith(prefixes) => prefixes
                .iter()
                .find(|p| text.starts_with(p.as_str()))
                .map(|p| Matched {
                    prefix_chars: p.chars().count(),
                }),
            Matcher::Pattern(regex) => regex.is_match(text).then(Matched::default),
        }
    }
}

/// Response half of a rule
#[derive(Debug, Clone)]
pub enum Handler {
    /// A fixed reply
    Say(String),
    /// A uniformly random member of the pool
    PickOne(Vec<String>),
    /// Look up the text after the prefix; declines on a miss
    Define,
    /// Report the dictionary size
    CountTerms,
    /// Parse `term: meaning[: example]` after the prefix and upsert it;
    /// declines when that is not a valid teach
    Learn,
}

impl Handler {
    pub fn say(text: &str) -> Self {
        Handler::Say(text.to_string())
    }

    pub fn pick_one(pool: &[&str]) -> Self {
        Handler::PickOne(pool.iter().map(|p| p.to_string()).collect())
    }
}

/// A (predicate, handler) pair in the cascade
#[derive(Debug, Clone)]
pub struct Rule {
    pub intent: Intent,
    pub matcher: Matcher,
    pub handler: Handler,
}

impl Rule {
    pub fn new(intent: Intent, matcher: Matcher, handler: Handler) -> Self {
        Self {
            intent,
            matcher,
            handler,
        }
    }
}

/// Reply produced for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub intent: Intent,
    /// Normalized term that was taught, if the dictionary changed
    pub learned: Option<String>,
}

impl Response {
    fn new(text: impl Into<String>, intent: Intent) -> Self {
        Self {
            text: text.into(),
            intent,
            learned: None,
        }
    }
}

/// Ordered rule cascade with a fallback pool
#[derive(Debug, Clone)]
pub struct ResponseEngine {
    rules: Vec<Rule>,
    fallback: Vec<String>,
}

impl Default for ResponseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEngine {
    /// Engine with Driah's built-in rules
    pub fn new() -> Self {
        Self::with_rules(rules::default_rules(), rules::fallback_responses())
    }

    /// Engine with a custom table. An empty fallback pool is replaced by the
    /// built-in one so that every utterance still gets a reply.
    pub fn with_rules(rules: Vec<Rule>, fallback: Vec<String>) -> Self {
        let fallback = if fallback.is_empty() {
            rules::fallback_responses()
        } else {
            fallback
        };
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }

    /// Append a rule at the lowest priority (still above the fallback)
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Insert a rule just ahead of the first rule with `intent`.
    /// Appends when no such rule exists.
    pub fn insert_before(&mut self, intent: Intent, rule: Rule) {
        let index = self
            .rules
            .iter()
            .position(|r| r.intent == intent)
            .unwrap_or(self.rules.len());
        self.rules.insert(index, rule);
    }

    /// Produce the reply for `input`.
    ///
    /// `dictionary` is consulted by definition queries and mutated by
    /// `learn` sentences; [`Response::learned`] tells the caller to persist.
    pub fn respond<R: Rng + ?Sized>(
        &self,
        input: &str,
        dictionary: &mut Dictionary,
        rng: &mut R,
    ) -> Response {
        let utterance = Utterance::new(input);

        for rule in &self.rules {
            let Some(matched) = rule.matcher.check(&utterance) else {
                continue;
            };

            match apply(rule, matched, &utterance, dictionary, rng) {
                Some(response) => {
                    tracing::debug!(intent = %response.intent, "Rule matched");
                    return response;
                }
                None => {
                    tracing::debug!(intent = %rule.intent, "Rule declined, continuing");
                }
            }
        }

        let text = self
            .fallback
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| rules::FALLBACK_RESPONSES[0].to_string());
        Response::new(text, Intent::Fallback)
    }
}

fn apply<R: Rng + ?Sized>(
    rule: &Rule,
    matched: Matched,
    utterance: &Utterance<'_>,
    dictionary: &mut Dictionary,
    rng: &mut R,
) -> Option<Response> {
    match &rule.handler {
        Handler::Say(text) => Some(Response::new(text.clone(), rule.intent)),
        Handler::PickOne(pool) => pool
            .choose(rng)
            .map(|text| Response::new(text.clone(), rule.intent)),
        Handler::Define => {
            let query = definition_query(utterance.lowered_after(matched.prefix_chars));
            dictionary
                .lookup(&query)
                .map(|entry| Response::new(rules::definition_reply(&entry), rule.intent))
        }
        Handler::CountTerms => Some(Response::new(
            rules::dictionary_size_reply(dictionary.len()),
            rule.intent,
        )),
        Handler::Learn => {
            let (term, meaning, example) = parse_learn(utterance.raw_after(matched.prefix_chars))?;
            match dictionary.upsert(term, meaning, example) {
                Ok(term) => Some(Response {
                    text: rules::learned_reply(&term),
                    intent: rule.intent,
                    learned: Some(term),
                }),
                Err(e) => {
                    tracing::debug!("Ignoring learn sentence: {}", e);
                    None
                }
            }
        }
    }
}

/// Strip `?.,!` anywhere and surrounding whitespace
fn definition_query(rest: &str) -> String {
    rest.chars()
        .filter(|c| !matches!(c, '?' | '.' | ',' | '!'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split `term: meaning[: example]`; `None` without at least a term and meaning
fn parse_learn(rest: &str) -> Option<(&str, &str, Option<&str>)> {
    let mut parts = rest.splitn(3, ':');
    let term = parts.next()?;
    let meaning = parts.next()?;
    Some((term, meaning, parts.next()))
}
