//! Driah's built-in rule table and canned replies

use crate::engine::{Handler, Intent, Matcher, Rule};
use crate::types::DictionaryEntry;

use regex::Regex;
use std::sync::LazyLock;

pub const WELCOME: &str =
    "Hello! I'm Driah AI, your friendly chatbot assistant. How can I help you today?";

pub const IDENTITY_REPLY: &str = "I'm Driah AI, a chatbot created to assist and chat with you.";

pub const AUTHORSHIP_REPLY: &str = "I was created by Omare Emmanuel, also known as Omar Lainz.";

pub const FEELINGS_REPLY: &str = "As an AI, I don't have feelings in the human sense, but I'm functioning well and ready to assist you!";

pub const NAME_MEANING_REPLY: &str = "My name comes from Gift Sumaiya, the girlfriend of my creator Omare Emmanuel. Driah is her nickname.";

pub const SADNESS_REPLY: &str = "I'm sorry to hear that you're feeling sad. Remember that it's okay to feel this way sometimes, and things will get better. Is there anything specific that's bothering you that you'd like to talk about?";

pub const HAPPINESS_REPLY: &str = "That's wonderful to hear! It's great that you're feeling happy. What's contributing to your good mood today?";

pub const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything!",
    "Why was the math book sad? Because it had too many problems.",
    "What do you call a fake noodle? An impasta!",
    "How does a computer get drunk? It takes screenshots!",
    "Why did the scarecrow win an award? Because he was outstanding in his field!",
];

pub const HAPPY_EMOJI_REPLY: &str = "I'm glad you're happy! How can I help you today?";
pub const SAD_EMOJI_REPLY: &str = "I'm sorry you're feeling down. Is there something I can do to help?";
pub const AFFECTION_EMOJI_REPLY: &str = "Thank you for the love! I appreciate your kindness.";

pub const GREETING_REPLY: &str = "Hello there! How can I assist you today?";
pub const FAREWELL_REPLY: &str = "Goodbye! Feel free to chat with me again anytime.";
pub const THANKS_REPLY: &str = "You're welcome! Is there anything else I can help you with?";

pub const FALLBACK_RESPONSES: &[&str] = &[
    "That's interesting! Tell me more about it.",
    "I'm still learning about many topics. Could you tell me more?",
    "I understand what you're saying. How can I help you with that?",
    "That's a great point! Would you like to discuss it further?",
    "I'm here to chat with you about anything you'd like to talk about.",
    "That's fascinating! I'd love to learn more about your perspective.",
    "I appreciate you sharing that with me. What else would you like to talk about?",
    "I'm not fully trained on that topic yet, but I'm eager to learn more. Can you elaborate?",
];

pub const EMPTY_HISTORY_REPLY: &str = "There's no chat history to download yet!";
pub const DOWNLOADED_REPLY: &str = "Chat history downloaded successfully!";

const HAPPY_EMOJI: &[&str] = &[
    "\u{1F60A}", "\u{1F603}", "\u{1F604}", "\u{1F601}", "\u{1F642}", "\u{1F600}",
];
const SAD_EMOJI: &[&str] = &[
    "\u{1F622}",
    "\u{1F62D}",
    "\u{1F614}",
    "\u{2639}\u{FE0F}",
    "\u{1F641}",
    "\u{1F61E}",
];
const AFFECTION_EMOJI: &[&str] = &[
    "\u{2764}\u{FE0F}",
    "\u{1F495}",
    "\u{1F60D}",
    "\u{1F970}",
    "\u{1F496}",
    "\u{1F497}",
];

static HAPPY_EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| exactly_one_of(HAPPY_EMOJI));
static SAD_EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| exactly_one_of(SAD_EMOJI));
static AFFECTION_EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| exactly_one_of(AFFECTION_EMOJI));

static GREETING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:hi|hello|hey|greetings)").unwrap());
static FAREWELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:goodbye|bye|see you|farewell)").unwrap());
static THANKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:thanks|thank you|ty)").unwrap());

fn exactly_one_of(alternatives: &[&str]) -> Regex {
    let body = alternatives
        .iter()
        .map(|a| regex::escape(a))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("^(?:{})$", body)).unwrap()
}

pub fn fallback_responses() -> Vec<String> {
    FALLBACK_RESPONSES.iter().map(|s| s.to_string()).collect()
}

pub fn definition_reply(entry: &DictionaryEntry) -> String {
    format!(
        "{}: {}\n\nExample: {}",
        entry.term, entry.meaning, entry.example
    )
}

pub fn dictionary_size_reply(count: usize) -> String {
    format!(
        "I currently know {} words and phrases. You can view them by clicking the Dictionary button at the top of the screen.",
        count
    )
}

pub fn learned_reply(term: &str) -> String {
    format!("I've learned the word \"{}\"! Thank you for teaching me.", term)
}

/// The cascade in evaluation order
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            Intent::Identity,
            Matcher::contains(&["what's your name", "who are you"]),
            Handler::say(IDENTITY_REPLY),
        ),
        Rule::new(
            Intent::Authorship,
            Matcher::contains(&["who created you", "who made you"]),
            Handler::say(AUTHORSHIP_REPLY),
        ),
        Rule::new(
            Intent::Feelings,
            Matcher::contains(&["how do you feel", "how are you feeling"]),
            Handler::say(FEELINGS_REPLY),
        ),
        Rule::new(
            Intent::NameMeaning,
            Matcher::contains(&["what does your name mean", "why are you called driah"]),
            Handler::say(NAME_MEANING_REPLY),
        ),
        Rule::new(
            Intent::Sadness,
            Matcher::contains(&["i'm sad", "feeling down", "i am sad"]),
            Handler::say(SADNESS_REPLY),
        ),
        Rule::new(
            Intent::Happiness,
            Matcher::contains(&["i'm happy", "feeling good", "i am happy"]),
            Handler::say(HAPPINESS_REPLY),
        ),
        Rule::new(
            Intent::Joke,
            Matcher::contains(&["tell me a joke"]),
            Handler::pick_one(JOKES),
        ),
        Rule::new(
            Intent::Definition,
            Matcher::starts_with(&["define ", "what is ", "what are "]),
            Handler::Define,
        ),
        Rule::new(
            Intent::DictionarySize,
            Matcher::contains(&["show me your dictionary", "what words do you know"]),
            Handler::CountTerms,
        ),
        Rule::new(
            Intent::Learn,
            Matcher::starts_with(&["learn "]),
            Handler::Learn,
        ),
        Rule::new(
            Intent::HappyEmoji,
            Matcher::pattern(HAPPY_EMOJI_RE.clone()),
            Handler::say(HAPPY_EMOJI_REPLY),
        ),
        Rule::new(
            Intent::SadEmoji,
            Matcher::pattern(SAD_EMOJI_RE.clone()),
            Handler::say(SAD_EMOJI_REPLY),
        ),
        Rule::new(
            Intent::AffectionEmoji,
            Matcher::pattern(AFFECTION_EMOJI_RE.clone()),
            Handler::say(AFFECTION_EMOJI_REPLY),
        ),
        Rule::new(
            Intent::Greeting,
            Matcher::pattern(GREETING_RE.clone()),
            Handler::say(GREETING_REPLY),
        ),
        Rule::new(
            Intent::Farewell,
            Matcher::pattern(FAREWELL_RE.clone()),
            Handler::say(FAREWELL_REPLY),
        ),
        Rule::new(
            Intent::Thanks,
            Matcher::pattern(THANKS_RE.clone()),
            Handler::say(THANKS_REPLY),
        ),
    ]
}
