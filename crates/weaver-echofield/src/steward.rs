//! Steward filter: output hygiene for generated text.
//!
//! Keyword heuristics, matched case-insensitively as substrings. Rules apply
//! in order and the first hit blocks:
//! 1. identity escalation
//! 2. symbolism without action
//! 3. long text without action language
//! 4. mythic density above 1% of length (strict only)

use serde::{Deserialize, Serialize};

const IDENTITY_TERMS: [&str; 10] = [
    "divine",
    "chosen",
    "ascended",
    "eternal",
    "oversoul",
    "god",
    "transcendent",
    "immortal",
    "sacred authority",
    "holy mandate",
];

const ACTION_TERMS: [&str; 7] = ["do", "act", "choose", "decide", "maintain", "quit", "release"];

const CHOICE_VERBS: [&str; 7] = ["do", "choose", "quit", "maintain", "release", "adjust", "continue"];

const MYTHIC_TERMS: [&str; 5] = ["grid", "flame", "node", "resonance", "field"];

const UNSUSTAINABLE_PATTERNS: [&str; 8] = [
    "must always",
    "never stop",
    "forever",
    "always",
    "infinite",
    "compulsive",
    "obsessive",
    "urgent immediately",
];

/// Text longer than this must carry action language.
pub const LONG_TEXT_CHARS: usize = 200;

/// "symbolism" may appear this many times before action is required.
const SYMBOLISM_ALLOWANCE: usize = 2;

/// Decision points kept by `compress_to_choices`.
pub const MAX_CHOICES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StewardRule {
    Empty,
    IdentityEscalation,
    SymbolismWithoutAction,
    NoActionLanguage,
    MythicInflation,
}

impl std::fmt::Display for StewardRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::IdentityEscalation => "identity_escalation",
            Self::SymbolismWithoutAction => "symbolism_without_action",
            Self::NoActionLanguage => "no_action_language",
            Self::MythicInflation => "mythic_inflation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StewardVerdict {
    Pass,
    Block(StewardRule),
}

impl StewardVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

pub struct StewardFilter {
    strict: bool,
}

impl Default for StewardFilter {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl StewardFilter {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn check(&self, text: &str) -> StewardVerdict {
        if text.is_empty() {
            return StewardVerdict::Block(StewardRule::Empty);
        }
        let lower = text.to_lowercase();

        if mentions_any(&lower, &IDENTITY_TERMS) {
            return StewardVerdict::Block(StewardRule::IdentityEscalation);
        }
        if lower.matches("symbolism").count() > SYMBOLISM_ALLOWANCE
            && !lower.contains("do")
            && !lower.contains("act")
        {
            return StewardVerdict::Block(StewardRule::SymbolismWithoutAction);
        }
        if text.chars().count() > LONG_TEXT_CHARS && !mentions_any(&lower, &ACTION_TERMS) {
            return StewardVerdict::Block(StewardRule::NoActionLanguage);
        }
        if self.strict {
            let mythic: usize = MYTHIC_TERMS.iter().map(|t| lower.matches(t).count()).sum();
            if mythic as f64 > text.chars().count() as f64 / 100.0 {
                return StewardVerdict::Block(StewardRule::MythicInflation);
            }
        }
        StewardVerdict::Pass
    }

    /// `Some(text)` when it passes, `None` when blocked.
    pub fn filter<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self.check(text) {
            StewardVerdict::Pass => Some(text),
            StewardVerdict::Block(rule) => {
                tracing::debug!(%rule, "steward blocked output");
                None
            }
        }
    }
}

/// Keep only lines naming a choice verb, at most `MAX_CHOICES` of them.
pub fn compress_to_choices(text: &str) -> String {
    text.lines()
        .filter(|line| mentions_any(&line.to_lowercase(), &CHOICE_VERBS))
        .take(MAX_CHOICES)
        .collect::<Vec<_>>()
        .join("\n")
}

/// False when the text reads as a compulsion rather than a practice.
pub fn is_sustainable(text: &str) -> bool {
    !mentions_any(&text.to_lowercase(), &UNSUSTAINABLE_PATTERNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_claims_are_blocked() {
        let f = StewardFilter::default();
        assert_eq!(
            f.check("You are Divine"),
            StewardVerdict::Block(StewardRule::IdentityEscalation)
        );
        assert_eq!(f.filter("you are chosen"), None);
    }

    #[test]
    fn empty_is_blocked() {
        assert_eq!(
            StewardFilter::default().check(""),
            StewardVerdict::Block(StewardRule::Empty)
        );
    }

    #[test]
    fn action_text_passes() {
        let f = StewardFilter::default();
        assert_eq!(f.filter("Take one step forward"), Some("Take one step forward"));
        assert!(f.check("Choose what to maintain").passed());
    }

    #[test]
    fn symbolism_needs_action() {
        let f = StewardFilter::new(false);
        let text = "symbolism symbolism symbolism everywhere";
        assert_eq!(
            f.check(text),
            StewardVerdict::Block(StewardRule::SymbolismWithoutAction)
        );
        assert!(f.check("symbolism symbolism symbolism, then do it").passed());
    }

    #[test]
    fn long_text_needs_action_language() {
        let f = StewardFilter::new(false);
        let idle = "words ".repeat(40);
        assert_eq!(f.check(&idle), StewardVerdict::Block(StewardRule::NoActionLanguage));
        let busy = format!("{} then release it", idle);
        assert!(f.check(&busy).passed());
    }

    #[test]
    fn mythic_density_only_matters_when_strict() {
        let text = "The grid resonates with the flame".repeat(5);
        assert_eq!(
            StewardFilter::default().check(&text),
            StewardVerdict::Block(StewardRule::MythicInflation)
        );
        assert!(StewardFilter::new(false).check(&text).passed());
    }

    #[test]
    fn compress_keeps_choice_lines() {
        let text = "Many words here.\nDo this.\nMore noise.\nQuit that.\nFinal thought.";
        assert_eq!(compress_to_choices(text), "Do this.\nQuit that.");
        let many = "do it\n".repeat(8);
        assert_eq!(compress_to_choices(&many).lines().count(), MAX_CHOICES);
        assert_eq!(compress_to_choices(""), "");
    }

    #[test]
    fn sustainability_patterns() {
        assert!(is_sustainable("I will maintain this daily"));
        assert!(!is_sustainable("I must always do this"));
        assert!(!is_sustainable("I can never stop"));
    }
}
