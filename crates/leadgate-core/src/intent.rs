//! Heuristic intent classification for inbound text.
//!
//! Used for logging and branch refinement only; dispatch is driven by lead
//! state and literal content, never by the classified intent.

use crate::form;

/// Coarse intent of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    OptionSelect,
    Question,
    FormResponse,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::OptionSelect => "option_select",
            Self::Question => "question",
            Self::FormResponse => "form_response",
            Self::Unknown => "unknown",
        }
    }
}

/// Words that open a greeting.
const GREETING_KW: &[&str] = &[
    "hi", "hello", "halo", "hai", "selamat", "salam", "hey", "pagi", "siang", "sore", "malam",
];

/// Interrogatives that open a question.
const QUESTION_KW: &[&str] = &[
    "apa", "bagaimana", "gimana", "berapa", "kapan", "dimana", "siapa", "mengapa", "kenapa",
    "what", "how", "when", "where", "who", "why",
];

/// Classify the intent of a message, case-insensitively.
pub fn detect_intent(text: &str) -> Intent {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    let first_word = lower
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())
        .unwrap_or("");

    if GREETING_KW.contains(&first_word) {
        return Intent::Greeting;
    }

    // A bare single digit is a menu selection.
    if trimmed.len() == 1 && trimmed.chars().all(|c| c.is_ascii_digit()) && trimmed != "0" {
        return Intent::OptionSelect;
    }

    if trimmed.ends_with('?') || QUESTION_KW.contains(&first_word) {
        return Intent::Question;
    }

    if form::form_keyword_count(&lower) >= 2 || trimmed.contains('\n') {
        return Intent::FormResponse;
    }

    Intent::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greetings() {
        assert_eq!(detect_intent("Halo"), Intent::Greeting);
        assert_eq!(detect_intent("selamat pagi kak"), Intent::Greeting);
        assert_eq!(detect_intent("Hi, saya mau tanya"), Intent::Greeting);
        assert_eq!(detect_intent("HELLO"), Intent::Greeting);
    }

    #[test]
    fn test_option_select() {
        assert_eq!(detect_intent("1"), Intent::OptionSelect);
        assert_eq!(detect_intent(" 3 "), Intent::OptionSelect);
        assert_eq!(detect_intent("9"), Intent::OptionSelect);
        // Zero is not a menu option.
        assert_eq!(detect_intent("0"), Intent::Unknown);
        // Multi-digit numbers are not selections.
        assert_ne!(detect_intent("12"), Intent::OptionSelect);
    }

    #[test]
    fn test_questions() {
        assert_eq!(detect_intent("Berapa biayanya"), Intent::Question);
        assert_eq!(detect_intent("kapan bisa mulai"), Intent::Question);
        assert_eq!(detect_intent("Is this still open?"), Intent::Question);
        assert_eq!(detect_intent("What do you offer"), Intent::Question);
    }

    #[test]
    fn test_form_response() {
        assert_eq!(
            detect_intent("Nama: Budi\nBudget: 100 juta"),
            Intent::FormResponse
        );
        // Two form keywords on one line, no newline.
        assert_eq!(
            detect_intent("budget saya 50 juta untuk jenis bisnis kuliner"),
            Intent::FormResponse
        );
    }

    #[test]
    fn test_unknown() {
        assert_eq!(detect_intent("ok"), Intent::Unknown);
        assert_eq!(detect_intent("terima kasih"), Intent::Unknown);
    }

    #[test]
    fn test_greeting_beats_question_mark() {
        // Leading greeting word wins over a trailing question mark.
        assert_eq!(detect_intent("halo?"), Intent::Greeting);
    }
}
