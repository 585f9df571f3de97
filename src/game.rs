//! In-chat mini-games
//!
//! A `GameSession` is the single game the chat is currently running. Each
//! variant has its own transition function taking the player's text and
//! returning an `Answer`: the next session (None once the game ends), the
//! reply and whether the guess solved it.

use crate::catalog::{self, Riddle, TriviaQuestion};
use serde::{Deserialize, Serialize};

/// Shown for letters the player has not matched yet
pub const PLACEHOLDER: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameKind {
    Trivia,
    WordGuess,
    Riddle,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Trivia => "trivia",
            GameKind::WordGuess => "word_guess",
            GameKind::Riddle => "riddle",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GameKind::Trivia => "Trivia",
            GameKind::WordGuess => "Word guess",
            GameKind::Riddle => "Riddle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameSession {
    Trivia {
        question: String,
        options: Vec<String>,
        correct_answer: String,
    },
    WordGuess {
        secret_word: String,
    },
    Riddle {
        question: String,
        answer: String,
        hint: String,
        hint_revealed: bool,
    },
}

impl GameSession {
    /// Start a new game of `kind` with content from the catalog
    pub fn start(kind: GameKind) -> (GameSession, String) {
        let session = match kind {
            GameKind::Trivia => Self::from_trivia(catalog::random_trivia()),
            GameKind::WordGuess => Self::from_word(catalog::random_word()),
            GameKind::Riddle => Self::from_riddle(catalog::random_riddle()),
        };
        let intro = session.intro();
        (session, intro)
    }

    pub fn from_trivia(q: &TriviaQuestion) -> Self {
        GameSession::Trivia {
            question: q.question.to_string(),
            options: q.options.iter().map(|o| o.to_string()).collect(),
            correct_answer: q.correct_answer.to_string(),
        }
    }

    pub fn from_word(word: &str) -> Self {
        GameSession::WordGuess {
            secret_word: word.to_string(),
        }
    }

    pub fn from_riddle(r: &Riddle) -> Self {
        GameSession::Riddle {
            question: r.question.to_string(),
            answer: r.answer.to_string(),
            hint: r.hint.to_string(),
            hint_revealed: false,
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            GameSession::Trivia { .. } => GameKind::Trivia,
            GameSession::WordGuess { .. } => GameKind::WordGuess,
            GameSession::Riddle { .. } => GameKind::Riddle,
        }
    }

    /// Opening prompt for the game
    pub fn intro(&self) -> String {
        match self {
            GameSession::Trivia { question, options, .. } => {
                let numbered = options
                    .iter()
                    .enumerate()
                    .map(|(i, o)| format!("{}. {}", i + 1, o))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "Let's play trivia! {}\n{}\nType your answer.",
                    question, numbered
                )
            }
            GameSession::WordGuess { secret_word } => {
                let first = secret_word.chars().next().unwrap_or(PLACEHOLDER);
                format!(
                    "Let's play word guess! I'm thinking of a {}-letter wellness word that starts with \"{}\". What's your guess?",
                    secret_word.chars().count(),
                    first
                )
            }
            GameSession::Riddle { question, .. } => format!(
                "Here's a riddle for you: {} (Type \"hint\" if you need help.)",
                question
            ),
        }
    }

    /// Interpret `text` as an answer to this game
    pub fn answer(self, text: &str) -> Answer {
        match self {
            GameSession::Trivia { correct_answer, .. } => answer_trivia(correct_answer, text),
            GameSession::WordGuess { secret_word } => answer_word_guess(secret_word, text),
            GameSession::Riddle {
                question,
                answer,
                hint,
                hint_revealed,
            } => answer_riddle(question, answer, hint, hint_revealed, text),
        }
    }
}

/// Result of one answer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// The game after this turn; None once it has ended
    pub next: Option<GameSession>,
    pub reply: String,
    /// The guess was right
    pub solved: bool,
}

impl Answer {
    fn solved(reply: String) -> Self {
        Self {
            next: None,
            reply,
            solved: true,
        }
    }

    fn unsolved(next: Option<GameSession>, reply: String) -> Self {
        Self {
            next,
            reply,
            solved: false,
        }
    }
}

// Trivia is single-shot: the game ends whether or not the guess is right
fn answer_trivia(correct_answer: String, guess: &str) -> Answer {
    if catalog::answers_match(&correct_answer, guess) {
        Answer::solved(format!(
            "Correct! 🎉 {} is right. Say \"play trivia\" for another question.",
            correct_answer
        ))
    } else {
        Answer::unsolved(
            None,
            format!(
                "Not quite. The correct answer was {}. Say \"play trivia\" to try another one.",
                correct_answer
            ),
        )
    }
}

fn answer_word_guess(secret_word: String, guess: &str) -> Answer {
    if catalog::answers_match(&secret_word, guess) {
        return Answer::solved(format!("You got it! The word was \"{}\". 🎉", secret_word));
    }

    let reveal = partial_reveal(&secret_word, guess.trim());
    Answer::unsolved(
        Some(GameSession::WordGuess { secret_word }),
        format!("Not quite. Here's what you have so far: {}. Try again!", reveal),
    )
}

fn answer_riddle(question: String, answer: String, hint: String, hint_revealed: bool, guess: &str) -> Answer {
    if catalog::answers_match(&answer, guess) {
        return Answer::solved(format!("That's correct! Well done! The answer is \"{}\".", answer));
    }

    let asked_for_hint = guess.to_lowercase().contains("hint");
    let reply = if asked_for_hint {
        format!("Hint: {}", hint)
    } else {
        "Sorry, that's not right. Try again, or type \"hint\" for a clue.".to_string()
    };
    Answer::unsolved(
        Some(GameSession::Riddle {
            question,
            answer,
            hint,
            hint_revealed: hint_revealed || asked_for_hint,
        }),
        reply,
    )
}

/// Letter-by-letter comparison of `guess` against `secret`.
///
/// The first letter is always shown. Any other position is shown only when
/// the guess has the same letter (ignoring case) at that position.
pub fn partial_reveal(secret: &str, guess: &str) -> String {
    let guess: Vec<char> = guess.chars().collect();
    secret
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let matched = guess
                .get(i)
                .map(|g| g.to_lowercase().eq(c.to_lowercase()))
                .unwrap_or(false);
            if i == 0 || matched {
                c
            } else {
                PLACEHOLDER
            }
        })
        .collect()
}
