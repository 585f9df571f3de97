//! Memory match board
//!
//! Cards are dealt face down from a shuffled deck of symbol pairs. The
//! player turns up two cards per move; a pair stays revealed, a mismatch
//! stays up until `settle` turns both back over.

use crate::catalog;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCard {
    pub id: usize,
    pub value: String,
    pub flipped: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Out of range, already face up, or two cards are waiting to settle
    Ignored,
    FirstCard,
    Match,
    Mismatch,
    /// The flip matched the final pair
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMatch {
    cards: Vec<MemoryCard>,
    face_up: Vec<usize>,
    matches: usize,
    moves: usize,
}

impl Default for MemoryMatch {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMatch {
    pub fn new() -> Self {
        Self::from_deck(catalog::shuffled_memory_deck())
    }

    /// Deal a specific card order
    pub fn from_deck<S: Into<String>>(deck: Vec<S>) -> Self {
        let cards = deck
            .into_iter()
            .enumerate()
            .map(|(id, value)| MemoryCard {
                id,
                value: value.into(),
                flipped: false,
                matched: false,
            })
            .collect();
        Self {
            cards,
            face_up: Vec::with_capacity(2),
            matches: 0,
            moves: 0,
        }
    }

    pub fn cards(&self) -> &[MemoryCard] {
        &self.cards
    }

    pub fn matches(&self) -> usize {
        self.matches
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    pub fn pairs(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn is_complete(&self) -> bool {
        self.matches == self.pairs()
    }

    /// True while a mismatched pair is face up and waiting for `settle`
    pub fn awaiting_settle(&self) -> bool {
        self.face_up.len() == 2
    }

    pub fn flip(&mut self, index: usize) -> FlipOutcome {
        let Some(card) = self.cards.get(index) else {
            return FlipOutcome::Ignored;
        };
        if card.flipped || card.matched || self.face_up.len() == 2 {
            return FlipOutcome::Ignored;
        }

        self.cards[index].flipped = true;
        self.face_up.push(index);

        if self.face_up.len() < 2 {
            return FlipOutcome::FirstCard;
        }

        self.moves += 1;
        let (first, second) = (self.face_up[0], self.face_up[1]);

        if self.cards[first].value != self.cards[second].value {
            return FlipOutcome::Mismatch;
        }

        self.cards[first].matched = true;
        self.cards[second].matched = true;
        self.face_up.clear();
        self.matches += 1;

        if self.is_complete() {
            FlipOutcome::Completed
        } else {
            FlipOutcome::Match
        }
    }

    /// Turn a mismatched pair back face down
    pub fn settle(&mut self) {
        if self.face_up.len() < 2 {
            return;
        }
        for index in self.face_up.drain(..) {
            self.cards[index].flipped = false;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// One-line text rendering: `?` for face-down cards
    pub fn render(&self) -> String {
        self.cards
            .iter()
            .map(|c| {
                if c.flipped || c.matched {
                    c.value.clone()
                } else {
                    "?".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
