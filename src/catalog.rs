// Static content for games, tips and fallback chat replies
// Every table is non-empty; the pickers sample uniformly.

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriviaQuestion {
    pub question: &'static str,
    pub options: &'static [&'static str],
    pub correct_answer: &'static str,
    pub category: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Riddle {
    pub question: &'static str,
    pub answer: &'static str,
    pub hint: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TipCategory {
    Nutrition,
    Exercise,
    Sleep,
    MentalHealth,
    Hydration,
    Posture,
    Mindfulness,
}

impl TipCategory {
    pub const ALL: [TipCategory; 7] = [
        TipCategory::Nutrition,
        TipCategory::Exercise,
        TipCategory::Sleep,
        TipCategory::MentalHealth,
        TipCategory::Hydration,
        TipCategory::Posture,
        TipCategory::Mindfulness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TipCategory::Nutrition => "Nutrition",
            TipCategory::Exercise => "Exercise",
            TipCategory::Sleep => "Sleep",
            TipCategory::MentalHealth => "Mental Health",
            TipCategory::Hydration => "Hydration",
            TipCategory::Posture => "Posture",
            TipCategory::Mindfulness => "Mindfulness",
        }
    }
}

impl FromStr for TipCategory {
    type Err = String;

    /// Case-insensitive; accepts spaces or hyphens ("mental-health")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().to_lowercase() == wanted || c.as_str().replace(' ', "-").to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown category: {}", s.trim()))
    }
}

impl fmt::Display for TipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthTip {
    pub text: &'static str,
    pub category: TipCategory,
}

// ============ Tables ============

pub const TRIVIA_QUESTIONS: &[TriviaQuestion] = &[
    TriviaQuestion {
        question: "What is the capital of France?",
        options: &["London", "Berlin", "Paris", "Madrid"],
        correct_answer: "Paris",
        category: "Geography",
    },
    TriviaQuestion {
        question: "Which planet is known as the Red Planet?",
        options: &["Venus", "Mars", "Jupiter", "Saturn"],
        correct_answer: "Mars",
        category: "Space",
    },
    TriviaQuestion {
        question: "What is the chemical symbol for gold?",
        options: &["Ag", "Fe", "Au", "Cu"],
        correct_answer: "Au",
        category: "Science",
    },
    TriviaQuestion {
        question: "How many continents are there on Earth?",
        options: &["5", "6", "7", "8"],
        correct_answer: "7",
        category: "Geography",
    },
    TriviaQuestion {
        question: "Which famous scientist developed the theory of relativity?",
        options: &["Isaac Newton", "Albert Einstein", "Galileo Galilei", "Stephen Hawking"],
        correct_answer: "Albert Einstein",
        category: "Science",
    },
    TriviaQuestion {
        question: "How many hours of sleep do most adults need each night?",
        options: &["4-5", "5-6", "7-9", "10-12"],
        correct_answer: "7-9",
        category: "Wellness",
    },
    TriviaQuestion {
        question: "Which hormone is often called the 'sleep hormone'?",
        options: &["Cortisol", "Melatonin", "Adrenaline", "Insulin"],
        correct_answer: "Melatonin",
        category: "Wellness",
    },
];

pub const WORD_LIST: &[&str] = &[
    "happiness",
    "mindfulness",
    "meditation",
    "wellness",
    "serenity",
    "peaceful",
    "harmony",
    "balance",
];

pub const RIDDLES: &[Riddle] = &[
    Riddle {
        question: "What has keys but can't open locks?",
        answer: "piano",
        hint: "It makes music.",
    },
    Riddle {
        question: "What gets wetter the more it dries?",
        answer: "towel",
        hint: "You use it after a shower.",
    },
    Riddle {
        question: "What has a face and two hands but no arms or legs?",
        answer: "clock",
        hint: "It tells you something important every second.",
    },
    Riddle {
        question: "What can you catch but not throw?",
        answer: "cold",
        hint: "You might need tissues.",
    },
    Riddle {
        question: "What belongs to you, but other people use it more than you do?",
        answer: "name",
        hint: "People call you by it.",
    },
    Riddle {
        question: "The more you take, the more you leave behind. What are they?",
        answer: "footsteps",
        hint: "Think about going for a walk.",
    },
    Riddle {
        question: "What has many teeth but can't bite?",
        answer: "comb",
        hint: "It helps with your hair.",
    },
];

pub const HEALTH_TIPS: &[HealthTip] = &[
    HealthTip { text: "Fill half your plate with vegetables at each meal.", category: TipCategory::Nutrition },
    HealthTip { text: "Keep a piece of fruit within reach for an easy afternoon snack.", category: TipCategory::Nutrition },
    HealthTip { text: "Eat slowly and put your fork down between bites to notice fullness.", category: TipCategory::Nutrition },
    HealthTip { text: "Take a 10-minute walk after meals to help digestion.", category: TipCategory::Exercise },
    HealthTip { text: "Try to move for a few minutes every hour you sit.", category: TipCategory::Exercise },
    HealthTip { text: "Stretch gently for five minutes when you wake up.", category: TipCategory::Exercise },
    HealthTip { text: "Keep a consistent bedtime, even on weekends.", category: TipCategory::Sleep },
    HealthTip { text: "Put screens away 30 minutes before bed.", category: TipCategory::Sleep },
    HealthTip { text: "Keep your bedroom cool, dark and quiet.", category: TipCategory::Sleep },
    HealthTip { text: "Write down three things you're grateful for each day.", category: TipCategory::MentalHealth },
    HealthTip { text: "Reach out to a friend today, even with a short message.", category: TipCategory::MentalHealth },
    HealthTip { text: "It's okay to say no. Protecting your energy is self-care.", category: TipCategory::MentalHealth },
    HealthTip { text: "Start your day with a glass of water.", category: TipCategory::Hydration },
    HealthTip { text: "Carry a reusable water bottle as a visual reminder to drink.", category: TipCategory::Hydration },
    HealthTip { text: "Herbal tea counts toward your daily fluids.", category: TipCategory::Hydration },
    HealthTip { text: "Keep your screen at eye level to avoid neck strain.", category: TipCategory::Posture },
    HealthTip { text: "Roll your shoulders back and down a few times an hour.", category: TipCategory::Posture },
    HealthTip { text: "Keep both feet flat on the floor while sitting.", category: TipCategory::Posture },
    HealthTip { text: "Take three slow, deep breaths before reacting to stress.", category: TipCategory::Mindfulness },
    HealthTip { text: "Notice five things you can see, four you can hear and three you can touch.", category: TipCategory::Mindfulness },
    HealthTip { text: "Eat one meal today without your phone.", category: TipCategory::Mindfulness },
];

pub const REFLECTION_PROMPTS: &[&str] = &[
    "What made you smile today?",
    "What is one thing you learned about yourself this week?",
    "What challenged you today, and how did you respond?",
    "Who are you grateful for right now, and why?",
    "What would you like to let go of?",
    "What does a perfect calm day look like for you?",
    "When did you feel most like yourself today?",
    "What small win can you celebrate today?",
    "What is something you're looking forward to?",
    "How did you take care of yourself today?",
];

pub const FALLBACK_RESPONSES: &[&str] = &[
    "I'm here to listen whenever you need to talk.",
    "That sounds challenging. How can I help support you?",
    "Remember to take care of yourself today - even small acts of self-care matter.",
    "Deep breathing can help in moments of stress. Would you like me to guide you through a quick exercise?",
    "It's important to acknowledge your feelings. Would you like to discuss them further?",
    "What's one small positive thing you've experienced recently?",
    "Sometimes writing down your thoughts can help process them. Have you tried journaling?",
];

/// Wellness symbols for the memory match board; each appears twice in a deck
pub const MEMORY_SYMBOLS: &[&str] = &["🧘", "🌿", "💧", "☀️", "🌙", "🍎", "💤", "❤️"];

// ============ Pickers ============

fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

pub fn random_trivia() -> &'static TriviaQuestion {
    pick(TRIVIA_QUESTIONS, &mut rand::rng())
}

/// Answer comparison shared by every game: surrounding whitespace and case
/// are ignored
pub fn answers_match(expected: &str, guess: &str) -> bool {
    expected.trim().to_lowercase() == guess.trim().to_lowercase()
}

pub fn check_trivia_answer(question: &TriviaQuestion, guess: &str) -> bool {
    answers_match(question.correct_answer, guess)
}

pub fn random_word() -> &'static str {
    *pick(WORD_LIST, &mut rand::rng())
}

pub fn random_riddle() -> &'static Riddle {
    pick(RIDDLES, &mut rand::rng())
}

pub fn random_health_tip() -> &'static HealthTip {
    pick(HEALTH_TIPS, &mut rand::rng())
}

pub fn all_health_tips() -> &'static [HealthTip] {
    HEALTH_TIPS
}

pub fn health_tips_in(category: TipCategory) -> Vec<&'static HealthTip> {
    HEALTH_TIPS.iter().filter(|t| t.category == category).collect()
}

pub fn random_reflection_prompt() -> &'static str {
    *pick(REFLECTION_PROMPTS, &mut rand::rng())
}

pub fn random_fallback_response() -> &'static str {
    *pick(FALLBACK_RESPONSES, &mut rand::rng())
}

/// Every symbol twice, in uniformly random order (Fisher-Yates)
pub fn shuffled_memory_deck() -> Vec<&'static str> {
    shuffled_memory_deck_with(&mut rand::rng())
}

pub fn shuffled_memory_deck_with<R: Rng + ?Sized>(rng: &mut R) -> Vec<&'static str> {
    let mut deck: Vec<&'static str> = MEMORY_SYMBOLS
        .iter()
        .flat_map(|symbol| [*symbol, *symbol])
        .collect();
    deck.shuffle(rng);
    deck
}

pub fn list_games() -> String {
    "Here are the games we can play right here in the chat:\n\
     - Trivia: say \"play trivia\"\n\
     - Word Guess: say \"play word guess\"\n\
     - Riddles: say \"play riddles\"\n\
     You can also ask for a \"health tip\" or a \"reflection prompt\"."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_every_trivia_answer_checks_in_any_case() {
        for q in TRIVIA_QUESTIONS {
            assert!(check_trivia_answer(q, q.correct_answer));
            assert!(check_trivia_answer(q, &q.correct_answer.to_uppercase()));
            assert!(check_trivia_answer(q, &q.correct_answer.to_lowercase()));
            assert!(q.options.contains(&q.correct_answer), "{}", q.question);
        }
    }

    #[test]
    fn test_wrong_trivia_answer_rejected() {
        let q = &TRIVIA_QUESTIONS[0];
        assert!(!check_trivia_answer(q, "London"));
        assert!(!check_trivia_answer(q, "Par is"));
    }

    #[test]
    fn test_trivia_answer_ignores_surrounding_whitespace() {
        let q = &TRIVIA_QUESTIONS[0];
        assert!(check_trivia_answer(q, "Paris "));
        assert!(check_trivia_answer(q, "  paris\n"));
    }

    #[test]
    fn test_pickers_return_members_and_cover_catalog() {
        let mut words = HashSet::new();
        let mut questions = HashSet::new();
        let mut riddles = HashSet::new();
        for _ in 0..2000 {
            let w = random_word();
            assert!(WORD_LIST.contains(&w));
            words.insert(w);

            let q = random_trivia();
            assert!(TRIVIA_QUESTIONS.contains(q));
            questions.insert(q.question);

            let r = random_riddle();
            assert!(RIDDLES.contains(r));
            riddles.insert(r.question);
        }
        assert_eq!(words.len(), WORD_LIST.len());
        assert_eq!(questions.len(), TRIVIA_QUESTIONS.len());
        assert_eq!(riddles.len(), RIDDLES.len());
    }

    #[test]
    fn test_other_pickers_are_members() {
        for _ in 0..200 {
            assert!(HEALTH_TIPS.contains(random_health_tip()));
            assert!(REFLECTION_PROMPTS.contains(&random_reflection_prompt()));
            assert!(FALLBACK_RESPONSES.contains(&random_fallback_response()));
        }
    }

    #[test]
    fn test_memory_deck_has_pairs() {
        let deck = shuffled_memory_deck();
        assert_eq!(deck.len(), MEMORY_SYMBOLS.len() * 2);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for card in &deck {
            *counts.entry(*card).or_default() += 1;
        }
        assert_eq!(counts.len(), MEMORY_SYMBOLS.len());
        assert!(counts.values().all(|&c| c == 2));
    }

    #[test]
    fn test_memory_shuffle_is_not_biased() {
        // A comparator-based sort shuffle skews the first slot; Fisher-Yates
        // keeps every symbol near 1/8 of the draws.
        let mut rng = rand::rng();
        let draws = 4000;
        let mut first: HashMap<&str, usize> = HashMap::new();
        for _ in 0..draws {
            let deck = shuffled_memory_deck_with(&mut rng);
            *first.entry(deck[0]).or_default() += 1;
        }
        let expected = draws / MEMORY_SYMBOLS.len();
        for symbol in MEMORY_SYMBOLS {
            let seen = first.get(symbol).copied().unwrap_or(0);
            assert!(
                seen > expected * 7 / 10 && seen < expected * 13 / 10,
                "{} led the deck {} times (expected ~{})",
                symbol,
                seen,
                expected
            );
        }
    }

    #[test]
    fn test_tip_categories() {
        for category in TipCategory::ALL {
            assert!(!health_tips_in(category).is_empty(), "{}", category);
        }
        assert_eq!(all_health_tips().len(), HEALTH_TIPS.len());
        assert_eq!("mental health".parse::<TipCategory>(), Ok(TipCategory::MentalHealth));
        assert_eq!("Mental-Health".parse::<TipCategory>(), Ok(TipCategory::MentalHealth));
        assert!("juggling".parse::<TipCategory>().is_err());
    }
}
