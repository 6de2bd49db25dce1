//! Static question bank used whenever generation fails.

use super::GeneratedQuestion;
use rand::seq::IndexedRandom;

struct BankQuestion {
    question: &'static str,
    answer: &'static str,
    alternatives: [&'static str; 3],
    alternate_spellings: &'static [&'static str],
}

const GENERAL: &[BankQuestion] = &[
    BankQuestion {
        question: "What is the capital of France?",
        answer: "Paris",
        alternatives: ["Lyon", "Marseille", "Nice"],
        alternate_spellings: &[],
    },
    BankQuestion {
        question: "Who painted the Mona Lisa?",
        answer: "Leonardo da Vinci",
        alternatives: ["Michelangelo", "Raphael", "Donatello"],
        alternate_spellings: &["Da Vinci", "Leonardo"],
    },
    BankQuestion {
        question: "Which animal is known as the 'King of the Jungle'?",
        answer: "Lion",
        alternatives: ["Tiger", "Elephant", "Gorilla"],
        alternate_spellings: &["The lion"],
    },
];

const SCIENCE: &[BankQuestion] = &[
    BankQuestion {
        question: "What is the chemical symbol for water?",
        answer: "H2O",
        alternatives: ["CO2", "NaCl", "O2"],
        alternate_spellings: &[],
    },
    BankQuestion {
        question: "What planet is known as the Red Planet?",
        answer: "Mars",
        alternatives: ["Venus", "Jupiter", "Mercury"],
        alternate_spellings: &[],
    },
    BankQuestion {
        question: "What is the chemical symbol for gold?",
        answer: "Au",
        alternatives: ["Ag", "Fe", "Cu"],
        alternate_spellings: &[],
    },
];

const HISTORY: &[BankQuestion] = &[
    BankQuestion {
        question: "In which year did World War II end?",
        answer: "1945",
        alternatives: ["1939", "1941", "1950"],
        alternate_spellings: &[],
    },
    BankQuestion {
        question: "Who was the first President of the United States?",
        answer: "George Washington",
        alternatives: ["Thomas Jefferson", "Abraham Lincoln", "John Adams"],
        alternate_spellings: &["Washington"],
    },
];

const LAST_RESORT: BankQuestion = BankQuestion {
    question: "What color is the sky on a clear day?",
    answer: "Blue",
    alternatives: ["Green", "Red", "Yellow"],
    alternate_spellings: &[],
};

fn bank_for(category: &str) -> Option<&'static [BankQuestion]> {
    match category.trim().to_lowercase().as_str() {
        "general" => Some(GENERAL),
        "science" => Some(SCIENCE),
        "history" => Some(HISTORY),
        _ => None,
    }
}

/// Pick a random bank question from one of the categories, or from general knowledge
pub fn fallback_question(categories: &[String]) -> GeneratedQuestion {
    let mut rng = rand::rng();

    let banks: Vec<&[BankQuestion]> = categories.iter().filter_map(|c| bank_for(c)).collect();
    let bank = banks.choose(&mut rng).copied().unwrap_or(GENERAL);
    let picked = bank.choose(&mut rng).unwrap_or(&LAST_RESORT);

    GeneratedQuestion {
        question: picked.question.to_string(),
        answer: picked.answer.to_string(),
        alternatives: picked.alternatives.iter().map(|s| s.to_string()).collect(),
        alternate_spellings: picked
            .alternate_spellings
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}
