//! crates/meeting_assistant_core/src/password.rs
//!
//! Advisory password-strength scoring for sign-up feedback. The accounts API
//! owns the real password policy; nothing here accepts or rejects a password.

use serde::Serialize;
use std::fmt;

pub const MIN_PASSWORD_LENGTH: usize = 8;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum StrengthLabel {
    /// Nothing typed yet.
    Empty,
    VeryWeak,
    Weak,
    Fair,
    Good,
    Strong,
    VeryStrong,
}

impl StrengthLabel {
    fn for_score(score: u8) -> Self {
        match score {
            0 => StrengthLabel::VeryWeak,
            1 => StrengthLabel::Weak,
            2 => StrengthLabel::Fair,
            3 => StrengthLabel::Good,
            4 => StrengthLabel::Strong,
            _ => StrengthLabel::VeryStrong,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthLabel::Empty => "",
            StrengthLabel::VeryWeak => "Very weak",
            StrengthLabel::Weak => "Weak",
            StrengthLabel::Fair => "Fair",
            StrengthLabel::Good => "Good",
            StrengthLabel::Strong => "Strong",
            StrengthLabel::VeryStrong => "Very strong",
        }
    }
}

impl fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the five criteria a password meets, for the sign-up checklist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Criteria {
    pub min_length: bool,
    pub digit: bool,
    pub lowercase: bool,
    pub uppercase: bool,
    pub special: bool,
}

impl Criteria {
    pub fn of(password: &str) -> Self {
        Self {
            min_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
            digit: password.chars().any(|c| c.is_ascii_digit()),
            lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
            uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
            special: password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
        }
    }

    pub fn satisfied(&self) -> u8 {
        [
            self.min_length,
            self.digit,
            self.lowercase,
            self.uppercase,
            self.special,
        ]
        .into_iter()
        .filter(|met| *met)
        .count() as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    /// 0 to 5, one point per satisfied criterion.
    pub score: u8,
    pub label: StrengthLabel,
    pub criteria: Criteria,
}

pub fn evaluate(password: &str) -> PasswordStrength {
    let criteria = Criteria::of(password);
    let score = criteria.satisfied();
    let label = if password.is_empty() {
        StrengthLabel::Empty
    } else {
        StrengthLabel::for_score(score)
    };
    PasswordStrength {
        score,
        label,
        criteria,
    }
}
