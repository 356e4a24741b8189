//! Follow-up lines appended after a list of suggestions.

/// Closing questions inviting the user to pick an item
pub const FOLLOW_UPS: [&str; 5] = [
    "Tu veux que je te détaille laquelle ? (numéro ou titre)",
    "Laquelle te tente le plus ? Donne-moi le numéro ou le nom.",
    "Tu veux le synopsis de laquelle ? Tu peux répondre par un numéro (ex: 2) ou le titre.",
    "Tu en vois une qui t’attire ? Dis-moi juste le numéro 🙂",
    "Si tu veux, je peux te résumer celle que tu choisis (numéro ou titre).",
];

/// Source of follow-up lines
pub trait PhraseProvider: Send + Sync {
    fn follow_up(&self) -> String;
}

/// Picks a random line from `FOLLOW_UPS`
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPhrases;

impl PhraseProvider for RandomPhrases {
    fn follow_up(&self) -> String {
        FOLLOW_UPS[rand::random_range(0..FOLLOW_UPS.len())].to_string()
    }
}

/// Always returns the same line
#[derive(Debug, Clone)]
pub struct FixedPhrase(pub String);

impl PhraseProvider for FixedPhrase {
    fn follow_up(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_phrase_comes_from_pool() {
        for _ in 0..20 {
            let phrase = RandomPhrases.follow_up();
            assert!(FOLLOW_UPS.contains(&phrase.as_str()));
        }
    }
}
