//! Genre preference extraction from raw user messages.
//!
//! ## Algorithm
//! 1. Lowercase the message and fold curly apostrophes to straight ones
//! 2. Find every vocabulary term present (substring match)
//! 3. Negated liking ("j'aime pas", "je n'aime pas") → dislikes
//! 4. Plain liking ("j'aime" with no negation anywhere) → likes
//! 5. Every term present → fav_genres
//!
//! Sets deduplicate and keep first-mention order, so repeating a message is a
//! no-op.

use crate::session::Preferences;

/// Genre terms recognised in messages
pub const GENRE_VOCABULARY: [&str; 14] = [
    "science-fiction",
    "sf",
    "action",
    "comédie",
    "comedie",
    "drame",
    "thriller",
    "horreur",
    "fantastique",
    "animation",
    "aventure",
    "romance",
    "mystère",
    "mystere",
];

const NEGATIONS: [&str; 2] = ["j'aime pas", "je n'aime pas"];

const SKIP_MARKERS: [&str; 2] = ["peu importe", "n'importe"];

/// Lowercase with typographic apostrophes folded
pub fn fold_message(message: &str) -> String {
    message.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// Vocabulary terms present in an already folded message, in vocabulary order
fn terms_in(folded: &str) -> impl Iterator<Item = &'static str> + '_ {
    GENRE_VOCABULARY
        .iter()
        .copied()
        .filter(move |term| folded.contains(term))
}

/// Record the genres mentioned in `message` into `prefs` and return them.
pub fn update_preferences<'a>(prefs: &'a mut Preferences, message: &str) -> &'a Preferences {
    let folded = fold_message(message);
    let negated = NEGATIONS.iter().any(|marker| folded.contains(marker));

    for term in terms_in(&folded) {
        if negated {
            prefs.dislikes.insert(term);
        } else if folded.contains("j'aime") {
            prefs.likes.insert(term);
        }
        prefs.fav_genres.insert(term);
    }

    prefs
}

/// Whether the user waved the genre question away
pub fn skips_genre(message: &str) -> bool {
    let folded = fold_message(message);
    SKIP_MARKERS.iter().any(|marker| folded.contains(marker))
}
