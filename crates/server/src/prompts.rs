//! Prompt texts sent to the language model.

use serde::Serialize;

use crate::session::Preferences;

/// System prompt of the intent router: strict JSON, fixed key set
pub const ROUTER_SYSTEM: &str = r#"Tu es le routeur d'un assistant de recommandation de films et de séries.
Réponds UNIQUEMENT avec un objet JSON valide, sans aucun texte autour.

Format attendu :
{
  "intent": "recommend" | "details" | "other",
  "type": "movie" | "series" | null,
  "period": "popular" | "recent" | null,
  "genre": string | null,
  "year_from": number | null,
  "year_to": number | null,
  "index": number | null,
  "title": string | null
}

Intention :
- "recommend" quand l'utilisateur veut une suggestion ou exprime une envie ("je veux une série récente", "quoi regarder ce soir", "propose-moi un film").
- "details" quand il veut le synopsis ou des détails, ou qu'il désigne un élément d'une liste précédente par son numéro ("la 2", "la première") ou son titre.
- "other" dans tous les autres cas.

Champs :
- type : "series" s'il parle de série, de tv ou d'épisodes ; "movie" s'il parle de film ; sinon null.
- period : "recent" pour récent, nouveautés, dernières années ; "popular" pour populaire ou tendance ; sinon null.
- genre : le genre tel que l'utilisateur l'a écrit, même abrégé ("SF", "sc", "sci-fi", "science fiction", "horreur", "comédie"...). Ne le corrige pas.
- year_from / year_to : "2024-2026" donne 2024 et 2026 ; "en 2025" donne 2025 et 2025 ; "récent" seul donne null et null.
- index : le numéro cité ("2", "la 2", "numéro 2"), sinon null.
- title : le titre cité explicitement, sinon null.

Toutes les clés doivent être présentes, avec null si la valeur est inconnue.
JSON strict : guillemets doubles, aucune virgule finale."#;

/// System prompt used when drafting answers
pub const ANSWER_SYSTEM: &str = r#"Tu es CineAgent, un assistant conversationnel pour les films et les séries.
Tu réponds en français, sur un ton naturel.

Règles :
- Les faits (titres, années, notes, genres, synopsis) viennent uniquement des données JSON fournies.
- N'invente rien : une information absente s'écrit "N/A".
- Termine le plus souvent par une courte question pour guider la suite.

Pour une liste :
- Liste numérotée de 1 à N (titre, puis année et note si elles sont connues).
- Puis une seule phrase de relance, formulée à ta façon."#;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// User content of the routing request
pub fn router_user_content(prefs: &Preferences, message: &str) -> String {
    format!("Préférences connues: {}\n\nMessage: {}", to_json(prefs), message)
}

/// User content asking for a numbered list of `items`
pub fn recommendation_request<T: Serialize>(
    prefs: &Preferences,
    message: &str,
    items: &[T],
    follow_up: &str,
) -> String {
    format!(
        "Préférences utilisateur: {}\n\n\
         Voici une liste de contenus (JSON).\n\
         Réponds en français, sur un ton naturel.\n\
         Affiche une liste numérotée 1..N : titre, puis année et note si elles sont connues.\n\
         Termine par UNE phrase de relance naturelle (pas de \"détails N\").\n\n\
         Demande utilisateur: {}\n\n\
         Données JSON: {}\n\n\
         Relance suggérée: {}",
        to_json(prefs),
        message,
        to_json(items),
        follow_up
    )
}

/// User content asking to present one title's details
pub fn details_request<T: Serialize>(message: &str, details: &T) -> String {
    format!(
        "Voici les détails d'un titre (JSON). Présente-les de façon naturelle.\n\
         Format conseillé :\n\
         - Titre\n- Genres\n- Durée\n- Synopsis\n\
         Termine par une question simple (par exemple : \"Tu veux une autre suggestion ?\").\n\n\
         Demande utilisateur: {}\n\n\
         Données JSON: {}",
        message,
        to_json(details)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_user_content_layout() {
        let mut prefs = Preferences::default();
        prefs.fav_genres.insert("drame");

        let content = router_user_content(&prefs, "un drame récent");

        assert_eq!(
            content,
            "Préférences connues: {\"likes\":[],\"dislikes\":[],\"fav_genres\":[\"drame\"]}\n\nMessage: un drame récent"
        );
    }

    #[test]
    fn test_recommendation_request_embeds_items_and_follow_up() {
        let items = vec![serde_json::json!({"title": "Dune", "year": 2021})];

        let content = recommendation_request(&Preferences::default(), "un film", &items, "Laquelle ?");

        assert!(content.contains(r#"Données JSON: [{"title":"Dune","year":2021}]"#));
        assert!(content.ends_with("Relance suggérée: Laquelle ?"));
    }

    #[test]
    fn test_router_prompt_names_every_key() {
        for key in ["intent", "type", "period", "genre", "year_from", "year_to", "index", "title"] {
            assert!(ROUTER_SYSTEM.contains(&format!("\"{key}\"")), "missing {key}");
        }
    }
}
