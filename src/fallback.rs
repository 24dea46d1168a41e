//! Offline fallback responder.
//!
//! When no authenticated stream is available the chat still answers: a
//! keyword match over a small set of subject categories picks a canned reply,
//! delivered after a short simulated thinking delay. Replies flow through the
//! same chat-mutation path as real assistant messages, without an exchange id.

use std::time::Duration;

use crate::observability;
use crate::types::Message;

/// A subject category matched against user input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Subject {
    /// Mathematics.
    Math,
    /// Physics.
    Physics,
    /// Chemistry.
    Chemistry,
    /// Biology.
    Biology,
    /// History and geography.
    History,
    /// Languages and grammar.
    Language,
    /// No keyword matched.
    General,
}

/// Keyword tables cover both French and English input.
const MATH_KEYWORDS: &[&str] = &[
    "math", "maths", "équation", "equation", "fraction", "algèbre", "algebra", "géométrie",
    "geometry", "calcul", "théorème", "theorem",
];
const PHYSICS_KEYWORDS: &[&str] = &[
    "physique", "physics", "mécanique", "mechanics", "quantique", "quantum", "force", "énergie",
    "energy", "gravité", "gravity", "électricité", "electricity",
];
const CHEMISTRY_KEYWORDS: &[&str] = &[
    "chimie", "chemistry", "molécule", "molecule", "atome", "atom", "réaction", "reaction",
    "acide", "acid",
];
const BIOLOGY_KEYWORDS: &[&str] = &[
    "biologie", "biology", "cellule", "cell", "adn", "dna", "photosynthèse", "photosynthesis",
    "organisme", "organism",
];
const HISTORY_KEYWORDS: &[&str] = &[
    "histoire", "history", "révolution", "revolution", "guerre", "war", "empire", "géographie",
    "geography",
];
const LANGUAGE_KEYWORDS: &[&str] = &[
    "grammaire", "grammar", "conjugaison", "conjugation", "orthographe", "spelling", "verbe",
    "verb", "vocabulaire", "vocabulary",
];

impl Subject {
    /// Classify user input by keyword.
    pub fn classify(input: &str) -> Self {
        let input = input.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| input.contains(k));
        if matches(MATH_KEYWORDS) {
            Subject::Math
        } else if matches(PHYSICS_KEYWORDS) {
            Subject::Physics
        } else if matches(CHEMISTRY_KEYWORDS) {
            Subject::Chemistry
        } else if matches(BIOLOGY_KEYWORDS) {
            Subject::Biology
        } else if matches(HISTORY_KEYWORDS) {
            Subject::History
        } else if matches(LANGUAGE_KEYWORDS) {
            Subject::Language
        } else {
            Subject::General
        }
    }

    /// The canned reply for this subject.
    pub fn canned_reply(&self) -> &'static str {
        match self {
            Subject::Math => {
                "Bonne question de mathématiques ! Pour bien y répondre, commence par \
                 identifier ce que l'énoncé te donne et ce qu'il te demande. Connecte-toi \
                 pour que je puisse t'accompagner pas à pas."
            }
            Subject::Physics => {
                "La physique, c'est passionnant ! Pense d'abord aux grandeurs en jeu et aux \
                 lois qui les relient. Connecte-toi pour une explication détaillée adaptée à \
                 ton niveau."
            }
            Subject::Chemistry => {
                "En chimie, tout part des atomes et de leurs liaisons. Essaie d'écrire \
                 l'équation de la réaction en jeu. Connecte-toi pour que je t'aide à \
                 l'équilibrer."
            }
            Subject::Biology => {
                "La biologie décrit le vivant à toutes les échelles. Situe d'abord ta \
                 question : cellule, organisme ou écosystème ? Connecte-toi pour aller plus \
                 loin ensemble."
            }
            Subject::History => {
                "Pour l'histoire-géo, replace les événements dans leur contexte : dates, \
                 acteurs, causes et conséquences. Connecte-toi pour construire une vraie \
                 réponse argumentée."
            }
            Subject::Language => {
                "Pour les langues, la régularité paie ! Commence par identifier la règle de \
                 grammaire concernée. Connecte-toi pour des exercices corrigés pas à pas."
            }
            Subject::General => {
                "Je suis ton tuteur IA ! Hors connexion, je ne peux donner que des conseils \
                 généraux. Connecte-toi pour obtenir une réponse complète à ta question."
            }
        }
    }
}

/// Dedicated reply for whiteboard-flagged input, regardless of keyword match.
const WHITEBOARD_REPLY: &str =
    "J'ai bien reçu ton tableau blanc ! Hors connexion, je ne peux pas l'analyser en \
     détail. Connecte-toi pour que nous puissions le travailler ensemble.";

/// Produces canned offline replies.
#[derive(Debug, Clone)]
pub struct FallbackResponder {
    delay: Duration,
}

impl FallbackResponder {
    /// Create a responder with the given simulated thinking delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Produce the canned reply for the given input.
    ///
    /// Waits the simulated delay, then returns an assistant message with no
    /// exchange id.
    pub async fn respond(&self, input: &str, has_whiteboard: bool) -> Message {
        tokio::time::sleep(self.delay).await;
        observability::FALLBACK_REPLIES.click();
        let reply = if has_whiteboard {
            WHITEBOARD_REPLY
        } else {
            Subject::classify(input).canned_reply()
        };
        Message::assistant(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[test]
    fn classify_french_physics_question() {
        assert_eq!(
            Subject::classify("Explique la mécanique quantique"),
            Subject::Physics
        );
    }

    #[test]
    fn classify_english_math_question() {
        assert_eq!(
            Subject::classify("Help me solve this equation"),
            Subject::Math
        );
    }

    #[test]
    fn classify_unmatched_input_as_general() {
        assert_eq!(Subject::classify("raconte-moi une blague"), Subject::General);
    }

    #[tokio::test(start_paused = true)]
    async fn respond_waits_the_simulated_delay() {
        let responder = FallbackResponder::new(Duration::from_millis(1500));
        let started = tokio::time::Instant::now();
        let message = responder
            .respond("Explique la mécanique quantique", false)
            .await;
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(message.exchange_id.is_none());
        assert_eq!(message.content, Subject::Physics.canned_reply());
    }

    #[tokio::test(start_paused = true)]
    async fn whiteboard_input_gets_dedicated_reply() {
        let responder = FallbackResponder::new(Duration::from_millis(1500));
        let message = responder.respond("résous cette équation", true).await;
        assert_eq!(message.content, WHITEBOARD_REPLY);
    }
}
