use crate::agents::{DietaryTarget, TransformDirective};

/// The closed set of session intents a recognized utterance can map to.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Transform(TransformDirective),
    StartTimer,
    PauseTimer,
    ResumeTimer,
    Advance,
    Repeat,
    QueryPrepPhase,
    QueryTimeRemaining,
    ListIngredients,
    PauseSession,
    ResumeSession,
    Unrecognized(String),
}

/// Map noisy recognized speech to an intent.
///
/// Substring matching in a fixed precedence: multi-word phrases are checked
/// before the short generic words they contain, so "pause timer" can never
/// classify as the session-level "pause". Pure and deterministic.
pub fn classify(raw: &str) -> Intent {
    let text = raw.trim().to_lowercase();

    for (needle, target) in [
        ("vegetarian", DietaryTarget::Vegetarian),
        ("vegan", DietaryTarget::Vegan),
        ("gluten free", DietaryTarget::GlutenFree),
        ("dairy free", DietaryTarget::DairyFree),
    ] {
        if text.contains(needle) {
            return Intent::Transform(TransformDirective::Diet(target));
        }
    }

    if text.contains("scale up") || text.contains("double") {
        return Intent::Transform(TransformDirective::Scale(2.0));
    }
    if text.contains("scale down") || text.contains("half") {
        return Intent::Transform(TransformDirective::Scale(0.5));
    }

    if text.contains("start timer") {
        return Intent::StartTimer;
    }
    if text.contains("pause timer") || text.contains("stop timer") {
        return Intent::PauseTimer;
    }
    if text.contains("resume timer") || text.contains("restart timer") || text.contains("continue timer")
    {
        return Intent::ResumeTimer;
    }

    if text.contains("next") {
        return Intent::Advance;
    }
    if text.contains("repeat") {
        return Intent::Repeat;
    }
    if text.contains("what prep") {
        return Intent::QueryPrepPhase;
    }
    if text.contains("time") {
        return Intent::QueryTimeRemaining;
    }
    if text.contains("ingredients") {
        return Intent::ListIngredients;
    }
    if text.contains("pause") {
        return Intent::PauseSession;
    }
    if text.contains("resume") {
        return Intent::ResumeSession;
    }

    Intent::Unrecognized(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_phrases_beat_generic_words() {
        assert_eq!(classify("please pause timer now"), Intent::PauseTimer);
        assert_eq!(classify("stop timer"), Intent::PauseTimer);
        assert_eq!(classify("restart timer"), Intent::ResumeTimer);
        assert_eq!(classify("start timer"), Intent::StartTimer);
    }

    #[test]
    fn generic_pause_and_resume_still_match_alone() {
        assert_eq!(classify("pause"), Intent::PauseSession);
        assert_eq!(classify("resume"), Intent::ResumeSession);
    }

    #[test]
    fn dietary_transforms() {
        assert_eq!(
            classify("make it vegan"),
            Intent::Transform(TransformDirective::Diet(DietaryTarget::Vegan))
        );
        assert_eq!(
            classify("can you do a gluten free version"),
            Intent::Transform(TransformDirective::Diet(DietaryTarget::GlutenFree))
        );
        assert_eq!(
            classify("vegetarian please"),
            Intent::Transform(TransformDirective::Diet(DietaryTarget::Vegetarian))
        );
    }

    #[test]
    fn scaling_transforms() {
        assert_eq!(
            classify("double the recipe"),
            Intent::Transform(TransformDirective::Scale(2.0))
        );
        assert_eq!(
            classify("scale down to half"),
            Intent::Transform(TransformDirective::Scale(0.5))
        );
    }

    #[test]
    fn navigation_and_queries() {
        assert_eq!(classify("  NEXT  "), Intent::Advance);
        assert_eq!(classify("repeat that"), Intent::Repeat);
        assert_eq!(classify("what prep is left"), Intent::QueryPrepPhase);
        assert_eq!(classify("how much time"), Intent::QueryTimeRemaining);
        assert_eq!(classify("list the ingredients"), Intent::ListIngredients);
    }

    #[test]
    fn unknown_text_is_unrecognized() {
        assert_eq!(classify("asdf"), Intent::Unrecognized("asdf".into()));
    }
}
