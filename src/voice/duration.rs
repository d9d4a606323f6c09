use std::sync::OnceLock;

use regex::Regex;

const MIN_MINUTES: u32 = 1;
const MAX_MINUTES: u32 = 300;

/// Patterns in priority order: verb-qualified durations win over a bare
/// number-of-minutes mention elsewhere in the instruction.
fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\b(?:cook|bake|simmer|boil)\s+for\s+(\d+)\s*(?:minutes?|mins?)\b")
                .expect("verb duration pattern is valid"),
            Regex::new(r"(?i)\b(\d+)\s*(?:minutes?|mins?)\b")
                .expect("plain duration pattern is valid"),
        ]
    })
}

/// Scan an instruction for a textual time duration and return it in seconds.
///
/// The first numeric match decides: a value outside [1, 300] minutes yields
/// nothing rather than falling through to a later pattern. Pure function,
/// re-run on every step change.
pub fn extract_duration_secs(instruction: &str) -> Option<u32> {
    for pattern in patterns() {
        if let Some(captures) = pattern.captures(instruction) {
            let minutes: u32 = captures[1].parse().ok()?;
            if (MIN_MINUTES..=MAX_MINUTES).contains(&minutes) {
                return Some(minutes * 60);
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::extract_duration_secs;

    #[test]
    fn extracts_simmer_duration() {
        assert_eq!(extract_duration_secs("Simmer for 15 minutes"), Some(900));
    }

    #[test]
    fn extracts_bare_minutes() {
        assert_eq!(
            extract_duration_secs("Let rest, about 5 min, before slicing"),
            Some(300)
        );
    }

    #[test]
    fn verb_qualified_wins_over_earlier_bare_number() {
        // "2 minutes" appears first but the bake phrase is higher priority.
        assert_eq!(
            extract_duration_secs("After 2 minutes of mixing, bake for 20 minutes"),
            Some(1200)
        );
    }

    #[test]
    fn no_duration_yields_nothing() {
        assert_eq!(extract_duration_secs("Preheat oven"), None);
    }

    #[test]
    fn out_of_range_durations_rejected() {
        assert_eq!(extract_duration_secs("Cook for 301 minutes"), None);
        assert_eq!(extract_duration_secs("bake for 0 minutes"), None);
        assert_eq!(extract_duration_secs("Cook for 300 minutes"), Some(18000));
    }
}
