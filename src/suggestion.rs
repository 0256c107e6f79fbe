//! Advice text keyed by lowercase emotion label.

/// Returned for any label outside the vocabulary
pub const DEFAULT_SUGGESTION: &str = "Take care of your well-being.";

/// Look up the suggestion for an emotion label.
///
/// Keys are lowercase; callers normalize casing before the lookup, so
/// `"HAPPY"` falls through to [`DEFAULT_SUGGESTION`].
pub fn suggestion_for(label: &str) -> &'static str {
    match label {
        "happy" => "Keep up the positivity! Consider spreading it by talking to a friend.",
        "sad" => "It's okay to feel sad. Try journaling or taking a walk in nature.",
        "angry" => "Take deep breaths. A short break or light exercise might help.",
        "neutral" => "You're stable now. Maintain balance with a hobby or light reading.",
        "fear" => "Try grounding techniques. Talk to someone you trust.",
        "disgust" => "Disengage from the situation. Reflect and understand your feeling.",
        "surprise" => "Channel your surprise into curiosity. Explore more about it.",
        _ => DEFAULT_SUGGESTION,
    }
}
