use serde::Serialize;

/// Label the sentiment classifier uses for the positive class.
pub const POSITIVE_LABEL: &str = "POSITIVE";

/// Writing tone picked from the prompt's sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Chosen for prompts classified as positive.
    Optimistic,
    /// Chosen for every other label.
    Serious,
}

impl Tone {
    /// Map a classifier label to a tone.
    ///
    /// Only the positive class selects [`Tone::Optimistic`]. Checkpoints
    /// disagree on casing (`POSITIVE` vs `positive`), so the comparison
    /// ignores ASCII case. `neutral` and anything unknown are serious.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case(POSITIVE_LABEL) {
            Tone::Optimistic
        } else {
            Tone::Serious
        }
    }

    /// Fixed text that precedes the prompt in the instruction.
    pub fn template_prefix(self) -> &'static str {
        match self {
            Tone::Optimistic => "Write a happy and optimistic story about: ",
            Tone::Serious => "Write a dark or serious story about: ",
        }
    }

    /// Build the instruction sent to the generator. The prompt is inserted as typed.
    pub fn instruction(self, prompt: &str) -> String {
        format!("{}{prompt}", self.template_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_label_is_optimistic_in_any_case() {
        assert_eq!(Tone::from_label("POSITIVE"), Tone::Optimistic);
        assert_eq!(Tone::from_label("positive"), Tone::Optimistic);
        assert_eq!(Tone::from_label("Positive"), Tone::Optimistic);
    }

    #[test]
    fn other_labels_are_serious() {
        for label in ["NEGATIVE", "negative", "neutral", "", "POSITIVE ", "LABEL_1"] {
            assert_eq!(Tone::from_label(label), Tone::Serious, "label {label:?}");
        }
    }

    #[test]
    fn instruction_uses_exact_templates() {
        assert_eq!(
            Tone::Optimistic.instruction("a sunny day"),
            "Write a happy and optimistic story about: a sunny day"
        );
        assert_eq!(
            Tone::Serious.instruction("the storm"),
            "Write a dark or serious story about: the storm"
        );
    }

    #[test]
    fn prompt_is_not_trimmed() {
        assert_eq!(
            Tone::Serious.instruction("  rain  "),
            "Write a dark or serious story about:   rain  "
        );
    }
}
