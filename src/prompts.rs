// Gesture labels follow the MediaPipe gesture recognizer vocabulary.
const GESTURE_PROMPTS: &[(&str, &str)] = &[
    (
        "Thumb_Up",
        "a peaceful forest landscape at sunrise, digital art",
    ),
    (
        "Victory",
        "a futuristic cyberpunk city skyline at night, neon lights",
    ),
    (
        "Open_Palm",
        "a surreal cosmic landscape with colorful nebulae and planets",
    ),
    (
        "Closed_Fist",
        "a mighty dragon breathing fire on a mountain peak, fantasy art",
    ),
    (
        "Pointing_Up",
        "a majestic castle floating in the clouds, dreamlike atmosphere",
    ),
];

pub fn prompt_for(gesture: &str) -> Option<&'static str> {
    GESTURE_PROMPTS
        .iter()
        .find(|(label, _)| *label == gesture)
        .map(|(_, prompt)| *prompt)
}

pub fn known_gestures() -> impl Iterator<Item = &'static str> {
    GESTURE_PROMPTS.iter().map(|(label, _)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_gesture_has_a_prompt() {
        assert_eq!(known_gestures().count(), 5);
        for label in known_gestures() {
            assert!(prompt_for(label).is_some_and(|p| !p.is_empty()));
        }
    }

    #[test]
    fn thumb_up_maps_to_forest() {
        assert_eq!(
            prompt_for("Thumb_Up"),
            Some("a peaceful forest landscape at sunrise, digital art")
        );
    }

    #[test]
    fn lookup_is_exact() {
        assert_eq!(prompt_for("thumb_up"), None);
        assert_eq!(prompt_for("None"), None);
        assert_eq!(prompt_for(""), None);
    }
}
