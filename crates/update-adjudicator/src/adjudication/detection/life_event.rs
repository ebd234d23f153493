use super::super::domain::{LifeEvent, LifeEventKind, UpdateType};

const MARRIAGE_KEYWORDS: [&str; 3] = ["marriage", "married", "spouse"];
const RELOCATION_KEYWORDS: [&str; 3] = ["address", "relocate", "move"];
const NAME_KEYWORD: &str = "name";

/// Keyword policy over the declared update type and the new value.
///
/// Rules are checked in precedence order and the first match wins, so a
/// payload mentioning both a spouse and an address is a marriage.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifeEventClassifier;

impl LifeEventClassifier {
    pub fn classify(&self, update_type: UpdateType, new_value: &str) -> LifeEvent {
        let text = format!("{} {}", update_type.label(), new_value).to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|word| text.contains(word));

        if contains_any(&MARRIAGE_KEYWORDS) {
            return life_event(LifeEventKind::Marriage, 0.85);
        }
        if contains_any(&RELOCATION_KEYWORDS) {
            return life_event(LifeEventKind::Relocation, 0.75);
        }
        if text.contains(NAME_KEYWORD) {
            return life_event(LifeEventKind::NameChange, 0.70);
        }
        LifeEvent::none()
    }
}

fn life_event(kind: LifeEventKind, confidence: f64) -> LifeEvent {
    LifeEvent {
        is_life_event: true,
        kind,
        confidence,
    }
}
