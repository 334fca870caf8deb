use crate::progress::CompletionSnapshot;

use super::types::SubTone;

pub const MOTIVATIONAL_THRESHOLD: f64 = 0.7;

/// Map a completion rate to a sub-tone. Exactly 1.0 is perfect, exactly 0.7
/// is motivational.
pub fn select_tone(rate: f64) -> SubTone {
    if rate >= 1.0 {
        SubTone::Perfect
    } else if rate >= MOTIVATIONAL_THRESHOLD {
        SubTone::Motivational
    } else {
        SubTone::Roast
    }
}

pub fn tone_for(snapshot: &CompletionSnapshot) -> SubTone {
    select_tone(snapshot.rate())
}
