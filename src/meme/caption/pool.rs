use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom};

use crate::meme::{
    error::MemeResult,
    types::{truncate_caption, CaptionRecord, SubTone},
};

use super::{pick_template, CaptionRequest, CaptionStrategy};

/// Fixed phrase pools. This tier never fails, which is what makes it the
/// fallback for every other caption tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCaptions;

impl StaticCaptions {
    pub fn pick(&self, request: &CaptionRequest, rng: &mut StdRng) -> CaptionRecord {
        let phrases = phrases_for(request);
        let text = phrases
            .choose(rng)
            .map(|phrase| truncate_caption(phrase))
            .unwrap_or_else(|| format!("{}/{} done", request.completed, request.total));

        let tone = request.sub_tone.tone();
        CaptionRecord {
            text,
            tone,
            sub_tone: request.sub_tone,
            template_id: pick_template(tone, rng),
            is_generated: false,
        }
    }
}

#[async_trait]
impl CaptionStrategy for StaticCaptions {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn produce(
        &self,
        request: &CaptionRequest,
        rng: &mut StdRng,
    ) -> MemeResult<CaptionRecord> {
        Ok(self.pick(request, rng))
    }
}

/// Every pool holds between 4 and 10 phrases. Perfect phrases all name the goal.
pub fn phrases_for(request: &CaptionRequest) -> Vec<String> {
    let done = request.completed;
    let total = request.total;
    let left = total.saturating_sub(done);
    let title = request.goal_title.trim();

    match request.sub_tone {
        SubTone::Perfect => vec![
            format!("Crushed it! {title}"),
            format!("{title}: done. Look who's got their life together!"),
            format!("{title} complete. Task master level: LEGENDARY"),
            format!("Said {title}. Did {title}."),
            format!("Plot twist: {title} actually happened"),
            format!("{title} done | dopamine activated"),
        ],
        SubTone::Motivational => vec![
            format!("{done}/{total} done! Almost there champion!"),
            "So close you can taste the victory!".to_string(),
            format!("{done} down, {left} to go. You got this!"),
            "The finish line is calling your name!".to_string(),
            "Keep pushing! Greatness awaits!".to_string(),
            "Final stretch! Make it count!".to_string(),
        ],
        SubTone::Roast => vec![
            format!("{done}/{total}? Even my plant is more productive"),
            "Netflix: 'Are you still watching?' You: 'Obviously'".to_string(),
            format!("{title}? More like {}-n't", title.to_lowercase()),
            "Procrastination level: Master Class".to_string(),
            format!("{done} tasks done. Your future self is judging you"),
            "That to-do list isn't going to do itself... oh wait".to_string(),
            "Commitment issues detected!".to_string(),
        ],
    }
}
