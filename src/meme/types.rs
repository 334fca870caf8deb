use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Emotional register of a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tone {
    Praise,
    Roast,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Praise => "praise",
            Tone::Roast => "roast",
        }
    }
}

/// Finer split used to pick phrasing. `Perfect` and `Motivational` are both
/// praise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubTone {
    Perfect,
    Motivational,
    Roast,
}

impl SubTone {
    pub fn tone(&self) -> Tone {
        match self {
            SubTone::Perfect | SubTone::Motivational => Tone::Praise,
            SubTone::Roast => Tone::Roast,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubTone::Perfect => "perfect",
            SubTone::Motivational => "motivational",
            SubTone::Roast => "roast",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRecord {
    /// Never empty, at most [`MAX_CAPTION_CHARS`] characters.
    pub text: String,
    pub tone: Tone,
    pub sub_tone: SubTone,
    pub template_id: String,
    pub is_generated: bool,
}

pub const MAX_CAPTION_CHARS: usize = 60;

/// Which tier produced a reward image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderMethod {
    LocalComposition,
    RemoteService,
    BasicComposition,
}

impl RenderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMethod::LocalComposition => "local composition",
            RenderMethod::RemoteService => "remote service",
            RenderMethod::BasicComposition => "basic composition",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ImageContent {
    Raster(RgbaImage),
    RemoteUrl(String),
}

#[derive(Debug, Clone)]
pub struct RenderResult {
    pub content: ImageContent,
    pub method: RenderMethod,
    pub source: CaptionRecord,
}

impl RenderResult {
    pub fn caption(&self) -> &CaptionRecord {
        &self.source
    }

    pub fn remote_url(&self) -> Option<&str> {
        match &self.content {
            ImageContent::RemoteUrl(url) => Some(url),
            ImageContent::Raster(_) => None,
        }
    }
}

/// Truncate to the caption limit, marking the cut with `...`.
pub fn truncate_caption(text: &str) -> String {
    if text.chars().count() <= MAX_CAPTION_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_CAPTION_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_short_text_untouched() {
        assert_eq!(truncate_caption("short"), "short");
        let exact = "x".repeat(MAX_CAPTION_CHARS);
        assert_eq!(truncate_caption(&exact), exact);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long = "é".repeat(80);
        let cut = truncate_caption(&long);
        assert_eq!(cut.chars().count(), MAX_CAPTION_CHARS);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn sub_tones_fold_into_tones() {
        assert_eq!(SubTone::Perfect.tone(), Tone::Praise);
        assert_eq!(SubTone::Motivational.tone(), Tone::Praise);
        assert_eq!(SubTone::Roast.tone(), Tone::Roast);
    }
}
