use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use rand::rngs::StdRng;

use crate::meme::{
    error::MemeResult,
    types::{CaptionRecord, ImageContent, RenderMethod, RenderResult},
};

use super::{
    compose::{solid_canvas, DEFAULT_GRADIENT},
    layout::{layout_caption, TextMeasure, CANVAS_SIZE},
    text::TextRasterizer,
    RenderStrategy,
};

/// Terminal tier: flat background and centered text. No catalog lookup and
/// no network, so the only way it fails is rasterization itself.
pub struct BasicComposer {
    text: Arc<TextRasterizer>,
    measure: Arc<dyn TextMeasure>,
}

impl BasicComposer {
    pub fn new(text: Arc<TextRasterizer>, measure: Arc<dyn TextMeasure>) -> Self {
        Self { text, measure }
    }

    pub fn compose(&self, record: &CaptionRecord) -> MemeResult<RgbaImage> {
        let mut canvas = solid_canvas(CANVAS_SIZE, CANVAS_SIZE, DEFAULT_GRADIENT.0);
        let lines = layout_caption(
            &record.text,
            None,
            CANVAS_SIZE,
            CANVAS_SIZE,
            self.measure.as_ref(),
        );
        self.text.draw_lines(&mut canvas, &lines)?;
        Ok(canvas)
    }
}

#[async_trait]
impl RenderStrategy for BasicComposer {
    fn method(&self) -> RenderMethod {
        RenderMethod::BasicComposition
    }

    async fn produce(&self, record: &CaptionRecord, _rng: &mut StdRng) -> MemeResult<RenderResult> {
        Ok(RenderResult {
            content: ImageContent::Raster(self.compose(record)?),
            method: RenderMethod::BasicComposition,
            source: record.clone(),
        })
    }
}
