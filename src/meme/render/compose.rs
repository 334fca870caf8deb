//! Local composition: template image (or a synthesized background) plus
//! caption text on a square canvas.

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use image::{imageops, Rgba, RgbaImage};
use rand::{rngs::StdRng, Rng};
use reqwest::Client;

use crate::meme::{
    error::{MemeError, MemeResult},
    templates::{TemplateCatalog, TemplateDescriptor, TextAreas},
    types::{CaptionRecord, ImageContent, RenderMethod, RenderResult, Tone},
};

use super::{
    layout::{layout_caption, TextMeasure, CANVAS_SIZE},
    text::{blend, TextRasterizer},
    RenderStrategy,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

const DECORATION_COUNT: usize = 30;
const DECORATION_ALPHA: f32 = 0.1;
const DECORATION_MIN_RADIUS: f32 = 5.0;
const DECORATION_MAX_RADIUS: f32 = 25.0;

const PRAISE_GRADIENT: ([u8; 3], [u8; 3]) = ([0x4C, 0xAF, 0x50], [0x8B, 0xC3, 0x4A]);
const ROAST_GRADIENT: ([u8; 3], [u8; 3]) = ([0xF4, 0x43, 0x36], [0xE9, 0x1E, 0x63]);
pub const DEFAULT_GRADIENT: ([u8; 3], [u8; 3]) = ([0x21, 0x96, 0xF3], [0x00, 0xBC, 0xD4]);

pub fn gradient_for(tone: Option<Tone>) -> ([u8; 3], [u8; 3]) {
    match tone {
        Some(Tone::Praise) => PRAISE_GRADIENT,
        Some(Tone::Roast) => ROAST_GRADIENT,
        None => DEFAULT_GRADIENT,
    }
}

pub struct LocalComposer {
    catalog: Arc<TemplateCatalog>,
    template_dir: Option<PathBuf>,
    client: Client,
    text: Arc<TextRasterizer>,
    measure: Arc<dyn TextMeasure>,
}

impl LocalComposer {
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        template_dir: Option<PathBuf>,
        timeout: Duration,
        text: Arc<TextRasterizer>,
        measure: Arc<dyn TextMeasure>,
    ) -> MemeResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            catalog,
            template_dir,
            client,
            text,
            measure,
        })
    }

    async fn load_template_image(&self, template: &TemplateDescriptor) -> MemeResult<RgbaImage> {
        let bytes = if template.is_remote_image() {
            let response = self
                .client
                .get(&template.image_source)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|err| MemeError::Resource(format!("{}: {err}", template.image_source)))?;
            response
                .bytes()
                .await
                .map_err(|err| MemeError::Resource(format!("{}: {err}", template.image_source)))?
                .to_vec()
        } else {
            let dir = self.template_dir.as_ref().ok_or_else(|| {
                MemeError::Resource(format!("no template directory for {}", template.id))
            })?;
            let path = dir.join(&template.image_source);
            tokio::fs::read(&path)
                .await
                .map_err(|err| MemeError::Resource(format!("{}: {err}", path.display())))?
        };

        image::load_from_memory(&bytes)
            .map(|img| img.to_rgba8())
            .map_err(|err| MemeError::Resource(format!("{}: {err}", template.image_source)))
    }

    /// Template image when it loads, otherwise a synthesized background.
    /// Returns the text areas that apply to whichever background was drawn.
    async fn background(
        &self,
        record: &CaptionRecord,
        rng: &mut StdRng,
    ) -> (RgbaImage, Option<TextAreas>) {
        if let Some(template) = self.catalog.lookup(&record.template_id) {
            match self.load_template_image(template).await {
                Ok(image) => {
                    return (
                        fit_onto_canvas(&image, CANVAS_SIZE, CANVAS_SIZE),
                        Some(template.text_areas.clone()),
                    );
                }
                Err(err) => log_warn!("template {} unusable, synthesizing: {err}", template.id),
            }
        } else {
            log_debug!("template {} not in catalog, synthesizing", record.template_id);
        }

        (
            decorated_gradient(CANVAS_SIZE, CANVAS_SIZE, Some(record.tone), rng),
            None,
        )
    }
}

#[async_trait]
impl RenderStrategy for LocalComposer {
    fn method(&self) -> RenderMethod {
        RenderMethod::LocalComposition
    }

    async fn produce(&self, record: &CaptionRecord, rng: &mut StdRng) -> MemeResult<RenderResult> {
        let (mut canvas, areas) = self.background(record, rng).await;

        let (w, h) = canvas.dimensions();
        let lines = layout_caption(&record.text, areas.as_ref(), w, h, self.measure.as_ref());
        self.text.draw_lines(&mut canvas, &lines)?;
        if record.is_generated {
            self.text.draw_badge(&mut canvas)?;
        }

        Ok(RenderResult {
            content: ImageContent::Raster(canvas),
            method: RenderMethod::LocalComposition,
            source: record.clone(),
        })
    }
}

/// Scale `image` to fit inside the canvas keeping its aspect ratio, centered
/// over black.
pub fn fit_onto_canvas(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 {
        return canvas;
    }

    let scale = (width as f32 / iw as f32).min(height as f32 / ih as f32);
    let sw = ((iw as f32 * scale).round() as u32).clamp(1, width);
    let sh = ((ih as f32 * scale).round() as u32).clamp(1, height);
    let resized = imageops::resize(image, sw, sh, imageops::FilterType::Triangle);

    let x = i64::from((width - sw) / 2);
    let y = i64::from((height - sh) / 2);
    imageops::overlay(&mut canvas, &resized, x, y);
    canvas
}

pub fn solid_canvas(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Diagonal gradient from the top-left to the bottom-right corner, with
/// translucent circles scattered over it.
pub fn decorated_gradient(width: u32, height: u32, tone: Option<Tone>, rng: &mut StdRng) -> RgbaImage {
    let (start, end) = gradient_for(tone);
    let (w, h) = (width as f32, height as f32);
    let length_sq = (w * w + h * h).max(1.0);

    let mut canvas = RgbaImage::from_fn(width, height, |x, y| {
        let t = ((x as f32 * w + y as f32 * h) / length_sq).clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
        Rgba([
            mix(start[0], end[0]),
            mix(start[1], end[1]),
            mix(start[2], end[2]),
            255,
        ])
    });

    for _ in 0..DECORATION_COUNT {
        let cx = rng.gen_range(0.0..w);
        let cy = rng.gen_range(0.0..h);
        let radius = rng.gen_range(DECORATION_MIN_RADIUS..DECORATION_MAX_RADIUS);
        fill_circle(&mut canvas, cx, cy, radius, [255, 255, 255], DECORATION_ALPHA);
    }

    canvas
}

fn fill_circle(canvas: &mut RgbaImage, cx: f32, cy: f32, radius: f32, rgb: [u8; 3], alpha: f32) {
    let (w, h) = canvas.dimensions();
    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil() as u32).min(w);
    let y1 = ((cy + radius).ceil() as u32).min(h);
    let r_sq = radius * radius;

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r_sq {
                blend(canvas.get_pixel_mut(x, y), rgb, alpha);
            }
        }
    }
}
