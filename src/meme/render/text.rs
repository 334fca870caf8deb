use std::{path::Path, sync::Arc};

use image::{Rgba, RgbaImage};

use crate::meme::error::{MemeError, MemeResult};

use super::layout::{DisplayFontMetrics, PlacedLine, TextMeasure, FONT_SIZE};

const ENABLE_LOGS: bool = true;

use crate::log_info;

const CAPTION_FONT_FAMILY: &str = "Impact, 'Arial Black', 'DejaVu Sans', sans-serif";
const OUTLINE_WIDTH: f32 = 4.0;
const OUTLINE_PASSES: usize = 3;
/// Offset from a line's vertical center to its baseline, as a share of font size.
const BASELINE_SHIFT: f32 = 0.35;

const BADGE_WIDTH: u32 = 45;
const BADGE_HEIGHT: u32 = 25;
const BADGE_FONT_SIZE: f32 = 12.0;

/// Draws caption text and the AI badge by building a small SVG overlay and
/// rasterizing it with resvg. The font database is loaded once and shared.
///
/// It also measures captions for wrapping, using the same shaping and
/// outline as the drawn text.
pub struct TextRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl TextRasterizer {
    pub fn new(font_dir: Option<&Path>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = font_dir {
            db.load_fonts_dir(dir);
        }
        log_info!("caption font database ready ({} faces)", db.len());
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Outlined white caption lines. Without any usable font the lines are
    /// skipped and the canvas is left as is.
    pub fn draw_lines(&self, canvas: &mut RgbaImage, lines: &[PlacedLine]) -> MemeResult<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let body: String = lines
            .iter()
            .map(|line| caption_svg(&line.text, line.x, line.y, FONT_SIZE))
            .collect();

        self.overlay_svg(canvas, &body)
    }

    /// Width of the inked caption, outline included. `None` when no face
    /// resolves for the caption family.
    fn shaped_width(&self, text: &str, font_size: f32) -> Option<f32> {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1">{}</svg>"#,
            caption_svg(text, 0.0, 0.0, font_size)
        );
        let tree = self.parse(&svg).ok()?;
        let root = tree.root();
        if !root.has_children() {
            return None;
        }
        let width = root.abs_stroke_bounding_box().width();
        (width > 0.0).then_some(width)
    }

    /// Small fixed-position "AI" stamp in the bottom-right corner.
    pub fn draw_badge(&self, canvas: &mut RgbaImage) -> MemeResult<()> {
        let (w, h) = canvas.dimensions();
        let x = w.saturating_sub(50);
        let y = h.saturating_sub(30);
        let text_x = w as f32 - 27.0;
        let text_y = h as f32 - 17.0 + BADGE_FONT_SIZE * BASELINE_SHIFT;

        let body = format!(
            r#"<rect x="{x}" y="{y}" width="{BADGE_WIDTH}" height="{BADGE_HEIGHT}" fill="rgb(0,100,200)" fill-opacity="0.9"/><text x="{text_x}" y="{text_y}" font-family="Arial, 'DejaVu Sans', sans-serif" font-weight="bold" font-size="{BADGE_FONT_SIZE}" text-anchor="middle" fill="white">AI</text>"#
        );
        self.overlay_svg(canvas, &body)
    }

    fn overlay_svg(&self, canvas: &mut RgbaImage, body: &str) -> MemeResult<()> {
        let (w, h) = canvas.dimensions();
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#
        );

        let tree = self
            .parse(&svg)
            .map_err(|err| MemeError::Render(format!("overlay svg: {err}")))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
            .ok_or_else(|| MemeError::Render(format!("failed to allocate {w}x{h} overlay")))?;
        resvg::render(&tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        for (dst, src) in canvas.pixels_mut().zip(pixmap.pixels()) {
            let color = src.demultiply();
            if color.alpha() == 0 {
                continue;
            }
            blend(
                dst,
                [color.red(), color.green(), color.blue()],
                f32::from(color.alpha()) / 255.0,
            );
        }
        Ok(())
    }

    fn parse(&self, svg: &str) -> Result<usvg::Tree, usvg::Error> {
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        usvg::Tree::from_data(svg.as_bytes(), &opts)
    }
}

impl TextMeasure for TextRasterizer {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.shaped_width(text, font_size)
            .unwrap_or_else(|| DisplayFontMetrics.text_width(text, font_size))
    }
}

/// Outline passes plus the white fill for one line centered at `(x, y)`.
fn caption_svg(text: &str, x: f32, y: f32, font_size: f32) -> String {
    let text = escape_xml(text);
    let baseline = y + font_size * BASELINE_SHIFT;
    let attrs = format!(
        r#"x="{x}" y="{baseline}" font-family="{CAPTION_FONT_FAMILY}" font-weight="bold" font-size="{font_size}" text-anchor="middle""#
    );
    let outline = format!(
        r#"<text {attrs} fill="none" stroke="black" stroke-width="{OUTLINE_WIDTH}" stroke-linejoin="round">{text}</text>"#
    );
    let mut svg = outline.repeat(OUTLINE_PASSES);
    svg.push_str(&format!(r#"<text {attrs} fill="white">{text}</text>"#));
    svg
}

/// Source-over blend of a straight-alpha color onto `dst`.
pub fn blend(dst: &mut Rgba<u8>, rgb: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - alpha;
    let dst_alpha = f32::from(dst[3]) / 255.0;
    for channel in 0..3 {
        let mixed = f32::from(rgb[channel]) * alpha + f32::from(dst[channel]) * inv;
        dst[channel] = mixed.round() as u8;
    }
    dst[3] = ((alpha + dst_alpha * inv) * 255.0).round() as u8;
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meme::render::layout::{layout_caption, CANVAS_SIZE, SIDE_MARGIN};

    const BACKGROUND: Rgba<u8> = Rgba([33, 150, 243, 255]);

    /// Leftmost and rightmost columns holding any drawn pixel.
    fn ink_columns(canvas: &RgbaImage) -> Option<(u32, u32)> {
        let columns: Vec<u32> = (0..canvas.width())
            .filter(|&x| (0..canvas.height()).any(|y| *canvas.get_pixel(x, y) != BACKGROUND))
            .collect();
        Some((*columns.first()?, *columns.last()?))
    }

    #[test]
    fn xml_special_characters_are_escaped() {
        assert_eq!(
            escape_xml(r#"TOM & "JERRY" <3 'EM"#),
            "TOM &amp; &quot;JERRY&quot; &lt;3 &apos;EM"
        );
    }

    #[test]
    fn blend_mixes_towards_source() {
        let mut px = Rgba([0, 0, 0, 255]);
        blend(&mut px, [255, 255, 255], 0.5);
        assert_eq!(px, Rgba([128, 128, 128, 255]));

        let mut untouched = Rgba([10, 20, 30, 255]);
        blend(&mut untouched, [255, 0, 0], 0.0);
        assert_eq!(untouched, Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn badge_paints_the_corner_only() {
        let rasterizer = TextRasterizer::new(None);
        let mut canvas = RgbaImage::from_pixel(500, 500, Rgba([255, 255, 255, 255]));
        rasterizer.draw_badge(&mut canvas).unwrap();

        // Inside the badge rectangle, away from the label.
        let inside = canvas.get_pixel(455, 475);
        assert!(inside[2] > inside[0], "badge should be blue, got {inside:?}");
        assert_eq!(*canvas.get_pixel(10, 10), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn drawing_lines_never_fails_on_plain_text() {
        let rasterizer = TextRasterizer::new(None);
        let mut canvas = RgbaImage::from_pixel(500, 500, Rgba([33, 150, 243, 255]));
        let lines = vec![PlacedLine {
            text: "CRUSHED IT & MORE".into(),
            x: 250.0,
            y: 250.0,
        }];
        rasterizer.draw_lines(&mut canvas, &lines).unwrap();
    }

    #[test]
    fn wrapped_captions_stay_inside_the_side_margins() {
        let rasterizer = TextRasterizer::new(None);
        let low = SIDE_MARGIN as u32;
        let high = CANVAS_SIZE - SIDE_MARGIN as u32;

        for caption in ["WOW MOM WOW MOM WOW MOM WOW", "HOMEWORK WARM-UP MOMENTUM DONE"] {
            let lines = layout_caption(caption, None, CANVAS_SIZE, CANVAS_SIZE, &rasterizer);
            assert!(lines.len() > 1, "{caption} should wrap");

            let mut canvas = RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, BACKGROUND);
            rasterizer.draw_lines(&mut canvas, &lines).unwrap();

            // Hosts without fonts draw nothing.
            if let Some((left, right)) = ink_columns(&canvas) {
                assert!(
                    left >= low && right <= high,
                    "{caption} inked columns {left}..={right}"
                );
            }
        }
    }

    #[test]
    fn measured_width_grows_with_text() {
        let rasterizer = TextRasterizer::new(None);
        let short = rasterizer.text_width("WOW", FONT_SIZE);
        let long = rasterizer.text_width("WOW MOM WOW", FONT_SIZE);
        assert!(short > 0.0);
        assert!(long > short);
    }
}
