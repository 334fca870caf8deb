//! Caption wrapping and line placement on the canvas.

use crate::meme::templates::TextAreas;

pub const CANVAS_SIZE: u32 = 500;
pub const FONT_SIZE: f32 = 36.0;
pub const LINE_HEIGHT: f32 = 45.0;
/// Horizontal room left on each side of a line.
pub const SIDE_MARGIN: f32 = 30.0;
/// Gap between a top or bottom text block and the canvas edge.
pub const EDGE_PADDING: f32 = 20.0;
/// Explicit segment break inside caption text.
pub const SEGMENT_BREAK: char = '|';

/// Width estimate for a run of text at a given font size.
pub trait TextMeasure: Send + Sync {
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Per-character advance table approximating a bold display face. Used when
/// no installed font resolves for the caption family.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayFontMetrics;

impl DisplayFontMetrics {
    fn advance(c: char) -> f32 {
        match c {
            ' ' => 0.28,
            'I' | 'i' | 'l' | 'j' | '!' | '.' | ',' | ':' | ';' | '\'' | '|' => 0.3,
            'M' | 'W' | 'm' | 'w' | '@' => 0.9,
            'A'..='Z' | '0'..='9' | '?' | '&' | '%' | '#' => 0.66,
            'a'..='z' => 0.56,
            c if c.is_ascii() => 0.5,
            // Emoji and CJK glyphs render roughly square.
            _ => 1.0,
        }
    }
}

impl TextMeasure for DisplayFontMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().map(Self::advance).sum::<f32>() * font_size
    }
}

/// Greedy word wrap. A word joins the current line only while the joined line
/// stays strictly narrower than `max_width`; a single word wider than the
/// limit gets a line of its own.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32, measure: &dyn TextMeasure) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.to_string();

    for word in words {
        let candidate = format!("{current} {word}");
        if measure.text_width(&candidate, font_size) < max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);
    lines
}

/// One caption line, centered horizontally at `x` and vertically at `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Upper-case, wrap and place a caption. `areas` is `None` when no template
/// applies, which centers the block.
pub fn layout_caption(
    text: &str,
    areas: Option<&TextAreas>,
    width: u32,
    height: u32,
    measure: &dyn TextMeasure,
) -> Vec<PlacedLine> {
    let width = width as f32;
    let height = height as f32;
    let max_width = width - 2.0 * SIDE_MARGIN;
    let center_x = width / 2.0;

    let upper = text.to_uppercase();
    let lines: Vec<String> = upper
        .split(SEGMENT_BREAK)
        .flat_map(|segment| wrap_text(segment, max_width, FONT_SIZE, measure))
        .collect();

    let place = |lines: &[String], first_center: f32| -> Vec<PlacedLine> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| PlacedLine {
                text: line.clone(),
                x: center_x,
                y: first_center + LINE_HEIGHT * i as f32,
            })
            .collect()
    };
    let top_start = EDGE_PADDING + LINE_HEIGHT / 2.0;
    let bottom_start =
        |count: usize| height - EDGE_PADDING - LINE_HEIGHT * count as f32 + LINE_HEIGHT / 2.0;

    match areas {
        Some(TextAreas::Top) => place(&lines, top_start),
        Some(TextAreas::Bottom) => place(&lines, bottom_start(lines.len())),
        Some(TextAreas::TopAndBottom) => {
            let split = lines.len().div_ceil(2);
            let (top, bottom) = lines.split_at(split);
            let mut placed = place(top, top_start);
            placed.extend(place(bottom, bottom_start(bottom.len())));
            placed
        }
        Some(TextAreas::CustomRegions(regions)) => regions
            .iter()
            .zip(lines)
            .map(|(region, text)| {
                let (x, y) = region.center();
                PlacedLine { text, x, y }
            })
            .collect(),
        Some(TextAreas::None) | None => {
            let block = LINE_HEIGHT * lines.len() as f32;
            place(&lines, (height - block) / 2.0 + LINE_HEIGHT / 2.0)
        }
    }
}
