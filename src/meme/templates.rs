//! Template catalog and the per-tone template pools.
//!
//! The catalog is a read-only lookup: a caption may name a template the
//! catalog does not know, which simply means the composer synthesizes a
//! background instead.

use serde::{Deserialize, Serialize};

use super::types::Tone;

/// Box in canvas coordinates where one caption line is centered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextAreas {
    Top,
    Bottom,
    TopAndBottom,
    CustomRegions(Vec<Region>),
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    pub id: String,
    pub display_name: String,
    /// File name under the template directory, or an `http(s)` URL.
    pub image_source: String,
    pub text_areas: TextAreas,
}

impl TemplateDescriptor {
    pub fn is_remote_image(&self) -> bool {
        self.image_source.starts_with("http://") || self.image_source.starts_with("https://")
    }
}

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<TemplateDescriptor>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<TemplateDescriptor>) -> Self {
        Self { templates }
    }

    pub fn builtin() -> Self {
        let entry = |id: &str, name: &str, file: &str, areas: TextAreas| TemplateDescriptor {
            id: id.into(),
            display_name: name.into(),
            image_source: file.into(),
            text_areas: areas,
        };

        Self::new(vec![
            entry(
                "drake",
                "Drake Pointing",
                "drake-template.jpg",
                TextAreas::CustomRegions(vec![
                    Region::new(250.0, 50.0, 200.0, 100.0),
                    Region::new(250.0, 200.0, 200.0, 100.0),
                ]),
            ),
            entry(
                "distracted_boyfriend",
                "Distracted Boyfriend",
                "distracted-boyfriend-template.jpg",
                TextAreas::Bottom,
            ),
            entry(
                "success_kid",
                "Success Kid",
                "success-kid-template.jpg",
                TextAreas::TopAndBottom,
            ),
            entry(
                "crying_cat",
                "Crying Cat",
                "crying-cat-template.jpg",
                TextAreas::Top,
            ),
            entry(
                "thumbs_up_cat",
                "Thumbs Up Cat",
                "thumbs-up-cat-template.jpg",
                TextAreas::Top,
            ),
        ])
    }

    pub fn lookup(&self, id: &str) -> Option<&TemplateDescriptor> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

const PRAISE_TEMPLATES: &[&str] = &[
    "success_kid",
    "drake_yes",
    "thumbs_up_cat",
    "leonardo_cheers",
    "oprah_you_get",
    "satisfied_seal",
    "you_can_do_it",
    "determined_baby",
    "rocky_balboa",
    "motivational_lion",
];

const ROAST_TEMPLATES: &[&str] = &[
    "crying_cat",
    "disappointed_guy",
    "facepalm",
    "distracted_boyfriend",
    "this_is_fine",
    "patrick_star",
];

/// Template ids a caption of the given tone may be paired with.
pub fn template_pool(tone: Tone) -> &'static [&'static str] {
    match tone {
        Tone::Praise => PRAISE_TEMPLATES,
        Tone::Roast => ROAST_TEMPLATES,
    }
}

/// A template the remote captioning service hosts publicly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTemplate {
    pub id: &'static str,
    pub name: &'static str,
}

const PRAISE_REMOTE: &[RemoteTemplate] = &[
    RemoteTemplate { id: "61579", name: "One Does Not Simply" },
    RemoteTemplate { id: "87743020", name: "Two Buttons" },
    RemoteTemplate { id: "129242436", name: "Change My Mind" },
    RemoteTemplate { id: "222403160", name: "Bernie I Am Once Again Asking" },
    RemoteTemplate { id: "131087935", name: "Running Away Balloon" },
    RemoteTemplate { id: "4030713", name: "Laughing Leo" },
    RemoteTemplate { id: "101470", name: "Ancient Aliens" },
];

const ROAST_REMOTE: &[RemoteTemplate] = &[
    RemoteTemplate { id: "112126428", name: "Distracted Boyfriend" },
    RemoteTemplate { id: "131940431", name: "Gru's Plan" },
    RemoteTemplate { id: "247375501", name: "Buff Doge vs. Cheems" },
    RemoteTemplate { id: "27813981", name: "Hide the Pain Harold" },
    RemoteTemplate { id: "80707627", name: "Sad Pablo Escobar" },
    RemoteTemplate { id: "102156234", name: "Mocking Spongebob" },
];

pub fn remote_pool(tone: Tone) -> &'static [RemoteTemplate] {
    match tone {
        Tone::Praise => PRAISE_REMOTE,
        Tone::Roast => ROAST_REMOTE,
    }
}
