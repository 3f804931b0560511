//! Comic domain types: the immutable generation request and the panels a run
//! produces.

use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtStyle {
    Japanese,
    Korean,
    European,
    Cyberpunk,
    Pixel,
    Animated,
}

impl ArtStyle {
    pub const ALL: [ArtStyle; 6] = [
        ArtStyle::Japanese,
        ArtStyle::Korean,
        ArtStyle::European,
        ArtStyle::Cyberpunk,
        ArtStyle::Pixel,
        ArtStyle::Animated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtStyle::Japanese => "japanese",
            ArtStyle::Korean => "korean",
            ArtStyle::European => "european",
            ArtStyle::Cyberpunk => "cyberpunk",
            ArtStyle::Pixel => "pixel",
            ArtStyle::Animated => "animated",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "japanese" => Some(ArtStyle::Japanese),
            "korean" => Some(ArtStyle::Korean),
            "european" => Some(ArtStyle::European),
            "cyberpunk" => Some(ArtStyle::Cyberpunk),
            "pixel" => Some(ArtStyle::Pixel),
            "animated" => Some(ArtStyle::Animated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceMode {
    General,
    Kids,
}

impl AudienceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AudienceMode::General => "general",
            AudienceMode::Kids => "kids",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "general" => Some(AudienceMode::General),
            "kids" => Some(AudienceMode::Kids),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Boy,
    Girl,
    Neutral,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Boy => "boy",
            Gender::Girl => "girl",
            Gender::Neutral => "neutral",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "boy" => Some(Gender::Boy),
            "girl" => Some(Gender::Girl),
            "neutral" => Some(Gender::Neutral),
            _ => None,
        }
    }
}

/// A user-supplied reference photo forwarded verbatim to the generation
/// service so generated characters keep the subject's likeness.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub data: Bytes,
}

/// Immutable input for one generation run. Owned by the orchestrator for the
/// duration of that run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub narrative: String,
    pub style: ArtStyle,
    pub mode: AudienceMode,
    pub gender: Option<Gender>,
    pub reference_images: Vec<ReferenceImage>,
}

impl GenerationRequest {
    pub fn new(narrative: impl Into<String>, style: ArtStyle, mode: AudienceMode) -> Self {
        Self {
            narrative: narrative.into(),
            style,
            mode,
            gender: None,
            reference_images: Vec::new(),
        }
    }
}

/// One entry of the script-synthesis result. Produced atomically as a set;
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelScript {
    /// 1-based panel position.
    pub index: usize,
    pub description: String,
    pub caption: String,
}

/// Rendered image bytes for one panel, as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelImage {
    pub mime_type: String,
    pub data: Bytes,
}

impl PanelImage {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One comic frame. Created without an image when its script lands; the image
/// is set at most once, on successful synthesis.
#[derive(Debug, Clone)]
pub struct Panel {
    pub index: usize,
    pub description: String,
    pub caption: String,
    pub image: Option<PanelImage>,
    pub attempts: u32,
}

impl Panel {
    pub fn from_script(script: PanelScript) -> Self {
        Self {
            index: script.index,
            description: script.description,
            caption: script.caption,
            image: None,
            attempts: 0,
        }
    }
}
