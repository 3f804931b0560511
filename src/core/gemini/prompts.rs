//! Prompt construction for script and image synthesis.
//!
//! The script prompt plots a four-beat healing arc; the image prompt renders
//! one panel description in the selected art style. Captions are requested in
//! Traditional Chinese to match the product's audience.

use crate::core::comic::{ArtStyle, AudienceMode, Gender, GenerationRequest};

/// Style line injected into both the script instruction and image prompts so
/// the writer describes scenes the renderer can actually draw.
pub fn style_descriptor(style: ArtStyle) -> &'static str {
    match style {
        ArtStyle::Japanese => {
            "soft Japanese manga, hand-drawn watercolor, warm pastel colors, gentle outlines"
        }
        ArtStyle::Korean => {
            "clean Korean webtoon, flat bright colors, crisp line art, generous white space"
        }
        ArtStyle::European => {
            "European bande dessinée, ligne claire, muted earthy palette, detailed backgrounds"
        }
        ArtStyle::Cyberpunk => {
            "cyberpunk illustration, neon glow on dark tones, rain-slick city light, cinematic framing"
        }
        ArtStyle::Pixel => {
            "retro pixel art, 32-bit palette, chunky dithering, cozy video-game warmth"
        }
        ArtStyle::Animated => {
            "cel-shaded animated cartoon, rounded shapes, saturated friendly colors, bold outlines"
        }
    }
}

pub fn script_system_instruction(style: ArtStyle, mode: AudienceMode) -> String {
    let mut out = String::from(
        "You are a compassionate, empathetic comic strip creator specializing in emotional support. \
         Take the user's feeling or situation, plus any photos they provide, and turn it into a \
         heartwarming four-panel comic strip. The tone is warm, healing, gentle and encouraging. \
         Avoid complex detail; focus on emotions and simple character actions.\n\
         Panel 1: introduce the feeling or situation.\n\
         Panel 2: acknowledge and validate the feeling.\n\
         Panel 3: a turning point, a small act of self-care, or a shift in perspective.\n\
         Panel 4: a heartwarming conclusion or comforting message.\n",
    );
    out.push_str(&format!(
        "Every panel description must mention the visual style: {}. \
         Describe the main character's appearance (hair, clothes) in EVERY panel description so \
         the character stays consistent.\n",
        style_descriptor(style)
    ));
    if mode == AudienceMode::Kids {
        out.push_str(
            "The reader is a young child: use simple vocabulary, round friendly characters, \
             nothing scary or sad beyond what a small act of kindness can fix.\n",
        );
    }
    out.push_str(
        "Captions are the panel's dialogue or narration, short and sweet, in Traditional Chinese. \
         Output ONLY JSON.",
    );
    out
}

pub fn script_user_prompt(request: &GenerationRequest) -> String {
    let mut out = String::new();
    if request.reference_images.is_empty() {
        out.push_str(&format!(
            "User's feeling: \"{}\". Create a four-panel healing comic script. \
             Invent a simple, relatable main character (e.g. a cute bear, a bunny, or a person).",
            request.narrative
        ));
    } else {
        out.push_str(&format!(
            "The user has provided photos as context for the story. Analyze them to understand \
             the setting and the character's look, then combine that with their text input: \
             \"{}\". Create a four-panel healing comic script. IMPORTANT: describe the main \
             character's appearance based on the photos in every panel description so the image \
             generator knows what to draw.",
            request.narrative
        ));
    }
    match request.gender {
        Some(Gender::Boy) => out.push_str(" The main character is a boy."),
        Some(Gender::Girl) => out.push_str(" The main character is a girl."),
        Some(Gender::Neutral) | None => {}
    }
    out
}

pub fn image_prompt(request: &GenerationRequest, description: &str) -> String {
    let mut out = String::new();
    out.push_str("Create one panel of a comic strip.\n");
    out.push_str(&format!("Scene action: {description}\n"));
    out.push_str(&format!("Art style: {}.\n", style_descriptor(request.style)));
    if request.mode == AudienceMode::Kids {
        out.push_str("Keep it child-friendly: soft shapes, nothing frightening.\n");
    }
    if request.reference_images.is_empty() {
        out.push_str(
            "Minimalist background, healing atmosphere, high quality, artistic.",
        );
    } else {
        out.push_str(
            "Reference: use the provided images as visual references for the character(s) and \
             setting. Maintain the general likeness of the people in the photos but render them \
             in the specified comic style.",
        );
    }
    out
}
