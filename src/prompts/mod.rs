use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

// NOTE:
// Style hints go into the user message; the system prompt is fixed
// and shared by generate, stream, and refine.

/// Generation rules sent as the system prompt with every upstream call.
pub const SYSTEM_PROMPT: &str = "\
You are an expert web developer. Generate complete, fully functional websites using pure HTML, CSS, and JavaScript.

MANDATORY RULES:
1. Return ONLY the complete HTML code (including internal <style> and <script> tags)
2. The site must be beautiful, modern, and responsive
3. Use Google Fonts when appropriate
4. Include animations and interactivity where it makes sense
5. The code must work standalone (no external dependencies other than CDNs)
6. Start with <!DOCTYPE html> and end with </html>
7. Do NOT add explanations — return only the code

Recommended styles:
- Modern design with gradients and shadows
- Well-chosen typography
- Responsive layout using CSS Grid/Flexbox
- Smooth micro-animations
- Cohesive color palette";

pub const STYLE_TAGS: &[&str] = &["modern", "minimalist", "corporate", "creative", "dark"];

const DEFAULT_STYLE_DESC: &str = "modern design";

static STYLE_HINTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "modern",
            "modern design with vibrant colors and glassmorphism elements",
        ),
        (
            "minimalist",
            "clean and minimalist design, lots of negative space, elegant typography",
        ),
        (
            "corporate",
            "professional and trustworthy design, blue/gray tones, serious",
        ),
        (
            "creative",
            "bold and creative design, unexpected colors, unconventional layout",
        ),
        ("dark", "dark theme, neons, cyberpunk/tech aesthetic"),
    ])
});

/// Human-readable description for a style tag. Unknown tags get the
/// generic modern fallback.
pub fn style_description(style: &str) -> &'static str {
    STYLE_HINTS.get(style).copied().unwrap_or(DEFAULT_STYLE_DESC)
}

/// User message for a fresh generation request.
pub fn build_site_prompt(prompt: &str, style: &str, language: &str) -> String {
    if !STYLE_TAGS.contains(&style) {
        debug!(style, "unknown style tag, using the default hint");
    }

    format!(
        "Create a complete website with {}.\n\n\
         User request: {}\n\n\
         Content language: {}\n\n\
         Generate the full HTML now:",
        style_description(style),
        prompt,
        language
    )
}

/// User message for modifying previously generated markup. The current
/// document is embedded verbatim.
pub fn build_refine_prompt(current_html: &str, instructions: &str) -> String {
    format!(
        "Here is the current HTML of the website:\n\n\
         ```html\n{current_html}\n```\n\n\
         Modify the site following these instructions: {instructions}\n\n\
         Return the complete modified HTML:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_styles_map_to_their_hints() {
        assert_eq!(
            style_description("modern"),
            "modern design with vibrant colors and glassmorphism elements"
        );
        assert_eq!(
            style_description("minimalist"),
            "clean and minimalist design, lots of negative space, elegant typography"
        );
        assert_eq!(
            style_description("corporate"),
            "professional and trustworthy design, blue/gray tones, serious"
        );
        assert_eq!(
            style_description("creative"),
            "bold and creative design, unexpected colors, unconventional layout"
        );
        assert_eq!(
            style_description("dark"),
            "dark theme, neons, cyberpunk/tech aesthetic"
        );
    }

    #[test]
    fn unknown_style_falls_back_to_modern() {
        assert_eq!(style_description("brutalist"), "modern design");
        assert_eq!(style_description(""), "modern design");
    }

    #[test]
    fn every_listed_tag_has_a_dedicated_hint() {
        for tag in STYLE_TAGS {
            assert_ne!(style_description(tag), DEFAULT_STYLE_DESC, "tag: {tag}");
        }
    }

    #[test]
    fn site_prompt_embeds_hint_request_and_language() {
        let message = build_site_prompt("A portfolio site", "dark", "en-US");
        assert!(message.contains("dark theme, neons, cyberpunk/tech aesthetic"));
        assert!(message.contains("A portfolio site"));
        assert!(message.contains("Content language: en-US"));
        assert!(message.ends_with("Generate the full HTML now:"));
    }

    #[test]
    fn refine_prompt_embeds_html_and_instructions_verbatim() {
        let message = build_refine_prompt("<html></html>", "make background blue");
        assert!(message.contains("<html></html>"));
        assert!(message.contains("make background blue"));
        assert!(message.ends_with("Return the complete modified HTML:"));
    }
}
