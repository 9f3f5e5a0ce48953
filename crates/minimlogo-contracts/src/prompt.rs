use crate::brand::{BrandDescription, LogoStyle};

const DEFAULT_DIRECTION: &str = "Professional and modern aesthetic.";
const FALLBACK_STYLE_CLAUSE: &str = "Minimalist and clean.";

/// Background and flatness requirements appended to every prompt.
///
/// Background removal strips near-white pixels with a global threshold, so
/// it only works when the model paints the mark on a flat white field.
pub const BACKGROUND_CONSTRAINTS: &[&str] = &[
    "MANDATORY: Solid, pure white background (#FFFFFF). Absolutely no textures or shadows on the background.",
    "Clean sharp lines, flat design, modern aesthetic.",
    "Iconic and memorable simplicity.",
    "High contrast.",
    "Do NOT include mockups, photorealistic backgrounds, or complex textures.",
    "The logo mark should be centered and clearly separated from the background.",
];

pub fn style_clause(style: &LogoStyle) -> &'static str {
    match style {
        LogoStyle::Geometric => {
            "Built with basic geometric shapes (circles, squares, triangles), mathematically balanced."
        }
        LogoStyle::Typographic => {
            "Focus on unique custom lettering or a stylized wordmark, elegant font-driven design."
        }
        LogoStyle::Abstract => {
            "Non-representational marks that convey the brand's essence through form and color."
        }
        LogoStyle::Monoline => {
            "Consistent line weight throughout the design, clean and modern line art."
        }
        LogoStyle::MinimalistPictorial => {
            "A highly simplified, iconic representation of a physical object related to the industry."
        }
        LogoStyle::Unrecognized(_) => FALLBACK_STYLE_CLAUSE,
    }
}

/// Instruction text sent to the image model for one brand description.
pub fn build_prompt(description: &BrandDescription) -> String {
    let mut lines = vec![
        format!(
            "Create a high-end, professional MINIMALIST vector logo for a brand named \"{}\".",
            description.brand_name.trim()
        ),
        format!("Industry: {}.", description.industry.trim()),
    ];
    if let Some(slogan) = description.slogan_text() {
        lines.push(format!("Slogan: \"{slogan}\"."));
    }
    lines.push(format!("Style: {}", style_clause(&description.style)));
    lines.push(format!("Color Palette: {}.", description.palette.label()));

    let direction = description.custom_details.trim();
    let direction = if direction.is_empty() {
        DEFAULT_DIRECTION
    } else {
        direction
    };
    lines.push(format!("Creative Direction: {direction}"));

    lines.push("Visual Requirements:".to_string());
    for constraint in BACKGROUND_CONSTRAINTS {
        lines.push(format!("- {constraint}"));
    }
    lines.join("\n")
}
