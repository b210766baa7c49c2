use crate::error::{GenError, Result};

pub const QUALITY_KEYWORDS: &[&str] = &[
    "high quality",
    "highly detailed",
    "detailed",
    "masterpiece",
    "4k",
    "8k",
    "professional",
    "sharp focus",
];

pub const QUALITY_SUFFIX: &str = "high quality, detailed, sharp focus, professional";

/// Appends quality descriptors unless the prompt already asks for quality.
pub fn enhance(prompt: &str) -> String {
    let trimmed = prompt.trim();
    let lowered = trimmed.to_lowercase();
    if QUALITY_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
    {
        return trimmed.to_string();
    }
    let base = trimmed.trim_end_matches(',').trim_end();
    format!("{}, {}", base, QUALITY_SUFFIX)
}

/// Rejects prompts that are empty or shorter than `min_chars` once trimmed.
pub fn validate(prompt: &str, min_chars: usize) -> Result<&str> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(GenError::ValidationError("No prompt provided".into()));
    }
    if trimmed.chars().count() < min_chars {
        return Err(GenError::ValidationError(format!(
            "Prompt must be at least {} characters long",
            min_chars
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_appends_suffix() {
        assert_eq!(
            enhance("a red fox in snow"),
            "a red fox in snow, high quality, detailed, sharp focus, professional"
        );
    }

    #[test]
    fn test_enhance_keeps_prompts_with_keywords() {
        assert_eq!(enhance("A MASTERPIECE of a castle"), "A MASTERPIECE of a castle");
        assert_eq!(enhance("city skyline, 8K"), "city skyline, 8K");
    }

    #[test]
    fn test_enhance_is_idempotent() {
        let once = enhance("a lighthouse at dusk,");
        assert_eq!(enhance(&once), once);
        assert_eq!(once, "a lighthouse at dusk, high quality, detailed, sharp focus, professional");
    }

    #[test]
    fn test_validate_prompt() {
        assert!(matches!(validate("   ", 3), Err(GenError::ValidationError(_))));
        assert!(matches!(validate(" ab ", 3), Err(GenError::ValidationError(_))));
        assert_eq!(validate("  cat ", 3).unwrap(), "cat");
    }
}
