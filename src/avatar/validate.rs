//! Field rules for avatar creation and edits.
//!
//! Each check returns `Err(message)` with a user-facing sentence; callers
//! collect them so every problem is reported at once.

use reqwest::Url;

use crate::avatar::model::Bracket;

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_BRACKET_LEN: usize = 50;
pub const MAX_ICON_URL_LEN: usize = 500;

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

pub fn name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name must be {} characters or less", MAX_NAME_LEN));
    }
    let allowed = |c: char| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_';
    if !name.chars().all(allowed) {
        return Err("Name contains invalid characters".to_string());
    }
    Ok(())
}

pub fn bracket(bracket: &str) -> Result<(), String> {
    if bracket.chars().count() > MAX_BRACKET_LEN {
        return Err(format!(
            "Bracket must be {} characters or less",
            MAX_BRACKET_LEN
        ));
    }
    Bracket::parse(bracket)
        .map(|_| ())
        .map_err(|e| e.message().to_string())
}

pub fn icon_url(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("Image URL cannot be empty".to_string());
    }
    if url.len() > MAX_ICON_URL_LEN {
        return Err(format!(
            "Image URL must be {} characters or less",
            MAX_ICON_URL_LEN
        ));
    }
    let parsed = Url::parse(url).map_err(|_| "Invalid URL format".to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err("Image URL must use http or https".to_string());
    }
    let path = parsed.path().to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Err("URL must point to an image (.jpg, .png, .gif, .webp)".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rules() {
        assert!(name("Aria Moon-light_2").is_ok());
        assert!(name("Éloïse").is_ok());
        assert!(name("  ").is_err());
        assert!(name(&"a".repeat(33)).is_err());
        assert!(name("<script>").unwrap_err().contains("invalid characters"));
    }

    #[test]
    fn test_bracket_rules() {
        assert!(bracket("[text]").is_ok());
        assert!(bracket("text").is_err());
        assert!(bracket("[]").unwrap_err().contains("'text'"));
        assert!(bracket(&format!("{}text", "x".repeat(50))).is_err());
    }

    #[test]
    fn test_icon_url_rules() {
        assert!(icon_url("https://cdn.example.com/a/b.PNG").is_ok());
        assert!(icon_url("https://cdn.discordapp.com/x/y.webp?ex=1&is=2").is_ok());
        assert_eq!(icon_url("not a url").unwrap_err(), "Invalid URL format");
        assert!(icon_url("https://example.com/page.html").is_err());
        assert!(icon_url("https://example.com/png").is_err());
        assert!(icon_url("ftp://example.com/a.png").is_err());
        assert!(icon_url("").is_err());
    }
}
