use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::AssetRole;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid file name regex (verified by tests)"));

static FOUR_DIGIT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}\b").expect("valid year regex (verified by tests)"));

/// Extension used when the asset URL carries none.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Strip characters that are not allowed in file names on common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "").into_owned()
}

/// Deterministic file name for an asset of a product.
///
/// `Aventus`, main, `jpg` gives `Aventus_main.jpg`; additional image 2 gives
/// `Aventus_additional_2.jpg`.
pub fn asset_file_name(product_name: &str, role: AssetRole, index: Option<usize>, extension: &str) -> String {
    let base = sanitize_filename(product_name);
    match role {
        AssetRole::Main => format!("{}_main.{}", base, extension),
        AssetRole::Additional => format!("{}_additional_{}.{}", base, index.unwrap_or(0), extension),
    }
}

/// File extension of the last path segment of `url`, ignoring any query string.
pub fn extension_from_url(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or("");
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Product id from the page's metadata image URL: the file name up to its first underscore.
///
/// `https://pimages.parfumo.de/720/12345_img-1234_creed_aventus.jpg` gives `12345`.
pub fn id_from_image_url(image_url: &str) -> Option<String> {
    let file_name = image_url.trim().rsplit('/').next()?;
    let id = file_name.split('_').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// First standalone four-digit number in `label`.
pub fn four_digit_year(label: &str) -> Option<String> {
    FOUR_DIGIT_YEAR.find(label).map(|m| m.as_str().to_string())
}

/// Remove the site origin from `href`, leaving a path relative to it.
pub fn strip_origin(href: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.is_empty() {
        href.to_string()
    } else {
        href.replace(base, "")
    }
}

/// Resolve a possibly relative link against the site base.
pub fn absolute_url(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(href.trim()).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_reserved_characters() {
        let name = sanitize_filename(r#"A/B:"C"*D"#);
        for c in ['\\', '/', '*', '?', ':', '"', '<', '>', '|'] {
            assert!(!name.contains(c), "{} still contains {:?}", name, c);
        }
        assert_eq!(name, "ABCD");
        assert_eq!(sanitize_filename(r"x\y?z<w>|v"), "xyzwv");
        assert_eq!(sanitize_filename("Plain Name"), "Plain Name");
    }

    #[test]
    fn test_asset_file_names() {
        assert_eq!(asset_file_name("Aventus", AssetRole::Main, None, "jpg"), "Aventus_main.jpg");
        assert_eq!(
            asset_file_name("Light Blue: Pour Homme", AssetRole::Additional, Some(3), "png"),
            "Light Blue Pour Homme_additional_3.png"
        );
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("https://cdn.example.com/a/b/pic.PNG?w=100"), "png");
        assert_eq!(extension_from_url("https://cdn.example.com/a/b/pic.webp"), "webp");
        assert_eq!(extension_from_url("https://cdn.example.com/a/b/pic"), "jpg");
        assert_eq!(extension_from_url("https://cdn.example.com/"), "jpg");
    }

    #[test]
    fn test_id_from_image_url() {
        assert_eq!(
            id_from_image_url("https://pimages.parfumo.de/720/12345_img-1234_creed_aventus.jpg"),
            Some("12345".to_string())
        );
        assert_eq!(id_from_image_url("https://x/plain.jpg"), Some("plain.jpg".to_string()));
        assert_eq!(id_from_image_url("https://x/_nothing.jpg"), None);
        assert_eq!(id_from_image_url(""), None);
    }

    #[test]
    fn test_four_digit_year() {
        assert_eq!(four_digit_year("Released 2010 by Creed"), Some("2010".to_string()));
        assert_eq!(four_digit_year("Discontinued"), None);
        assert_eq!(four_digit_year("120345"), None);
    }

    #[test]
    fn test_strip_origin_and_absolute_url() {
        assert_eq!(
            strip_origin("https://www.parfumo.com/Perfumes/Creed", "https://www.parfumo.com/"),
            "/Perfumes/Creed"
        );
        assert_eq!(strip_origin("/Notes/Iris", "https://www.parfumo.com"), "/Notes/Iris");
        assert_eq!(
            absolute_url("https://www.parfumo.com", "/Perfumes/Creed").as_deref(),
            Some("https://www.parfumo.com/Perfumes/Creed")
        );
        assert_eq!(
            absolute_url("https://www.parfumo.com", "https://other.org/x").as_deref(),
            Some("https://other.org/x")
        );
    }
}
