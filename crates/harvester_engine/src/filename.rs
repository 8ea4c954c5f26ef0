use sha2::{Digest, Sha256};

pub const FALLBACK_FOLDER: &str = "Pinterest_Board";
const MAX_FOLDER_CHARS: usize = 50;

/// Folder name for the archive: non-word characters stripped, whitespace runs
/// collapsed to `_`, at most 50 characters.
pub fn archive_folder_name(title: Option<&str>) -> String {
    let Some(title) = title else {
        return FALLBACK_FOLDER.to_string();
    };
    let kept: String = title
        .trim()
        .chars()
        .filter(|c| is_word_char(*c) || c.is_whitespace())
        .collect();

    let mut compacted = String::with_capacity(kept.len());
    let mut in_space = false;
    for c in kept.chars() {
        if c.is_whitespace() {
            if !in_space {
                compacted.push('_');
            }
            in_space = true;
        } else {
            compacted.push(c);
            in_space = false;
        }
    }

    let name: String = compacted.chars().take(MAX_FOLDER_CHARS).collect();
    if name.trim_matches('_').is_empty() {
        FALLBACK_FOLDER.to_string()
    } else {
        name
    }
}

/// `{folder}.zip`
pub fn archive_filename(folder: &str) -> String {
    format!("{folder}.zip")
}

/// `{folder}/pin_{index}_{token}.{ext}` with a token derived from the job stamp.
pub fn entry_name(folder: &str, index: usize, stamp: &str, ext: &str) -> String {
    let token = short_hash(&format!("{stamp}:{index}"));
    format!("{folder}/pin_{index}_{token}.{ext}")
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_name_strips_punctuation_and_joins_words() {
        assert_eq!(
            archive_folder_name(Some("  Summer Recipes! (2024)  ")),
            "Summer_Recipes_2024"
        );
    }

    #[test]
    fn folder_name_is_truncated() {
        let long = "a".repeat(80);
        assert_eq!(archive_folder_name(Some(&long)).len(), 50);
    }

    #[test]
    fn missing_or_empty_title_falls_back() {
        assert_eq!(archive_folder_name(None), FALLBACK_FOLDER);
        assert_eq!(archive_folder_name(Some("!!! ???")), FALLBACK_FOLDER);
    }

    #[test]
    fn entry_names_are_stable_per_stamp() {
        let first = entry_name("Board", 3, "1700000000000", "jpg");
        assert_eq!(first, entry_name("Board", 3, "1700000000000", "jpg"));
        assert!(first.starts_with("Board/pin_3_"));
        assert!(first.ends_with(".jpg"));
        assert_ne!(first, entry_name("Board", 3, "1700000000001", "jpg"));
    }
}
