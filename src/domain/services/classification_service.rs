use serde::Serialize;

use crate::domain::entities::item::ItemKind;

/// Display category of an item, as shown by the drive front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Folder,
    SharedFolder,
    Document,
    Spreadsheet,
    Pdf,
    Image,
    Video,
    Audio,
    Archive,
    Other,
}

impl Category {
    /// Numeric code understood by the front end
    pub fn code(&self) -> u8 {
        match self {
            Category::Folder => 0,
            Category::SharedFolder => 1,
            Category::Document => 4,
            Category::Spreadsheet => 5,
            Category::Pdf => 7,
            Category::Image => 8,
            Category::Video => 9,
            Category::Audio => 10,
            Category::Archive => 13,
            Category::Other => 99,
        }
    }
}

/// Derives the display category from the stored kind and MIME hint.
///
/// Rules are checked in order and the first match wins. Never fails: a
/// missing or unknown MIME type is `Other`.
pub fn classify(kind: ItemKind, mime_hint: Option<&str>, is_shared_view: bool) -> Category {
    if kind == ItemKind::Folder {
        return if is_shared_view {
            Category::SharedFolder
        } else {
            Category::Folder
        };
    }

    let mime = match mime_hint {
        Some(mime) => mime.trim().to_ascii_lowercase(),
        None => return Category::Other,
    };
    let contains_any = |needles: &[&str]| needles.iter().any(|needle| mime.contains(needle));

    if mime.starts_with("image/") {
        Category::Image
    } else if mime.starts_with("video/") {
        Category::Video
    } else if mime.starts_with("audio/") {
        Category::Audio
    } else if mime.contains("pdf") {
        Category::Pdf
    } else if contains_any(&["sheet", "csv", "excel"]) {
        Category::Spreadsheet
    } else if contains_any(&["document", "word"]) {
        Category::Document
    } else if contains_any(&["zip", "compressed"]) {
        Category::Archive
    } else {
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mime: &str) -> Category {
        classify(ItemKind::File, Some(mime), false)
    }

    #[test]
    fn test_folders_ignore_mime() {
        assert_eq!(classify(ItemKind::Folder, Some("image/png"), false), Category::Folder);
        assert_eq!(classify(ItemKind::Folder, None, true), Category::SharedFolder);
    }

    #[test]
    fn test_media_prefixes() {
        assert_eq!(file("image/png"), Category::Image);
        assert_eq!(file("video/mp4"), Category::Video);
        assert_eq!(file("audio/mpeg"), Category::Audio);
        assert_eq!(file("IMAGE/JPEG"), Category::Image);
    }

    #[test]
    fn test_substring_rules_in_order() {
        assert_eq!(file("application/pdf"), Category::Pdf);
        assert_eq!(
            file("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            Category::Spreadsheet
        );
        assert_eq!(file("text/csv"), Category::Spreadsheet);
        assert_eq!(file("application/vnd.ms-excel"), Category::Spreadsheet);
        assert_eq!(
            file("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            Category::Document
        );
        assert_eq!(file("application/msword"), Category::Document);
        assert_eq!(file("application/zip"), Category::Archive);
        assert_eq!(file("application/x-7z-compressed"), Category::Archive);
    }

    #[test]
    fn test_unknown_or_missing_is_other() {
        assert_eq!(file("text/plain"), Category::Other);
        assert_eq!(classify(ItemKind::File, None, false), Category::Other);
        assert_eq!(Category::Other.code(), 99);
    }
}
