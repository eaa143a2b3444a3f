//! Showcase trigger presets: one button per category with its own lifetime.

use crate::notification::{Category, ScheduleRequest};

/// A canned toast that can be fired repeatedly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub label: &'static str,
    pub category: &'static str,
    pub lifetime_ms: u64,
    pub message: &'static str,
}

pub const SHOWCASE_PRESETS: [Preset; 3] = [
    Preset {
        label: "Success (2s)",
        category: "success",
        lifetime_ms: 2000,
        message: "Operation succeeded",
    },
    Preset {
        label: "Info (3s)",
        category: "info",
        lifetime_ms: 3000,
        message: "Heads up, this is some information",
    },
    Preset {
        label: "Error (5s)",
        category: "error",
        lifetime_ms: 5000,
        message: "Something went wrong",
    },
];

impl Preset {
    pub fn category(&self) -> Category {
        Category::new(self.category)
    }

    /// Request that fires this preset
    pub fn request(&self) -> ScheduleRequest {
        ScheduleRequest::new(self.message)
            .category(self.category())
            .lifetime_ms(self.lifetime_ms as i64)
    }
}

/// Look a preset up by 1-based index, full label, or category name.
pub fn find(key: &str) -> Option<&'static Preset> {
    let key = key.trim();
    if let Ok(index) = key.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| SHOWCASE_PRESETS.get(i));
    }

    SHOWCASE_PRESETS.iter().find(|preset| {
        preset.label.eq_ignore_ascii_case(key) || preset.category.eq_ignore_ascii_case(key)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_index() {
        assert_eq!(find("1").unwrap().category, "success");
        assert_eq!(find("3").unwrap().lifetime_ms, 5000);
        assert!(find("0").is_none());
        assert!(find("4").is_none());
    }

    #[test]
    fn test_find_by_label_or_category() {
        assert_eq!(find("info (3s)").unwrap().lifetime_ms, 3000);
        assert_eq!(find("Error").unwrap().message, "Something went wrong");
        assert!(find("warning").is_none());
    }

    #[test]
    fn test_preset_request() {
        let request = SHOWCASE_PRESETS[0].request();
        assert_eq!(request.message, "Operation succeeded");
        assert_eq!(request.category, Some(Category::success()));
        assert_eq!(request.lifetime_ms, Some(2000));
    }
}
