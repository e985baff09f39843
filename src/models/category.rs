//! GP professional-growth categories.

use serde::{Deserialize, Serialize};

/// One of the six fixed professional-growth standards evidence is filed under.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GpCategory {
    GP1,
    GP2,
    GP3,
    GP4,
    GP5,
    GP6,
}

impl GpCategory {
    pub const ALL: [GpCategory; 6] = [
        GpCategory::GP1,
        GpCategory::GP2,
        GpCategory::GP3,
        GpCategory::GP4,
        GpCategory::GP5,
        GpCategory::GP6,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GpCategory::GP1 => "GP1",
            GpCategory::GP2 => "GP2",
            GpCategory::GP3 => "GP3",
            GpCategory::GP4 => "GP4",
            GpCategory::GP5 => "GP5",
            GpCategory::GP6 => "GP6",
        }
    }

    /// Accepts the code in any letter case, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GP1" => Some(GpCategory::GP1),
            "GP2" => Some(GpCategory::GP2),
            "GP3" => Some(GpCategory::GP3),
            "GP4" => Some(GpCategory::GP4),
            "GP5" => Some(GpCategory::GP5),
            "GP6" => Some(GpCategory::GP6),
            _ => None,
        }
    }

    /// Badge colour shown next to evidence cards.
    pub fn badge_color(&self) -> &'static str {
        match self {
            GpCategory::GP1 => "#2563eb",
            GpCategory::GP2 => "#16a34a",
            GpCategory::GP3 => "#9333ea",
            GpCategory::GP4 => "#ea580c",
            GpCategory::GP5 => "#db2777",
            GpCategory::GP6 => "#0d9488",
        }
    }
}

impl std::fmt::Display for GpCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category entry served to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub code: GpCategory,
    pub badge_color: &'static str,
}

impl From<GpCategory> for CategoryInfo {
    fn from(code: GpCategory) -> Self {
        Self {
            code,
            badge_color: code.badge_color(),
        }
    }
}
