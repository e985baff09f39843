//! Teacher profile singleton.

use serde::{Deserialize, Serialize};

/// The teacher's profile page content. Always saved whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(default)]
    pub name: String,
    /// Image encoded as a data URL
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub qualifications: String,
    #[serde(default)]
    pub description: String,
}

/// Profile as served to the dashboard; `saved` is false when defaults are shown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub profile: ProfileRecord,
    pub saved: bool,
}

impl From<Option<ProfileRecord>> for ProfileView {
    fn from(stored: Option<ProfileRecord>) -> Self {
        match stored {
            Some(profile) => Self {
                profile,
                saved: true,
            },
            None => Self {
                profile: ProfileRecord::default(),
                saved: false,
            },
        }
    }
}
