// src/network/types.rs
use serde::{Deserialize, Serialize};

/// `status` as the backend sends it. Anything that is not a string (a bool,
/// a number, an object) still decodes but never counts as success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusField {
    Text(String),
    Other(serde_json::Value),
}

impl StatusField {
    /// Case-insensitive "success". No trimming.
    pub fn is_success(&self) -> bool {
        match self {
            StatusField::Text(s) => s.eq_ignore_ascii_case("success"),
            StatusField::Other(_) => false,
        }
    }

    /// Exactly the literal `"success"`.
    pub fn is_literal_success(&self) -> bool {
        matches!(self, StatusField::Text(s) if s == "success")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LivenessRequest {
    pub image: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivenessResponse {
    #[serde(default)]
    pub status: Option<StatusField>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<LivenessData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivenessData {
    #[serde(default)]
    pub liveness: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub face_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl LivenessResponse {
    /// Either signal is enough: `data.liveness == true` or a success status.
    pub fn passed(&self) -> bool {
        let live = self
            .data
            .as_ref()
            .and_then(|d| d.liveness)
            .unwrap_or(false);
        let status_ok = self.status.as_ref().map(StatusField::is_success).unwrap_or(false);
        live || status_ok
    }

    pub fn confidence(&self) -> Option<f64> {
        self.data.as_ref().and_then(|d| d.confidence)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NinMatchRequest {
    pub nin: String,
    pub selfie_image: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BvnMatchRequest {
    pub bvn: String,
    pub selfie_image: String,
}

/// Response of both the NIN and the BVN match endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdMatchResponse {
    #[serde(default)]
    pub status: Option<StatusField>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "match")]
    pub matched: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub data: Option<IdentityRecord>,
}

/// Identity record returned by the lookup backend. Only one of `nin` and
/// `bvn` is set, depending on the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(default)]
    pub nin: Option<String>,
    #[serde(default)]
    pub bvn: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalCommitRequest {
    pub email: String,
    pub mode: String,
    pub first_name: String,
    pub surname: String,
    pub dob: String,
    pub nin: String,
    pub bvn: String,
    pub user_first_name: String,
    pub user_last_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalCommitResponse {
    #[serde(default)]
    pub status: Option<StatusField>,
    #[serde(default)]
    pub message: Option<String>,
}

impl FinalCommitResponse {
    pub fn committed(&self) -> bool {
        self.status
            .as_ref()
            .map(StatusField::is_literal_success)
            .unwrap_or(false)
    }
}
