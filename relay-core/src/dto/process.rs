//! Process request DTO

use serde::{Deserialize, Serialize};

/// Body of `POST /process`
///
/// Required fields default to empty so that missing values surface as
/// validation errors rather than JSON decoding errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessRequest {
    pub api_key: String,
    /// Changed-on date, `YYYY-MM-DD`
    pub date: String,
    pub dropi_country_suffix: String,
    pub webhook_suffix: String,
    /// Optional upper bound, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_util: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_workspace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_ns: Option<String>,
}
