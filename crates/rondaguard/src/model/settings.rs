//! Report branding settings.

use serde::{Deserialize, Serialize};

/// Branding applied to exported reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    /// Company name printed in report headers.
    pub company_name: String,
    /// Header color as a CSS hex string.
    pub header_color: String,
    /// Logo image reference.
    pub logo: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            company_name: "RondaGuard Pro".to_string(),
            header_color: "#3b82f6".to_string(),
            logo: None,
        }
    }
}
