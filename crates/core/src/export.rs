//! Export targets for finished collages.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Social platform a collage is exported for.
///
/// Both targets share the square output; they only differ in the suggested
/// download filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    Instagram,
    Tiktok,
}

impl ExportTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
        }
    }
}

impl std::str::FromStr for ExportTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instagram" => Ok(Self::Instagram),
            "tiktok" => Ok(Self::Tiktok),
            other => Err(CoreError::Validation(format!(
                "Unknown export target '{other}', expected 'instagram' or 'tiktok'"
            ))),
        }
    }
}

/// Suggested download filename, e.g. `ootd-collage-instagram-1700000000000.png`.
pub fn export_filename(target: ExportTarget, at: Timestamp) -> String {
    format!(
        "ootd-collage-{}-{}.png",
        target.as_str(),
        at.timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn filename_embeds_target_and_millis() {
        let at = chrono::Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            export_filename(ExportTarget::Tiktok, at),
            "ootd-collage-tiktok-1700000000123.png"
        );
    }

    #[test]
    fn target_deserializes_lowercase() {
        let target: ExportTarget = serde_json::from_str("\"instagram\"").unwrap();
        assert_eq!(target, ExportTarget::Instagram);
        assert!(serde_json::from_str::<ExportTarget>("\"myspace\"").is_err());
    }

    #[test]
    fn target_parses_from_query_value() {
        assert_eq!("tiktok".parse::<ExportTarget>().unwrap(), ExportTarget::Tiktok);
        assert!(matches!(
            "Instagram".parse::<ExportTarget>(),
            Err(CoreError::Validation(_))
        ));
    }
}
