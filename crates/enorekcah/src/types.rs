use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry harvested from a team's hacktivity listing.
///
/// `url` is always absolute and is the join key against [`ReportBody`].
/// `metadata` holds the best-effort fields (`bounty`, `severity`,
/// `date`); a key that could not be extracted is absent, never an
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub team: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// The narrative body of one disclosed report, as markdown with code
/// blocks and decorative markup stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBody {
    pub url: String,
    pub body: String,
}

/// A summary joined with its body text. `body` is the empty string
/// when no matching [`ReportBody`] was collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedReport {
    pub team: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub body: String,
}

impl MergedReport {
    pub fn from_summary(summary: ReportSummary, body: String) -> Self {
        MergedReport {
            team: summary.team,
            title: summary.title,
            url: summary.url,
            metadata: summary.metadata,
            body,
        }
    }
}
