use std::collections::HashMap;

use crate::types::{MergedReport, ReportBody, ReportSummary};

/// Left-join bodies onto summaries by URL. Summaries are authoritative:
/// the output has exactly one record per summary, in summary order,
/// with `body` attached where a URL matches and `""` otherwise. Body
/// URLs with no matching summary are ignored; duplicate body URLs are
/// resolved last-write-wins rather than failing the merge.
pub fn merge(summaries: Vec<ReportSummary>, bodies: Vec<ReportBody>) -> Vec<MergedReport> {
    let mut body_index: HashMap<String, String> = HashMap::with_capacity(bodies.len());
    for record in bodies {
        body_index.insert(record.url, record.body);
    }

    summaries
        .into_iter()
        .map(|summary| {
            let body = body_index.get(&summary.url).cloned().unwrap_or_default();
            MergedReport::from_summary(summary, body)
        })
        .collect()
}

/// How many merged records carry a non-empty body.
#[derive(Debug)]
pub struct MergeStats {
    pub with_body: usize,
    pub without_body: usize,
    pub total: usize,
}

impl MergeStats {
    pub fn from_merged(records: &[MergedReport]) -> MergeStats {
        let with_body = records.iter().filter(|r| !r.body.is_empty()).count();
        MergeStats {
            with_body,
            without_body: records.len() - with_body,
            total: records.len(),
        }
    }
}

impl std::fmt::Display for MergeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Reports with content:    {}", self.with_body)?;
        writeln!(f, "  Reports without content: {}", self.without_body)?;
        writeln!(f, "  Total:                   {}", self.total)
    }
}
