//! One named, independently runnable case per catalogue entry.

use ogc_common::{HttpClient, ScanResult};
use serde::Serialize;
use thredds_catalog::fetch_and_parse;

use crate::config::SuccessPolicy;
use crate::runner::{EntryReport, Scanner};

/// A single catalogue entry packaged as a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryCase {
    /// `test_001`, `test_002`, ... in catalogue order.
    pub name: String,
    pub index: usize,
    pub entry_uri: String,
}

impl EntryCase {
    /// Run the full probe sequence for this entry.
    pub async fn run(&self, scanner: &Scanner) -> EntryReport {
        scanner.probe_entry(self.index, self.entry_uri.clone()).await
    }

    /// Run and judge the entry under `policy`.
    pub async fn check(&self, scanner: &Scanner, policy: SuccessPolicy) -> bool {
        self.run(scanner).await.passed(policy)
    }
}

/// List the entries of `catalogue_uri` as cases.
pub async fn generate_cases(http: &HttpClient, catalogue_uri: &str) -> ScanResult<Vec<EntryCase>> {
    let doc = fetch_and_parse(http, catalogue_uri).await?;
    Ok(doc
        .entry_uris()
        .into_iter()
        .enumerate()
        .map(|(index, entry_uri)| EntryCase {
            name: case_name(index),
            index,
            entry_uri,
        })
        .collect())
}

fn case_name(index: usize) -> String {
    format!("test_{:03}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_names_are_one_based_and_padded() {
        assert_eq!(case_name(0), "test_001");
        assert_eq!(case_name(41), "test_042");
        assert_eq!(case_name(999), "test_1000");
    }
}
