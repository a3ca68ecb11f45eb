//! In-memory grant catalog and matching.
//!
//! The catalog is seeded at startup (built-in entries or a JSON file) and only
//! read afterwards. Matching is keyword/tag overlap scoring, nothing fancier.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub name: String,
    pub organization: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub max_award_usd: u64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrantMatch {
    pub grant: Grant,
    pub score: f64,
    pub matched_tags: Vec<String>,
}

pub struct GrantCatalog {
    grants: Vec<Grant>,
}

impl GrantCatalog {
    pub fn from_grants(grants: Vec<Grant>) -> Self {
        Self { grants }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read grants file: {}", e)))?;
        let grants: Vec<Grant> = serde_json::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse grants file: {}", e)))?;
        Ok(Self { grants })
    }

    pub fn all(&self) -> &[Grant] {
        &self.grants
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Rank catalog entries against a project description and tag list.
    /// Tag overlap dominates; keyword overlap in descriptions breaks ties.
    pub fn match_grants(&self, description: &str, tags: &[String], limit: usize) -> Vec<GrantMatch> {
        let query_words = keywords(description);
        let query_tags: HashSet<String> = tags.iter().map(|t| t.to_lowercase()).collect();

        let mut matches: Vec<GrantMatch> = self
            .grants
            .iter()
            .filter_map(|grant| {
                let matched_tags: Vec<String> = grant
                    .tags
                    .iter()
                    .filter(|t| query_tags.contains(&t.to_lowercase()))
                    .cloned()
                    .collect();

                let keyword_hits = keywords(&grant.description)
                    .intersection(&query_words)
                    .count();

                let score = 2.0 * matched_tags.len() as f64 + 0.5 * keyword_hits as f64;
                if score > 0.0 {
                    Some(GrantMatch {
                        grant: grant.clone(),
                        score,
                        matched_tags,
                    })
                } else {
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(limit);
        matches
    }

    // built-in catalog used when no --grants-file is given
    pub fn seed() -> Self {
        let grants = vec![
            Grant {
                id: "grant_hyperdag_eco".to_string(),
                name: "HyperDAG Ecosystem Grant".to_string(),
                organization: "HyperDAG Foundation".to_string(),
                description: "Funding for teams building infrastructure, tooling and \
                              integrations on the HyperDAG network"
                    .to_string(),
                tags: vec!["infrastructure".into(), "tooling".into(), "dag".into()],
                max_award_usd: 100_000,
                deadline: None,
            },
            Grant {
                id: "grant_zk_infra".to_string(),
                name: "ZK Infrastructure Fund".to_string(),
                organization: "Open Proof Collective".to_string(),
                description: "Supports zero-knowledge proof systems, circuits and \
                              verifiable computation research"
                    .to_string(),
                tags: vec!["zk".into(), "cryptography".into(), "research".into()],
                max_award_usd: 250_000,
                deadline: None,
            },
            Grant {
                id: "grant_devtools".to_string(),
                name: "Developer Tooling Microgrant".to_string(),
                organization: "Web3 Builders Guild".to_string(),
                description: "Small grants for SDKs, client libraries, debuggers and \
                              developer experience improvements"
                    .to_string(),
                tags: vec!["tooling".into(), "sdk".into(), "dx".into()],
                max_award_usd: 15_000,
                deadline: None,
            },
            Grant {
                id: "grant_defi_safety".to_string(),
                name: "DeFi Safety Initiative".to_string(),
                organization: "Chain Safety Alliance".to_string(),
                description: "Audits, monitoring and incident response tooling for \
                              decentralized finance protocols"
                    .to_string(),
                tags: vec!["defi".into(), "security".into()],
                max_award_usd: 75_000,
                deadline: None,
            },
            Grant {
                id: "grant_ai_agents".to_string(),
                name: "Autonomous Agents Program".to_string(),
                organization: "HyperDAG Labs".to_string(),
                description: "Research grants for AI agents coordinating over \
                              decentralized networks and reputation systems"
                    .to_string(),
                tags: vec!["ai".into(), "agents".into(), "reputation".into()],
                max_award_usd: 120_000,
                deadline: None,
            },
            Grant {
                id: "grant_community".to_string(),
                name: "Community Growth Fund".to_string(),
                organization: "HyperDAG Foundation".to_string(),
                description: "Events, education and referral programs growing the \
                              HyperDAG developer community"
                    .to_string(),
                tags: vec!["community".into(), "education".into()],
                max_award_usd: 10_000,
                deadline: None,
            },
        ];
        Self { grants }
    }
}

// lowercase words longer than three characters
fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn tag_overlap_outranks_keywords() {
        let catalog = GrantCatalog::seed();
        let matches = catalog.match_grants(
            "building developer tooling for the network",
            &["sdk".to_string()],
            10,
        );

        assert!(!matches.is_empty());
        assert_eq!(matches[0].grant.id, "grant_devtools");
        assert_eq!(matches[0].matched_tags, vec!["sdk".to_string()]);
    }

    #[test]
    fn scores_are_descending() {
        let catalog = GrantCatalog::seed();
        let matches = catalog.match_grants(
            "zero-knowledge proof research on decentralized networks",
            &["zk".to_string(), "research".to_string()],
            10,
        );

        for pair in matches.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn no_overlap_yields_no_matches() {
        let catalog = GrantCatalog::seed();
        let matches = catalog.match_grants("qqq", &[], 10);
        assert!(matches.is_empty());
    }

    #[test]
    fn limit_truncates_results() {
        let catalog = GrantCatalog::seed();
        let matches = catalog.match_grants(
            "funding for tooling research infrastructure and community grants",
            &[],
            2,
        );
        assert!(matches.len() <= 2);
    }

    #[test]
    fn from_file_parses_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "id": "g1",
                "name": "Test Grant",
                "organization": "Org",
                "description": "test",
                "tags": ["a"],
                "max_award_usd": 1000
            }}]"#
        )
        .unwrap();

        let catalog = GrantCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.all()[0].id, "g1");
    }
}
