//! Ranks every query against every reference.
//!
//! References are fingerprinted once with the content-hash fallback, so a
//! reference that fails to decode is still scored (badly) rather than
//! dropped. Queries are fingerprinted strictly; a query that fails to decode
//! yields a result with `error` set and no candidates. Results keep query
//! input order and candidates are sorted by descending score, ties keeping
//! reference input order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{Config, ReportMode};
use crate::error::{Error, Result};
use crate::logging::log_decode_error;
use crate::processing::fingerprint::{Fingerprint, Fingerprinter};
use crate::processing::similarity::scaled_similarity;
use crate::processing::timeout_utils::execute_with_timeout;
use crate::types::{InputAsset, MatchCandidate, MatchSummary, QueryResult};

/// A reference name paired with its fingerprint
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintedAsset {
    pub name: String,
    pub fingerprint: Fingerprint,
}

/// Matches query assets against reference assets
#[derive(Debug, Clone)]
pub struct Matcher {
    config: Config,
    fingerprinter: Fingerprinter,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Matcher {
    /// Create a matcher with its own fingerprinting thread pool
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let num_threads = if config.threads == 0 {
            num_cpus::get()
        } else {
            config.threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("fingerprint-{}", i))
            .build()
            .map_err(|e| Error::Unknown(format!("Failed to build thread pool: {}", e)))?;

        let fingerprinter = Fingerprinter::from_config(&config);
        Ok(Self {
            config,
            fingerprinter,
            pool: Some(Arc::new(pool)),
        })
    }

    /// Create a matcher that runs on rayon's global pool, without validating `config`
    pub fn unpooled(config: Config) -> Self {
        let fingerprinter = Fingerprinter::from_config(&config);
        Self {
            config,
            fingerprinter,
            pool: None,
        }
    }

    /// Replace the fingerprint engine, e.g. to inject an embedding model
    pub fn with_fingerprinter(mut self, fingerprinter: Fingerprinter) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn run<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Fingerprint references in input order, substituting content hashes on failure
    pub fn fingerprint_references(&self, references: &[InputAsset]) -> Vec<FingerprintedAsset> {
        references
            .par_iter()
            .map(|asset| FingerprintedAsset {
                name: asset.name.clone(),
                fingerprint: self.fingerprinter.fingerprint(asset),
            })
            .collect()
    }

    /// Score one query fingerprint against every reference
    pub fn rank(
        &self,
        query: &Fingerprint,
        references: &[FingerprintedAsset],
    ) -> Vec<MatchCandidate> {
        let mut candidates: Vec<MatchCandidate> = references
            .iter()
            .map(|reference| {
                let score =
                    scaled_similarity(query, &reference.fingerprint, &self.config.score_scaling);
                MatchCandidate {
                    reference_name: reference.name.clone(),
                    score,
                    is_match: score > self.config.threshold,
                }
            })
            .collect();

        // sort_by is stable, so equal scores keep reference order
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        if self.config.report_mode == ReportMode::MatchesOnly {
            candidates.retain(|c| c.is_match);
        }

        candidates
    }

    fn match_query(&self, query: &InputAsset, references: &[FingerprintedAsset]) -> QueryResult {
        match self.fingerprinter.try_fingerprint(query) {
            Ok(fingerprint) => {
                let candidates = self.rank(&fingerprint, references);
                debug!(
                    "Query '{}': {} candidates, best {:?}",
                    query.name,
                    candidates.len(),
                    candidates.first().map(|c| (&c.reference_name, c.score))
                );
                QueryResult {
                    query_name: query.name.clone(),
                    candidates,
                    error: None,
                }
            }
            Err(e) => {
                log_decode_error(&query.name, &e);
                QueryResult::failed(query.name.clone(), format!("Error processing file: {}", e))
            }
        }
    }

    /// Rank every query against every reference
    pub fn match_all(&self, references: &[InputAsset], queries: &[InputAsset]) -> Vec<QueryResult> {
        let start = Instant::now();
        info!(
            "Matching {} queries against {} references",
            queries.len(),
            references.len()
        );

        let results: Vec<QueryResult> = self.run(|| {
            let fingerprinted = self.fingerprint_references(references);
            queries
                .par_iter()
                .map(|query| self.match_query(query, &fingerprinted))
                .collect()
        });

        let summary = MatchSummary::from_results(&results, references.len());
        info!(
            "Processed {} queries against {} references in {:.2?}: {} matched, {} failed",
            summary.queries,
            summary.references,
            start.elapsed(),
            summary.matched_queries,
            summary.failed_queries
        );

        results
    }

    /// `match_all` bounded by `timeout_secs`; without a timeout it simply runs
    pub fn match_all_with_timeout(
        &self,
        references: Vec<InputAsset>,
        queries: Vec<InputAsset>,
    ) -> Result<Vec<QueryResult>> {
        match self.config.timeout_secs {
            None => Ok(self.match_all(&references, &queries)),
            Some(secs) => {
                let matcher = self.clone();
                execute_with_timeout("Match", Duration::from_secs(secs), move || {
                    matcher.match_all(&references, &queries)
                })
            }
        }
    }
}

/// Rank `queries` against `references` with default settings and the given threshold.
///
/// The threshold is clamped to [0, 1]; NaN is treated as 1.0, so nothing matches.
pub fn match_all(
    references: &[InputAsset],
    queries: &[InputAsset],
    threshold: f64,
) -> Vec<QueryResult> {
    Matcher::unpooled(Config::with_threshold(clamp_threshold(threshold)))
        .match_all(references, queries)
}

fn clamp_threshold(threshold: f64) -> f64 {
    if (0.0..=1.0).contains(&threshold) {
        return threshold;
    }

    let clamped = if threshold.is_nan() {
        1.0
    } else {
        threshold.clamp(0.0, 1.0)
    };
    warn!(
        "Match threshold {} is outside [0, 1], using {}",
        threshold, clamped
    );
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::fingerprint::content_hash;

    fn reference(name: &str, pattern: u64) -> FingerprintedAsset {
        FingerprintedAsset {
            name: name.to_string(),
            fingerprint: Fingerprint::from_bits((0..64).map(|i| pattern & (1u64 << i) != 0)),
        }
    }

    fn query() -> Fingerprint {
        Fingerprint::from_bits(vec![false; 64])
    }

    #[test]
    fn test_rank_sorts_descending_with_stable_ties() {
        let matcher = Matcher::unpooled(Config::default());
        let references = vec![
            reference("far", u64::MAX),
            reference("tie-a", 0xFF),
            reference("exact", 0),
            reference("tie-b", 0xFF00),
        ];

        let names: Vec<String> = matcher
            .rank(&query(), &references)
            .into_iter()
            .map(|c| c.reference_name)
            .collect();
        assert_eq!(names, vec!["exact", "tie-a", "tie-b", "far"]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let matcher = Matcher::unpooled(Config::with_threshold(0.875));
        // 8 of 64 bits differ: score exactly 0.875
        let candidates = matcher.rank(&query(), &[reference("edge", 0xFF)]);
        assert_eq!(candidates[0].score, 0.875);
        assert!(!candidates[0].is_match);
    }

    #[test]
    fn test_matches_only_mode() {
        let mut config = Config::default();
        config.report_mode = ReportMode::MatchesOnly;
        let matcher = Matcher::unpooled(config);

        let candidates = matcher.rank(
            &query(),
            &[reference("far", u64::MAX), reference("exact", 0)],
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].reference_name, "exact");
    }

    #[test]
    fn test_incomparable_reference_scores_zero() {
        let matcher = Matcher::unpooled(Config::default());
        let fallback = FingerprintedAsset {
            name: "broken.svg".to_string(),
            fingerprint: content_hash(b"broken"),
        };

        let candidates = matcher.rank(&query(), &[fallback]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].score, 0.0);
        assert!(!candidates[0].is_match);
    }

    #[test]
    fn test_new_validates_config() {
        let mut config = Config::default();
        config.threshold = -1.0;
        assert!(matches!(Matcher::new(config), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_empty_inputs() {
        let matcher = Matcher::new(Config::default()).unwrap();
        assert!(matcher.match_all(&[], &[]).is_empty());

        let queries = vec![InputAsset::new("q.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"4\" height=\"4\"/>")];
        let results = matcher.match_all(&[], &queries);
        assert_eq!(results.len(), 1);
        assert!(results[0].candidates.is_empty());
        assert!(results[0].error.is_none());
    }

    #[test]
    fn test_free_match_all_clamps_threshold() {
        assert_eq!(clamp_threshold(0.55), 0.55);
        assert_eq!(clamp_threshold(-0.5), 0.0);
        assert_eq!(clamp_threshold(1.5), 1.0);
        assert_eq!(clamp_threshold(f64::NAN), 1.0);

        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"4\" height=\"4\"/>";
        let references = vec![InputAsset::new("r.svg", svg)];
        let queries = vec![InputAsset::new("q.svg", svg)];

        // Identical fingerprints score 1.0, which never exceeds a clamped 1.0
        for threshold in [1.5, f64::NAN] {
            let results = match_all(&references, &queries, threshold);
            assert_eq!(results[0].candidates[0].score, 1.0);
            assert!(!results[0].candidates[0].is_match);
        }

        let results = match_all(&references, &queries, -3.0);
        assert!(results[0].candidates[0].is_match);
    }

    #[test]
    fn test_timeout_wrapper_returns_results() {
        let mut config = Config::default();
        config.timeout_secs = Some(30);
        let matcher = Matcher::new(config).unwrap();

        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"4\" height=\"4\"/>";
        let results = matcher
            .match_all_with_timeout(
                vec![InputAsset::new("r.svg", svg)],
                vec![InputAsset::new("q.svg", svg)],
            )
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidates[0].score, 1.0);
    }
}
