use serde::{Deserialize, Serialize, Serializer};

/// A named byte buffer handed in by the caller for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputAsset {
    /// File name, used for extension sniffing and reporting
    pub name: String,

    /// Undecoded file contents
    pub raw_bytes: Vec<u8>,
}

impl InputAsset {
    pub fn new(name: impl Into<String>, raw_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            raw_bytes: raw_bytes.into(),
        }
    }
}

/// What an input buffer looks like to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    VectorGraphic,
    RasterImage,
    Unknown,
}

/// One reference scored against one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub reference_name: String,

    /// Similarity in [0, 1], serialized to three decimals
    #[serde(serialize_with = "serialize_score")]
    pub score: f64,

    pub is_match: bool,
}

/// Ranked candidates for one query, or the reason there are none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_name: String,
    pub candidates: Vec<MatchCandidate>,
    pub error: Option<String>,
}

impl QueryResult {
    /// A query that could not be fingerprinted
    pub fn failed(query_name: impl Into<String>, error: impl ToString) -> Self {
        Self {
            query_name: query_name.into(),
            candidates: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Highest-ranked candidate, if it is a match
    pub fn best_match(&self) -> Option<&MatchCandidate> {
        self.candidates.first().filter(|c| c.is_match)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Counts over a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchSummary {
    pub queries: usize,
    pub references: usize,
    pub matched_queries: usize,
    pub failed_queries: usize,
}

impl MatchSummary {
    pub fn from_results(results: &[QueryResult], references: usize) -> Self {
        Self {
            queries: results.len(),
            references,
            matched_queries: results.iter().filter(|r| r.best_match().is_some()).count(),
            failed_queries: results.iter().filter(|r| r.is_error()).count(),
        }
    }
}

/// Round to three decimals for reporting
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_score(*score))
}
