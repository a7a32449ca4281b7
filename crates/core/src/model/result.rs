use serde::{Deserialize, Serialize};

/// Score payload carried by quiz events and forwarded to external sinks.
///
/// Incremental updates carry `finished: false` and no total; the terminal
/// result carries `finished: true` and the question count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: u32,
    pub percentage: u32,
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// Authoritative result recovered from the remote manifest.
///
/// When present it replaces the locally derived summary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalResult {
    pub score: u32,
    pub percentage: u32,
    pub total: u32,
}
