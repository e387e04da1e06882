//! Key encoding for the storage layer.
//!
//! Keys are human-readable `{prefix}:{...}` strings. Numeric components
//! are zero-padded so lexicographic order matches numeric order, which
//! makes newest-first and time-range scans plain prefix iterations.

/// Width of zero-padded millisecond timestamps in keys.
const TS_WIDTH: usize = 13;

/// Width of zero-padded article ids in keys.
const ARTICLE_WIDTH: usize = 20;

/// Session row key: `sess:{session_id}`
pub fn session_key(session_id: &str) -> String {
    format!("sess:{}", session_id)
}

/// Session start-time index key: `start:{started_at_ms:013}:{session_id}`
///
/// Value is the session id; reverse iteration over the `start:` prefix
/// yields sessions newest-first.
pub fn session_start_key(started_at_ms: i64, session_id: &str) -> String {
    format!("start:{:0width$}:{}", started_at_ms, session_id, width = TS_WIDTH)
}

/// Topic row key: `topic:{session_id}:{topic_id}`
pub fn topic_key(session_id: &str, topic_id: i32) -> String {
    format!("topic:{}:{}", session_id, topic_id)
}

/// Prefix covering all topics of one session.
pub fn topic_session_prefix(session_id: &str) -> String {
    format!("topic:{}:", session_id)
}

/// Mapping primary key: `art:{article_id:020}:{session_id}`
pub fn mapping_article_key(article_id: i64, session_id: &str) -> String {
    format!("art:{:0width$}:{}", article_id, session_id, width = ARTICLE_WIDTH)
}

/// Prefix covering all mappings of one article, across sessions.
pub fn mapping_article_prefix(article_id: i64) -> String {
    format!("art:{:0width$}:", article_id, width = ARTICLE_WIDTH)
}

/// Mapping session index key: `run:{session_id}:{article_id:020}`
pub fn mapping_session_key(session_id: &str, article_id: i64) -> String {
    format!("run:{}:{:0width$}", session_id, article_id, width = ARTICLE_WIDTH)
}

/// Prefix covering all mappings computed by one session.
pub fn mapping_session_prefix(session_id: &str) -> String {
    format!("run:{}:", session_id)
}

/// Mapping time index key:
/// `time:{document_created_at_ms:013}:{article_id:020}:{session_id}`
///
/// Range scans over this index back the drift histograms.
pub fn mapping_time_key(document_created_ms: i64, article_id: i64, session_id: &str) -> String {
    format!(
        "time:{:0tw$}:{:0aw$}:{}",
        document_created_ms,
        article_id,
        session_id,
        tw = TS_WIDTH,
        aw = ARTICLE_WIDTH
    )
}

/// Bound for a mapping time-range scan: inclusive as a start key,
/// exclusive as an end key.
pub fn mapping_time_bound(ms: i64) -> String {
    format!("time:{:0width$}", ms, width = TS_WIDTH)
}

/// Lease key: `lease:{corpus_id}`
pub fn lease_key(corpus_id: &str) -> String {
    format!("lease:{}", corpus_id)
}
