use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Identifier of the worker that produced a batch.
pub type WorkerId = u64;

/// One consensus certificate from the ordered stream.
///
/// Certificates arrive as self-delimited JSON objects. Field shapes are not
/// trusted: the conversion from a parsed JSON value is total, so a
/// certificate with missing or oddly shaped fields is still produced (with
/// empty maps / `None` fields) rather than aborting the stream.
#[derive(Debug, Clone, Default)]
pub struct Certificate {
    pub id: Option<String>,
    pub author: Option<String>,
    pub round: Option<u64>,
    /// Declared batch digests, keyed by digest. `BTreeMap` iteration gives
    /// the ascending digest order that makes index assignment reproducible.
    pub payload: BTreeMap<String, WorkerId>,
    /// In-certificate transaction entries, classified per digest.
    pub transactions: BTreeMap<String, TxResolution>,
}

impl Certificate {
    /// Build a certificate from a structurally complete JSON value.
    pub fn from_json(value: &Value) -> Self {
        let id = value.get("id").and_then(Value::as_str).map(str::to_owned);
        let author = value
            .get("author")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let round = value.get("round").and_then(Value::as_u64);

        let payload = value
            .get("payload")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(digest, worker)| {
                        (digest.clone(), worker.as_u64().unwrap_or_default())
                    })
                    .collect()
            })
            .unwrap_or_default();

        let transactions = value
            .get("transactions")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(digest, entry)| (digest.clone(), TxResolution::classify(entry)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id,
            author,
            round,
            payload,
            transactions,
        }
    }
}

/// What a certificate says about one digest's transactions.
///
/// Classified once at the parse boundary so the rest of the pipeline
/// dispatches on a closed set of cases instead of inspecting raw JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResolution {
    /// The certificate embeds the full transaction list.
    Resolved(Vec<String>),
    /// The certificate marks the batch as not yet available.
    Pending,
    /// The certificate marks the batch as invalid, with the original marker.
    Invalid(String),
}

impl TxResolution {
    /// Classify a raw in-certificate transaction entry.
    ///
    /// A list is `Resolved` only when every element is a string. A status
    /// string starting with "invalid" becomes `Invalid`. Any other value,
    /// including unexpected shapes, is `Pending`.
    pub fn classify(entry: &Value) -> Self {
        match entry {
            Value::Array(items) => {
                let mut txs = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(tx) => txs.push(tx.to_owned()),
                        None => return Self::Pending,
                    }
                }
                Self::Resolved(txs)
            }
            Value::String(status) if status.to_ascii_lowercase().starts_with("invalid") => {
                Self::Invalid(status.clone())
            }
            _ => Self::Pending,
        }
    }
}

/// One materialized batch in the extraction output.
///
/// Created by the pipeline when a digest's transactions are first resolved;
/// `blockhash` and `blocknumber` are filled in later by the downstream
/// execution driver and are preserved verbatim when an output file is
/// reloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub cert_id: Option<String>,
    pub round: Option<u64>,
    pub author: Option<String>,
    pub batch_digest: String,
    pub transactions: Vec<String>,
    pub blockhash: Option<String>,
    /// Block number assigned at execution; -1 until then.
    pub blocknumber: i64,
}

impl BatchRecord {
    /// Build a fresh, not-yet-executed record for a resolved digest.
    pub fn new(cert: &Certificate, batch_digest: &str, transactions: Vec<String>) -> Self {
        Self {
            cert_id: cert.id.clone(),
            round: cert.round,
            author: cert.author.clone(),
            batch_digest: batch_digest.to_owned(),
            transactions,
            blockhash: None,
            blocknumber: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn certificate_from_full_object() {
        let value = json!({
            "id": "cert-1",
            "author": "node-a",
            "round": 164,
            "payload": { "d2": 1, "d1": 0 },
            "transactions": { "d1": ["aa", "bb"], "d2": "missing" }
        });
        let cert = Certificate::from_json(&value);
        assert_eq!(cert.id.as_deref(), Some("cert-1"));
        assert_eq!(cert.round, Some(164));
        // BTreeMap orders digests ascending regardless of input order.
        let digests: Vec<_> = cert.payload.keys().cloned().collect();
        assert_eq!(digests, vec!["d1", "d2"]);
        assert_eq!(
            cert.transactions.get("d1"),
            Some(&TxResolution::Resolved(vec!["aa".into(), "bb".into()]))
        );
        assert_eq!(cert.transactions.get("d2"), Some(&TxResolution::Pending));
    }

    #[test]
    fn certificate_from_sparse_object() {
        let cert = Certificate::from_json(&json!({ "round": "not-a-number" }));
        assert!(cert.id.is_none());
        assert!(cert.round.is_none());
        assert!(cert.payload.is_empty());
        assert!(cert.transactions.is_empty());
    }

    #[test]
    fn classify_list_of_strings() {
        let entry = json!(["0xaa"]);
        assert_eq!(
            TxResolution::classify(&entry),
            TxResolution::Resolved(vec!["0xaa".into()])
        );
    }

    #[test]
    fn classify_mixed_list_is_pending() {
        let entry = json!(["0xaa", 7]);
        assert_eq!(TxResolution::classify(&entry), TxResolution::Pending);
    }

    #[test]
    fn classify_status_strings() {
        assert_eq!(
            TxResolution::classify(&json!("invalid: bad signature")),
            TxResolution::Invalid("invalid: bad signature".into())
        );
        assert_eq!(TxResolution::classify(&json!("pending")), TxResolution::Pending);
        assert_eq!(TxResolution::classify(&json!(42)), TxResolution::Pending);
    }

    #[test]
    fn record_starts_unexecuted() {
        let cert = Certificate {
            id: Some("c".into()),
            round: Some(3),
            author: Some("a".into()),
            ..Default::default()
        };
        let record = BatchRecord::new(&cert, "d1", vec!["0xaa".into()]);
        assert_eq!(record.blockhash, None);
        assert_eq!(record.blocknumber, -1);
        assert_eq!(record.batch_digest, "d1");
    }
}
