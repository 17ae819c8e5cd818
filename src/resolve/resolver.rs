//! In-certificate transaction resolution and hex normalization.

use crate::types::{Certificate, TxResolution};
use tracing::debug;

/// Pull the transaction list for `digest` out of the certificate itself.
///
/// Returns `None` when the certificate has no usable entry: digest absent,
/// batch still pending, or batch marked invalid. None of these are errors;
/// the caller falls back to the external lookup.
pub fn from_certificate(cert: &Certificate, digest: &str) -> Option<Vec<String>> {
    match cert.transactions.get(digest) {
        Some(TxResolution::Resolved(txs)) => Some(txs.clone()),
        Some(TxResolution::Pending) => {
            debug!("Certificate marks batch {} as pending", digest);
            None
        }
        Some(TxResolution::Invalid(marker)) => {
            debug!("Certificate marks batch {} as invalid: {}", digest, marker);
            None
        }
        None => None,
    }
}

/// Normalize one transaction string to canonical hex encoding.
///
/// Adds the `0x` prefix when missing; an existing prefix keeps its case.
pub fn normalize_tx_hex(tx: &str) -> String {
    let tx = tx.trim();
    if tx.is_empty() {
        return String::new();
    }
    if tx.starts_with("0x") || tx.starts_with("0X") {
        return tx.to_owned();
    }
    format!("0x{tx}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn cert_with(digest: &str, entry: TxResolution) -> Certificate {
        let mut transactions = BTreeMap::new();
        transactions.insert(digest.to_owned(), entry);
        Certificate {
            transactions,
            ..Default::default()
        }
    }

    #[test]
    fn resolved_entry_is_returned() {
        let cert = cert_with("d1", TxResolution::Resolved(vec!["aa".into()]));
        assert_eq!(from_certificate(&cert, "d1"), Some(vec!["aa".into()]));
    }

    #[test]
    fn missing_digest_is_unresolved() {
        let cert = Certificate::default();
        assert_eq!(from_certificate(&cert, "d1"), None);
    }

    #[test]
    fn pending_and_invalid_are_unresolved() {
        let cert = cert_with("d1", TxResolution::Pending);
        assert_eq!(from_certificate(&cert, "d1"), None);

        let cert = cert_with("d1", TxResolution::Invalid("invalid".into()));
        assert_eq!(from_certificate(&cert, "d1"), None);
    }

    #[test]
    fn empty_resolved_list_is_still_resolved() {
        let cert = cert_with("d1", TxResolution::Resolved(vec![]));
        assert_eq!(from_certificate(&cert, "d1"), Some(vec![]));
    }

    #[test]
    fn normalize_adds_missing_prefix() {
        assert_eq!(normalize_tx_hex("aabb"), "0xaabb");
        assert_eq!(normalize_tx_hex("  aabb  "), "0xaabb");
    }

    #[test]
    fn normalize_keeps_existing_prefix_case() {
        assert_eq!(normalize_tx_hex("0xAABB"), "0xAABB");
        assert_eq!(normalize_tx_hex("0Xaabb"), "0Xaabb");
    }

    #[test]
    fn normalize_empty_stays_empty() {
        assert_eq!(normalize_tx_hex(""), "");
        assert_eq!(normalize_tx_hex("   "), "");
    }
}
