//! # Version Chain Integrity
//!
//! For a fixed document the version numbers must be exactly `1..=n`, with no
//! gaps or duplicates, and the newest version's checksum must equal the
//! document's checksum.

use crate::models::{DocumentId, DocumentVersion};
use crate::{Result, SyncError};

/// Summary of a verified chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    pub length: u32,
    pub head_checksum: String,
}

/// Check `versions` (any order) against the gapless-chain invariant.
///
/// # Errors
///
/// Returns `CorruptVersionChain` naming the first violation found.
pub fn verify_chain(
    document_id: &DocumentId,
    versions: &[DocumentVersion],
    expected_checksum: &str,
) -> Result<ChainReport> {
    let corrupt = |reason: String| SyncError::CorruptVersionChain {
        document_id: document_id.to_string(),
        reason,
    };

    let mut ordered: Vec<&DocumentVersion> = versions.iter().collect();
    ordered.sort_by_key(|v| v.version_number);

    let Some(head) = ordered.last() else {
        return Err(corrupt("document has no versions".to_string()));
    };

    for (index, version) in ordered.iter().enumerate() {
        if version.document_id != *document_id {
            return Err(corrupt(format!(
                "version {} belongs to document {}",
                version.version_number, version.document_id
            )));
        }

        let expected = index as u32 + 1;
        if version.version_number != expected {
            return Err(corrupt(format!(
                "expected version {}, found {}",
                expected, version.version_number
            )));
        }
    }

    if head.checksum != expected_checksum {
        return Err(corrupt(format!(
            "head version {} has checksum {}, document has {}",
            head.version_number, head.checksum, expected_checksum
        )));
    }

    Ok(ChainReport {
        length: head.version_number,
        head_checksum: head.checksum.clone(),
    })
}
