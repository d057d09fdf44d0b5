//! Snapshot persistence for the CA's passive-node backdrop.
//!
//! The reference implementation pickles `smt_setup_file` once and reloads
//! it on every subsequent run rather than re-populating hundreds of
//! thousands of passive certificates from scratch. We get the same
//! behavior with `serde`+`bincode` rather than a language-specific pickle
//! format, since the snapshot never needs to cross a process boundary
//! into anything but another run of this binary.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::smt::Smt;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to open snapshot file: {0}")]
    Open(#[from] std::io::Error),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] bincode::Error),
}

/// Load a previously-saved partition forest from `path`.
pub fn load_snapshot(path: &Path) -> Result<Vec<Smt>, PersistenceError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let smts = bincode::deserialize_from(reader)?;
    Ok(smts)
}

/// Save a partition forest to `path`, overwriting any existing file.
pub fn store_snapshot(path: &Path, smts: &[Smt]) -> Result<(), PersistenceError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, smts)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha1Trunc8HashFn;
    use crate::hash::HashFn;

    #[test]
    fn snapshot_roundtrips_through_disk() {
        let f = Sha1Trunc8HashFn;
        let mut smt = Smt::new(8);
        for i in 0..5 {
            let h = f.hash(format!("node-{i}").as_bytes());
            smt.add_node(&f, &h, false);
        }
        let smts = vec![smt];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.bns");
        store_snapshot(&path, &smts).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].roothash, smts[0].roothash);
    }

    #[test]
    fn loading_a_missing_file_errs() {
        let missing = Path::new("/nonexistent/revoc-snapshot.bns");
        assert!(load_snapshot(missing).is_err());
    }
}
