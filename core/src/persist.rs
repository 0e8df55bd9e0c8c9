use crate::codec::{CodecError, Encoding};
use crate::error::{Result, SearchError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

/// Build summary, written last. Its presence marks a completed build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u64,
    pub encoding: Encoding,
    pub created_at: String,
    pub version: u32,
}

/// File layout of one collection's index directory.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    pub fn vocabulary(&self) -> PathBuf { self.root.join("vocabulary") }
    pub fn doc_weights(&self) -> PathBuf { self.root.join("doc_weights.bin") }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn open_vocabulary(paths: &IndexPaths) -> Result<sled::Db> {
    Ok(sled::open(paths.vocabulary())?)
}

/// Snapshot the whole vocabulary into memory and release the store, so any
/// number of readers can open the same collection.
pub fn load_vocabulary(paths: &IndexPaths) -> Result<HashMap<String, u64>> {
    let db = open_vocabulary(paths)?;
    let mut vocabulary = HashMap::with_capacity(db.len());
    for entry in db.iter() {
        let (key, value) = entry?;
        let term = String::from_utf8_lossy(&key).into_owned();
        let bytes = <[u8; 8]>::try_from(&value[..]).map_err(|_| SearchError::Corruption {
            term: term.clone(),
            offset: 0,
            source: CodecError::InvalidOffset(value.len()),
        })?;
        vocabulary.insert(term, u64::from_be_bytes(bytes));
    }
    Ok(vocabulary)
}

pub fn save_docs(paths: &IndexPaths, names: &[String]) -> Result<()> {
    let mut f = File::create(paths.docs())?;
    let bytes = bincode::serialize(names)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_docs(paths: &IndexPaths) -> Result<Vec<String>> {
    let mut f = File::open(paths.docs())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

/// One little-endian `f64` per document, in id order.
pub fn save_doc_weights(paths: &IndexPaths, weights: &[f64]) -> Result<()> {
    let mut w = BufWriter::new(File::create(paths.doc_weights())?);
    for &weight in weights {
        w.write_f64::<LittleEndian>(weight)?;
    }
    w.flush()?;
    Ok(())
}

pub fn load_doc_weights(paths: &IndexPaths) -> Result<Vec<f64>> {
    let f = File::open(paths.doc_weights())?;
    let count = f.metadata()?.len() / 8;
    let mut r = BufReader::new(f);
    let mut weights = Vec::with_capacity(count as usize);
    for _ in 0..count {
        weights.push(r.read_f64::<LittleEndian>()?);
    }
    Ok(weights)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    f.sync_all()?;
    Ok(())
}

/// `None` when no build has completed in this directory.
pub fn load_meta(paths: &IndexPaths) -> Result<Option<MetaFile>> {
    let mut f = match File::open(paths.meta()) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(Some(serde_json::from_str(&buf)?))
}

pub fn remove_meta(paths: &IndexPaths) -> Result<()> {
    match fs::remove_file(paths.meta()) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Immediate subdirectories of `root` that hold a completed index, keyed by
/// directory name and sorted.
pub fn discover_indexes(root: &Path) -> Result<Vec<(String, IndexPaths)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let paths = IndexPaths::new(entry.path());
        if paths.meta().is_file() {
            found.push((entry.file_name().to_string_lossy().into_owned(), paths));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_weights_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_doc_weights(&paths, &[1.0, 2f64.sqrt(), 0.0]).unwrap();
        assert_eq!(std::fs::metadata(paths.doc_weights()).unwrap().len(), 24);
        assert_eq!(load_doc_weights(&paths).unwrap(), vec![1.0, 2f64.sqrt(), 0.0]);
    }

    #[test]
    fn meta_absent_until_saved() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        assert!(load_meta(&paths).unwrap().is_none());
        remove_meta(&paths).unwrap();

        let meta = MetaFile {
            num_docs: 2,
            num_terms: 5,
            encoding: Encoding::FixedWidth,
            created_at: "2024-01-01T00:00:00Z".into(),
            version: FORMAT_VERSION,
        };
        save_meta(&paths, &meta).unwrap();
        let json = std::fs::read_to_string(paths.meta()).unwrap();
        assert!(json.contains("\"fixed_width\""));
        assert_eq!(load_meta(&paths).unwrap().unwrap().num_terms, 5);
    }

    #[test]
    fn vocabulary_snapshot_releases_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        {
            let db = open_vocabulary(&paths).unwrap();
            db.insert("cat", &7u64.to_be_bytes()[..]).unwrap();
            db.insert("dog", &300u64.to_be_bytes()[..]).unwrap();
            db.flush().unwrap();
        }
        let first = load_vocabulary(&paths).unwrap();
        let second = load_vocabulary(&paths).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.get("dog"), Some(&300));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn short_offsets_are_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        {
            let db = open_vocabulary(&paths).unwrap();
            db.insert("cat", &[1u8, 2, 3][..]).unwrap();
            db.flush().unwrap();
        }
        let err = load_vocabulary(&paths).unwrap_err();
        assert!(err.is_corruption(), "{err}");
    }
}
