use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};

use time::format_description::well_known::Rfc3339;

use crate::codec::{write_postings, Encoding};
use crate::error::Result;
use crate::index::PositionalInvertedIndex;
use crate::persist::{
    open_vocabulary, remove_meta, save_doc_weights, save_docs, save_meta, IndexPaths, MetaFile,
    FORMAT_VERSION,
};

/// Flushes a completed in-memory index to a collection directory.
///
/// The write is ordered so that a crash never leaves the vocabulary pointing
/// at bytes that were not written: postings are synced before any offset is
/// committed, and `meta.json` appears only once everything else is durable.
pub struct DiskIndexWriter<'a> {
    index: &'a PositionalInvertedIndex,
    paths: IndexPaths,
    encoding: Encoding,
}

impl<'a> DiskIndexWriter<'a> {
    pub fn new(index: &'a PositionalInvertedIndex, paths: IndexPaths, encoding: Encoding) -> Self {
        Self { index, paths, encoding }
    }

    /// Write every term record and commit the vocabulary. Returns the build
    /// summary that was stored as `meta.json`.
    pub fn write_index(&self) -> Result<MetaFile> {
        create_dir_all(&self.paths.root)?;
        remove_meta(&self.paths)?;

        let file = File::create(self.paths.postings())?;
        let mut out = BufWriter::new(file);
        let mut offsets: Vec<(&str, u64)> = Vec::with_capacity(self.index.vocabulary_len());
        let mut offset = 0u64;
        for (term, postings) in self.index.iter() {
            offsets.push((term, offset));
            let written = write_postings(&mut out, self.encoding, postings)?;
            tracing::debug!(term, offset, doc_freq = postings.len(), "wrote postings");
            offset += written;
        }
        out.flush()?;
        out.get_ref().sync_all()?;

        let vocabulary = open_vocabulary(&self.paths)?;
        vocabulary.clear()?;
        let mut batch = sled::Batch::default();
        for (term, offset) in &offsets {
            batch.insert(term.as_bytes(), &offset.to_be_bytes()[..]);
        }
        vocabulary.apply_batch(batch)?;
        vocabulary.flush()?;
        drop(vocabulary);

        save_doc_weights(&self.paths, self.index.doc_weights())?;
        save_docs(&self.paths, self.index.doc_names())?;

        let meta = MetaFile {
            num_docs: self.index.num_docs() as u32,
            num_terms: offsets.len() as u64,
            encoding: self.encoding,
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            version: FORMAT_VERSION,
        };
        save_meta(&self.paths, &meta)?;
        tracing::info!(
            root = %self.paths.root.display(),
            num_docs = meta.num_docs,
            num_terms = meta.num_terms,
            bytes = offset,
            encoding = ?self.encoding,
            "index written"
        );
        Ok(meta)
    }
}
