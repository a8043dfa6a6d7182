use crate::index::{Dictionary, DiskPointer, DocLengthTable, PositionalPosting};
use anyhow::{ensure, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Append-only writer for a postings file. Each payload is an independently
/// deserializable bincode blob; the file is a flat concatenation addressed
/// purely by the returned (offset, length) pointers.
pub struct PostingsWriter {
    file: BufWriter<File>,
    offset: u64,
}

impl PostingsWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("create postings file {}", path.as_ref().display()))?;
        Ok(Self { file: BufWriter::new(file), offset: 0 })
    }

    /// Write payload at the end of the file and return its byte range.
    pub fn append(&mut self, payload: &[u8]) -> Result<DiskPointer> {
        let ptr = DiskPointer { offset: self.offset, length: payload.len() as u32 };
        self.file.write_all(payload)?;
        self.offset += payload.len() as u64;
        Ok(ptr)
    }

    pub fn append_postings(&mut self, postings: &[PositionalPosting]) -> Result<DiskPointer> {
        let bytes = bincode::serialize(postings)?;
        self.append(&bytes)
    }

    pub fn finish(mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// Random-access reader over a sealed postings file. Tracks its own cursor and
/// seeks relative to it, so repeated lookups within one query do not re-open
/// or re-scan the file.
pub struct PostingsReader {
    file: File,
    cursor: u64,
}

impl PostingsReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("open postings file {}", path.as_ref().display()))?;
        Ok(Self { file, cursor: 0 })
    }

    /// Return exactly `ptr.length` bytes starting at `ptr.offset`.
    pub fn read_at(&mut self, ptr: DiskPointer) -> Result<Vec<u8>> {
        let delta = ptr.offset as i64 - self.cursor as i64;
        self.file.seek(SeekFrom::Current(delta))?;
        let mut buf = vec![0u8; ptr.length as usize];
        self.file
            .read_exact(&mut buf)
            .with_context(|| format!("postings file truncated at offset {}", ptr.offset))?;
        self.cursor = ptr.offset + ptr.length as u64;
        Ok(buf)
    }

    pub fn read_postings(&mut self, ptr: DiskPointer) -> Result<Vec<PositionalPosting>> {
        let bytes = self.read_at(ptr)?;
        bincode::deserialize(&bytes)
            .with_context(|| format!("corrupt posting list at offset {}", ptr.offset))
    }
}

/// Persist the dictionary file: one bincode record of the two-element
/// structure (directory bundle, doc-length table).
pub fn save_dictionary<P: AsRef<Path>>(
    path: P,
    dictionary: &Dictionary,
    doc_lengths: &DocLengthTable,
) -> Result<()> {
    let mut f = File::create(path.as_ref())
        .with_context(|| format!("create dictionary file {}", path.as_ref().display()))?;
    let bytes = bincode::serialize(&(dictionary, doc_lengths))?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_dictionary<P: AsRef<Path>>(path: P) -> Result<(Dictionary, DocLengthTable)> {
    let mut f = File::open(path.as_ref())
        .with_context(|| format!("open dictionary file {}", path.as_ref().display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let (dictionary, doc_lengths): (Dictionary, DocLengthTable) = bincode::deserialize(&buf)
        .with_context(|| format!("corrupt dictionary file {}", path.as_ref().display()))?;
    ensure!(
        dictionary.collection_size as usize == doc_lengths.len(),
        "dictionary file inconsistent: {} documents vs {} length entries",
        dictionary.collection_size,
        doc_lengths.len()
    );
    Ok((dictionary, doc_lengths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TermEntry;
    use std::collections::HashMap;

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postings.bin");

        let first = vec![
            PositionalPosting { doc_id: 1, positions: vec![0, 4, 9] },
            PositionalPosting { doc_id: 7, positions: vec![2] },
        ];
        let second = vec![PositionalPosting { doc_id: 3, positions: vec![1, 2] }];

        let mut w = PostingsWriter::create(&path).unwrap();
        let p1 = w.append_postings(&first).unwrap();
        let p2 = w.append_postings(&second).unwrap();
        w.finish().unwrap();
        assert_eq!(p1.offset, 0);
        assert_eq!(p2.offset, p1.length as u64);

        // read out of write order to exercise the relative seek
        let mut r = PostingsReader::open(&path).unwrap();
        assert_eq!(r.read_postings(p2).unwrap(), second);
        assert_eq!(r.read_postings(p1).unwrap(), first);
        assert_eq!(r.read_postings(p2).unwrap(), second);
    }

    #[test]
    fn truncated_read_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postings.bin");
        let mut w = PostingsWriter::create(&path).unwrap();
        let ptr = w.append(b"abc").unwrap();
        w.finish().unwrap();

        let mut r = PostingsReader::open(&path).unwrap();
        let bad = DiskPointer { offset: ptr.offset, length: ptr.length + 10 };
        assert!(r.read_at(bad).is_err());
    }

    #[test]
    fn dictionary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dictionary.bin");

        let mut dict = Dictionary::default();
        dict.terms.insert(
            "negligence".to_string(),
            TermEntry { doc_frequency: 2, ptr: DiskPointer { offset: 0, length: 40 } },
        );
        dict.courts.insert(1, Some("SGCA".to_string()));
        dict.courts.insert(2, None);
        dict.landmarks.insert(1, true);
        dict.landmarks.insert(2, false);
        dict.collection_size = 2;
        let mut lengths: DocLengthTable = HashMap::new();
        lengths.insert(1, 1.78);
        lengths.insert(2, 0.0);

        save_dictionary(&path, &dict, &lengths).unwrap();
        let (loaded, loaded_lengths) = load_dictionary(&path).unwrap();
        assert_eq!(loaded.collection_size, 2);
        assert_eq!(loaded.terms.get("negligence"), dict.terms.get("negligence"));
        assert_eq!(loaded.courts.get(&1), Some(&Some("SGCA".to_string())));
        assert_eq!(loaded_lengths, lengths);
    }
}
