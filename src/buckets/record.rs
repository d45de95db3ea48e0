//! Bucket record framing.
//!
//! A bucket file is a flat sequence of records, each framed as the feature
//! length (`u32` LE), the feature bytes, the document id (`u32` LE) and the
//! occurrence count (`u32` LE). Readers yield records in arrival order.
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use crate::error::Error;

/// Anything longer is a corrupt frame, not a feature.
const MAX_FEATURE_LEN: u32 = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub feature: Vec<u8>,
    pub doc_id: u32,
    pub count: u32,
}

pub fn write_record<W: Write>(
    w: &mut W,
    feature: &[u8],
    doc_id: u32,
    count: u32,
) -> io::Result<()> {
    w.write_all(&(feature.len() as u32).to_le_bytes())?;
    w.write_all(feature)?;
    w.write_all(&doc_id.to_le_bytes())?;
    w.write_all(&count.to_le_bytes())
}

/// Streaming decoder over a single bucket file.
pub struct RecordReader<R: Read> {
    inner: R,
}

impl RecordReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(RecordReader {
            inner: BufReader::new(File::open(path)?),
        })
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        RecordReader { inner }
    }

    /// Fill `buf` completely. `Ok(false)` on clean EOF at a record boundary,
    /// `Format` error on a truncated frame.
    fn fill(&mut self, buf: &mut [u8]) -> Result<bool, Error> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => return Err(Error::Format("truncated bucket record".to_string())),
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }

    fn read_record(&mut self) -> Result<Option<Record>, Error> {
        let mut word = [0u8; 4];
        if !self.fill(&mut word)? {
            return Ok(None);
        }
        let len = u32::from_le_bytes(word);
        if len == 0 || len > MAX_FEATURE_LEN {
            return Err(Error::Format(format!(
                "bad feature length {} in bucket record",
                len
            )));
        }
        let mut feature = vec![0u8; len as usize];
        if !self.fill(&mut feature)? {
            return Err(Error::Format("truncated bucket record".to_string()));
        }
        if !self.fill(&mut word)? {
            return Err(Error::Format("truncated bucket record".to_string()));
        }
        let doc_id = u32::from_le_bytes(word);
        if !self.fill(&mut word)? {
            return Err(Error::Format("truncated bucket record".to_string()));
        }
        let count = u32::from_le_bytes(word);
        Ok(Some(Record {
            feature,
            doc_id,
            count,
        }))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Stream every record of every file in a bucket directory, in file-name
/// order.
pub fn for_each_record<F>(dir: &Path, mut visit: F) -> Result<(), Error>
where
    F: FnMut(Record),
{
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "bin").unwrap_or(false))
        .collect();
    paths.sort_unstable();
    for path in paths {
        for record in RecordReader::open(&path)? {
            visit(record.map_err(|e| match e {
                Error::Format(msg) => Error::Format(format!("{:?}: {}", path, msg)),
                other => other,
            })?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"abc", 7, 3).unwrap();
        write_record(&mut buf, &[0xff, 0x00], 8, 1).unwrap();

        let records: Vec<Record> = RecordReader::new(&buf[..])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            records,
            vec![
                Record {
                    feature: b"abc".to_vec(),
                    doc_id: 7,
                    count: 3
                },
                Record {
                    feature: vec![0xff, 0x00],
                    doc_id: 8,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"abc", 7, 3).unwrap();
        buf.truncate(buf.len() - 2);

        let results: Vec<_> = RecordReader::new(&buf[..]).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::Format(_))));
    }

    #[test]
    fn oversized_length_is_an_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        let results: Vec<_> = RecordReader::new(&buf[..]).collect();
        assert!(matches!(results[0], Err(Error::Format(_))));
    }
}
