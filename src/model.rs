//! Model assembly and serialization.
//!
//! The `model` artifact is the base64 of the bzip2 compression of a framed
//! binary blob: magic bytes, a format version, then the class names, the
//! log priors, the per-class feature log-probabilities and the compiled
//! scanner tables, all little-endian. The framing is versioned; readers
//! reject unknown magics and versions outright.
use std::fs;
use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use log::info;

use crate::error::Error;
use crate::scanner::NextMove;

const MAGIC: &[u8; 4] = b"LIDM";
const VERSION: u32 = 1;

/// A trained language identification model.
pub struct Model {
    pub classes: Vec<String>,
    /// Log class priors, one per class.
    pub pc: Vec<f64>,
    /// Log feature probabilities, feature-major: `ptc[f * num_classes + c]`.
    pub ptc: Vec<f64>,
    pub num_feats: usize,
    pub nextmove: NextMove,
    /// Accepting states with their sorted feature indices.
    pub output: Vec<(u32, Vec<u32>)>,
}

impl Model {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        put_u32(&mut buf, VERSION);

        put_u32(&mut buf, self.classes.len() as u32);
        for class in &self.classes {
            put_u32(&mut buf, class.len() as u32);
            buf.extend_from_slice(class.as_bytes());
        }
        for &v in &self.pc {
            buf.extend_from_slice(&v.to_le_bytes());
        }

        put_u32(&mut buf, self.num_feats as u32);
        for &v in &self.ptc {
            buf.extend_from_slice(&v.to_le_bytes());
        }

        buf.push(self.nextmove.width());
        put_u32(&mut buf, self.nextmove.num_states() as u32);
        match &self.nextmove {
            NextMove::U16(cells) => {
                for &c in cells {
                    buf.extend_from_slice(&c.to_le_bytes());
                }
            }
            NextMove::U32(cells) => {
                for &c in cells {
                    buf.extend_from_slice(&c.to_le_bytes());
                }
            }
        }

        put_u32(&mut buf, self.output.len() as u32);
        for (state, feats) in &self.output {
            put_u32(&mut buf, *state);
            put_u32(&mut buf, feats.len() as u32);
            for &f in feats {
                put_u32(&mut buf, f);
            }
        }
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Model, Error> {
        let mut cur = Cursor { buf, pos: 0 };
        if cur.take(4)? != MAGIC {
            return Err(Error::Format("bad model magic".to_string()));
        }
        let version = cur.u32()?;
        if version != VERSION {
            return Err(Error::Format(format!(
                "unsupported model version {}",
                version
            )));
        }

        let num_classes = cur.u32()? as usize;
        let mut classes = Vec::with_capacity(num_classes);
        for _ in 0..num_classes {
            let len = cur.u32()? as usize;
            let name = String::from_utf8(cur.take(len)?.to_vec())
                .map_err(|_| Error::Format("class name is not UTF-8".to_string()))?;
            classes.push(name);
        }
        let pc: Vec<f64> = (0..num_classes)
            .map(|_| cur.f64())
            .collect::<Result<_, _>>()?;

        let num_feats = cur.u32()? as usize;
        let ptc: Vec<f64> = (0..num_feats * num_classes)
            .map(|_| cur.f64())
            .collect::<Result<_, _>>()?;

        let width = cur.take(1)?[0];
        let num_states = cur.u32()? as usize;
        let cells = num_states * 256;
        let nextmove = match width {
            2 => {
                let raw = cur.take(cells * 2)?;
                NextMove::U16(
                    raw.chunks_exact(2)
                        .map(|c| u16::from_le_bytes([c[0], c[1]]))
                        .collect(),
                )
            }
            4 => {
                let raw = cur.take(cells * 4)?;
                NextMove::U32(
                    raw.chunks_exact(4)
                        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                )
            }
            other => {
                return Err(Error::Format(format!(
                    "unsupported nextmove cell width {}",
                    other
                )))
            }
        };

        let num_entries = cur.u32()? as usize;
        let mut output = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            let state = cur.u32()?;
            let len = cur.u32()? as usize;
            let feats: Vec<u32> = (0..len).map(|_| cur.u32()).collect::<Result<_, _>>()?;
            output.push((state, feats));
        }

        Ok(Model {
            classes,
            pc,
            ptc,
            num_feats,
            nextmove,
            output,
        })
    }

    /// Write the wrapped artifact to `path`.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&self.to_bytes())?;
        let compressed = encoder.finish()?;
        let encoded = BASE64.encode(compressed);
        fs::write(path, &encoded)?;
        info!("wrote model to {:?} ({} bytes)", path, encoded.len());
        Ok(())
    }

    /// Read an artifact written by [Model::write].
    pub fn read(path: &Path) -> Result<Model, Error> {
        use std::io::Read;
        let encoded = fs::read_to_string(path)?;
        let compressed = BASE64
            .decode(encoded.trim())
            .map_err(|e| Error::Format(format!("model is not valid base64: {}", e)))?;
        let mut raw = Vec::new();
        BzDecoder::new(&compressed[..]).read_to_end(&mut raw)?;
        Model::from_bytes(&raw)
    }
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.pos + n > self.buf.len() {
            return Err(Error::Format("truncated model".to_string()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, Error> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn f64(&mut self) -> Result<f64, Error> {
        let raw = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(f64::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use tempfile::tempdir;

    fn sample_model() -> Model {
        let features = vec![b"ab".to_vec(), b"b".to_vec()];
        let scanner = Scanner::build(&features).unwrap();
        let output = scanner.sparse_output();
        Model {
            classes: vec!["en".to_string(), "fr".to_string()],
            pc: vec![(0.5f64).ln(), (0.5f64).ln()],
            ptc: vec![0.1f64.ln(), 0.9f64.ln(), 0.9f64.ln(), 0.1f64.ln()],
            num_feats: features.len(),
            nextmove: scanner.nextmove().clone(),
            output,
        }
    }

    #[test]
    fn framing_round_trip() {
        let model = sample_model();
        let bytes = model.to_bytes();
        let back = Model::from_bytes(&bytes).unwrap();
        assert_eq!(back.classes, model.classes);
        assert_eq!(back.pc, model.pc);
        assert_eq!(back.ptc, model.ptc);
        assert_eq!(back.num_feats, model.num_feats);
        assert_eq!(back.nextmove, model.nextmove);
        assert_eq!(back.output, model.output);
        // the framing itself must be stable
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model");
        let model = sample_model();
        model.write(&path).unwrap();

        let back = Model::read(&path).unwrap();
        assert_eq!(back.to_bytes(), model.to_bytes());

        // artifact is base64 text
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
    }

    #[test]
    fn rebuilt_scanner_scans_identically() {
        let features = vec![b"ab".to_vec(), b"bc".to_vec(), b"abc".to_vec()];
        let scanner = Scanner::build(&features).unwrap();
        let expected = scanner.count(b"ababc");

        let model = Model {
            classes: vec!["x".to_string()],
            pc: vec![0.0],
            ptc: vec![0.0; 3],
            num_feats: 3,
            nextmove: scanner.nextmove().clone(),
            output: scanner.sparse_output(),
        };
        let bytes = model.to_bytes();
        let back = Model::from_bytes(&bytes).unwrap();
        let rebuilt = Scanner::from_parts(back.nextmove, &back.output, back.num_feats);
        assert_eq!(rebuilt.count(b"ababc"), expected);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = sample_model().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(Model::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn truncation_rejected() {
        let bytes = sample_model().to_bytes();
        assert!(matches!(
            Model::from_bytes(&bytes[..bytes.len() - 3]),
            Err(Error::Format(_))
        ));
    }
}
