//! Feature list and weight files.
//!
//! Feature files hold one feature per line as an escaped bytes-literal that
//! round-trips exactly: printable ASCII stays as-is, everything else is
//! `\xNN` (plus the usual `\n`, `\r`, `\t`, `\\` short forms). Weight files
//! are CSV with the escaped feature followed by one or more values.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Error;

/// Escape a byte sequence into a single-line literal.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out
}

/// Parse a line produced by [escape_bytes].
pub fn unescape_bytes(line: &str) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            if !c.is_ascii() || (c as u32) < 0x20 || (c as u32) > 0x7e {
                return Err(Error::Format(format!("unescaped byte in feature: {:?}", c)));
            }
            out.push(c as u8);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push(b'\\'),
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        let byte = u8::from_str_radix(&format!("{}{}", hi, lo), 16)
                            .map_err(|_| {
                                Error::Format(format!("bad hex escape in feature: {}", line))
                            })?;
                        out.push(byte);
                    }
                    _ => {
                        return Err(Error::Format(format!(
                            "truncated hex escape in feature: {}",
                            line
                        )))
                    }
                }
            }
            other => {
                return Err(Error::Format(format!(
                    "unknown escape {:?} in feature: {}",
                    other, line
                )))
            }
        }
    }
    Ok(out)
}

/// Write one feature per line.
pub fn write_features(features: &[Vec<u8>], path: &Path) -> Result<(), Error> {
    let mut w = BufWriter::new(File::create(path)?);
    for feat in features {
        writeln!(w, "{}", escape_bytes(feat))?;
    }
    w.flush()?;
    Ok(())
}

/// Read a feature-per-line file written by [write_features].
pub fn read_features(path: &Path) -> Result<Vec<Vec<u8>>, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut features = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let feat = unescape_bytes(&line)
            .map_err(|e| Error::Format(format!("{:?}:{}: {:?}", path, lineno + 1, e)))?;
        if feat.is_empty() {
            return Err(Error::Format(format!(
                "{:?}:{}: empty feature",
                path,
                lineno + 1
            )));
        }
        features.push(feat);
    }
    Ok(features)
}

/// Write per-feature weights as CSV. Scalar weights are ordered by
/// descending value, vector weights by feature bytes.
pub fn write_weights(weights: &HashMap<Vec<u8>, Vec<f64>>, path: &Path) -> Result<(), Error> {
    let mut keys: Vec<&Vec<u8>> = weights.keys().collect();
    let scalar = weights.values().all(|v| v.len() == 1);
    if scalar {
        keys.sort_unstable_by(|a, b| {
            let (wa, wb) = (weights[*a][0], weights[*b][0]);
            wb.partial_cmp(&wa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
    } else {
        keys.sort_unstable();
    }

    let mut w = csv::Writer::from_path(path)?;
    for key in keys {
        let mut row = vec![escape_bytes(key)];
        row.extend(weights[key].iter().map(|v| v.to_string()));
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}
