//! Crate-wide error type.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Invalid flag combination or parameter value.
    Config(String),
    /// No documents survived indexing/pruning.
    EmptyCorpus,
    /// The scanner state count does not fit the widest supported cell type.
    ScannerOverflow(usize),
    /// Malformed feature file or bucket record.
    Format(String),
    /// Non-finite value in IG or NB computation.
    Numeric(String),
    Csv(csv::Error),
    Json(serde_json::Error),
    Custom(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Error {
        Error::Csv(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Json(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
