//! Pipeline trait.
use crate::error::Error;

/// Implemented by every pipeline. Generic over the return type so that
/// pipelines producing a value can use the trait as well.
pub trait Pipeline<T> {
    fn run(&self) -> Result<T, Error>;
}
