/*! Feature selection.

Two stages: a document-frequency cut that keeps the most common n-grams of
every order, then the language-domain criterion that ranks the survivors by
per-language information gain, penalized by how well they discriminate
domains.
!*/
mod df;
mod ig;
mod ld;

pub use df::{ngram_select, tally};
pub use ig::compute_ig;
pub use ld::{select_ld_features, union_features};
