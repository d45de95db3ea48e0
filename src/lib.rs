#![doc = include_str!("../README.md")]
pub mod buckets;
pub mod cli;
pub mod error;
pub mod features;
pub mod index;
pub mod model;
pub mod nb;
pub mod pipelines;
pub mod pool;
pub mod scanner;
pub mod selection;
pub mod tokenize;
