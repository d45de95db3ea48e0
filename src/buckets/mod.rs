/*! Disk-backed feature buckets.

The tally phase shards its `(feature, doc_id, count)` output across on-disk
buckets keyed by a stable hash of the feature bytes, so that every record
mentioning a feature lands in the same bucket and reducers can process
buckets independently without holding the whole tally in memory.
!*/
mod record;
mod tally;

pub use record::{for_each_record, write_record, Record, RecordReader};
pub use tally::{build_index, bucket_of, Sampling, TallyOptions};
