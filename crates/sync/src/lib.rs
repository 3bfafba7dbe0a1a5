//! Dexhub sync: pulls script dumps from the external reference
//! service, normalizes them through `dexhub-core`, and bulk-writes the
//! results through `dexhub-db`.

pub mod fetch;
pub mod jobs;
