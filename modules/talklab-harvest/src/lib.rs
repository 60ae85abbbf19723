pub mod analyzer;
pub mod assets;
pub mod enrich;
pub mod listing;
pub mod merge;
pub mod playlist;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

#[cfg(test)]
mod batch_tests;
#[cfg(test)]
mod enrich_tests;
#[cfg(test)]
mod merge_tests;
