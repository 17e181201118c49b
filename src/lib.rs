pub mod analyzers;
pub mod charts;
pub mod cleaner;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod sample;
pub mod spatial;
pub mod stats;
pub mod table;
