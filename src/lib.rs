pub mod assemble;
pub mod batch;
pub mod chebi;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod http;
pub mod legacy;
pub mod output;
pub mod record;
pub mod references;
pub mod sorter;
pub mod sources;
pub mod store;
