//! File loading for metablock: record collections and gold standards from
//! delimited text files.

pub mod csv;
pub mod error;

pub use self::csv::{
    load_collection, load_gold_standard, parse_collection, parse_gold_standard, LoadedCollection,
};
pub use error::IoError;
