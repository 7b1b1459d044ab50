pub mod bin_common;
pub mod episode;
pub mod model;
pub mod table;

/// For stand-alone functionality that fit comfortably within one file.
pub mod utils;
