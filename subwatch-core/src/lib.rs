pub mod config;
pub mod error;
pub mod error_utils;
pub mod keywords;
pub mod matcher;
pub mod seen_cache;
pub mod source;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use keywords::*;
pub use matcher::*;
pub use seen_cache::*;
pub use source::*;
pub use types::*;
