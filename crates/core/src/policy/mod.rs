pub mod matcher;

pub use matcher::match_tier;
