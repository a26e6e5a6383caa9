pub mod candidate;
pub mod policy;
pub mod result;
