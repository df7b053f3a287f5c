pub mod job;
pub mod tag;
