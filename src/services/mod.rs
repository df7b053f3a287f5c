pub mod chat_bridge;
pub mod drain;
pub mod images;
pub mod queue;
pub mod tag_validation;
pub mod vision;
