use std::sync::Arc;

use crate::services::{
    images::ImageSource, queue::JobQueue, tag_validation::TagValidator, vision::VisionOracle,
};

/// Collaborators for one drain run.
#[derive(Clone)]
pub struct WorkerState {
    pub queue: Arc<dyn JobQueue>,
    pub images: Arc<dyn ImageSource>,
    pub oracle: Arc<dyn VisionOracle>,
    pub validator: TagValidator,
}

impl WorkerState {
    pub fn new(
        queue: impl JobQueue + 'static,
        images: impl ImageSource + 'static,
        oracle: impl VisionOracle + 'static,
        validator: TagValidator,
    ) -> Self {
        Self {
            queue: Arc::new(queue),
            images: Arc::new(images),
            oracle: Arc::new(oracle),
            validator,
        }
    }
}
