use serde::Serialize;
use synthgen_core::Dataset;

/// Position of one rendered frame inside a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrameRequest {
    pub iteration: usize,
    pub arrangement: usize,
    pub picture: usize,
}

impl FrameRequest {
    /// First picture of an arrangement: objects are re-arranged before it is taken.
    pub fn starts_arrangement(&self) -> bool {
        self.picture == 0
    }

    /// First frame of an iteration: a new background is picked before it is taken.
    pub fn starts_iteration(&self) -> bool {
        self.arrangement == 0 && self.picture == 0
    }
}

/// Iterations x arrangements x pictures, picture index varying fastest.
#[derive(Clone, Copy, Debug)]
pub struct FrameSchedule {
    iterations: usize,
    arrangements: usize,
    pictures: usize,
}

impl FrameSchedule {
    pub fn new(iterations: usize, arrangements: usize, pictures: usize) -> Self {
        Self {
            iterations,
            arrangements,
            pictures,
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl Dataset<FrameRequest> for FrameSchedule {
    fn get(&self, index: usize) -> Option<FrameRequest> {
        if index >= self.len() {
            return None;
        }
        let per_iteration = self.arrangements * self.pictures;
        Some(FrameRequest {
            iteration: index / per_iteration,
            arrangement: index % per_iteration / self.pictures,
            picture: index % self.pictures,
        })
    }

    fn len(&self) -> usize {
        self.iterations * self.arrangements * self.pictures
    }
}
