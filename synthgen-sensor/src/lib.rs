pub mod camera_pose;

pub use camera_pose::{CameraPose, Projection};
