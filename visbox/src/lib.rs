pub mod annotation;
pub mod bbox;
pub mod estimator;
pub mod instance_mask;
pub mod occlusion;
pub mod ray_scene;
pub mod resolver;

pub use annotation::{format_records, parse_label_line, LabelParseError, YoloRecord};
pub use bbox::{BoundingBox2D, YoloBox};
pub use estimator::{estimate, Estimate, EstimatorOptions, ReferenceBoxPolicy};
pub use occlusion::{FrameOcclusion, OcclusionStrategy, OcclusionTester};
pub use resolver::{BoxSource, VisibilityRecord, VisibilityResolver, VisibilityResolverCfg};
