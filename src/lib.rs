pub mod batch;
pub mod codec;
pub mod config;
pub mod debug;
pub mod detection;
pub mod error;
pub mod extract;
pub mod logging;
pub mod mask;
pub mod models;
pub mod pipeline;

pub use batch::{BatchItemResult, BatchResponse, handle_request, process_batch};
pub use config::{ConfigOverrides, Device, SliceConfig};
pub use debug::{DebugSink, DirectoryDebugSink, NoopDebugSink};
pub use detection::{ContourDetector, ContrastSegmenter, Detector, SegmentSession, Segmenter, segment};
pub use error::{ErrorScope, Result, SliceError};
pub use extract::{ObjectExtractor, Placement, extract_object};
pub use models::{BoundingBox, DetectedBox, MaskCandidates, MaskData, RawMask};
pub use pipeline::{ExtractedObject, ImageProcessor, Pipeline};
