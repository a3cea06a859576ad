mod backend;
mod backends;
mod recognizer;
mod result;

pub use backend::ObjectDetector;
pub use backends::{StubDetector, StubRecognizer};
pub use recognizer::TextRecognizer;
pub use result::{BoundingBox, RawDetection};
