pub mod grading;
pub mod payload;
pub mod question;
pub mod region;

pub use grading::{GradingOutcome, GradingRecord, PageReport, RetrievalMatch, StageTimings};
pub use payload::{DetectionResponse, OcrResponse, OcrSpans};
pub use question::{CharGlyph, Question, RegionContent, TextSpan};
pub use region::{BoundingBox, Region};
