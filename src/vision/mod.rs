//! Vision Layer
//!
//! Pixel-level stages of the pipeline: preprocessing and plot-region
//! detection, colored marker detection, and the optional metadata OCR path.

pub mod detection;
pub mod ocr;
pub mod ocr_preprocess;
pub mod preprocess;

pub use detection::{HsvRange, MarkerDetector};
pub use ocr::{parse_footer, FooterMetadataExtractor, MetadataExtractor, NoMetadata, TextRecognizer};
pub use preprocess::{preprocess, GraphRegion, PreprocessedImage, Preprocessor};
