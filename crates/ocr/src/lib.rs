pub mod engine;
pub mod filters;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod tesseract;
pub mod types;

pub use engine::{Attempt, AttemptState, OcrEngine, Recognition};
pub use normalize::normalize;
pub use pipeline::{LabelPipeline, LabelReport, OcrInput, PipelineError};
pub use preprocess::{
    composite_grid, encode_png, load_image, save_composite, PreprocessError, PreprocessingBank,
    Technique, Variant, VariantSource,
};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, ScriptedRecognizer};
pub use tesseract::TesseractCli;
pub use types::{EngineMode, PageSegMode, RawRecognition, RecognizerConfig, DEFAULT_ATTEMPTS};
