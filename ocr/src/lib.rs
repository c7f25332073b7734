mod ocr;
mod preprocess;
mod tesseract;

pub use ocr::{Ocr, OcrToken};
pub use preprocess::prepare_for_ocr;
pub use tesseract::{OcrConfig, Tesseract, TesseractError, parse_tsv};
