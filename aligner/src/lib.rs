mod batch;
mod color;
mod compositor;
mod config;
mod error;
mod locator;
mod output;
mod progress;

pub use batch::{BatchEntry, BatchOutcome, BatchRunner, BatchState, CancellationFlag};
pub use color::{FALLBACK_COLOR, dominant_color};
pub use compositor::{Compositor, PasteRegion, paste_region};
pub use config::{AlignConfig, Background, MatchMode};
pub use error::AlignError;
pub use locator::{LocatedWord, MIN_CONFIDENCE, WordLocator, WordMatch, load_image};
pub use output::{output_file_name, write_image};
pub use progress::{ProgressEvent, ProgressSink};
