pub mod artefacts;
pub mod clipping;
pub mod config;
pub mod convert;
pub mod detectors;
pub mod error;
pub mod io;
pub mod peaks;
pub mod resample;
pub mod rolling;
pub mod signal;
pub mod simulate;
pub mod spline;

pub use artefacts::{rr_artefacts, ArtefactConfig, ArtefactReport};
pub use config::DetectionConfig;
pub use detectors::*;
pub use error::{PulseError, Result};
pub use signal::*;
