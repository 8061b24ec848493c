//! Audio subsystem: container parsing, block decoding, output sink.

pub mod adpcm;
pub mod output;
pub mod wav;

pub use output::{AudioSink, CpalOutput};
pub use wav::ContainerHeader;
