pub mod multi_writer;
pub mod sizer;
pub mod zero_reader;

pub use multi_writer::MultiWriteSeeker;
pub use sizer::{HolePredictor, Sizer};
pub use zero_reader::ZeroReader;
