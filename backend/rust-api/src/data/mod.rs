//! Built-in content used when the stores are empty or unreachable, and by
//! the `seed-content` binary.

pub mod samples;

pub use samples::{sample_modules, sample_tasks, sample_videos};
