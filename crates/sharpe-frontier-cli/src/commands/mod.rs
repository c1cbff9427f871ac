pub mod simulate;
pub mod stats;
