mod clustering;
mod observations;

pub use clustering::*;
pub use observations::*;
