pub mod files;
pub mod weather;

pub use files::*;
pub use weather::*;
