pub mod download;
pub mod get_names;
pub mod upload;

pub use download::*;
pub use get_names::*;
pub use upload::*;
