pub mod db;
mod file_access;
pub mod inference;
pub mod routes;
mod startup;
mod utils;

pub use db::*;
pub use file_access::{
    parse_file_timestamp, FileAccess, FileData, FileParams, OBSERVATIONS_PREFIX,
};
pub use inference::*;
pub use routes::*;
pub use startup::*;
pub use utils::*;
