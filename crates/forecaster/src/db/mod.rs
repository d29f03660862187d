mod observation_data;

pub use observation_data::*;
