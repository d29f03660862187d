mod cluster_model;

pub use cluster_model::*;
