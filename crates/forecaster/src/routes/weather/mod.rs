pub mod weather_routes;

pub use weather_routes::*;
