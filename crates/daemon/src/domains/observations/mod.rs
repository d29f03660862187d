mod current_conditions;

pub use current_conditions::*;
