pub mod definition;
pub mod validation;

pub use definition::*;
pub use validation::*;
