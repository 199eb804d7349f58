pub mod settings;
pub mod startup;

pub use settings::*;
pub use startup::*;
