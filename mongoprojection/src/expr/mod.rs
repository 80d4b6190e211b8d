pub mod definitions;
pub use definitions::*;
pub mod visitor;
