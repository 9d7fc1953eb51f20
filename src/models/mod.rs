pub mod enums;
pub mod filters;
pub mod note;

pub use enums::*;
pub use filters::*;
pub use note::*;
