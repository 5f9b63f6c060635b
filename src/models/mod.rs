pub mod document;
pub mod enums;
pub mod size;
pub mod upload;

pub use document::*;
pub use enums::*;
pub use size::*;
pub use upload::*;
