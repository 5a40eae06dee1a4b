pub mod document;
pub mod shared;
pub mod system;
