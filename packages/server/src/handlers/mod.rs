pub mod document;
pub mod system;
