pub mod document_status;
pub mod storage;

pub use document_status::DocumentStatus;
