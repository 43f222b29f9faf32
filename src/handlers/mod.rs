// HTTP request handlers for the composition root
pub mod static_files;

// Re-export the main handler functions
pub use static_files::{health, serve_static};
