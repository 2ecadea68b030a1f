pub mod text;

pub use text::{chunk_text, slugify, truncate_chars};
