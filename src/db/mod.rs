pub mod dbdocs;
pub mod memory;
