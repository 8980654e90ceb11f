pub mod dates;
pub mod filename;
