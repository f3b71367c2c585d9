//! XML helpers shared by the writers and the validator.

pub mod escape;

pub use escape::escape_xml;
