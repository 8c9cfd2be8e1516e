//! Vocabulary shared by the sequencing engine and its front-ends.

pub mod domain;
pub mod error;
pub mod layout;
pub mod protocol;
