//! Participant policy domain.

pub mod policy;
