//! Strategy trait, its variants and family-based selection.

pub mod selection;
pub mod strategy;
pub mod variants;
