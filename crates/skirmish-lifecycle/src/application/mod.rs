//! The lifecycle controller and its command handlers.

pub mod command_handlers;
pub mod controller;
