//! Gateway request handlers.

pub(crate) mod chat;
