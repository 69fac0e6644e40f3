//! Domain modules, leaf-first: presence, queue, matching, chat, moderation.

pub mod chat;
pub mod matching;
pub mod moderation;
pub mod presence;
pub mod queue;
