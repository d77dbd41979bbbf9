/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - The review being composed (draft.rs)
/// - Photo attachments (attachment.rs)
/// - The signed-in user (session.rs)
/// - The offline copy of the review list (cache.rs)

pub mod data;
pub mod draft;
pub mod attachment;
pub mod session;
pub mod cache;
