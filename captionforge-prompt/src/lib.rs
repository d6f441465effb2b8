//! # captionforge-prompt
//!
//! Chat prompt templates for description enhancement.
//!
//! A template document is a YAML mapping with a `messages` list of
//! `{role, content}` entries. The caption is rendered into the **last**
//! message with Tera; earlier messages are passed through verbatim.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use captionforge_prompt::PromptTemplate;
//!
//! fn messages_for(caption: &str) {
//!     if let Ok(template) = PromptTemplate::builtin() {
//!         if let Ok(messages) = template.render(caption) {
//!             for m in messages {
//!                 println!("{}: {}", m.role, m.content);
//!             }
//!         }
//!     }
//! }
//! ```

pub mod error;
pub mod template;

pub use error::PromptError;
pub use template::{ChatMessage, PromptTemplate};
