//! Tera-backed chat prompt template: [`ChatMessage`] and [`PromptTemplate`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

use crate::error::PromptError;

// ---------------------------------------------------------------------------
// Builtin document
// ---------------------------------------------------------------------------

const BUILTIN_TEMPLATE: &str = include_str!("templates/describe.yml");
const BUILTIN_ORIGIN: &str = "<builtin>";

/// Tera name the last message is registered under.
const LAST_MESSAGE: &str = "enhance/last_message.tera";

/// Variable the caption is exposed as inside the template.
pub const DESCRIPTION_VAR: &str = "description";

/// One chat message (`role` is `system`, `user` or `assistant`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct PromptDocument {
    messages: Vec<ChatMessage>,
}

/// How the last message receives the description.
#[derive(Debug, Clone)]
enum LastMessage {
    /// Tera syntax: `{{ description }}`.
    Tera(Tera),
    /// `str.format` syntax: `{description}`, with `{{` / `}}` as literal braces.
    Format(String),
}

/// A parsed template with its last message compiled.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    messages: Vec<ChatMessage>,
    last: LastMessage,
}

impl PromptTemplate {
    /// Parse a template document from YAML source.
    ///
    /// `origin` only labels errors.
    pub fn from_yaml(source: &str, origin: &str) -> Result<Self, PromptError> {
        let doc: PromptDocument =
            serde_yaml::from_str(source).map_err(|e| PromptError::Parse {
                origin: origin.to_string(),
                source: e,
            })?;
        let Some(last) = doc.messages.last() else {
            return Err(PromptError::NoMessages {
                origin: origin.to_string(),
            });
        };

        let last = if is_format_style(&last.content) {
            LastMessage::Format(last.content.clone())
        } else {
            let mut tera = Tera::default();
            tera.add_raw_template(LAST_MESSAGE, &last.content)?;
            LastMessage::Tera(tera)
        };
        Ok(Self {
            messages: doc.messages,
            last,
        })
    }

    /// Load a template document from disk.
    pub fn load_at(path: &Path) -> Result<Self, PromptError> {
        let source = std::fs::read_to_string(path).map_err(|e| PromptError::Io {
            path: PathBuf::from(path),
            source: e,
        })?;
        Self::from_yaml(&source, &path.display().to_string())
    }

    /// The template shipped with the binary.
    pub fn builtin() -> Result<Self, PromptError> {
        Self::from_yaml(BUILTIN_TEMPLATE, BUILTIN_ORIGIN)
    }

    /// Load `path` when it exists, otherwise fall back to [`Self::builtin`].
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, PromptError> {
        match path {
            Some(p) if p.exists() => Self::load_at(p),
            Some(p) => {
                tracing::warn!(path = %p.display(), "prompt template not found, using builtin");
                Self::builtin()
            }
            None => Self::builtin(),
        }
    }

    /// Messages as written in the document (last one unrendered).
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages with `description` rendered into the last one.
    pub fn render(&self, description: &str) -> Result<Vec<ChatMessage>, PromptError> {
        let rendered = match &self.last {
            LastMessage::Tera(tera) => {
                let mut ctx = Context::new();
                ctx.insert(DESCRIPTION_VAR, description);
                tera.render(LAST_MESSAGE, &ctx)?
            }
            LastMessage::Format(content) => format_style(content, description),
        };

        let mut messages = self.messages.clone();
        if let Some(last) = messages.last_mut() {
            last.content = rendered;
        }
        Ok(messages)
    }
}

/// A `{description}` placeholder and no Tera `{{ description }}` marks a
/// `str.format`-style message.
fn is_format_style(content: &str) -> bool {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    content.contains(&format!("{{{DESCRIPTION_VAR}}}"))
        && !compact.contains(&format!("{{{{{DESCRIPTION_VAR}}}}}"))
}

/// `str.format` substitution: `{description}` is replaced, `{{` and `}}`
/// collapse to single braces, any other field is kept as written.
fn format_style(content: &str, description: &str) -> String {
    let placeholder = format!("{{{DESCRIPTION_VAR}}}");
    let mut out = String::with_capacity(content.len() + description.len());
    let mut rest = content;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if rest.starts_with("{{") {
            out.push('{');
            rest = &rest[2..];
        } else if rest.starts_with("}}") {
            out.push('}');
            rest = &rest[2..];
        } else if rest.starts_with(&placeholder) {
            out.push_str(description);
            rest = &rest[placeholder.len()..];
        } else {
            out.push_str(&rest[..1]);
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}
