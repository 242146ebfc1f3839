//! Text elements and their styles
//!
//! A text element is the smallest text-bearing unit of a block. On the wire
//! it is an object with exactly one populated field; in memory it is an enum.

use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Link target of a styled run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
}

/// Independent inline style flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub inline_code: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

impl TextStyle {
    /// Check if any style is applied
    pub fn has_formatting(&self) -> bool {
        self.bold
            || self.italic
            || self.strikethrough
            || self.underline
            || self.inline_code
            || self.link.is_some()
    }
}

/// A span of text with one style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_element_style: Option<TextStyle>,
}

impl TextRun {
    /// Create a new plain text run
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            text_element_style: None,
        }
    }

    /// Create a text run carrying `style`, omitting the style when it is empty
    pub fn styled(content: impl Into<String>, style: &TextStyle) -> Self {
        Self {
            content: content.into(),
            text_element_style: style.has_formatting().then(|| style.clone()),
        }
    }

    /// Style of this run, or the empty style
    pub fn style(&self) -> TextStyle {
        self.text_element_style.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionUser {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionDoc {
    pub token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_element_style: Option<TextStyle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One text element; exactly one kind per element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireElement", into = "WireElement")]
pub enum TextElement {
    TextRun(TextRun),
    MentionUser(MentionUser),
    MentionDoc(MentionDoc),
    Equation(Equation),
    LinkPreview(LinkPreview),
    /// An element kind this crate does not model (reminders, inline files, ...)
    Unsupported,
}

impl TextElement {
    /// Plain text run element
    pub fn text(content: impl Into<String>) -> Self {
        TextElement::TextRun(TextRun::new(content))
    }

    /// Equation element
    pub fn equation(content: impl Into<String>) -> Self {
        TextElement::Equation(Equation {
            content: content.into(),
            text_element_style: None,
        })
    }

    /// Raw text of the element, ignoring style
    pub fn plain_text(&self) -> &str {
        match self {
            TextElement::TextRun(run) => &run.content,
            TextElement::Equation(eq) => &eq.content,
            TextElement::MentionDoc(doc) => &doc.token,
            TextElement::MentionUser(user) => &user.user_id,
            TextElement::LinkPreview(preview) => &preview.url,
            TextElement::Unsupported => "",
        }
    }
}

/// Wire shape of a text element: one object with optional fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_run: Option<TextRun>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    mention_user: Option<MentionUser>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    mention_doc: Option<MentionDoc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    equation: Option<Equation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    link_preview: Option<LinkPreview>,
}

impl From<WireElement> for TextElement {
    fn from(wire: WireElement) -> Self {
        if let Some(run) = wire.text_run {
            TextElement::TextRun(run)
        } else if let Some(user) = wire.mention_user {
            TextElement::MentionUser(user)
        } else if let Some(doc) = wire.mention_doc {
            TextElement::MentionDoc(doc)
        } else if let Some(eq) = wire.equation {
            TextElement::Equation(eq)
        } else if let Some(preview) = wire.link_preview {
            TextElement::LinkPreview(preview)
        } else {
            TextElement::Unsupported
        }
    }
}

impl From<TextElement> for WireElement {
    fn from(element: TextElement) -> Self {
        let mut wire = WireElement::default();
        match element {
            TextElement::TextRun(run) => wire.text_run = Some(run),
            TextElement::MentionUser(user) => wire.mention_user = Some(user),
            TextElement::MentionDoc(doc) => wire.mention_doc = Some(doc),
            TextElement::Equation(eq) => wire.equation = Some(eq),
            TextElement::LinkPreview(preview) => wire.link_preview = Some(preview),
            TextElement::Unsupported => {}
        }
        wire
    }
}

/// Block-level style of a text-bearing payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlockStyle {
    /// Alignment code (1 left, 2 center, 3 right)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<u32>,

    /// Todo completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,

    /// Code block language code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<u32>,

    /// Ordered list sequence: a number, or `auto` to continue the previous item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
}

/// Payload of every text-bearing block type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub elements: Vec<TextElement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextBlockStyle>,
}

impl TextBody {
    /// Body with the given elements and no block style
    pub fn new(elements: Vec<TextElement>) -> Self {
        Self {
            elements,
            style: None,
        }
    }

    /// Body with the given elements and block style
    pub fn with_style(elements: Vec<TextElement>, style: TextBlockStyle) -> Self {
        Self {
            elements,
            style: Some(style),
        }
    }

    /// Concatenated raw text of all elements
    pub fn plain_text(&self) -> String {
        self.elements.iter().map(TextElement::plain_text).collect()
    }
}
