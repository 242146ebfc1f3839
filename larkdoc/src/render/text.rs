//! Inline text rendering

use crate::model::{TextElement, TextStyle};

/// Wrap a run's content in Markdown style markers
///
/// Each marker wraps the previous result, in the order bold, italic,
/// strikethrough, inline code, underline, link. Empty content is never
/// wrapped.
pub fn style_run(content: &str, style: &TextStyle) -> String {
    if content.is_empty() {
        return String::new();
    }

    let mut text = content.to_string();
    if style.bold {
        text = format!("**{}**", text);
    }
    if style.italic {
        text = format!("*{}*", text);
    }
    if style.strikethrough {
        text = format!("~~{}~~", text);
    }
    if style.inline_code {
        text = format!("`{}`", text);
    }
    if style.underline {
        text = format!("<u>{}</u>", text);
    }
    if let Some(ref link) = style.link {
        text = format!("[{}]({})", text, decode_url(&link.url));
    }
    text
}

/// Render text elements to Markdown
///
/// `user_name` resolves the display name of a mentioned user.
pub fn render_elements<F>(elements: &[TextElement], mut user_name: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut result = String::new();
    for element in elements {
        match element {
            TextElement::TextRun(run) => match run.text_element_style {
                Some(ref style) => result.push_str(&style_run(&run.content, style)),
                None => result.push_str(&run.content),
            },
            TextElement::MentionUser(mention) => {
                result.push('@');
                result.push_str(&user_name(&mention.user_id));
            }
            TextElement::MentionDoc(mention) => {
                result.push_str(&format!("[{}]", mention.token));
            }
            TextElement::Equation(equation) => {
                result.push_str(&format!("${}$", equation.content));
            }
            TextElement::LinkPreview(preview) => {
                result.push_str(&format!("[{}]", preview.url));
            }
            TextElement::Unsupported => {}
        }
    }
    result
}

/// Decode `%XX` escapes in a URL
///
/// Malformed escapes are kept as written; invalid UTF-8 is replaced.
pub fn decode_url(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
