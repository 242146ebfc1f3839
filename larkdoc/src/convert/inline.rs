//! Inline content to text elements

use super::ast::Inline;
use super::latex::sanitize_latex;
use crate::model::{Link, TextElement, TextRun, TextStyle};
use crate::schema::MAX_TEXT_RUN_CHARS;

/// Flattened inline content
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Piece {
    Text(String, TextStyle),
    Equation(String),
    Image(String),
    DisplayMath(String),
}

impl Piece {
    fn is_blank(&self) -> bool {
        matches!(self, Piece::Text(content, _) if content.trim().is_empty())
    }
}

/// Flatten inline trees, accumulating the style bag down each branch
///
/// Adjacent runs with identical style are merged.
pub(super) fn flatten(inlines: &[Inline]) -> Vec<Piece> {
    let mut pieces = Vec::new();
    walk(inlines, &TextStyle::default(), &mut pieces);
    pieces
}

fn walk(inlines: &[Inline], style: &TextStyle, pieces: &mut Vec<Piece>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => push_text(pieces, &text.replace('\n', " "), style),
            Inline::Code(code) => {
                let code_style = TextStyle {
                    inline_code: true,
                    ..style.clone()
                };
                push_text(pieces, &code.replace('\n', " "), &code_style);
            }
            Inline::SoftBreak | Inline::HardBreak => push_text(pieces, " ", style),
            Inline::Strong(children) => {
                let bold = TextStyle {
                    bold: true,
                    ..style.clone()
                };
                walk(children, &bold, pieces);
            }
            Inline::Emphasis(children) => {
                let italic = TextStyle {
                    italic: true,
                    ..style.clone()
                };
                walk(children, &italic, pieces);
            }
            Inline::Strikethrough(children) => {
                let struck = TextStyle {
                    strikethrough: true,
                    ..style.clone()
                };
                walk(children, &struck, pieces);
            }
            Inline::Link { url, children } => {
                let linked = TextStyle {
                    link: Some(Link { url: url.clone() }),
                    ..style.clone()
                };
                if children.is_empty() {
                    push_text(pieces, url, &linked);
                } else {
                    walk(children, &linked, pieces);
                }
            }
            Inline::Image { url } => pieces.push(Piece::Image(url.clone())),
            Inline::InlineMath(math) => pieces.push(Piece::Equation(sanitize_latex(math))),
            Inline::DisplayMath(math) => pieces.push(Piece::DisplayMath(sanitize_latex(math))),
        }
    }
}

fn push_text(pieces: &mut Vec<Piece>, content: &str, style: &TextStyle) {
    if content.is_empty() {
        return;
    }
    if let Some(Piece::Text(last, last_style)) = pieces.last_mut() {
        if last_style == style {
            last.push_str(content);
            return;
        }
    }
    pieces.push(Piece::Text(content.to_string(), style.clone()));
}

/// Text elements of text and equation pieces; images and display math are skipped
///
/// Runs longer than the vendor limit become several runs with the same style.
pub(super) fn to_elements(pieces: &[Piece]) -> Vec<TextElement> {
    let mut elements = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Text(content, style) => {
                elements.extend(
                    split_run(content)
                        .into_iter()
                        .map(|chunk| TextElement::TextRun(TextRun::styled(chunk, style))),
                );
            }
            Piece::Equation(content) => elements.push(TextElement::equation(content.clone())),
            Piece::Image(url) => log::debug!("Dropping image {} from inline-only content", url),
            Piece::DisplayMath(math) => elements.push(TextElement::equation(math.clone())),
        }
    }
    elements
}

/// Whether a buffer of pieces would produce only whitespace
pub(super) fn is_blank(pieces: &[Piece]) -> bool {
    pieces.iter().all(Piece::is_blank)
}

/// Split text into chunks of at most the vendor run length, in characters
pub fn split_run(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in content.chars() {
        if count == MAX_TEXT_RUN_CHARS {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_flatten_nested_styles() {
        // Arrange
        let inlines = vec![
            text("a "),
            Inline::Strong(vec![text("b "), Inline::Emphasis(vec![text("c")])]),
        ];

        // Act
        let pieces = flatten(&inlines);

        // Assert
        let bold = TextStyle {
            bold: true,
            ..TextStyle::default()
        };
        let bold_italic = TextStyle {
            italic: true,
            ..bold.clone()
        };
        assert_eq!(
            pieces,
            vec![
                Piece::Text("a ".to_string(), TextStyle::default()),
                Piece::Text("b ".to_string(), bold),
                Piece::Text("c".to_string(), bold_italic),
            ]
        );
    }

    #[test]
    fn test_flatten_merges_breaks_into_spaces() {
        let pieces = flatten(&[text("one"), Inline::SoftBreak, text("two\nthree")]);
        assert_eq!(
            pieces,
            vec![Piece::Text("one two three".to_string(), TextStyle::default())]
        );
    }

    #[test]
    fn test_flatten_empty_link_uses_url() {
        let pieces = flatten(&[Inline::Link {
            url: "https://x.io".to_string(),
            children: vec![],
        }]);
        let Piece::Text(content, style) = &pieces[0] else {
            panic!("expected text");
        };
        assert_eq!(content, "https://x.io");
        assert_eq!(style.link.as_ref().unwrap().url, "https://x.io");
    }

    #[test]
    fn test_flatten_sanitizes_math() {
        let pieces = flatten(&[Inline::InlineMath("\\operatorname{sin} x".to_string())]);
        assert_eq!(pieces, vec![Piece::Equation("\\text{sin} x".to_string())]);
    }

    #[test]
    fn test_split_run_boundaries() {
        assert!(split_run("").is_empty());
        assert_eq!(split_run("abc"), vec!["abc"]);

        let exact = "x".repeat(MAX_TEXT_RUN_CHARS);
        assert_eq!(split_run(&exact).len(), 1);

        let long = "é".repeat(MAX_TEXT_RUN_CHARS * 2 + 1);
        let chunks = split_run(&long);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].chars().count(), 1);
        assert_eq!(chunks.concat(), long);
    }

    #[test]
    fn test_to_elements_keeps_style_across_chunks() {
        // Arrange
        let style = TextStyle {
            bold: true,
            ..TextStyle::default()
        };
        let pieces = vec![Piece::Text("y".repeat(4500), style.clone())];

        // Act
        let elements = to_elements(&pieces);

        // Assert
        assert_eq!(elements.len(), 3);
        for element in &elements {
            let TextElement::TextRun(run) = element else {
                panic!("expected run");
            };
            assert_eq!(run.style(), style);
        }
    }
}
