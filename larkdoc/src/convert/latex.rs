//! LaTeX rewrites for the platform's equation renderer
//!
//! The renderer rejects `\operatorname`, `\tag` and `\mathring`, and typesets
//! `_`/`^` inside `\text{}` literally.

use regex::{Captures, NoExpand, Regex};
use std::sync::LazyLock;

/// Brace group allowing one level of nested braces
macro_rules! group {
    () => {
        r"\{((?:[^{}]|\{[^{}]*\})*)\}"
    };
}

static OPERATORNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(r"\\operatorname\*?\s*", group!())).expect("valid operatorname regex")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(concat!(r"\\tag\*?\s*", group!())).expect("valid tag regex"));

static RING_A: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\mathring\s*\{\s*(?:\\mathrm\s*\{\s*A\s*\}|A)\s*\}").expect("valid ring regex")
});

static RING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(r"\\mathring\s*", group!())).expect("valid mathring regex")
});

static TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(concat!(r"\\text\s*", group!())).expect("valid text regex"));

/// Rewrite commands the platform's equation renderer rejects
pub fn sanitize_latex(latex: &str) -> String {
    let latex = OPERATORNAME.replace_all(latex, r"\text{$1}");
    let latex = TAG.replace_all(&latex, "($1)");
    let latex = RING_A.replace_all(&latex, NoExpand(r"\AA"));
    let latex = RING.replace_all(&latex, "$1");
    let latex = TEXT.replace_all(&latex, |caps: &Captures<'_>| {
        let inner = &caps[1];
        if inner.contains('_') || inner.contains('^') {
            format!(r"\mathrm{{{}}}", inner)
        } else {
            caps[0].to_string()
        }
    });
    latex.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operatorname() {
        assert_eq!(sanitize_latex(r"\operatorname{argmax}_x f"), r"\text{argmax}_x f");
        assert_eq!(sanitize_latex(r"\operatorname*{lim}"), r"\text{lim}");
    }

    #[test]
    fn test_tag() {
        assert_eq!(sanitize_latex(r"E = mc^2 \tag{1}"), "E = mc^2 (1)");
    }

    #[test]
    fn test_mathring() {
        assert_eq!(sanitize_latex(r"\mathring{A}"), r"\AA");
        assert_eq!(sanitize_latex(r"\mathring{\mathrm{A}}"), r"\AA");
        assert_eq!(sanitize_latex(r"\mathring{u}"), "u");
    }

    #[test]
    fn test_text_with_scripts_becomes_mathrm() {
        assert_eq!(sanitize_latex(r"\text{x_1}"), r"\mathrm{x_1}");
        assert_eq!(sanitize_latex(r"\text{plain}"), r"\text{plain}");
    }

    #[test]
    fn test_untouched() {
        let input = r"\frac{a}{b} + \sqrt{2}";
        assert_eq!(sanitize_latex(input), input);
    }
}
