//! Code block language table
//!
//! One table drives both directions: the canonical name is what the
//! renderer emits after the opening fence, and what the converter looks up.

/// Language code for plain text
pub const PLAIN_TEXT: u32 = 1;

/// Canonical fence names indexed by vendor code
const LANGUAGES: &[(u32, &str)] = &[
    (1, "text"),
    (2, "abap"),
    (3, "ada"),
    (4, "apache"),
    (5, "apex"),
    (6, "assembly"),
    (7, "bash"),
    (8, "csharp"),
    (9, "cpp"),
    (10, "c"),
    (11, "cobol"),
    (12, "css"),
    (13, "coffeescript"),
    (14, "d"),
    (15, "dart"),
    (16, "delphi"),
    (17, "django"),
    (18, "dockerfile"),
    (19, "erlang"),
    (20, "fortran"),
    (21, "foxpro"),
    (22, "go"),
    (23, "groovy"),
    (24, "html"),
    (25, "htmlbars"),
    (26, "http"),
    (27, "haskell"),
    (28, "json"),
    (29, "java"),
    (30, "javascript"),
    (31, "julia"),
    (32, "kotlin"),
    (33, "latex"),
    (34, "lisp"),
    (35, "logo"),
    (36, "lua"),
    (37, "matlab"),
    (38, "makefile"),
    (39, "markdown"),
    (40, "nginx"),
    (41, "objectivec"),
    (42, "openedgeabl"),
    (43, "php"),
    (44, "perl"),
    (45, "postscript"),
    (46, "powershell"),
    (47, "prolog"),
    (48, "protobuf"),
    (49, "python"),
    (50, "r"),
    (51, "rpg"),
    (52, "ruby"),
    (53, "rust"),
    (54, "sas"),
    (55, "scss"),
    (56, "sql"),
    (57, "scala"),
    (58, "scheme"),
    (59, "scratch"),
    (60, "shell"),
    (61, "swift"),
    (62, "thrift"),
    (63, "typescript"),
    (64, "vbscript"),
    (65, "vb"),
    (66, "xml"),
    (67, "yaml"),
    (68, "cmake"),
    (69, "diff"),
    (70, "gherkin"),
    (71, "graphql"),
    (72, "glsl"),
    (73, "properties"),
    (74, "solidity"),
    (75, "toml"),
];

/// Common fence spellings that are not canonical names
const ALIASES: &[(&str, &str)] = &[
    ("plaintext", "text"),
    ("plain", "text"),
    ("txt", "text"),
    ("sh", "shell"),
    ("zsh", "shell"),
    ("console", "shell"),
    ("c++", "cpp"),
    ("cc", "cpp"),
    ("c#", "csharp"),
    ("cs", "csharp"),
    ("golang", "go"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("py", "python"),
    ("python3", "python"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("md", "markdown"),
    ("yml", "yaml"),
    ("tex", "latex"),
    ("objc", "objectivec"),
    ("objective-c", "objectivec"),
    ("ps1", "powershell"),
    ("proto", "protobuf"),
    ("kt", "kotlin"),
    ("docker", "dockerfile"),
    ("make", "makefile"),
    ("patch", "diff"),
];

/// Look up the vendor code for a fence info string
///
/// The first word of the info string is lowercased before lookup; anything
/// unrecognized maps to [`PLAIN_TEXT`].
pub fn code_language(info: &str) -> u32 {
    let name = info
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();

    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, target)| *target)
        .unwrap_or(name.as_str());

    LANGUAGES
        .iter()
        .find(|(_, lang)| *lang == canonical)
        .map(|(code, _)| *code)
        .unwrap_or(PLAIN_TEXT)
}

/// Canonical fence name for a vendor code (`text` when unknown)
pub fn language_name(code: u32) -> &'static str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("text")
}
