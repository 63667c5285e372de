//! Line classification for requirements files
//!
//! Every line is classified without failing: anything that is not a plain
//! package requirement keeps a kind tag and its exact bytes. Package lines
//! additionally carry the structured [`Requirement`] the policy engine
//! rewrites.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use reqsync_fs::Newline;

/// Tokens that introduce an installer option rather than a package.
const DIRECTIVE_TOKENS: &[&str] = &[
    "-r",
    "--requirement",
    "-c",
    "--constraint",
    "-e",
    "--editable",
    "--index-url",
    "--extra-index-url",
    "--find-links",
    "--trusted-host",
    "--no-index",
    "-i",
    "-f",
];

static VCS_OR_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(git\+|https?://|ssh://|file:|svn\+|hg\+|bzr\+)")
        .expect("Invalid VCS regex")
});

static LOCAL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\.\.?/|/|[a-zA-Z]:\\)").expect("Invalid path regex"));

static INCLUDE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(-r|--requirement|-c|--constraint)(?:\s+|\s*=\s*)(\S.*)$")
        .expect("Invalid include regex")
});

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?").expect("Invalid name regex")
});

static EXTRA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("Invalid extra regex")
});

static SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(===|~=|==|!=|<=|>=|<|>)\s*([A-Za-z0-9*+!._-]+)\s*$")
        .expect("Invalid specifier regex")
});

/// Version comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Compatible,
    Equal,
    Arbitrary,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
}

impl Operator {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "~=" => Self::Compatible,
            "==" => Self::Equal,
            "===" => Self::Arbitrary,
            "!=" => Self::NotEqual,
            "<=" => Self::LessEqual,
            ">=" => Self::GreaterEqual,
            "<" => Self::Less,
            ">" => Self::Greater,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compatible => "~=",
            Self::Equal => "==",
            Self::Arbitrary => "===",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
        }
    }

    /// Operators that establish a lower bound: `>=`, `>`, `~=`, `==`.
    pub fn is_floor(&self) -> bool {
        matches!(
            self,
            Self::GreaterEqual | Self::Greater | Self::Compatible | Self::Equal
        )
    }
}

/// One `(operator, version)` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub op: Operator,
    pub version: String,
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// Structured form of a package line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Name as written
    pub name: String,
    pub extras: Vec<String>,
    /// Constraints in source order
    pub specifiers: Vec<Specifier>,
    /// Environment marker text after `;`, verbatim but trimmed
    pub marker: Option<String>,
}

impl Requirement {
    /// Render `name[extras]<spec>; marker` with extras sorted.
    pub fn render(&self, spec: &str) -> String {
        let mut out = self.name.clone();
        if !self.extras.is_empty() {
            let mut extras = self.extras.clone();
            extras.sort();
            extras.dedup();
            out.push('[');
            out.push_str(&extras.join(","));
            out.push(']');
        }
        out.push_str(spec);
        if let Some(marker) = &self.marker {
            out.push_str("; ");
            out.push_str(marker);
        }
        out
    }
}

/// What a line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Comment,
    Hashed,
    Editable,
    Directive,
    Vcs,
    Path,
    Unparsed,
    Package(Requirement),
}

impl LineKind {
    pub fn requirement(&self) -> Option<&Requirement> {
        match self {
            Self::Package(req) => Some(req),
            _ => None,
        }
    }
}

/// One classified line.
///
/// `indent + content + comment + eol` always equals `raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Exact source text including the terminator
    pub raw: String,
    /// Leading whitespace before a package requirement
    pub indent: String,
    /// Requirement text, or the whole unterminated line for other kinds
    pub content: String,
    /// Trailing whitespace and inline comment after a requirement
    pub comment: String,
    pub eol: Option<Newline>,
    pub kind: LineKind,
}

impl ParsedLine {
    pub fn eol_str(&self) -> &'static str {
        self.eol.map(|nl| nl.as_str()).unwrap_or("")
    }

    pub fn requirement(&self) -> Option<&Requirement> {
        self.kind.requirement()
    }

    /// Rebuild the line around a new requirement text.
    pub fn with_content(&self, content: &str) -> String {
        format!("{}{}{}{}", self.indent, content, self.comment, self.eol_str())
    }

    pub fn reassemble(&self) -> String {
        self.with_content(&self.content)
    }
}

/// Kind of file reference found in a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Requirement,
    Constraint,
}

/// A `-r`/`-c` reference to another file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRef {
    pub path: String,
    pub kind: IncludeKind,
}

/// Split text into lines, each keeping its `\r\n`, `\r` or `\n` terminator.
pub fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..=i]);
                start = i + 1;
            }
            b'\r' => {
                let end = if bytes.get(i + 1) == Some(&b'\n') {
                    i + 1
                } else {
                    i
                };
                lines.push(&text[start..=end]);
                start = end + 1;
                i = end;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }

    lines
}

fn split_eol(line: &str) -> (&str, Option<Newline>) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, Some(Newline::CrLf))
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, Some(Newline::Lf))
    } else if let Some(body) = line.strip_suffix('\r') {
        (body, Some(Newline::Cr))
    } else {
        (line, None)
    }
}

/// Split off an inline comment at the first ` #`.
///
/// Returns the requirement text with trailing whitespace removed and the rest
/// of the line (whitespace plus comment) verbatim.
pub fn split_trailing_comment(body: &str) -> (&str, &str) {
    let head = match body.find(" #") {
        Some(idx) => &body[..idx],
        None => body,
    };
    let content = head.trim_end();
    (content, &body[content.len()..])
}

/// Whether the stripped line is an installer option rather than a package.
pub fn is_directive(stripped: &str) -> bool {
    let Some(token) = stripped.split_whitespace().next() else {
        return false;
    };
    token.starts_with("--") || DIRECTIVE_TOKENS.contains(&token)
}

/// Classify one raw line (terminator included).
pub fn parse_line(line: &str) -> ParsedLine {
    let (body, eol) = split_eol(line);
    let stripped = body.trim();

    let simple = |kind: LineKind| ParsedLine {
        raw: line.to_string(),
        indent: String::new(),
        content: body.to_string(),
        comment: String::new(),
        eol,
        kind,
    };

    if stripped.is_empty() || stripped.starts_with('#') {
        return simple(LineKind::Comment);
    }
    if stripped.contains("--hash=") {
        return simple(LineKind::Hashed);
    }
    if stripped.starts_with("-e") || stripped.starts_with("--editable") {
        return simple(LineKind::Editable);
    }
    if is_directive(stripped) {
        return simple(LineKind::Directive);
    }
    if VCS_OR_URL.is_match(stripped) {
        return simple(LineKind::Vcs);
    }
    if LOCAL_PATH.is_match(stripped) {
        return simple(LineKind::Path);
    }

    let indent_len = body.len() - body.trim_start().len();
    let (content, comment) = split_trailing_comment(&body[indent_len..]);

    let kind = match parse_requirement(content) {
        Ok(Some(req)) => LineKind::Package(req),
        Ok(None) => LineKind::Vcs,
        Err(()) => {
            tracing::warn!("Unparseable requirement kept as-is: {}", stripped);
            return simple(LineKind::Unparsed);
        }
    };

    ParsedLine {
        raw: line.to_string(),
        indent: body[..indent_len].to_string(),
        content: content.to_string(),
        comment: comment.to_string(),
        eol,
        kind,
    }
}

/// Parse `name[extras] specs ; marker`.
///
/// `Ok(None)` signals a direct `name @ url` reference.
fn parse_requirement(text: &str) -> Result<Option<Requirement>, ()> {
    let name_match = NAME.find(text).ok_or(())?;
    let name = name_match.as_str().to_string();
    let mut rest = text[name_match.end()..].trim_start();

    let mut extras = Vec::new();
    if let Some(after) = rest.strip_prefix('[') {
        let close = after.find(']').ok_or(())?;
        for extra in after[..close].split(',') {
            let extra = extra.trim();
            if extra.is_empty() {
                continue;
            }
            if !EXTRA.is_match(extra) {
                return Err(());
            }
            extras.push(extra.to_string());
        }
        rest = after[close + 1..].trim_start();
    }

    if rest.starts_with('@') {
        return Ok(None);
    }

    let (spec_text, marker) = match rest.split_once(';') {
        Some((spec, marker)) => {
            let marker = marker.trim();
            if marker.is_empty() {
                return Err(());
            }
            (spec.trim(), Some(marker.to_string()))
        }
        None => (rest.trim(), None),
    };

    let spec_text = match spec_text.strip_prefix('(') {
        Some(inner) => inner.strip_suffix(')').ok_or(())?.trim(),
        None => spec_text,
    };

    let mut specifiers = Vec::new();
    if !spec_text.is_empty() {
        for part in spec_text.split(',') {
            let caps = SPECIFIER.captures(part).ok_or(())?;
            let op = Operator::parse(&caps[1]).ok_or(())?;
            specifiers.push(Specifier {
                op,
                version: caps[2].to_string(),
            });
        }
    }

    Ok(Some(Requirement {
        name,
        extras,
        specifiers,
        marker,
    }))
}

/// Find `-r`/`--requirement` and `-c`/`--constraint` references in `text`.
pub fn find_file_links(text: &str) -> Vec<IncludeRef> {
    split_lines(text)
        .into_iter()
        .filter_map(|line| {
            let caps = INCLUDE_REF.captures(line.trim())?;
            let kind = match caps[1].to_ascii_lowercase().as_str() {
                "-c" | "--constraint" => IncludeKind::Constraint,
                _ => IncludeKind::Requirement,
            };
            let (value, _) = split_trailing_comment(&caps[2]);
            let path = value.trim().trim_matches('"').trim_matches('\'');
            if path.is_empty() {
                return None;
            }
            Some(IncludeRef {
                path: path.to_string(),
                kind,
            })
        })
        .collect()
}

/// Whether any line pins hashes.
pub fn has_hash_pins(text: &str) -> bool {
    text.contains("--hash=")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kind_name(line: &str) -> &'static str {
        match parse_line(line).kind {
            LineKind::Comment => "comment",
            LineKind::Hashed => "hashed",
            LineKind::Editable => "editable",
            LineKind::Directive => "directive",
            LineKind::Vcs => "vcs",
            LineKind::Path => "path",
            LineKind::Unparsed => "unparsed",
            LineKind::Package(_) => "package",
        }
    }

    #[rstest]
    #[case("\n", "comment")]
    #[case("   \n", "comment")]
    #[case("# pinned below\n", "comment")]
    #[case("numpy==1.26.0 --hash=sha256:abc\n", "hashed")]
    #[case("-e git+https://github.com/org/repo.git#egg=repo\n", "editable")]
    #[case("--editable ./local\n", "editable")]
    #[case("-r base.txt\n", "directive")]
    #[case("--constraint=constraints.txt\n", "directive")]
    #[case("--index-url https://pypi.org/simple\n", "directive")]
    #[case("-i https://pypi.org/simple\n", "directive")]
    #[case("--pre\n", "directive")]
    #[case("git+https://github.com/org/repo.git\n", "vcs")]
    #[case("https://example.com/pkg.whl\n", "vcs")]
    #[case("pkg @ https://example.com/pkg.whl\n", "vcs")]
    #[case("./vendor/pkg\n", "path")]
    #[case("/opt/wheels/pkg.whl\n", "path")]
    #[case("C:\\wheels\\pkg.whl\n", "path")]
    #[case("requests\n", "package")]
    #[case("requests[socks,security]>=2.0; python_version >= \"3.8\"\n", "package")]
    #[case("requests>=\n", "unparsed")]
    #[case("not a requirement!\n", "unparsed")]
    fn classifies(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(kind_name(line), expected);
    }

    #[test]
    fn package_fields() {
        let parsed = parse_line("Django[bcrypt] >= 4.0 , <5 ; python_version>='3.10'  # web\r\n");
        let req = parsed.requirement().unwrap();

        assert_eq!(req.name, "Django");
        assert_eq!(req.extras, vec!["bcrypt".to_string()]);
        assert_eq!(
            req.specifiers,
            vec![
                Specifier {
                    op: Operator::GreaterEqual,
                    version: "4.0".to_string()
                },
                Specifier {
                    op: Operator::Less,
                    version: "5".to_string()
                },
            ]
        );
        assert_eq!(req.marker.as_deref(), Some("python_version>='3.10'"));
        assert_eq!(parsed.comment, "  # web");
        assert_eq!(parsed.eol, Some(Newline::CrLf));
    }

    #[test]
    fn parenthesized_specifiers() {
        let parsed = parse_line("attrs (>=22.1,!=23.0)");
        let req = parsed.requirement().unwrap();
        assert_eq!(req.specifiers.len(), 2);
        assert_eq!(parsed.eol, None);
    }

    #[test]
    fn indent_is_kept_apart_from_content() {
        let parsed = parse_line("    flask>=2.0\n");
        assert_eq!(parsed.indent, "    ");
        assert_eq!(parsed.content, "flask>=2.0");
        assert_eq!(parsed.with_content("flask>=3.0"), "    flask>=3.0\n");
    }

    #[rstest]
    #[case("requests>=2.0  # keep me\n")]
    #[case("  numpy \r\n")]
    #[case("pandas\r")]
    #[case("attrs")]
    #[case("# comment only\n")]
    #[case("-r other.txt\n")]
    #[case("garbage ((\n")]
    fn reassembly_reproduces_raw(#[case] line: &str) {
        assert_eq!(parse_line(line).reassemble(), line);
    }

    #[test]
    fn render_sorts_extras_and_keeps_marker() {
        let parsed = parse_line("pkg[zeta,alpha]>=1.0; sys_platform == 'linux'\n");
        let req = parsed.requirement().unwrap();
        assert_eq!(
            req.render(">=2.0"),
            "pkg[alpha,zeta]>=2.0; sys_platform == 'linux'"
        );
    }

    #[test]
    fn split_lines_keeps_each_terminator() {
        assert_eq!(
            split_lines("a\r\nb\rc\nd"),
            vec!["a\r\n", "b\r", "c\n", "d"]
        );
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn comment_split_uses_first_space_hash() {
        assert_eq!(split_trailing_comment("pkg>=1 # a # b"), ("pkg>=1", " # a # b"));
        assert_eq!(split_trailing_comment("pkg>=1   "), ("pkg>=1", "   "));
        assert_eq!(split_trailing_comment("pkg#frag"), ("pkg#frag", ""));
    }

    #[test]
    fn finds_links_in_both_forms() {
        let text = "-r base.txt\n--requirement=\"dev reqs.txt\"  # dev\n-c constraints.txt\nrequests\n";
        assert_eq!(
            find_file_links(text),
            vec![
                IncludeRef {
                    path: "base.txt".to_string(),
                    kind: IncludeKind::Requirement
                },
                IncludeRef {
                    path: "dev reqs.txt".to_string(),
                    kind: IncludeKind::Requirement
                },
                IncludeRef {
                    path: "constraints.txt".to_string(),
                    kind: IncludeKind::Constraint
                },
            ]
        );
    }

    #[test]
    fn hash_pins_detected() {
        assert!(has_hash_pins("a==1 \\\n    --hash=sha256:deadbeef\n"));
        assert!(!has_hash_pins("a==1\n"));
    }
}
