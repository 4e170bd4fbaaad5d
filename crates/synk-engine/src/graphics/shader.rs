//! Shader source conventions.
//!
//! A program named `base` is made of two WGSL files next to each other:
//! `base.vert.wgsl` holds the vertex stage and `base.frag.wgsl` the fragment stage. Each
//! stage declares its entry point with the matching attribute (`@vertex fn ...`,
//! `@fragment fn ...`).

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// File suffix appended to the program base path.
    pub const fn suffix(self) -> &'static str {
        match self {
            ShaderStage::Vertex => ".vert.wgsl",
            ShaderStage::Fragment => ".frag.wgsl",
        }
    }

    /// WGSL attribute marking an entry point of this stage.
    pub const fn attribute(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "@vertex",
            ShaderStage::Fragment => "@fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// `base` with the stage suffix appended (`shaders/main` -> `shaders/main.vert.wgsl`).
pub fn stage_path(base: &Path, stage: ShaderStage) -> PathBuf {
    let mut raw = OsString::from(base.as_os_str());
    raw.push(stage.suffix());
    PathBuf::from(raw)
}

/// Reads the source of one stage.
pub(crate) fn read_stage(base: &Path, stage: ShaderStage) -> Result<(PathBuf, String)> {
    let path = stage_path(base, stage);
    match std::fs::read_to_string(&path) {
        Ok(source) => Ok((path, source)),
        Err(e) => Err(Error::ShaderCompile {
            stage,
            path,
            diagnostic: format!("cannot read source: {e}"),
        }),
    }
}

/// Name of the first function tagged with the stage attribute, ignoring comments.
pub(crate) fn find_entry_point(source: &str, stage: ShaderStage) -> Option<String> {
    let code = strip_comments(source);
    let attribute = stage.attribute();
    let mut rest = code.as_str();

    while let Some(pos) = rest.find(attribute) {
        rest = &rest[pos + attribute.len()..];
        if rest.starts_with(is_ident_char) {
            continue;
        }

        let mut tail = rest.trim_start();

        // Other attributes may sit between the stage tag and `fn`.
        while let Some(after_at) = tail.strip_prefix('@') {
            let len = after_at
                .find(|c: char| !is_ident_char(c))
                .unwrap_or(after_at.len());
            tail = after_at[len..].trim_start();
            if tail.starts_with('(') {
                match tail.find(')') {
                    Some(close) => tail = tail[close + 1..].trim_start(),
                    None => return None,
                }
            }
        }

        let Some(after_fn) = tail.strip_prefix("fn") else {
            continue;
        };
        if !after_fn.starts_with(char::is_whitespace) {
            continue;
        }

        let name: String = after_fn
            .trim_start()
            .chars()
            .take_while(|&c| is_ident_char(c))
            .collect();
        if !name.is_empty() {
            return Some(name);
        }
    }

    None
}

/// Cheap structural check used when no real compiler is available.
///
/// Rejects blank sources and unbalanced `()`, `[]`, `{}`.
pub(crate) fn check_structure(source: &str) -> std::result::Result<(), String> {
    let code = strip_comments(source);
    if code.trim().is_empty() {
        return Err("source is empty".into());
    }

    let mut open: Vec<(char, usize)> = Vec::new();
    for (line_no, line) in code.lines().enumerate() {
        let line_no = line_no + 1;
        for c in line.chars() {
            match c {
                '(' | '[' | '{' => open.push((c, line_no)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match open.pop() {
                        Some((o, _)) if o == expected => {}
                        _ => return Err(format!("line {line_no}: unexpected `{c}`")),
                    }
                }
                _ => {}
            }
        }
    }

    match open.pop() {
        Some((c, line_no)) => Err(format!("line {line_no}: unclosed `{c}`")),
        None => Ok(()),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replaces `//` and (nested) `/* */` comments with spaces, keeping line breaks.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut block_depth = 0usize;
    let mut line_comment = false;

    while let Some(c) = chars.next() {
        if line_comment {
            if c == '\n' {
                line_comment = false;
                out.push('\n');
            }
            continue;
        }

        if block_depth > 0 {
            match (c, chars.peek()) {
                ('*', Some('/')) => {
                    chars.next();
                    block_depth -= 1;
                    if block_depth == 0 {
                        out.push(' ');
                    }
                }
                ('/', Some('*')) => {
                    chars.next();
                    block_depth += 1;
                }
                ('\n', _) => out.push('\n'),
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('/')) => {
                chars.next();
                line_comment = true;
            }
            ('/', Some('*')) => {
                chars.next();
                block_depth = 1;
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERT: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec4<f32>,
};

// @vertex fn commented_out() {}
@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VsOut {
    var out: VsOut;
    out.pos = vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}
"#;

    #[test]
    fn stage_path_appends_suffix() {
        let base = Path::new("res/shaders/main");
        assert_eq!(
            stage_path(base, ShaderStage::Vertex),
            PathBuf::from("res/shaders/main.vert.wgsl")
        );
        assert_eq!(
            stage_path(base, ShaderStage::Fragment),
            PathBuf::from("res/shaders/main.frag.wgsl")
        );
    }

    #[test]
    fn entry_point_skips_comments() {
        assert_eq!(
            find_entry_point(VERT, ShaderStage::Vertex).as_deref(),
            Some("vs_main")
        );
        assert_eq!(find_entry_point(VERT, ShaderStage::Fragment), None);
    }

    #[test]
    fn entry_point_after_extra_attribute() {
        let src = "@fragment @must_use fn fs(@location(0) c: vec4<f32>) -> @location(0) vec4<f32> { return c; }";
        assert_eq!(
            find_entry_point(src, ShaderStage::Fragment).as_deref(),
            Some("fs")
        );
    }

    #[test]
    fn structure_check_reports_unbalanced_delimiters() {
        assert!(check_structure(VERT).is_ok());
        assert_eq!(
            check_structure("fn a() {\n  let x = (1;\n}").unwrap_err(),
            "line 3: unexpected `}`"
        );
        assert_eq!(
            check_structure("fn a() {\n").unwrap_err(),
            "line 1: unclosed `{`"
        );
        assert_eq!(
            check_structure("  // nothing\n").unwrap_err(),
            "source is empty"
        );
    }

    #[test]
    fn nested_block_comments_are_stripped() {
        let src = "a /* one /* two */ still */ b";
        assert_eq!(strip_comments(src), "a   b");
    }
}
