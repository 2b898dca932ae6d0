//! Steam `libraryfolders.vdf` reader.
//!
//! The file is text KeyValues; only the `"path"` of each library entry is
//! needed, so this is a tokenizer plus a depth counter rather than a full
//! tree parser.

use std::fs;
use std::path::{Path, PathBuf};

/// Location of the library list inside a Steam root.
pub const LIBRARY_FOLDERS_REL: &str = "steamapps/libraryfolders.vdf";

/// Depth of each library entry's keys: root object, then the numbered entry.
const ENTRY_DEPTH: usize = 2;

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Str(String),
    Open,
    Close,
}

/// Reads library paths listed by the Steam root, in file order.
///
/// A missing or unreadable file yields an empty list.
pub fn library_paths(steam_root: &Path) -> Vec<PathBuf> {
    let path = steam_root.join(LIBRARY_FOLDERS_REL);
    match fs::read(&path) {
        Ok(data) => parse_library_paths(&String::from_utf8_lossy(&data)),
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "no library folders file");
            Vec::new()
        }
    }
}

/// Extracts every `"path"` value found at entry depth.
fn parse_library_paths(text: &str) -> Vec<PathBuf> {
    let tokens = tokenize(text);
    let mut paths = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            Token::Str(key) => match tokens.get(i + 1) {
                Some(Token::Str(value)) => {
                    if depth == ENTRY_DEPTH && key.eq_ignore_ascii_case("path") && !value.is_empty()
                    {
                        paths.push(PathBuf::from(value));
                    }
                    i += 1;
                }
                // Key of a nested object; the brace is handled next round.
                _ => {}
            },
        }
        i += 1;
    }

    paths
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => tokens.push(Token::Open),
            '}' => tokens.push(Token::Close),
            '"' => {
                let mut s = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                match escaped {
                                    'n' => s.push('\n'),
                                    't' => s.push('\t'),
                                    other => s.push(other),
                                }
                            }
                        }
                        other => s.push(other),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '/' if chars.peek() == Some(&'/') => {
                // Line comment.
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    tokens
}
