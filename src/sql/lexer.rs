//! Lexical helpers shared by the dialect parsers.
//!
//! None of these track line positions: comments are removed and whitespace
//! runs collapse before any structure is extracted.

use std::iter::Peekable;
use std::str::Chars;

/// Which comment syntax a source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    /// `--`, `/* */`, and `#` at the start of a line (MySQL).
    Sql,
    /// `//` and `/* */`, with backslash escapes inside strings (Prisma and
    /// TypeScript sources).
    Script,
}

/// Comment stripper over a character stream. Quoted text passes through
/// untouched so that `'--'` or `"https://..."` inside a literal survives.
struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
    style: CommentStyle,
    /// Only whitespace seen since the last newline.
    line_start: bool,
    out: String,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str, style: CommentStyle) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self {
            chars,
            current_char,
            style,
            line_start: true,
            out: String::with_capacity(input.len()),
        }
    }

    fn advance(&mut self) {
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// Stops on the newline so line structure is kept.
    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // /
        self.advance(); // *
        while let Some(c) = self.current_char {
            self.advance();
            if c == '*' && self.current_char == Some('/') {
                self.advance();
                break;
            }
        }
        // Keep tokens on either side apart.
        self.out.push(' ');
    }

    fn copy_quoted(&mut self, quote: char) {
        self.out.push(quote);
        self.advance();
        while let Some(c) = self.current_char {
            self.out.push(c);
            self.advance();
            if c == '\\' && self.style == CommentStyle::Script {
                if let Some(escaped) = self.current_char {
                    self.out.push(escaped);
                    self.advance();
                }
                continue;
            }
            if c == quote {
                // Doubled quote is an escaped quote.
                if self.style == CommentStyle::Sql && self.current_char == Some(quote) {
                    self.out.push(quote);
                    self.advance();
                } else {
                    break;
                }
            }
        }
    }

    fn run(mut self) -> String {
        while let Some(c) = self.current_char {
            let line_start = self.line_start;
            self.line_start = c == '\n' || (line_start && c.is_whitespace());
            match (self.style, c) {
                (CommentStyle::Sql, '-') if self.peek() == Some(&'-') => self.skip_line_comment(),
                (CommentStyle::Sql, '#') if line_start => self.skip_line_comment(),
                (CommentStyle::Script, '/') if self.peek() == Some(&'/') => {
                    self.skip_line_comment()
                }
                (_, '/') if self.peek() == Some(&'*') => self.skip_block_comment(),
                (_, '\'' | '"' | '`') => self.copy_quoted(c),
                _ => {
                    self.out.push(c);
                    self.advance();
                }
            }
        }
        self.out
    }
}

/// Remove `--` line comments, `/* */` block comments and MySQL `#` line
/// comments. `#` only opens a comment at the start of a line, so the
/// PostgreSQL XOR operator in `CHECK (a # b > 0)` is kept.
pub fn strip_comments(input: &str) -> String {
    Scanner::new(input, CommentStyle::Sql).run()
}

/// Remove `//` and `/* */` comments from Prisma or TypeScript source.
/// Newlines are kept, so line-oriented parsing still works afterwards.
pub fn strip_script_comments(input: &str) -> String {
    Scanner::new(input, CommentStyle::Script).run()
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_quote(c: char) -> bool {
    matches!(c, '\'' | '"' | '`')
}

/// Split `text` on `delimiter` wherever it is not nested inside brackets
/// or quotes. Fragments are trimmed and empty ones dropped.
pub fn split_top_level(text: &str, delimiter: char) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;

    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            c if is_quote(c) => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == delimiter && depth == 0 => {
                fragments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fragments.push(current);

    fragments
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Given the byte offset of an opening `(`, `[` or `{`, return the text
/// between it and its matching close, plus the offset just past the close.
/// `None` when the bracket is never closed.
pub fn enclosed(text: &str, open: usize) -> Option<(&str, usize)> {
    let open_char = text[open..].chars().next()?;
    let close_char = match open_char {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        if is_quote(c) {
            quote = Some(c);
        } else if c == open_char {
            depth += 1;
        } else if c == close_char {
            depth -= 1;
            if depth == 0 {
                let end = open + offset;
                return Some((&text[open + 1..end], end + 1));
            }
        }
    }
    None
}

/// Split on whitespace outside brackets and quotes, so `numeric(10, 2)` and
/// `'a b'` stay single words.
pub fn words(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;

    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            c if is_quote(c) => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Strip identifier quoting: `"name"`, `` `name` `` or `[name]`.
pub fn unquote(ident: &str) -> String {
    let ident = ident.trim();
    let stripped = ident
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| ident.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .or_else(|| ident.strip_prefix('[').and_then(|s| s.strip_suffix(']')));
    stripped.unwrap_or(ident).to_string()
}

/// Object name without its schema qualifier: `public."users"` -> `users`.
pub fn object_name(raw: &str) -> String {
    let last = raw.trim().rsplit('.').next().unwrap_or(raw);
    unquote(last)
}

/// Unquoted names from a `(a, "b", c)` style list body.
pub fn name_list(body: &str) -> Vec<String> {
    split_top_level(body, ',')
        .iter()
        .filter_map(|item| item.split_whitespace().next())
        .map(unquote)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        let sql = "-- header\nCREATE /* block */ TABLE t (\n  note TEXT DEFAULT '--keep'\n  # mysql style\n);";
        let stripped = collapse_whitespace(&strip_comments(sql));
        assert_eq!(stripped, "CREATE TABLE t ( note TEXT DEFAULT '--keep' );");
    }

    #[test]
    fn test_hash_mid_line_is_an_operator() {
        let sql = "CREATE TABLE t (a INT, b INT, CHECK (a # b > 0));";
        assert_eq!(strip_comments(sql), sql);
    }

    #[test]
    fn test_strip_script_comments() {
        let src = "model User {\n  id Int @id // the user's key\n  /* it's\n  old */ site String @default(\"https://a.b\")\n}";
        let stripped = strip_script_comments(src);
        assert_eq!(
            stripped,
            "model User {\n  id Int @id \n    site String @default(\"https://a.b\")\n}"
        );
        assert!(enclosed(&stripped, stripped.find('{').unwrap()).is_some());
    }

    #[test]
    fn test_script_strings_use_backslash_escapes() {
        let src = r#"a: text("a").default("say \"hi\" // not a comment"), // gone"#;
        assert_eq!(
            strip_script_comments(src).trim_end(),
            r#"a: text("a").default("say \"hi\" // not a comment"),"#
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert_eq!(strip_comments("a /* never closed").trim(), "a");
    }

    #[test]
    fn test_split_top_level_respects_parens() {
        let body = "id INT, price NUMERIC(10, 2), PRIMARY KEY (id, price)";
        assert_eq!(
            split_top_level(body, ','),
            vec!["id INT", "price NUMERIC(10, 2)", "PRIMARY KEY (id, price)"]
        );
    }

    #[test]
    fn test_split_top_level_respects_quotes() {
        let sql = "CREATE TABLE a (x TEXT DEFAULT ';'); CREATE TABLE b (y INT);";
        assert_eq!(split_top_level(sql, ';').len(), 2);
    }

    #[test]
    fn test_enclosed() {
        let text = "t (a INT, b NUMERIC(4, 1)) ENGINE=InnoDB";
        let open = text.find('(').unwrap();
        let (inner, end) = enclosed(text, open).unwrap();
        assert_eq!(inner, "a INT, b NUMERIC(4, 1)");
        assert_eq!(&text[end..], " ENGINE=InnoDB");
        assert!(enclosed("(never", 0).is_none());
    }

    #[test]
    fn test_words() {
        assert_eq!(
            words("price numeric(10, 2) DEFAULT 'a b' NOT NULL"),
            vec!["price", "numeric(10, 2)", "DEFAULT", "'a b'", "NOT", "NULL"]
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(unquote("\"User Table\""), "User Table");
        assert_eq!(unquote("`col`"), "col");
        assert_eq!(unquote("[col]"), "col");
        assert_eq!(object_name("public.\"users\""), "users");
        assert_eq!(name_list("\"a\", b DESC"), vec!["a", "b"]);
    }
}
