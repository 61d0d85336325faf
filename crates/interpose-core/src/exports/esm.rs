//! ES module export scanner.
//!
//! Finds the names a module exports by scanning for `export` declarations
//! without a full parse. Comments, string, template and regex literals are
//! skipped; TypeScript type-only exports produce nothing.

use super::ExportName;
use rustc_hash::FxHashSet;

/// Scan ES module source for its export list.
///
/// Returns entries in first-appearance order, deduplicated. `export * from`
/// declarations come back as [`ExportName::StarFrom`] with the specifier as
/// written.
#[must_use]
pub fn scan_esm_exports(source: &str) -> Vec<ExportName> {
    let chars: Vec<char> = source.chars().collect();
    let mut cur = Cursor::new(&chars);
    let mut out = Collector::default();

    while let Some(c) = cur.peek() {
        if c == '/' && cur.peek_at(1) == Some('/') {
            cur.skip_line_comment();
            continue;
        }
        if c == '/' && cur.peek_at(1) == Some('*') {
            cur.skip_block_comment();
            continue;
        }
        if matches!(c, '"' | '\'' | '`') {
            cur.skip_string();
            continue;
        }
        if c == '/' && cur.regex_allowed() {
            cur.skip_regex();
            continue;
        }
        if cur.at_keyword("export") && !cur.after_dot() {
            cur.advance(6);
            scan_export(&mut cur, &mut out);
            continue;
        }
        cur.bump();
    }

    out.names
}

#[derive(Default)]
struct Collector {
    names: Vec<ExportName>,
    seen: FxHashSet<ExportName>,
}

impl Collector {
    fn push(&mut self, entry: ExportName) {
        if self.seen.insert(entry.clone()) {
            self.names.push(entry);
        }
    }

    fn named(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() {
            self.push(ExportName::Named(name));
        }
    }
}

/// Scan the declaration following an `export` keyword.
fn scan_export(cur: &mut Cursor<'_>, out: &mut Collector) {
    cur.skip_trivia();
    match cur.peek() {
        Some('*') => {
            cur.bump();
            cur.skip_trivia();
            if cur.eat_keyword("as") {
                cur.skip_trivia();
                if let Some(name) = cur.read_name() {
                    out.named(name);
                }
                return;
            }
            if cur.eat_keyword("from") {
                cur.skip_trivia();
                if let Some(spec) = cur.read_string() {
                    out.push(ExportName::StarFrom(spec));
                }
            }
        }
        Some('{') => {
            cur.bump();
            scan_export_list(cur, out);
        }
        Some(c) if is_ident_start(c) => {
            let Some(word) = cur.read_ident() else {
                return;
            };
            match word.as_str() {
                "default" => out.named("default"),
                "const" | "let" | "var" => scan_declarators(cur, out),
                "function" => scan_function_name(cur, out),
                "async" => {
                    cur.skip_trivia();
                    if cur.eat_keyword("function") {
                        scan_function_name(cur, out);
                    }
                }
                "class" | "enum" => scan_declared_name(cur, out),
                "abstract" => {
                    cur.skip_trivia();
                    if cur.eat_keyword("class") {
                        scan_declared_name(cur, out);
                    }
                }
                // type, interface, declare, `export =`, `export import`: no runtime binding
                _ => {}
            }
        }
        _ => {}
    }
}

/// `export { a, b as c, d as default, x as "string name" }`
fn scan_export_list(cur: &mut Cursor<'_>, out: &mut Collector) {
    loop {
        cur.skip_trivia();
        match cur.peek() {
            None => return,
            Some('}') => {
                cur.bump();
                return;
            }
            Some(',') => {
                cur.bump();
                continue;
            }
            _ => {}
        }

        let Some(local) = cur.read_name() else {
            cur.bump();
            continue;
        };
        cur.skip_trivia();

        if local == "type" && cur.peek().is_some_and(is_ident_start) && !cur.at_keyword("as") {
            // `export { type Foo }`
            let _ = cur.read_ident();
            cur.skip_trivia();
            if cur.eat_keyword("as") {
                cur.skip_trivia();
                let _ = cur.read_name();
            }
            continue;
        }

        let exported = if cur.eat_keyword("as") {
            cur.skip_trivia();
            cur.read_name().unwrap_or(local)
        } else {
            local
        };
        out.named(exported);
    }
}

fn scan_function_name(cur: &mut Cursor<'_>, out: &mut Collector) {
    cur.skip_trivia();
    if cur.peek() == Some('*') {
        cur.bump();
    }
    scan_declared_name(cur, out);
}

fn scan_declared_name(cur: &mut Cursor<'_>, out: &mut Collector) {
    cur.skip_trivia();
    if let Some(name) = cur.read_ident() {
        out.named(name);
    }
}

/// `export const a = 1, { b, c: d } = obj, [e, ...f] = arr`
fn scan_declarators(cur: &mut Cursor<'_>, out: &mut Collector) {
    cur.skip_trivia();
    if cur.at_keyword("enum") {
        // `export const enum` is erased by TypeScript.
        return;
    }
    loop {
        cur.skip_trivia();
        match cur.peek() {
            Some('{' | '[') => scan_pattern(cur, out),
            Some(c) if is_ident_start(c) => {
                if let Some(name) = cur.read_ident() {
                    out.named(name);
                }
            }
            _ => return,
        }
        if !skip_initializer(cur) {
            return;
        }
    }
}

/// Collect the bindings of a destructuring pattern. The cursor is on the
/// opening brace or bracket.
fn scan_pattern(cur: &mut Cursor<'_>, out: &mut Collector) {
    let Some(open) = cur.bump() else {
        return;
    };
    let object = open == '{';
    let close = if object { '}' } else { ']' };

    loop {
        cur.skip_trivia();
        match cur.peek() {
            None => return,
            Some(c) if c == close => {
                cur.bump();
                return;
            }
            Some(',') => {
                cur.bump();
                continue;
            }
            Some('.') => {
                while cur.peek() == Some('.') {
                    cur.bump();
                }
                cur.skip_trivia();
                scan_binding_target(cur, out);
            }
            Some('{' | '[') if !object => scan_pattern(cur, out),
            Some('[') => {
                // computed key
                cur.skip_balanced();
                scan_property_value(cur, out);
            }
            Some('"' | '\'') if object => {
                let _ = cur.read_string();
                scan_property_value(cur, out);
            }
            Some(c) if is_ident_char(c) => {
                let key = cur.read_word();
                cur.skip_trivia();
                if object && cur.peek() == Some(':') {
                    scan_property_value(cur, out);
                } else if let Some(key) = key {
                    out.named(key);
                }
            }
            Some(_) => {
                cur.bump();
                continue;
            }
        }

        cur.skip_trivia();
        if cur.peek() == Some('=') {
            cur.bump();
            skip_default(cur, close);
        }
    }
}

/// After an object pattern key: `: target`.
fn scan_property_value(cur: &mut Cursor<'_>, out: &mut Collector) {
    cur.skip_trivia();
    if cur.peek() == Some(':') {
        cur.bump();
        cur.skip_trivia();
        scan_binding_target(cur, out);
    }
}

fn scan_binding_target(cur: &mut Cursor<'_>, out: &mut Collector) {
    match cur.peek() {
        Some('{' | '[') => scan_pattern(cur, out),
        _ => {
            if let Some(name) = cur.read_ident() {
                out.named(name);
            }
        }
    }
}

/// Skip a pattern default value, stopping before `,` or the pattern's
/// closing delimiter.
fn skip_default(cur: &mut Cursor<'_>, close: char) {
    let mut depth = 0usize;
    while let Some(c) = cur.peek() {
        match c {
            '"' | '\'' | '`' => {
                cur.skip_string();
                continue;
            }
            '/' if cur.peek_at(1) == Some('/') => {
                cur.skip_line_comment();
                continue;
            }
            '/' if cur.peek_at(1) == Some('*') => {
                cur.skip_block_comment();
                continue;
            }
            '/' if cur.regex_allowed() => {
                cur.skip_regex();
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth > 0 => depth -= 1,
            ',' if depth == 0 => return,
            _ if c == close && depth == 0 => return,
            _ => {}
        }
        cur.bump();
    }
}

/// Skip a declarator's type annotation and initializer.
///
/// Returns `true` when a top-level `,` was consumed and another declarator
/// follows.
fn skip_initializer(cur: &mut Cursor<'_>) -> bool {
    let mut depth = 0usize;
    let mut angle = 0usize;
    let mut assigned = false;
    let mut last: Option<char> = None;

    while let Some(c) = cur.peek() {
        match c {
            '/' if cur.peek_at(1) == Some('/') => {
                cur.skip_line_comment();
                continue;
            }
            '/' if cur.peek_at(1) == Some('*') => {
                cur.skip_block_comment();
                continue;
            }
            '"' | '\'' | '`' => {
                cur.skip_string();
                last = Some(c);
                continue;
            }
            '/' if cur.regex_allowed() => {
                cur.skip_regex();
                // A regex literal ends an operand.
                last = None;
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            '<' if !assigned && depth == 0 => angle += 1,
            '>' if !assigned && depth == 0 && angle > 0 => angle -= 1,
            '=' if !assigned && depth == 0 && angle == 0 => assigned = true,
            ',' if depth == 0 && angle == 0 => {
                cur.bump();
                return true;
            }
            ';' if depth == 0 => {
                cur.bump();
                return false;
            }
            '\n' if depth == 0 && angle == 0 && !continues_expression(cur, last) => {
                return false;
            }
            _ => {}
        }
        if !c.is_whitespace() {
            last = Some(c);
        }
        cur.bump();
    }
    false
}

/// Whether a top-level line break inside an initializer continues the
/// expression rather than ending the statement.
fn continues_expression(cur: &Cursor<'_>, last: Option<char>) -> bool {
    const TRAILING: &str = "=+-*/%,([{?:&|^!<>~.";
    const LEADING: &str = ".?:+-*/%=&|^<>,)]}";

    if last.is_some_and(|c| TRAILING.contains(c)) {
        return true;
    }
    cur.peek_significant().is_some_and(|c| LEADING.contains(c))
}

/// Keywords after which a `/` begins a regex literal.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Character cursor over module source.
struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(chars: &'a [char]) -> Self {
        Self { chars, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.chars.len());
    }

    /// Check if the keyword starts here, with word boundaries on both sides.
    fn at_keyword(&self, keyword: &str) -> bool {
        let pos = self.pos;
        if pos > 0 && is_ident_char(self.chars[pos - 1]) {
            return false;
        }

        let mut len = 0;
        for (j, k) in keyword.chars().enumerate() {
            if self.chars.get(pos + j) != Some(&k) {
                return false;
            }
            len += 1;
        }

        !self.chars.get(pos + len).is_some_and(|&c| is_ident_char(c))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance(keyword.chars().count());
            true
        } else {
            false
        }
    }

    /// Whether the previous significant character is `.` (property access).
    fn after_dot(&self) -> bool {
        self.chars[..self.pos]
            .iter()
            .rev()
            .find(|c| !c.is_whitespace())
            .is_some_and(|&c| c == '.')
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(2);
        while self.pos < self.chars.len() {
            if self.chars[self.pos] == '*' && self.peek_at(1) == Some('/') {
                self.advance(2);
                return;
            }
            self.pos += 1;
        }
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) => self.skip_line_comment(),
                (Some('/'), Some('*')) => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    /// Next character after whitespace and comments, without moving.
    fn peek_significant(&self) -> Option<char> {
        let mut ahead = Cursor {
            chars: self.chars,
            pos: self.pos,
        };
        ahead.skip_trivia();
        ahead.peek()
    }

    /// Skip a string or template literal. The cursor is on the opening quote.
    fn skip_string(&mut self) {
        let Some(quote) = self.bump() else {
            return;
        };
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                c if c == quote => return,
                '$' if quote == '`' && self.peek() == Some('{') => {
                    self.bump();
                    self.skip_template_expr();
                }
                // unterminated
                '\n' if quote != '`' => return,
                _ => {}
            }
        }
    }

    /// Skip a `${ ... }` template substitution; the `${` is already consumed.
    fn skip_template_expr(&mut self) {
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' | '`' => {
                    self.skip_string();
                    continue;
                }
                '/' if self.peek_at(1) == Some('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.skip_block_comment();
                    continue;
                }
                '/' if self.regex_allowed() => {
                    self.skip_regex();
                    continue;
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Skip a bracketed group, including nested groups and strings.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' | '`' => {
                    self.skip_string();
                    continue;
                }
                '/' if self.peek_at(1) == Some('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.skip_block_comment();
                    continue;
                }
                '/' if self.regex_allowed() => {
                    self.skip_regex();
                    continue;
                }
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Whether a `/` here starts a regex literal rather than a division,
    /// judged from the previous significant token.
    fn regex_allowed(&self) -> bool {
        let before = &self.chars[..self.pos];
        let Some(end) = before.iter().rposition(|c| !c.is_whitespace()) else {
            return true;
        };
        let prev = before[end];
        if is_ident_char(prev) {
            let start = before[..end]
                .iter()
                .rposition(|&c| !is_ident_char(c))
                .map_or(0, |i| i + 1);
            let word: String = before[start..=end].iter().collect();
            return REGEX_PREFIX_KEYWORDS.contains(&word.as_str());
        }
        !matches!(prev, ')' | ']' | '"' | '\'' | '`')
    }

    /// Skip a regex literal and its flags. The cursor is on the opening `/`.
    fn skip_regex(&mut self) {
        self.bump();
        let mut in_class = false;
        while let Some(c) = self.peek() {
            match c {
                '/' if !in_class => {
                    self.bump();
                    break;
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '\\' => {
                    self.bump();
                }
                // unterminated
                '\n' | '\r' => return,
                _ => {}
            }
            self.bump();
        }
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
    }

    /// Read a single- or double-quoted string literal's contents.
    fn read_string(&mut self) -> Option<String> {
        let quote = self.peek().filter(|&c| matches!(c, '"' | '\''))?;
        self.bump();
        let mut value = String::new();
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                c if c == quote => return Some(value),
                '\n' => return None,
                _ => value.push(c),
            }
        }
        None
    }

    fn read_ident(&mut self) -> Option<String> {
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        self.read_word()
    }

    /// Read a run of identifier characters (also matches numeric keys).
    fn read_word(&mut self) -> Option<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    /// An export name: identifier or string literal.
    fn read_name(&mut self) -> Option<String> {
        match self.peek() {
            Some('"' | '\'') => self.read_string(),
            _ => self.read_ident(),
        }
    }
}
