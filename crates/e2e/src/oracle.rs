//! CSS validity oracle.
//!
//! Scenarios judge the application's output with a [`CssValidator`]. The
//! built-in [`SyntaxValidator`] is structural: it checks that a stylesheet
//! tokenizes and nests correctly and that declarations are well formed. It
//! does not know property grammars.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One syntax problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssSyntaxError {
    /// Description
    pub message: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl fmt::Display for CssSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Judges CSS text; an empty result means valid
pub trait CssValidator: Send + Sync {
    /// Validate a stylesheet
    fn validate(&self, css: &str) -> Vec<CssSyntaxError>;

    /// Validator name for reports
    fn name(&self) -> &str {
        "css-validator"
    }
}

/// Fail unless `css` is valid
pub fn expect_valid(validator: &dyn CssValidator, css: &str) -> HarnessResult<()> {
    let errors = validator.validate(css);
    match errors.first() {
        None => Ok(()),
        Some(first) => Err(HarnessError::OracleFailed {
            message: format!(
                "{} rejected CSS expected to be valid ({} error(s), first at {first})",
                validator.name(),
                errors.len()
            ),
        }),
    }
}

/// Fail unless `css` is rejected; returns the errors found
pub fn expect_invalid(validator: &dyn CssValidator, css: &str) -> HarnessResult<Vec<CssSyntaxError>> {
    let errors = validator.validate(css);
    if errors.is_empty() {
        return Err(HarnessError::OracleFailed {
            message: format!(
                "{} accepted CSS expected to be malformed ({} bytes)",
                validator.name(),
                css.len()
            ),
        });
    }
    Ok(errors)
}

/// Deepest block nesting the parser follows
const MAX_NESTING: usize = 256;

/// At-rules that must carry a block
const BLOCK_AT_RULES: [&str; 10] = [
    "media",
    "supports",
    "keyframes",
    "-webkit-keyframes",
    "font-face",
    "page",
    "container",
    "counter-style",
    "property",
    "document",
];

/// At-rules whose block holds declarations rather than rules
fn has_declaration_block(name: &str) -> bool {
    matches!(
        name,
        "font-face" | "page" | "counter-style" | "property" | "viewport" | "font-palette-values"
    ) || ["top-", "bottom-", "left-", "right-"]
        .iter()
        .any(|margin| name.starts_with(margin))
}

fn is_valid_property_name(name: &str) -> bool {
    if let Some(custom) = name.strip_prefix("--") {
        return !custom.is_empty()
            && custom
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    }
    let body = name.strip_prefix('-').unwrap_or(name);
    let mut chars = body.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Structural CSS syntax checker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyntaxValidator {
    allow_empty: bool,
}

impl SyntaxValidator {
    /// Create a validator that rejects empty stylesheets
    #[must_use]
    pub const fn new() -> Self {
        Self { allow_empty: false }
    }

    /// Accept stylesheets with no rules
    #[must_use]
    pub const fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }
}

impl CssValidator for SyntaxValidator {
    fn validate(&self, css: &str) -> Vec<CssSyntaxError> {
        let mut parser = Parser::new(css);
        let items = parser.parse_rules(None);
        if items == 0 && !self.allow_empty && parser.errors.is_empty() {
            parser.errors.push(CssSyntaxError {
                message: "empty stylesheet".to_string(),
                line: 1,
                column: 1,
            });
        }
        parser.errors
    }

    fn name(&self) -> &str {
        "syntax-validator"
    }
}

#[derive(Debug, Clone, Copy)]
struct Ch {
    c: char,
    line: usize,
    column: usize,
}

struct Parser {
    chars: Vec<Ch>,
    pos: usize,
    depth: usize,
    errors: Vec<CssSyntaxError>,
}

impl Parser {
    /// Positions every char and blanks out comments
    fn new(css: &str) -> Self {
        let mut chars = Vec::with_capacity(css.len());
        let mut errors = Vec::new();
        let (mut line, mut column) = (1, 1);
        let mut quote: Option<char> = None;
        let mut comment_start: Option<(usize, usize)> = None;
        let mut iter = css.chars().peekable();

        while let Some(c) = iter.next() {
            let here = (line, column);
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }

            if comment_start.is_some() {
                if c == '*' && iter.peek() == Some(&'/') {
                    iter.next();
                    column += 1;
                    comment_start = None;
                }
                if c == '\n' {
                    chars.push(Ch { c, line: here.0, column: here.1 });
                }
                continue;
            }

            match quote {
                Some(q) if c == q || c == '\n' => quote = None,
                Some(_) if c == '\\' => {
                    chars.push(Ch { c, line: here.0, column: here.1 });
                    if let Some(next) = iter.next() {
                        let next_pos = (line, column);
                        if next == '\n' {
                            line += 1;
                            column = 1;
                        } else {
                            column += 1;
                        }
                        chars.push(Ch { c: next, line: next_pos.0, column: next_pos.1 });
                    }
                    continue;
                }
                Some(_) => {}
                None if c == '"' || c == '\'' => quote = Some(c),
                None if c == '/' && iter.peek() == Some(&'*') => {
                    iter.next();
                    column += 1;
                    comment_start = Some(here);
                    chars.push(Ch { c: ' ', line: here.0, column: here.1 });
                    continue;
                }
                None => {}
            }
            chars.push(Ch { c, line: here.0, column: here.1 });
        }

        if let Some((line, column)) = comment_start {
            errors.push(CssSyntaxError {
                message: "unterminated comment".to_string(),
                line,
                column,
            });
        }
        Self {
            chars,
            pos: 0,
            depth: 0,
            errors,
        }
    }

    fn peek(&self) -> Option<Ch> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Ch> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn error_at(&mut self, at: Ch, message: impl Into<String>) {
        self.errors.push(CssSyntaxError {
            message: message.into(),
            line: at.line,
            column: at.column,
        });
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|ch| ch.c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Read up to `;`, `{` or `}` at bracket depth zero, without consuming it
    fn read_component(&mut self) -> (String, Option<Ch>) {
        let mut text = String::new();
        let mut open: Vec<Ch> = Vec::new();
        while let Some(ch) = self.peek() {
            let at_stop = match ch.c {
                '{' | '}' => true,
                ';' => open.is_empty(),
                _ => false,
            };
            if at_stop {
                break;
            }
            match ch.c {
                '"' | '\'' => {
                    self.read_string(&mut text);
                    continue;
                }
                '(' | '[' => open.push(ch),
                ')' | ']' => {
                    let expected = if ch.c == ')' { '(' } else { '[' };
                    if open.last().map(|o| o.c) == Some(expected) {
                        open.pop();
                    } else {
                        self.error_at(ch, format!("unbalanced '{}'", ch.c));
                    }
                }
                _ => {}
            }
            text.push(ch.c);
            self.pos += 1;
        }
        for unclosed in open {
            self.error_at(unclosed, format!("unclosed '{}'", unclosed.c));
        }
        (text, self.peek())
    }

    fn read_string(&mut self, text: &mut String) {
        let Some(quote) = self.bump() else { return };
        text.push(quote.c);
        loop {
            match self.peek() {
                None => {
                    self.error_at(quote, "unterminated string");
                    return;
                }
                Some(ch) if ch.c == '\n' => {
                    self.error_at(quote, "unterminated string");
                    return;
                }
                Some(ch) if ch.c == '\\' => {
                    text.push(ch.c);
                    self.pos += 1;
                    if let Some(escaped) = self.bump() {
                        text.push(escaped.c);
                    }
                }
                Some(ch) => {
                    text.push(ch.c);
                    self.pos += 1;
                    if ch.c == quote.c {
                        return;
                    }
                }
            }
        }
    }

    /// Parse the block opened by `open`; input past the nesting limit is abandoned
    fn parse_block(&mut self, open: Ch, declarations: bool) {
        if self.depth >= MAX_NESTING {
            self.error_at(open, format!("nesting too deep (more than {MAX_NESTING} levels)"));
            self.pos = self.chars.len();
            return;
        }
        self.depth += 1;
        if declarations {
            self.parse_declarations(open);
        } else {
            self.parse_rules(Some(open));
        }
        self.depth -= 1;
    }

    /// Rule list until EOF (top level) or the `}` matching `open`
    fn parse_rules(&mut self, open: Option<Ch>) -> usize {
        let mut items = 0;
        loop {
            self.skip_ws();
            let Some(ch) = self.peek() else {
                if let Some(open) = open {
                    self.error_at(open, "unclosed '{'");
                }
                return items;
            };
            match ch.c {
                '}' => {
                    self.pos += 1;
                    if open.is_some() {
                        return items;
                    }
                    self.error_at(ch, "unbalanced '}'");
                }
                '@' => {
                    self.parse_at_rule();
                    items += 1;
                }
                _ => {
                    if self.parse_qualified_rule(ch) {
                        items += 1;
                    }
                }
            }
        }
    }

    fn parse_qualified_rule(&mut self, start: Ch) -> bool {
        let (prelude, stop) = self.read_component();
        let prelude = prelude.trim();
        match stop.map(|s| s.c) {
            Some('{') => {
                let Some(open) = self.bump() else { return false };
                if prelude.is_empty() {
                    self.error_at(open, "rule without a selector");
                }
                self.parse_block(open, true);
                true
            }
            Some(';') => {
                self.pos += 1;
                if prelude.contains(':') {
                    self.error_at(start, format!("declaration `{prelude}` outside of a rule"));
                } else if !prelude.is_empty() {
                    self.error_at(start, format!("unexpected `{prelude}`"));
                }
                false
            }
            _ => {
                if prelude.contains(':') && !prelude.contains(' ') {
                    self.error_at(start, format!("declaration `{prelude}` outside of a rule"));
                } else {
                    self.error_at(start, format!("selector `{prelude}` has no declaration block"));
                }
                false
            }
        }
    }

    fn parse_declarations(&mut self, open: Ch) {
        loop {
            self.skip_ws();
            let Some(ch) = self.peek() else {
                self.error_at(open, "unclosed '{'");
                return;
            };
            match ch.c {
                '}' => {
                    self.pos += 1;
                    return;
                }
                ';' => self.pos += 1,
                '@' => self.parse_at_rule(),
                _ => {
                    let (text, stop) = self.read_component();
                    match stop.map(|s| s.c) {
                        Some('{') => {
                            // nested rule
                            let Some(inner) = self.bump() else { return };
                            if text.trim().is_empty() {
                                self.error_at(inner, "rule without a selector");
                            }
                            self.parse_block(inner, true);
                        }
                        Some(';') => {
                            self.pos += 1;
                            self.check_declaration(&text, ch);
                        }
                        _ => self.check_declaration(&text, ch),
                    }
                }
            }
        }
    }

    fn check_declaration(&mut self, text: &str, at: Ch) {
        let Some((name, value)) = text.split_once(':') else {
            self.error_at(at, format!("expected ':' in declaration `{}`", text.trim()));
            return;
        };
        let name = name.trim();
        if !is_valid_property_name(name) {
            self.error_at(at, format!("invalid property name `{name}`"));
            return;
        }
        let value = value.trim();
        let value = value
            .strip_suffix("!important")
            .map_or(value, str::trim_end);
        if value.is_empty() && !name.starts_with("--") {
            self.error_at(at, format!("empty value for `{name}`"));
        }
    }

    fn parse_at_rule(&mut self) {
        let Some(at) = self.bump() else { return };
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.c.is_alphanumeric() || ch.c == '-' || ch.c == '_' {
                name.push(ch.c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if name.is_empty() {
            self.error_at(at, "at-rule without a name");
        }
        let name = name.to_ascii_lowercase();

        let (_prelude, stop) = self.read_component();
        match stop.map(|s| s.c) {
            Some(';') => {
                self.pos += 1;
                if BLOCK_AT_RULES.contains(&name.as_str()) {
                    self.error_at(at, format!("@{name} requires a block"));
                }
            }
            Some('{') => {
                let Some(open) = self.bump() else { return };
                self.parse_block(open, has_declaration_block(&name));
            }
            _ => self.error_at(at, format!("@{name} is missing ';' or a block")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn errors(css: &str) -> Vec<CssSyntaxError> {
        SyntaxValidator::new().validate(css)
    }

    fn first_message(css: &str) -> String {
        errors(css)
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_default()
    }

    mod valid_tests {
        use super::*;

        #[test]
        fn test_simple_rules() {
            assert!(errors(".a{color:red}.b{margin:0 auto}").is_empty());
            assert!(errors(".a { color: red; }\n\n.b > .c:hover { padding: 1px 2px; }").is_empty());
        }

        #[test]
        fn test_at_rules() {
            let css = r#"
                @charset "utf-8";
                @import url("base.css");
                @media (max-width: 769px) { .a { width: 50%; } }
                @supports (display: grid) { .b { display: grid } }
                @keyframes fade { from { opacity: 0 } 50% { opacity: .5 } to { opacity: 1 } }
                @font-face { font-family: "X"; src: url(x.woff2) format("woff2"); }
            "#;
            assert_eq!(errors(css), vec![]);
        }

        #[test]
        fn test_custom_and_vendor_properties() {
            let css = ":root{--main-color:#333;--empty:;}.a{-webkit-transition:all 1s;color:var(--main-color)!important}";
            assert!(errors(css).is_empty());
        }

        #[test]
        fn test_comments_and_strings() {
            let css = "/* header */ .a::before { content: \"{;}\" } /* a{ */";
            assert!(errors(css).is_empty());
        }

        #[test]
        fn test_data_uri_with_semicolon() {
            let css = ".a{background:url(data:image/png;base64,AAAA)}";
            assert!(errors(css).is_empty());
        }

        #[test]
        fn test_nested_rule() {
            assert!(errors(".a{color:red;&:hover{color:blue}}").is_empty());
        }
    }

    mod invalid_tests {
        use super::*;

        #[test]
        fn test_empty_values() {
            let found = errors(".header{background-color:;color:#fff;padding:}");
            assert_eq!(found.len(), 2);
            assert!(found[0].message.contains("background-color"));
            assert!(found[1].message.contains("padding"));
        }

        #[test]
        fn test_unclosed_block() {
            assert_eq!(first_message(".a{color:red"), "unclosed '{'");
        }

        #[test]
        fn test_deep_nesting_is_reported() {
            let found = errors(&"a{".repeat(100_000));
            assert_eq!(
                found.iter().filter(|e| e.message.starts_with("nesting too deep")).count(),
                1
            );
            let found = errors(&"@media screen{".repeat(10_000));
            assert!(found.iter().any(|e| e.message.starts_with("nesting too deep")));
        }

        #[test]
        fn test_nesting_within_limit() {
            let css = format!("{}color:red{}", ".a{".repeat(100), "}".repeat(100));
            assert!(errors(&css).is_empty());
        }

        #[test]
        fn test_unbalanced_close() {
            assert_eq!(first_message(".a{color:red}}"), "unbalanced '}'");
        }

        #[test]
        fn test_missing_brace_between_rules() {
            let found = errors(".a{color:#333;padding:10px 20px .nav{display:flex}");
            assert!(found.iter().any(|e| e.message == "unclosed '{'"));
        }

        #[test]
        fn test_missing_colon() {
            assert!(first_message(".a{color red}").starts_with("expected ':'"));
        }

        #[test]
        fn test_missing_selector() {
            assert_eq!(first_message("{color:red}"), "rule without a selector");
        }

        #[test]
        fn test_stray_declaration() {
            assert!(first_message("color:red;").contains("outside of a rule"));
            assert!(first_message("color:red").contains("outside of a rule"));
        }

        #[test]
        fn test_invalid_property_name() {
            assert_eq!(first_message(".a{1color:red}"), "invalid property name `1color`");
            assert_eq!(first_message(".a{co lor:red}"), "invalid property name `co lor`");
        }

        #[test]
        fn test_unclosed_paren() {
            assert_eq!(first_message(".a{width:calc(1px + 2px}"), "unclosed '('");
        }

        #[test]
        fn test_unterminated_comment_and_string() {
            assert_eq!(first_message(".a{color:red} /* trailing"), "unterminated comment");
            assert_eq!(first_message(".a{content:\"abc}\n"), "unterminated string");
        }

        #[test]
        fn test_empty_stylesheet() {
            assert_eq!(first_message("  \n /* nothing */ "), "empty stylesheet");
            assert!(SyntaxValidator::new().allow_empty(true).validate("").is_empty());
        }

        #[test]
        fn test_block_at_rule_without_block() {
            assert_eq!(first_message("@media screen;"), "@media requires a block");
        }

        #[test]
        fn test_error_position() {
            let found = errors(".a{color:red}\n.b{\n  margin:;\n}");
            assert_eq!(found.len(), 1);
            assert_eq!((found[0].line, found[0].column), (3, 3));
            assert_eq!(found[0].to_string(), "3:3: empty value for `margin`");
        }
    }

    mod helper_tests {
        use super::*;

        #[test]
        fn test_expect_helpers() {
            let v = SyntaxValidator::new();
            assert!(expect_valid(&v, ".a{b:c}").is_ok());
            assert!(matches!(
                expect_valid(&v, ".a{b:}"),
                Err(HarnessError::OracleFailed { .. })
            ));
            assert_eq!(expect_invalid(&v, ".a{b:}").unwrap().len(), 1);
            assert!(expect_invalid(&v, ".a{b:c}").is_err());
        }
    }

    proptest! {
        #[test]
        fn prop_generated_rules_are_valid(
            rules in prop::collection::vec(
                ("[a-z]{1,8}", "[a-z][a-z-]{0,10}", "[0-9]{1,4}(px|rem|em|%)"),
                1..8,
            )
        ) {
            let css: String = rules
                .iter()
                .map(|(sel, prop, val)| format!(".{sel}{{{prop}:{val}}}"))
                .collect();
            prop_assert!(errors(&css).is_empty(), "{css}");
        }

        #[test]
        fn prop_dropping_a_closing_brace_is_detected(
            sels in prop::collection::vec("[a-z]{1,8}", 1..6)
        ) {
            let mut css: String = sels.iter().map(|s| format!(".{s}{{color:red}}")).collect();
            css.pop();
            prop_assert!(!errors(&css).is_empty());
        }
    }
}
