//! Structural outline of a unit's source: functions, registrations, docs and
//! block nesting, built from the token stream.
//!
//! Building an outline also validates the source: delimiters must balance and
//! the script must compile. Either failure is a [`ParseFailure`].

use thiserror::Error;

use super::lexer::{lex, line_of, Spanned, Token};

/// Name of the registration function.
pub const REGISTRATION_FN: &str = "strategy";

/// The source could not be parsed; quality degrades to all zeroes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("unrecognised input at line {line}")]
    Lex { line: usize },

    #[error("unexpected '{found}' at line {line}")]
    Unbalanced { found: char, line: usize },

    #[error("unclosed '{open}' opened at line {line}")]
    Unclosed { open: char, line: usize },

    #[error("syntax error: {0}")]
    Syntax(String),
}

/// A function definition found in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct FnOutline<'s> {
    pub name: &'s str,
    pub params: usize,
    /// Preceded by a `///` doc comment.
    pub documented: bool,
    pub line: usize,
}

/// One open delimiter on the nesting stack.
#[derive(Debug, Clone, Copy)]
struct Frame {
    open: char,
    line: usize,
    /// Body of an `if` or `else`.
    conditional: bool,
}

/// Parsed view of one unit's source.
#[derive(Debug, Clone)]
pub struct SourceOutline<'s> {
    tokens: Vec<Token<'s>>,
    pub functions: Vec<FnOutline<'s>>,
    /// Number of `strategy(...)` registration calls.
    pub registrations: usize,
    /// Unit-level doc text exists (`//!`, or `///` on a registration).
    pub unit_documented: bool,
    /// Enclosing `if`/`else` block count for every `return`.
    pub return_depths: Vec<usize>,
}

impl<'s> SourceOutline<'s> {
    pub fn parse(source: &'s str) -> Result<Self, ParseFailure> {
        let spanned = lex(source).map_err(|e| ParseFailure::Lex {
            line: line_of(source, e.offset),
        })?;
        let return_depths = scan_nesting(source, &spanned)?;

        rhai::Engine::new_raw()
            .compile(source)
            .map_err(|e| ParseFailure::Syntax(e.to_string()))?;

        let tokens: Vec<Token<'s>> = spanned.iter().map(|(t, _)| *t).collect();
        let functions = collect_functions(source, &spanned);
        let (registrations, documented_registration) = collect_registrations(&tokens);
        let has_inner_doc = tokens.iter().any(|t| matches!(t, Token::InnerDoc(text) if !text.is_empty()));

        Ok(Self {
            tokens,
            functions,
            registrations,
            unit_documented: has_inner_doc || documented_registration,
            return_depths,
        })
    }

    pub fn tokens(&self) -> &[Token<'s>] {
        &self.tokens
    }

    pub fn defines(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
    }

    pub fn count(&self, pred: impl Fn(&Token<'s>) -> bool) -> usize {
        self.tokens.iter().filter(|t| pred(*t)).count()
    }

    /// Comparisons of anything against `()` with `==` or `!=`.
    pub fn unit_comparisons(&self) -> usize {
        let t = &self.tokens;
        let is_cmp = |tok: &Token<'_>| matches!(tok, Token::EqEq | Token::NotEq);
        let mut count = 0;
        for i in 0..t.len() {
            if !is_cmp(&t[i]) {
                continue;
            }
            let right = matches!(t.get(i + 1..i + 3), Some([Token::LParen, Token::RParen]));
            let left = i >= 2 && matches!(t[i - 2..i], [Token::LParen, Token::RParen]);
            if right || left {
                count += 1;
            }
        }
        count
    }

    /// Numeric literal values with unary minus folded in.
    pub fn numeric_literals(&self) -> Vec<f64> {
        let t = &self.tokens;
        t.iter()
            .enumerate()
            .filter_map(|(i, tok)| match tok {
                Token::Number(v) => {
                    let negated = i >= 1
                        && t[i - 1] == Token::Minus
                        && (i < 2 || !t[i - 2].ends_operand());
                    Some(if negated { -v } else { *v })
                }
                _ => None,
            })
            .collect()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &'s str> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            Token::Ident(name) => Some(*name),
            _ => None,
        })
    }
}

/// Match delimiters and record the conditional depth of every `return`.
fn scan_nesting(source: &str, spanned: &[Spanned<'_>]) -> Result<Vec<usize>, ParseFailure> {
    let mut stack: Vec<Frame> = Vec::new();
    // Stack height at which the next `{` opens an if/else body
    let mut pending_conditional: Option<usize> = None;
    let mut return_depths = Vec::new();

    for (token, span) in spanned {
        let line = line_of(source, span.start);
        match token {
            Token::If | Token::Else => pending_conditional = Some(stack.len()),
            Token::LBrace => {
                let conditional = pending_conditional == Some(stack.len());
                if conditional {
                    pending_conditional = None;
                }
                stack.push(Frame { open: '{', line, conditional });
            }
            Token::MapOpen => stack.push(Frame { open: '{', line, conditional: false }),
            Token::LParen => stack.push(Frame { open: '(', line, conditional: false }),
            Token::LBracket => stack.push(Frame { open: '[', line, conditional: false }),
            Token::RBrace | Token::RParen | Token::RBracket => {
                let (found, expected) = match token {
                    Token::RBrace => ('}', '{'),
                    Token::RParen => (')', '('),
                    _ => (']', '['),
                };
                match stack.pop() {
                    Some(frame) if frame.open == expected => {}
                    _ => return Err(ParseFailure::Unbalanced { found, line }),
                }
            }
            Token::Return => {
                return_depths.push(stack.iter().filter(|f| f.conditional).count());
            }
            _ => {}
        }
    }

    match stack.pop() {
        Some(frame) => Err(ParseFailure::Unclosed {
            open: frame.open,
            line: frame.line,
        }),
        None => Ok(return_depths),
    }
}

fn collect_functions<'s>(source: &str, spanned: &[Spanned<'s>]) -> Vec<FnOutline<'s>> {
    let mut functions = Vec::new();
    for (i, (token, span)) in spanned.iter().enumerate() {
        if *token != Token::Fn {
            continue;
        }
        let Some((Token::Ident(name), _)) = spanned.get(i + 1) else {
            continue;
        };

        let mut params = 0;
        let mut saw_param = false;
        for (tok, _) in spanned.iter().skip(i + 3) {
            match tok {
                Token::RParen => break,
                Token::Ident(_) if !saw_param => {
                    saw_param = true;
                    params += 1;
                }
                Token::Punct(",") => saw_param = false,
                _ => {}
            }
        }

        let mut before = i;
        if before > 0 && spanned[before - 1].0 == Token::Private {
            before -= 1;
        }
        let documented = before > 0 && matches!(spanned[before - 1].0, Token::OuterDoc(text) if !text.is_empty());

        functions.push(FnOutline {
            name: *name,
            params,
            documented,
            line: line_of(source, span.start),
        });
    }
    functions
}

/// Registration call count, and whether any registration carries a `///` doc.
fn collect_registrations(tokens: &[Token<'_>]) -> (usize, bool) {
    let mut count = 0;
    let mut documented = false;
    for (i, token) in tokens.iter().enumerate() {
        if *token != Token::Ident(REGISTRATION_FN) || tokens.get(i + 1) != Some(&Token::LParen) {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| tokens[p]);
        if matches!(prev, Some(Token::Fn) | Some(Token::Punct("."))) {
            continue;
        }
        count += 1;
        if matches!(prev, Some(Token::OuterDoc(text)) if !text.is_empty()) {
            documented = true;
        }
    }
    (count, documented)
}
