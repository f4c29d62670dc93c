//! Expression front-end: constant substitution, function-call rewrite,
//! tokenization, and shunting-yard conversion to postfix.
//!
//! Function calls are lowered before tokenization: each `fn(args)` is
//! replaced by a bracketed form using a reserved bracket pair, so the
//! tokenizer can treat a whole call as a single operand token without a
//! full AST. The postfix emitter recursively compiles the bracket contents.

use phf::phf_map;
use xeno_container::{opcode, Diagnostic};

/// Longest accepted expression text, in bytes.
pub(crate) const MAX_EXPRESSION_LENGTH: usize = 1024;
/// Token-count cap applied to both the infix and postfix forms.
pub(crate) const MAX_EXPRESSION_TOKENS: usize = 100;

/// Symbolic constants substituted textually when they appear as isolated
/// tokens.
static CONSTANTS: phf::Map<&'static str, &'static str> = phf_map! {
    "M_PI" => "3.141592653589793",
    "M_E" => "2.718281828459045",
    "M_TAU" => "6.283185307179586",
    "M_SQRT2" => "1.4142135623730951",
    "M_SQRT3" => "1.7320508075688772",
    "P_LIGHT_SPEED" => "299792458",
};

/// A built-in math function and the reserved bracket pair its calls are
/// rewritten into.
pub(crate) struct FunctionInfo {
    pub name: &'static str,
    pub open: char,
    pub close: char,
    pub opcode: u8,
    pub num_args: u8,
}

pub(crate) const MATH_FUNCTIONS: &[FunctionInfo] = &[
    FunctionInfo { name: "abs", open: '[', close: ']', opcode: opcode::ABS, num_args: 1 },
    FunctionInfo { name: "max", open: '{', close: '}', opcode: opcode::MAX, num_args: 2 },
    FunctionInfo { name: "min", open: '|', close: '|', opcode: opcode::MIN, num_args: 2 },
    FunctionInfo { name: "sqrt", open: '~', close: '~', opcode: opcode::SQRT, num_args: 1 },
    FunctionInfo { name: "sin", open: '#', close: '#', opcode: opcode::SIN, num_args: 1 },
    FunctionInfo { name: "cos", open: '@', close: '@', opcode: opcode::COS, num_args: 1 },
    FunctionInfo { name: "tan", open: '&', close: '&', opcode: opcode::TAN, num_args: 1 },
];

/// Rewrites recognized symbolic constants into their decimal text. A match
/// counts only when its neighbors are not identifier characters.
pub(crate) fn process_constants(expr: &str) -> String {
    let mut result = expr.to_string();
    let mut pos = 0;

    while pos < result.len() {
        if !result.is_char_boundary(pos) {
            pos += 1;
            continue;
        }
        let b = result.as_bytes()[pos];
        if b == b'M' || b == b'P' {
            let mut advanced = false;
            for (name, value) in CONSTANTS.entries() {
                if result[pos..].starts_with(name) && is_isolated(&result, pos, name.len()) {
                    result.replace_range(pos..pos + name.len(), value);
                    pos += value.len();
                    advanced = true;
                    break;
                }
            }
            if advanced {
                continue;
            }
        }
        pos += 1;
    }

    result
}

fn is_isolated(s: &str, start: usize, len: usize) -> bool {
    let bytes = s.as_bytes();
    if start > 0 {
        let prev = bytes[start - 1];
        if prev.is_ascii_alphanumeric() || prev == b'_' {
            return false;
        }
    }
    if start + len < bytes.len() {
        let next = bytes[start + len];
        if next.is_ascii_alphanumeric() || next == b'_' {
            return false;
        }
    }
    true
}

/// Replaces each `fn(args)` call with its reserved bracketed form,
/// recursing into arguments. The depth counter is shared across all
/// functions within one call and bounded by the policy's expression depth;
/// exceeding it leaves the expression partially rewritten.
pub(crate) fn rewrite_functions(
    expr: &str,
    max_depth: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    if expr.len() > MAX_EXPRESSION_LENGTH {
        diagnostics.push(Diagnostic::error("Expression too long"));
        return expr.to_string();
    }

    let mut result = process_constants(expr);
    let mut depth = 0;

    for func in MATH_FUNCTIONS {
        let pattern = format!("{}(", func.name);
        loop {
            if depth >= max_depth {
                break;
            }
            let Some(pos) = result.find(&pattern) else {
                break;
            };
            let open = pos + func.name.len();
            let Some(end) = find_matching_paren(&result, open) else {
                break;
            };
            let inner = rewrite_functions(&result[open + 1..end], max_depth, diagnostics);
            result = format!(
                "{}{}{}{}{}",
                &result[..pos],
                func.open,
                inner,
                func.close,
                &result[end + 1..]
            );
            depth += 1;
        }
    }

    if depth >= max_depth {
        diagnostics.push(Diagnostic::error("Expression too complex"));
    }

    result
}

/// Finds the `)` matching the `(` at `open` by counted scan.
fn find_matching_paren(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut count = 1;
    for (i, &b) in bytes.iter().enumerate().skip(open + 1) {
        match b {
            b'(' => count += 1,
            b')' => {
                count -= 1;
                if count == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits an expression into tokens.
///
/// Double-quoted string literals are single tokens (quotes included), a
/// bracketed function form is a single token closed by its matching bracket
/// character, two-character comparison operators are recognized before
/// single-character splitting, and whitespace separates everything else.
pub(crate) fn tokenize(
    expr: &str,
    max_string_length: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<String> {
    let mut tokens = Vec::new();
    if expr.len() > MAX_EXPRESSION_LENGTH {
        diagnostics.push(Diagnostic::error("Expression too long"));
        return tokens;
    }

    let chars: Vec<char> = expr.chars().collect();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut closing: Option<char> = None;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '"' && closing.is_none() {
            if in_quotes {
                current.push(c);
                if current.len() > max_string_length {
                    diagnostics.push(Diagnostic::error("String too long"));
                    current = "\"\"".to_string();
                }
                tokens.push(std::mem::take(&mut current));
                in_quotes = false;
            } else {
                flush(&mut tokens, &mut current);
                in_quotes = true;
                current.push(c);
            }
            i += 1;
            continue;
        }

        if in_quotes {
            current.push(c);
            i += 1;
            continue;
        }

        match closing {
            None => {
                if let Some(close) = close_bracket(c) {
                    flush(&mut tokens, &mut current);
                    closing = Some(close);
                    current.push(c);
                    i += 1;
                    continue;
                }
            }
            Some(close) if c == close => {
                current.push(c);
                tokens.push(std::mem::take(&mut current));
                closing = None;
                i += 1;
                continue;
            }
            Some(_) => {
                current.push(c);
                i += 1;
                continue;
            }
        }

        if c.is_whitespace() {
            flush(&mut tokens, &mut current);
            i += 1;
            continue;
        }

        if i + 1 < chars.len() {
            let two: String = [c, chars[i + 1]].iter().collect();
            if matches!(two.as_str(), "==" | "!=" | "<=" | ">=") {
                flush(&mut tokens, &mut current);
                tokens.push(two);
                i += 2;
                continue;
            }
        }

        if matches!(c, '+' | '-' | '*' | '/' | '%' | '^' | '<' | '>' | '(' | ')') {
            flush(&mut tokens, &mut current);
            if c == '-' && expects_operand(&tokens) {
                // A minus with no left operand subtracts from zero.
                tokens.push("0".to_string());
            }
            tokens.push(c.to_string());
        } else {
            current.push(c);
        }
        i += 1;
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn flush(tokens: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// The close character paired with a reserved open bracket.
fn close_bracket(c: char) -> Option<char> {
    MATH_FUNCTIONS
        .iter()
        .find(|f| f.open == c)
        .map(|f| f.close)
}

/// True when the next token must be an operand, so a `-` here is unary.
fn expects_operand(tokens: &[String]) -> bool {
    match tokens.last() {
        None => true,
        Some(t) => t == "(" || is_operator_token(t),
    }
}

fn is_operator_token(token: &str) -> bool {
    matches!(
        token,
        "+" | "-" | "*" | "/" | "%" | "^" | "==" | "!=" | "<" | ">" | "<=" | ">="
    )
}

/// Shunting-yard conversion to postfix. `^` is right-associative; the
/// precedence table is `^:4, */%:3, +-:2, comparisons:1`.
pub(crate) fn infix_to_postfix(
    tokens: Vec<String>,
    max_name_len: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<String> {
    let mut output = Vec::with_capacity(tokens.len());
    if tokens.len() > MAX_EXPRESSION_TOKENS {
        diagnostics.push(Diagnostic::error("Too many tokens in expression"));
        return output;
    }

    let mut operators: Vec<String> = Vec::new();

    for token in tokens {
        if is_operand(&token, max_name_len) {
            output.push(token);
        } else if token == "(" {
            operators.push(token);
        } else if token == ")" {
            while matches!(operators.last(), Some(top) if top != "(") {
                if let Some(top) = operators.pop() {
                    output.push(top);
                }
            }
            operators.pop();
        } else {
            let token_precedence = precedence(&token);
            loop {
                let pop = match operators.last() {
                    Some(top) if top != "(" => {
                        let top_precedence = precedence(top);
                        top_precedence > token_precedence
                            || (top_precedence == token_precedence
                                && !is_right_associative(&token))
                    }
                    _ => false,
                };
                if !pop {
                    break;
                }
                if let Some(top) = operators.pop() {
                    output.push(top);
                }
            }
            operators.push(token);
        }
    }

    while let Some(op) = operators.pop() {
        output.push(op);
    }

    output
}

fn is_operand(token: &str, max_name_len: usize) -> bool {
    is_integer(token)
        || is_float(token)
        || is_bool(token)
        || is_quoted_string(token)
        || is_valid_variable(token, max_name_len)
        || bracketed_function(token).is_some()
}

/// The function whose bracket pair delimits this token, if any.
pub(crate) fn bracketed_function(token: &str) -> Option<&'static FunctionInfo> {
    if token.len() < 2 {
        return None;
    }
    MATH_FUNCTIONS
        .iter()
        .find(|f| token.starts_with(f.open) && token.ends_with(f.close))
}

pub(crate) fn precedence(op: &str) -> i32 {
    match op {
        "^" => 4,
        "*" | "/" | "%" => 3,
        "+" | "-" => 2,
        _ if is_comparison_operator(op) => 1,
        _ => 0,
    }
}

pub(crate) fn is_right_associative(op: &str) -> bool {
    op == "^"
}

pub(crate) fn is_comparison_operator(op: &str) -> bool {
    matches!(op, "==" | "!=" | "<" | ">" | "<=" | ">=")
}

/// Decimal integer literal: optional leading `-`, all digits, length <= 16,
/// value within i32.
pub(crate) fn is_integer(s: &str) -> bool {
    if s.is_empty() || s.len() > 16 {
        return false;
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    s.parse::<i64>()
        .is_ok_and(|v| i32::try_from(v).is_ok())
}

/// Decimal float literal: optional leading `-`, digits with exactly one
/// `.`, length <= 32.
pub(crate) fn is_float(s: &str) -> bool {
    if s.is_empty() || s.len() > 32 {
        return false;
    }
    let body = s.strip_prefix('-').unwrap_or(s);
    let mut has_decimal = false;
    for b in body.bytes() {
        match b {
            b'.' => {
                if has_decimal {
                    return false;
                }
                has_decimal = true;
            }
            b'0'..=b'9' => {}
            _ => return false,
        }
    }
    has_decimal && s.len() > 1
}

pub(crate) fn is_bool(s: &str) -> bool {
    s == "true" || s == "false"
}

pub(crate) fn is_quoted_string(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

/// ASCII identifier: letter or underscore, then letters/digits/underscores,
/// length bounded by the policy's variable-name limit.
pub(crate) fn is_valid_variable(s: &str, max_len: usize) -> bool {
    if s.is_empty() || s.len() > max_len {
        return false;
    }
    let bytes = s.as_bytes();
    if !(bytes[0].is_ascii_alphabetic() || bytes[0] == b'_') {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Fallible integer parse; failures yield zero.
pub(crate) fn parse_int(s: &str) -> i32 {
    s.parse().unwrap_or(0)
}

/// Fallible float parse; failures yield zero.
pub(crate) fn parse_float(s: &str) -> f32 {
    s.parse().unwrap_or(0.0)
}
