// ABOUTME: S-expression reader built from nom combinators

use nom::{
    branch::alt,
    character::complete::{char, multispace1, satisfy},
    combinator::value,
    multi::many0,
    IResult, Parser,
};

use crate::error::ParseError;
use crate::term::Term;

const SYMBOL_PUNCT: &str = "_+-*/?!<>=.:";

fn is_symbol_start(c: char) -> bool {
    (c.is_alphanumeric() && !c.is_ascii_digit()) || SYMBOL_PUNCT.contains(c)
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || SYMBOL_PUNCT.contains(c)
}

/// Skip whitespace and `;` comments (to end of line)
fn ws_and_comments(input: &str) -> IResult<&str, ()> {
    many0(alt((
        value((), multispace1),
        value((), (char(';'), nom::bytes::complete::take_while(|c| c != '\n'))),
    )))
    .map(|_| ())
    .parse(input)
}

/// Parse a number: optional `-`, a digit, digits or underscores, and an
/// optional `.digits` fraction. Underscores are readability separators.
fn parse_number(input: &str) -> IResult<&str, Term> {
    let (rest, sign) = nom::combinator::opt(char('-')).parse(input)?;
    let (rest, first) = satisfy(|c: char| c.is_ascii_digit())(rest)?;
    let (rest, digits) =
        nom::bytes::complete::take_while(|c: char| c.is_ascii_digit() || c == '_')(rest)?;

    let mut literal = String::new();
    if sign.is_some() {
        literal.push('-');
    }
    literal.push(first);
    literal.push_str(digits);

    // Optional fraction; a bare trailing dot is left for the symbol rules
    let (rest, fraction) = nom::combinator::opt((
        char('.'),
        nom::bytes::complete::take_while1(|c: char| c.is_ascii_digit()),
    ))
    .parse(rest)?;
    if let Some((_, frac)) = fraction {
        literal.push('.');
        literal.push_str(frac);
    }

    let cleaned: String = literal.chars().filter(|c| *c != '_').collect();
    match cleaned.parse::<f64>() {
        Ok(n) => Ok((rest, Term::Num(n))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

/// Parse a symbol over the Slight alphabet; `true` and `false` read as
/// booleans rather than symbols.
fn parse_symbol(input: &str) -> IResult<&str, Term> {
    let (rest, first) = satisfy(is_symbol_start)(input)?;
    let (rest, tail) = nom::bytes::complete::take_while(is_symbol_char)(rest)?;

    let mut ident = String::new();
    ident.push(first);
    ident.push_str(tail);

    let term = match ident.as_str() {
        "true" => Term::Bool(true),
        "false" => Term::Bool(false),
        _ => Term::Sym(ident),
    };
    Ok((rest, term))
}

/// Parse a keyword: `:` followed by symbol characters; self-evaluating
fn parse_keyword(input: &str) -> IResult<&str, Term> {
    let (rest, _) = char(':')(input)?;
    let (rest, first) = satisfy(|c| is_symbol_char(c) && c != ':')(rest)?;
    let (rest, tail) = nom::bytes::complete::take_while(is_symbol_char)(rest)?;

    let mut ident = String::new();
    ident.push(first);
    ident.push_str(tail);
    Ok((rest, Term::Key(ident)))
}

/// Parse a double-quoted string, handling `\"`, `\\`, and `\n` escapes.
/// Unknown escapes pass through verbatim.
fn parse_string(input: &str) -> IResult<&str, Term> {
    let (body, _) = char('"')(input)?;
    let mut result = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[i + 1..], Term::Str(result))),
            '\\' => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, '"')) => result.push('"'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, other)) => {
                    result.push('\\');
                    result.push(other);
                }
                None => break,
            },
            c => result.push(c),
        }
    }

    // Ran off the end without a closing quote
    Err(nom::Err::Failure(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// The quote reader: `'X` desugars to `(quote X)`
fn parse_quote(input: &str) -> IResult<&str, Term> {
    let (rest, _) = char('\'')(input)?;
    let (rest, expr) = parse_expr(rest)?;
    Ok((rest, Term::list(vec![Term::Sym("quote".to_string()), expr])))
}

/// Parse a list: `(expr …)`. The empty list reads as Nil.
fn parse_list(input: &str) -> IResult<&str, Term> {
    let (input, _) = char('(')(input)?;
    let (input, _) = ws_and_comments(input)?;

    let mut items = Vec::new();
    let mut remaining = input;

    loop {
        if let Ok((rest, _)) = char::<_, nom::error::Error<_>>(')')(remaining) {
            return Ok((rest, Term::list(items)));
        }
        if remaining.is_empty() {
            return Err(nom::Err::Failure(nom::error::Error::new(
                remaining,
                nom::error::ErrorKind::Eof,
            )));
        }

        let (rest, expr) = parse_expr(remaining)?;
        items.push(expr);

        let (rest, _) = ws_and_comments(rest)?;
        remaining = rest;
    }
}

fn parse_expr(input: &str) -> IResult<&str, Term> {
    let (input, _) = ws_and_comments(input)?;
    alt((
        parse_quote,
        parse_list,
        parse_number,
        parse_string,
        parse_keyword,
        parse_symbol,
    ))
    .parse(input)
}

/// Classify a nom failure into the reader error taxonomy
fn classify(leftover: &str) -> ParseError {
    let trimmed = leftover.trim_start();
    if trimmed.starts_with(')') {
        ParseError::UnmatchedParen
    } else if trimmed.starts_with('"') {
        ParseError::UnclosedString
    } else if trimmed.is_empty() {
        ParseError::UnclosedList
    } else {
        let snippet: String = trimmed.chars().take(24).collect();
        ParseError::UnrecognizedToken(snippet)
    }
}

/// Parses a whole source text into its top-level term sequence
pub fn parse_program(input: &str) -> Result<Vec<Term>, ParseError> {
    let mut terms = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = ws_and_comments(remaining).unwrap_or((remaining, ()));
        if rest.is_empty() {
            return Ok(terms);
        }
        match parse_expr(rest) {
            Ok((next, term)) => {
                terms.push(term);
                remaining = next;
            }
            Err(nom::Err::Failure(e)) => return Err(classify(e.input)),
            Err(_) => return Err(classify(rest)),
        }
    }
}

/// Parses exactly one expression and rejects trailing input
pub fn parse(input: &str) -> Result<Term, ParseError> {
    let terms = parse_program(input)?;
    let mut iter = terms.into_iter();
    match (iter.next(), iter.next()) {
        (Some(term), None) => Ok(term),
        (None, _) => Err(ParseError::UnclosedList),
        (Some(_), Some(extra)) => Err(ParseError::TrailingInput(extra.to_string())),
    }
}

/// True when every `(` has a matching `)` outside strings and comments.
/// The REPL keeps reading continuation lines while this is false.
pub fn is_balanced(input: &str) -> bool {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ';' => in_comment = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth <= 0 && !in_string
}
