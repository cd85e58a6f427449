use crate::parser::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    Word(String), // Command or argument, quotes already removed
    RedirectIn,   // <
    RedirectOut,  // >
    Pipe,         // |
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn is_boundary(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '<' | '>' | '|')
}

// A word runs until an unquoted blank or operator; quoted and unquoted pieces
// that touch are glued together.
fn tokenize_word(chars: &mut Chars) -> Result<TokenType, ParseError> {
    let mut word = String::new();

    while let Some(&c) = chars.peek() {
        match c {
            c if is_boundary(c) => break,
            '\'' | '"' => {
                word.push_str(&tokenize_quoted_string(chars)?);
            }
            '\\' => {
                chars.next(); // consume backslash
                match chars.next() {
                    Some(escaped_char) => word.push(escaped_char),
                    None => word.push('\\'),
                }
            }
            _ => {
                word.push(c);
                chars.next();
            }
        }
    }
    Ok(TokenType::Word(word))
}

fn tokenize_quoted_string(chars: &mut Chars) -> Result<String, ParseError> {
    let mut quoted_string = String::new();
    let quote_char = match chars.next() {
        Some(q) => q,
        None => return Ok(quoted_string),
    };

    loop {
        match chars.next() {
            Some(c) if c == quote_char => return Ok(quoted_string),
            Some('\\') if quote_char == '"' => match chars.peek() {
                Some(&next) if next == '"' || next == '\\' => {
                    quoted_string.push(next);
                    chars.next();
                }
                _ => quoted_string.push('\\'),
            },
            Some(c) => quoted_string.push(c),
            None => return Err(ParseError::UnterminatedQuote(quote_char)),
        }
    }
}

pub fn tokenize(input: &str) -> Result<Vec<TokenType>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '<' => {
                chars.next();
                tokens.push(TokenType::RedirectIn);
            }
            '>' => {
                chars.next();
                tokens.push(TokenType::RedirectOut);
            }
            '|' => {
                chars.next();
                tokens.push(TokenType::Pipe);
            }
            _ => {
                tokens.push(tokenize_word(&mut chars)?);
            }
        }
    }
    Ok(tokens)
}
