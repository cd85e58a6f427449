use thiserror::Error;

use crate::ast::{Pipeline, Stage};
use crate::tokenizer::{tokenize, TokenType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command line")]
    Empty,
    #[error("invalid null command")]
    NullCommand,
    #[error("{0}: ambiguous input")]
    AmbiguousInput(String),
    #[error("{0}: ambiguous output")]
    AmbiguousOutput(String),
    #[error("missing name for redirect")]
    MissingTarget,
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
}

pub fn parse(line: &str) -> Result<Pipeline, ParseError> {
    let tokens = tokenize(line)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut iter = tokens.into_iter().peekable();
    let mut stages = Vec::new();
    loop {
        stages.push(parse_stage(&mut iter)?);
        match iter.next() {
            Some(TokenType::Pipe) => continue,
            Some(_) => return Err(ParseError::NullCommand),
            None => break,
        }
    }

    check_redirects(&stages)?;

    #[cfg(debug_assertions)]
    tracing::trace!(stages = stages.len(), "parsed pipeline");

    Ok(Pipeline::new(line.trim_end_matches(['\n', '\r']), stages))
}

// Consumes tokens up to (not including) the next pipe.
fn parse_stage<I>(tokens: &mut std::iter::Peekable<I>) -> Result<Stage, ParseError>
where
    I: Iterator<Item = TokenType>,
{
    let mut stage = Stage::default();

    while let Some(token) = tokens.peek() {
        match token {
            TokenType::Pipe => break,
            TokenType::Word(_) => {
                if let Some(TokenType::Word(word)) = tokens.next() {
                    stage.argv.push(word);
                }
            }
            TokenType::RedirectIn | TokenType::RedirectOut => {
                let is_input = matches!(tokens.next(), Some(TokenType::RedirectIn));
                let target = match tokens.next() {
                    Some(TokenType::Word(target)) => target,
                    _ => return Err(ParseError::MissingTarget),
                };
                let name = stage.program().to_string();
                if is_input {
                    if stage.input.replace(target).is_some() {
                        return Err(ParseError::AmbiguousInput(name));
                    }
                } else if stage.output.replace(target).is_some() {
                    return Err(ParseError::AmbiguousOutput(name));
                }
            }
        }
    }

    if stage.argv.is_empty() {
        return Err(ParseError::NullCommand);
    }
    Ok(stage)
}

// Only the ends of a pipeline may be redirected; everything in between is
// already spoken for by a pipe.
fn check_redirects(stages: &[Stage]) -> Result<(), ParseError> {
    let last = stages.len() - 1;
    for (i, stage) in stages.iter().enumerate() {
        if i > 0 && stage.input.is_some() {
            return Err(ParseError::AmbiguousInput(stage.program().to_string()));
        }
        if i < last && stage.output.is_some() {
            return Err(ParseError::AmbiguousOutput(stage.program().to_string()));
        }
    }
    Ok(())
}
