use crate::ast::Stage;
use crate::parser::{parse, ParseError};
use crate::tokenizer::{tokenize, TokenType};

fn words(input: &str) -> Vec<TokenType> {
    tokenize(input).unwrap()
}

fn word(s: &str) -> TokenType {
    TokenType::Word(s.to_string())
}

#[test]
fn test_escape_character() {
    assert_eq!(words(r"echo Hello\ World"), vec![word("echo"), word("Hello World")]);
}

#[test]
fn test_quotes() {
    assert_eq!(words(r"echo 'Hello World'"), vec![word("echo"), word("Hello World")]);
    assert_eq!(words(r#"echo "hello 'world'""#), vec![word("echo"), word("hello 'world'")]);
    assert_eq!(words(r#"echo 'hello "world"'"#), vec![word("echo"), word("hello \"world\"")]);
    assert_eq!(words(r#"echo "say \"hi\"""#), vec![word("echo"), word("say \"hi\"")]);
    // Pieces that touch make one word
    assert_eq!(words(r#"echo a"b c"'d'"#), vec![word("echo"), word("ab cd")]);
    // Operators inside quotes are just text
    assert_eq!(words("echo '|<>'"), vec![word("echo"), word("|<>")]);
}

#[test]
fn test_operators() {
    assert_eq!(
        words("cat<in|sort>out"),
        vec![
            word("cat"),
            TokenType::RedirectIn,
            word("in"),
            TokenType::Pipe,
            word("sort"),
            TokenType::RedirectOut,
            word("out"),
        ]
    );
}

#[test]
fn test_parse_pipeline() {
    let pipeline = parse("sort -r < in.txt | uniq -c | head -n 3 > out.txt\n").unwrap();
    assert_eq!(pipeline.line, "sort -r < in.txt | uniq -c | head -n 3 > out.txt");
    assert_eq!(pipeline.len(), 3);
    assert_eq!(
        pipeline.stages[0],
        Stage {
            argv: vec!["sort".into(), "-r".into()],
            input: Some("in.txt".into()),
            output: None,
        }
    );
    assert_eq!(pipeline.stages[1], Stage::new(["uniq", "-c"]));
    assert_eq!(pipeline.stages[2].output.as_deref(), Some("out.txt"));
    assert_eq!(pipeline.stages[2].args(), ["-n", "3"]);
}

#[test]
fn test_parse_errors() {
    assert_eq!(parse("   "), Err(ParseError::Empty));
    assert_eq!(parse("| ls"), Err(ParseError::NullCommand));
    assert_eq!(parse("ls |"), Err(ParseError::NullCommand));
    assert_eq!(parse("ls | | wc"), Err(ParseError::NullCommand));
    assert_eq!(parse("ls >"), Err(ParseError::MissingTarget));
    assert_eq!(parse("ls > | wc"), Err(ParseError::MissingTarget));
    assert_eq!(parse("ls | wc < f"), Err(ParseError::AmbiguousInput("wc".into())));
    assert_eq!(parse("ls > f | wc"), Err(ParseError::AmbiguousOutput("ls".into())));
    assert_eq!(parse("cat < a < b"), Err(ParseError::AmbiguousInput("cat".into())));
    assert_eq!(parse("echo 'oops"), Err(ParseError::UnterminatedQuote('\'')));
}

#[test]
fn test_debug_report() {
    let pipeline = parse("ls -l | wc > count").unwrap();
    let report = pipeline.to_string();
    assert!(report.contains("Stage 0: \"ls -l\""));
    assert!(report.contains("output: pipe to stage 1"));
    assert!(report.contains("input: pipe from stage 0"));
    assert!(report.contains("output: count"));
    assert!(report.contains("argv: \"ls\",\"-l\""));
}
