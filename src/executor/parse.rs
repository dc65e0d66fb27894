//! Sequence/pipeline/segment/redirection grammar, built on top of
//! `tokenize`'s flat token stream.

use super::tokenize::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// `;` between statements.
    Sequence,
    /// `&&`: run only if the previous segment succeeded.
    And,
    /// `||`: run only if the previous segment failed.
    Or,
    /// `&`: run the preceding pipeline in the background.
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Truncate,
    Append,
    Input,
}

#[derive(Debug, Clone)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub target: String,
}

/// One command in a pipeline: argv plus which of its args came from double
/// quotes (and so must not be glob-expanded).
#[derive(Debug, Clone, Default)]
pub struct Segment {
    pub argv: Vec<String>,
    pub quoted: Vec<bool>,
    pub redirects: Vec<Redirect>,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub pipeline: Pipeline,
    /// The connector that follows this statement (how it joins the next one).
    pub connector: Option<Connector>,
}

pub fn parse(tokens: &[Token]) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut current_pipeline_tokens: Vec<Token> = Vec::new();
    let mut push_statement = |tokens: &mut Vec<Token>, connector: Option<Connector>, out: &mut Vec<Statement>| {
        if !tokens.is_empty() {
            out.push(Statement { pipeline: parse_pipeline(tokens), connector });
            tokens.clear();
        }
    };

    for token in tokens {
        match token {
            Token::Operator(op) if op == ";" => push_statement(&mut current_pipeline_tokens, Some(Connector::Sequence), &mut statements),
            Token::Operator(op) if op == "&&" => push_statement(&mut current_pipeline_tokens, Some(Connector::And), &mut statements),
            Token::Operator(op) if op == "||" => push_statement(&mut current_pipeline_tokens, Some(Connector::Or), &mut statements),
            Token::Operator(op) if op == "&" => push_statement(&mut current_pipeline_tokens, Some(Connector::Background), &mut statements),
            other => current_pipeline_tokens.push(other.clone()),
        }
    }
    push_statement(&mut current_pipeline_tokens, None, &mut statements);
    statements
}

fn parse_pipeline(tokens: &[Token]) -> Pipeline {
    let mut segments = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    for token in tokens {
        if matches!(token, Token::Operator(op) if op == "|") {
            segments.push(parse_segment(&current));
            current.clear();
        } else {
            current.push(token.clone());
        }
    }
    segments.push(parse_segment(&current));
    Pipeline { segments }
}

fn parse_segment(tokens: &[Token]) -> Segment {
    let mut segment = Segment::default();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Operator(op) if op == ">" || op == ">>" || op == "<" => {
                let kind = match op.as_str() {
                    ">" => RedirectKind::Truncate,
                    ">>" => RedirectKind::Append,
                    _ => RedirectKind::Input,
                };
                if let Some(Token::Word(target) | Token::QuotedWord(target)) = tokens.get(i + 1) {
                    segment.redirects.push(Redirect { kind, target: target.clone() });
                    i += 2;
                    continue;
                }
                i += 1;
            }
            Token::Word(word) => {
                segment.argv.push(word.clone());
                segment.quoted.push(false);
                i += 1;
            }
            Token::QuotedWord(word) => {
                segment.argv.push(word.clone());
                segment.quoted.push(true);
                i += 1;
            }
            Token::Operator(_) => {
                i += 1;
            }
        }
    }
    segment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tokenize::tokenize;

    #[test]
    fn splits_pipeline_and_redirection() {
        let statements = parse(&tokenize("cat f.txt | sort > out.txt"));
        assert_eq!(statements.len(), 1);
        let pipeline = &statements[0].pipeline;
        assert_eq!(pipeline.segments.len(), 2);
        assert_eq!(pipeline.segments[0].argv, vec!["cat", "f.txt"]);
        assert_eq!(pipeline.segments[1].argv, vec!["sort"]);
        assert_eq!(pipeline.segments[1].redirects[0].target, "out.txt");
    }

    #[test]
    fn sequencing_connectors_split_statements() {
        let statements = parse(&tokenize("mkdir a && cd a || echo fail"));
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].connector, Some(Connector::And));
        assert_eq!(statements[1].connector, None);
    }
}
