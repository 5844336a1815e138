//! nginx-grammar parser and printer.
//!
//! Grammar: a file is a sequence of statements; a statement is one or
//! more words terminated by `;` (directive) or followed by a braced
//! child sequence (block). `#` starts a line comment. Single- and
//! double-quoted words keep their quotes so rendering round-trips
//! `return 200 "v1"` intact.

use crate::error::{ConfError, ConfResult};
use crate::tree::{ConfTree, Node};

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String, usize),
    Open(usize),
    Close(usize),
    Semi(usize),
}

fn tokenize(input: &str) -> ConfResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Line comment: skip to end of line.
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '{' => {
                chars.next();
                tokens.push(Token::Open(line));
            }
            '}' => {
                chars.next();
                tokens.push(Token::Close(line));
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semi(line));
            }
            quote @ ('"' | '\'') => {
                let start_line = line;
                chars.next();
                let mut word = String::new();
                word.push(quote);
                let mut terminated = false;
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    word.push(c);
                    if c == quote {
                        terminated = true;
                        break;
                    }
                }
                if !terminated {
                    return Err(ConfError::UnterminatedString(start_line));
                }
                tokens.push(Token::Word(word, start_line));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '{' | '}' | ';' | '#') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word, line));
            }
        }
    }

    Ok(tokens)
}

/// Parse configuration text into a tree.
pub fn parse(text: &str) -> ConfResult<ConfTree> {
    let tokens = tokenize(text)?;
    let mut pos = 0;
    let nodes = parse_nodes(&tokens, &mut pos, 0)?;
    Ok(ConfTree::new(nodes))
}

fn parse_nodes(tokens: &[Token], pos: &mut usize, depth: usize) -> ConfResult<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut words: Vec<String> = Vec::new();

    while *pos < tokens.len() {
        match &tokens[*pos] {
            Token::Word(word, _) => {
                words.push(word.clone());
                *pos += 1;
            }
            Token::Semi(line) => {
                *pos += 1;
                if words.is_empty() {
                    return Err(ConfError::EmptyDirective(*line));
                }
                let name = words.remove(0);
                nodes.push(Node::Directive {
                    name,
                    args: std::mem::take(&mut words),
                });
            }
            Token::Open(line) => {
                *pos += 1;
                if words.is_empty() {
                    return Err(ConfError::UnnamedBlock(*line));
                }
                let name = words.remove(0);
                let args = std::mem::take(&mut words);
                let children = parse_nodes(tokens, pos, depth + 1)?;
                nodes.push(Node::Block { name, args, children });
            }
            Token::Close(line) => {
                if depth == 0 {
                    return Err(ConfError::UnbalancedClose(*line));
                }
                if !words.is_empty() {
                    return Err(ConfError::UnexpectedEof("statement not terminated before '}'"));
                }
                *pos += 1;
                return Ok(nodes);
            }
        }
    }

    if depth > 0 {
        return Err(ConfError::UnexpectedEof("missing closing '}'"));
    }
    if !words.is_empty() {
        return Err(ConfError::UnexpectedEof("trailing statement missing ';'"));
    }
    Ok(nodes)
}

/// Render a tree back to configuration text.
pub fn render(tree: &ConfTree) -> String {
    let mut out = String::new();
    render_nodes(&tree.nodes, 0, &mut out);
    out
}

fn render_nodes(nodes: &[Node], depth: usize, out: &mut String) {
    for node in nodes {
        for _ in 0..depth {
            out.push_str("    ");
        }
        match node {
            Node::Directive { name, args } => {
                out.push_str(name);
                for arg in args {
                    out.push(' ');
                    out.push_str(arg);
                }
                out.push_str(";\n");
            }
            Node::Block { name, args, children } => {
                out.push_str(name);
                for arg in args {
                    out.push(' ');
                    out.push_str(arg);
                }
                out.push_str(" {\n");
                render_nodes(children, depth + 1, out);
                for _ in 0..depth {
                    out.push_str("    ");
                }
                out.push_str("}\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# frontend fleet config
worker_processes auto;

events {
    worker_connections 1024;
}

http {
    upstream app {
        server 10.0.0.1:3000;
        server 10.0.0.2:3000;
    }

    server {
        listen 0.0.0.0:8080;
        location / {
            proxy_pass http://app;
        }
    }
}
"#;

    #[test]
    fn parses_nested_blocks() {
        let tree = parse(SAMPLE).unwrap();
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].name(), "worker_processes");
        assert_eq!(tree.nodes[1].name(), "events");

        match &tree.nodes[2] {
            Node::Block { name, children, .. } => {
                assert_eq!(name, "http");
                assert_eq!(children.len(), 2);
                assert_eq!(children[0].name(), "upstream");
            }
            _ => panic!("expected http block"),
        }
    }

    #[test]
    fn comments_are_skipped() {
        let tree = parse("# only a comment\nlisten 80; # trailing\n").unwrap();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(
            tree.nodes[0],
            Node::directive("listen", &["80"])
        );
    }

    #[test]
    fn quoted_args_keep_quotes() {
        let tree = parse(r#"return 200 "v1";"#).unwrap();
        assert_eq!(
            tree.nodes[0],
            Node::directive("return", &["200", "\"v1\""])
        );
    }

    #[test]
    fn block_args_are_kept() {
        let tree = parse("location /api {\n  proxy_pass http://app;\n}\n").unwrap();
        match &tree.nodes[0] {
            Node::Block { name, args, children } => {
                assert_eq!(name, "location");
                assert_eq!(args, &["/api"]);
                assert_eq!(children.len(), 1);
            }
            _ => panic!("expected block"),
        }
    }

    #[test]
    fn render_parse_roundtrip() {
        let tree = parse(SAMPLE).unwrap();
        let rendered = tree.render();
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(tree, reparsed);
    }

    #[test]
    fn missing_close_brace_is_an_error() {
        assert_eq!(
            parse("http {\n listen 80;\n"),
            Err(ConfError::UnexpectedEof("missing closing '}'"))
        );
    }

    #[test]
    fn stray_close_brace_is_an_error() {
        assert_eq!(parse("}\n"), Err(ConfError::UnbalancedClose(1)));
    }

    #[test]
    fn bare_semicolon_is_an_error() {
        assert_eq!(parse(";\n"), Err(ConfError::EmptyDirective(1)));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert_eq!(
            parse("return 200 \"oops;\n"),
            Err(ConfError::UnterminatedString(1))
        );
    }

    #[test]
    fn anonymous_block_is_an_error() {
        assert_eq!(parse("{ listen 80; }"), Err(ConfError::UnnamedBlock(1)));
    }

    #[test]
    fn empty_input_parses_to_empty_tree() {
        assert_eq!(parse("").unwrap(), ConfTree::default());
        assert_eq!(parse("   \n\n").unwrap(), ConfTree::default());
    }
}
