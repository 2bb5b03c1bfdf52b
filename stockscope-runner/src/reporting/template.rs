//! `{placeholder}` substitution for HTML templates.
//!
//! A placeholder is `{` + identifier (`[A-Za-z0-9_]+`) + `}`. `{{` and `}}`
//! emit literal braces; any other brace is copied through, so inline CSS
//! such as `body { margin: 0 }` needs no escaping.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("template has no value for placeholder '{0}'")]
    MissingValue(String),
}

#[derive(Debug, Clone)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The file at `path` when given, otherwise the built-in text.
    pub fn load(path: Option<&Path>, builtin: &str) -> std::io::Result<Self> {
        match path {
            Some(p) => Ok(Self::new(std::fs::read_to_string(p)?)),
            None => Ok(Self::new(builtin)),
        }
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for token in tokens(&self.text) {
            if let Token::Placeholder(name) = token {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    pub fn render(&self, values: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.text.len());
        for token in tokens(&self.text) {
            match token {
                Token::Text(s) => out.push_str(s),
                Token::Placeholder(name) => {
                    let value = values
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingValue(name.to_string()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

enum Token<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn tokens(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'{' || bytes[i] == b'}') && bytes.get(i + 1) == Some(&bytes[i]);
        if escaped {
            tokens.push(Token::Text(&text[start..=i]));
            i += 2;
            start = i;
            continue;
        }
        if bytes[i] == b'{' {
            let name_len = bytes[i + 1..].iter().take_while(|&&b| is_ident(b)).count();
            let close = i + 1 + name_len;
            if name_len > 0 && bytes.get(close) == Some(&b'}') {
                tokens.push(Token::Text(&text[start..i]));
                tokens.push(Token::Placeholder(&text[i + 1..close]));
                i = close + 1;
                start = i;
                continue;
            }
        }
        i += 1;
    }
    tokens.push(Token::Text(&text[start..]));
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn values(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn substitutes_placeholders() {
        let t = Template::new("<h1>{symbol}</h1><p>{symbol} closed at {last_close}</p>");
        let out = t
            .render(&values(&[("symbol", "ACME"), ("last_close", "101.50")]))
            .unwrap();
        assert_eq!(out, "<h1>ACME</h1><p>ACME closed at 101.50</p>");
        assert_eq!(t.placeholders(), vec!["symbol", "last_close"]);
    }

    #[test]
    fn css_braces_pass_through() {
        let t = Template::new("body { margin: 0 } .x{color:red} {{literal}} {name}");
        let out = t.render(&values(&[("name", "v")])).unwrap();
        assert_eq!(out, "body { margin: 0 } .x{color:red} {literal} v");
    }

    #[test]
    fn missing_value_is_an_error() {
        let t = Template::new("{symbol} {absent}");
        assert_eq!(
            t.render(&values(&[("symbol", "ACME")])),
            Err(TemplateError::MissingValue("absent".to_string()))
        );
    }

    #[test]
    fn unterminated_brace_is_literal() {
        let t = Template::new("a {b");
        assert_eq!(t.render(&BTreeMap::new()).unwrap(), "a {b");
    }

    proptest! {
        #[test]
        fn brace_free_text_is_unchanged(text in "[^{}]*") {
            let t = Template::new(text.clone());
            prop_assert_eq!(t.render(&BTreeMap::new()).unwrap(), text);
        }

        #[test]
        fn placeholder_value_is_inserted_verbatim(value in "[^{}]*") {
            let t = Template::new("<p>{v}</p>");
            let out = t.render(&values(&[("v", value.as_str())])).unwrap();
            prop_assert_eq!(out, format!("<p>{value}</p>"));
        }
    }
}
