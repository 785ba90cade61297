mod types;

pub use types::*;

use std::str::FromStr;

// Characters rejected by at least one common filesystem
const INVALID_FILENAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Parse a template such as `2025-{1}-{2}-判决书`
///
/// `{` flushes the pending literal and starts a column reference, `}` closes it.
/// Braces must balance: an unterminated `{`, a nested `{` or a stray `}` is an error.
pub fn parse_template(template: &str) -> Result<NamingTemplate, TemplateError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut digits: Option<(usize, String)> = None;

    for (position, c) in template.chars().enumerate() {
        match (c, digits.as_mut()) {
            ('{', None) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                digits = Some((position, String::new()));
            }
            ('{', Some(_)) => return Err(TemplateError::UnbalancedBraces { position }),
            ('}', None) => return Err(TemplateError::UnbalancedBraces { position }),
            ('}', Some((_, buffer))) => {
                let index = buffer
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| TemplateError::InvalidColumn {
                        text: buffer.clone(),
                    })?;
                tokens.push(Token::Column(index));
                digits = None;
            }
            (c, Some((_, buffer))) => buffer.push(c),
            (c, None) => literal.push(c),
        }
    }

    if let Some((position, _)) = digits {
        return Err(TemplateError::UnbalancedBraces { position });
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    Ok(NamingTemplate { tokens })
}

impl FromStr for NamingTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_template(s)
    }
}

impl NamingTemplate {
    /// Render against one row of cells
    pub fn render<S: AsRef<str>>(&self, row: &[S]) -> Result<String, TemplateError> {
        let mut rendered = String::new();

        for token in &self.tokens {
            match token {
                Token::Literal(text) => rendered.push_str(text),
                Token::Column(index) => {
                    let cell = row.get(*index).ok_or(TemplateError::ColumnIndexOutOfRange {
                        index: *index,
                        len: row.len(),
                    })?;
                    rendered.push_str(cell.as_ref());
                }
            }
        }

        Ok(rendered)
    }
}

/// Replace characters that are not allowed in file names
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}
