use thiserror::Error;

/// One piece of a naming template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text copied verbatim into the rendered name
    Literal(String),
    /// Reference to a 0-indexed column of the row being rendered
    Column(usize),
}

/// A parsed `{index}` naming template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingTemplate {
    pub(super) tokens: Vec<Token>,
}

impl NamingTemplate {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Highest column index referenced, if any
    pub fn max_column(&self) -> Option<usize> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Column(i) => Some(*i),
                Token::Literal(_) => None,
            })
            .max()
    }

    /// Fail early when a row of `width` cells could never satisfy this template
    pub fn check_width(&self, width: usize) -> Result<(), TemplateError> {
        match self.max_column() {
            Some(index) if index >= width => {
                Err(TemplateError::ColumnIndexOutOfRange { index, len: width })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unbalanced braces at position {position} in template")]
    UnbalancedBraces { position: usize },

    #[error("Invalid column reference '{{{text}}}': expected a non-negative integer")]
    InvalidColumn { text: String },

    #[error("Column index {index} is out of range for a row with {len} columns")]
    ColumnIndexOutOfRange { index: usize, len: usize },
}
