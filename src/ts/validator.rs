use crate::pool;
use crate::ts::errors::TreeSitterError;

/// Validate that markup has no syntax errors.
///
/// Returns Ok(()) if the markup parses without ERROR nodes.
pub fn validate_markup(source: &str) -> Result<(), TreeSitterError> {
    let errors = pool::with_parser(|parser| {
        parser
            .parse_with_source(source)
            .map(|parsed| parsed.error_nodes())
    })??;

    match errors.len() {
        0 => Ok(()),
        1 => Err(TreeSitterError::SyntaxError {
            byte_start: errors[0].byte_start,
            byte_end: errors[0].byte_end,
        }),
        n => Err(TreeSitterError::MultipleSyntaxErrors { count: n }),
    }
}

/// Count ERROR and MISSING nodes in the markup.
///
/// Markup that tree-sitter refuses to parse at all counts as one error.
pub fn count_errors(source: &str) -> usize {
    match validate_markup(source) {
        Ok(()) => 0,
        Err(TreeSitterError::MultipleSyntaxErrors { count }) => count,
        Err(_) => 1,
    }
}
