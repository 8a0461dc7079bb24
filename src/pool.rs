//! Thread-local HTML parser.
//!
//! A single edit parses markup up to three times: the page, the content
//! fragment, and the mutated page again during repair. Building a
//! tree-sitter parser means loading the grammar each time, so every thread
//! keeps one. Pipelines on different threads never share a parser.

use crate::ts::{HtmlParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static HTML_PARSER: RefCell<Option<HtmlParser>> = const { RefCell::new(None) };
}

/// Run `f` with this thread's parser, creating it on first use.
///
/// A call made from inside `f` gets a fresh parser instead of the pooled
/// one, which is still borrowed.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use html_patcher::pool::with_parser;
///
/// let has_errors = with_parser(|parser| {
///     parser.parse_with_source("<p>hi</p>").map(|p| p.has_errors())
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut HtmlParser) -> R,
{
    HTML_PARSER.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            return Ok(f(&mut HtmlParser::new()?));
        };
        let parser = match slot.take() {
            Some(parser) => parser,
            None => HtmlParser::new()?,
        };
        Ok(f(slot.insert(parser)))
    })
}
