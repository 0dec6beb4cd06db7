//! Markup stripping for (X)HTML content documents.

use scraper::{ElementRef, Html, Node};

use crate::consts::{BLOCK_ELEMENTS, BODY_SELECTOR, SILENT_ELEMENTS, WHITESPACE_REGEX};

/// Returns the narratable text of an (X)HTML document's `<body>`.
///
/// Block-level elements end a line; inline elements don't. Whitespace within
/// a line is collapsed, blank lines are dropped, and the result is trimmed.
pub fn strip(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut buffer = String::new();
    // The HTML parser always synthesizes a body, but be lenient anyway.
    let root = document.select(&BODY_SELECTOR).next().unwrap_or_else(|| document.root_element());
    walk(root, &mut buffer);
    buffer
        .lines()
        .map(|line| WHITESPACE_REGEX.replace_all(line.trim(), " "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn walk(element: ElementRef<'_>, buffer: &mut String) {
    let name = element.value().name();
    if SILENT_ELEMENTS.contains(&name) {
        return;
    }
    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        buffer.push('\n');
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buffer.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    walk(child, buffer);
                }
            },
            _ => {},
        }
    }
    if block {
        buffer.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("<html><body><p>Hello</p><p>World</p></body></html>", "Hello\nWorld")]
    #[case("<html><body><p>He was <em>very</em> tired.</p></body></html>", "He was very tired.")]
    #[case("<html><head><title>Chapter 1</title></head><body><h1>One</h1></body></html>", "One")]
    #[case("<body><p>  lots \n\n of   space </p></body>", "lots\nof space")]
    #[case("<body><script>var x = 1;</script><p>Text</p><style>p {}</style></body>", "Text")]
    #[case("<body>line<br/>break</body>", "line\nbreak")]
    #[case("<body></body>", "")]
    #[case("<p>Fragment</p> only", "Fragment\nonly")]
    fn test_strip(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(strip(html), expected);
    }

    #[test]
    fn test_strip_xhtml() {
        let xhtml = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
  <head><title>Dune</title></head>
  <body>
    <section epub:type="chapter">
      <h2>Book One</h2>
      <p>A beginning is the time for taking the most delicate care.</p>
    </section>
  </body>
</html>"#;
        assert_eq!(strip(xhtml), "Book One\nA beginning is the time for taking the most delicate care.");
    }
}
