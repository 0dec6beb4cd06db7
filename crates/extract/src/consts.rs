use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

selector!(BODY_SELECTOR, "body");
regex!(WHITESPACE_REGEX, r"\s+");

/// Elements whose boundaries end a line of narrated text.
pub(crate) const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "nav", "ol", "p", "pre", "section", "table", "td",
    "th", "tr", "ul",
];
/// Elements whose text is never narrated.
pub(crate) const SILENT_ELEMENTS: &[&str] = &["head", "noscript", "script", "style", "template"];

/// Fixed arguments for rasterizing the first page of a PDF as a JPEG.
pub(crate) const PDFTOPPM_ARGS: &[&str] = &["-jpeg", "-f", "1", "-l", "1", "-singlefile"];
/// Rendering one page should take seconds; anything longer is a stuck renderer.
pub(crate) const PDFTOPPM_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);
