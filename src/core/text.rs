// src/core/text.rs
//
// Flatten a parsed document into the lines a reader would see.
// Block-level elements and <br> break lines; inline elements run together.
// Text under script/style/head and friends is not visible and is skipped.

use scraper::{ElementRef, Html};

use super::sanitize::normalize_ws;

const HIDDEN: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "html", "li", "main", "nav", "ol", "option", "p", "pre", "section", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Visible, non-empty, whitespace-normalized lines in document order.
pub fn visible_lines(doc: &Html) -> Vec<String> {
    let mut buf = String::new();
    walk(doc.root_element(), &mut buf);

    buf.lines()
        .map(normalize_ws)
        .filter(|l| !l.is_empty())
        .collect()
}

fn walk(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if HIDDEN.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }

    let block = BLOCK.contains(&name);
    if block { out.push('\n'); }

    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            walk(child_el, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }

    if block { out.push('\n'); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_split_inline_joins() {
        let doc = Html::parse_document(
            "<html><head><title>t</title><style>.a{}</style></head><body>\
             <div>北京 <b>(东城)</b></div><p>12.3<span> nGy/h</span></p>\
             <script>var x = 1;</script>line<br>next</body></html>",
        );
        assert_eq!(
            visible_lines(&doc),
            vec!["北京 (东城)", "12.3 nGy/h", "line", "next"]
        );
    }

    #[test]
    fn blank_lines_dropped() {
        let doc = Html::parse_document("<div>\n   \n</div><div>&nbsp;</div><div> a \n b </div>");
        assert_eq!(visible_lines(&doc), vec!["a", "b"]);
    }
}
