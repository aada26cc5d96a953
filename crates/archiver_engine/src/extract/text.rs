use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Selector};

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of `element` on a single line.
pub(crate) fn inline_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of `element` with line structure kept: `<br>` and block elements
/// start new lines, paragraphs are separated by a blank line. Inline images
/// contribute their alt text (emoji are often rendered that way). Elements
/// matching `noise` are skipped entirely.
pub(crate) fn block_text(element: ElementRef<'_>, noise: &[Selector]) -> String {
    let mut builder = TextBuilder::default();
    for child in element.children() {
        visit_node(child, noise, &mut builder);
    }
    builder.finish()
}

fn visit_node(node: NodeRef<'_, Node>, noise: &[Selector], builder: &mut TextBuilder) {
    match node.value() {
        Node::Text(text) => builder.append_text(text),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                visit_element(element, noise, builder);
            }
        }
        _ => {}
    }
}

fn visit_element(element: ElementRef<'_>, noise: &[Selector], builder: &mut TextBuilder) {
    if noise.iter().any(|selector| selector.matches(&element)) {
        return;
    }
    let tag = element.value().name().to_ascii_lowercase();
    match tag.as_str() {
        "br" => builder.ensure_newline(),
        "img" => {
            if let Some(alt) = element.value().attr("alt") {
                builder.append_text(alt);
            }
        }
        "script" | "style" | "noscript" | "template" | "svg" => {}
        "p" => {
            builder.ensure_blank_line();
            visit_children(element, noise, builder);
            builder.ensure_blank_line();
        }
        "div" | "li" | "ul" | "ol" | "blockquote" | "section" | "article" | "h1" | "h2"
        | "h3" | "h4" | "h5" | "h6" | "figure" | "figcaption" | "pre" => {
            builder.ensure_newline();
            visit_children(element, noise, builder);
            builder.ensure_newline();
        }
        _ => visit_children(element, noise, builder),
    }
}

fn visit_children(element: ElementRef<'_>, noise: &[Selector], builder: &mut TextBuilder) {
    for child in element.children() {
        visit_node(child, noise, builder);
    }
}

#[derive(Default)]
struct TextBuilder {
    buffer: String,
    last_char: Option<char>,
}

impl TextBuilder {
    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if matches!(self.last_char, None | Some(' ') | Some('\n')) {
                    continue;
                }
                self.push_char(' ');
            } else {
                self.push_char(ch);
            }
        }
    }

    fn ensure_newline(&mut self) {
        if self.buffer.is_empty() || self.last_char == Some('\n') {
            return;
        }
        self.trim_trailing_space();
        self.push_char('\n');
    }

    fn ensure_blank_line(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.ensure_newline();
        if !self.buffer.ends_with("\n\n") {
            self.push_char('\n');
        }
    }

    fn trim_trailing_space(&mut self) {
        while self.buffer.ends_with(' ') {
            self.buffer.pop();
        }
        self.last_char = self.buffer.chars().last();
    }

    fn push_char(&mut self, ch: char) {
        self.buffer.push(ch);
        self.last_char = Some(ch);
    }

    fn finish(self) -> String {
        self.buffer
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn body_of(fragment: &str, noise: &[&str]) -> String {
        let html = Html::parse_fragment(fragment);
        let noise: Vec<Selector> = noise.iter().map(|css| Selector::parse(css).unwrap()).collect();
        let selector = Selector::parse("div.body").unwrap();
        let element = html.select(&selector).next().unwrap();
        block_text(element, &noise)
    }

    #[test]
    fn normalizes_runs_of_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn line_breaks_and_paragraphs_survive() {
        let text = body_of(
            r#"<div class="body"><p>First   line<br>second</p><p>Next paragraph</p></div>"#,
            &[],
        );
        assert_eq!(text, "First line\nsecond\n\nNext paragraph");
    }

    #[test]
    fn noise_is_skipped_and_emoji_alt_kept() {
        let text = body_of(
            r#"<div class="body">Great day <img alt="🎉" src="e.png"><span role="button">See more</span></div>"#,
            &["span[role='button']"],
        );
        assert_eq!(text, "Great day 🎉");
    }
}
