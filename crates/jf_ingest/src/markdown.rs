//! Converts feed summaries from HTML into the light markdown used in messages.

use scraper::{ElementRef, Html};

/// Renders an HTML fragment as markdown. Plain text passes through with
/// whitespace collapsed and `_` / `*` escaped.
pub fn html_to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render_children(fragment.root_element(), &mut out);
    tidy(&out)
}

fn render_children(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            push_text(out, text);
        } else if let Some(child) = ElementRef::wrap(child) {
            render_element(child, out);
        }
    }
}

fn render_inline(element: ElementRef) -> String {
    let mut inner = String::new();
    render_children(element, &mut inner);
    inner.trim().to_string()
}

/// Wraps the rendered content in `open`/`close`, keeping any edge
/// whitespace outside the markers.
fn wrap_inline(element: ElementRef, open: &str, close: &str, out: &mut String) {
    let mut raw = String::new();
    render_children(element, &mut raw);
    let inner = raw.trim();

    if raw.starts_with(char::is_whitespace) {
        push_text(out, " ");
    }
    if !inner.is_empty() {
        out.push_str(open);
        out.push_str(inner);
        out.push_str(close);
        if raw.ends_with(char::is_whitespace) {
            push_text(out, " ");
        }
    }
}

fn render_element(element: ElementRef, out: &mut String) {
    let name = element.value().name();
    match name {
        "script" | "style" | "head" | "img" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let inner = render_inline(element);
            if !inner.is_empty() {
                out.push_str("\n\n");
                out.push_str(&"#".repeat(level));
                out.push(' ');
                out.push_str(&inner);
                out.push_str("\n\n");
            }
        }
        "p" | "div" | "section" | "article" | "blockquote" | "ul" | "ol" => {
            out.push_str("\n\n");
            render_children(element, out);
            out.push_str("\n\n");
        }
        "li" => {
            let ordered = element
                .parent()
                .and_then(ElementRef::wrap)
                .map_or(false, |parent| parent.value().name() == "ol");
            out.push('\n');
            if ordered {
                let position = element
                    .prev_siblings()
                    .filter_map(ElementRef::wrap)
                    .filter(|sibling| sibling.value().name() == "li")
                    .count()
                    + 1;
                out.push_str(&format!("{}. ", position));
            } else {
                out.push_str("* ");
            }
            out.push_str(&render_inline(element));
        }
        "br" => out.push('\n'),
        "em" | "i" => wrap_inline(element, "*", "*", out),
        "strong" | "b" => wrap_inline(element, "**", "**", out),
        "code" => wrap_inline(element, "`", "`", out),
        "a" => match element.value().attr("href").map(str::trim).filter(|h| !h.is_empty()) {
            Some(href) => wrap_inline(element, "[", &format!("]({})", href), out),
            None => render_children(element, out),
        },
        _ => render_children(element, out),
    }
}

fn push_text(out: &mut String, text: &str) {
    let mut last_space = out.ends_with(char::is_whitespace);
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
            continue;
        }
        if c == '_' || c == '*' {
            out.push('\\');
        }
        out.push(c);
        last_space = false;
    }
}

/// Trims every line and keeps at most one blank line between blocks.
fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
