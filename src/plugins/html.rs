//! HTML page to scraped payload conversion.

use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};

const SKIP_TAGS: [&str; 7] = ["script", "style", "noscript", "nav", "header", "footer", "aside"];
const BLOCK_TAGS: [&str; 11] = ["p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "article"];
const CONTENT_SELECTORS: [&str; 5] = ["article", "main", "[role='main']", "#content", ".content"];

/// Build a `{url, title, description, content}` payload from an HTML document.
/// Missing pieces are omitted rather than sent as empty strings.
pub fn html_to_payload(url: &str, html: &str) -> Value {
    let document = Html::parse_document(html);
    let mut payload = json!({ "url": url });

    if let Some(title) = first_text(&document, "title") {
        payload["title"] = json!(title);
    }
    if let Some(description) = meta_description(&document) {
        payload["description"] = json!(description);
    }
    let content = main_content(&document);
    if !content.is_empty() {
        payload["content"] = json!(content);
    }
    payload
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn meta_description(document: &Html) -> Option<String> {
    let sel = Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#).ok()?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|d| !d.is_empty())
}

fn main_content(document: &Html) -> String {
    for selector in CONTENT_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        let parts: Vec<String> = document
            .select(&sel)
            .map(|el| clean_text(&element_text(&el)))
            .filter(|t| !t.is_empty())
            .collect();
        if !parts.is_empty() {
            return parts.join("\n\n");
        }
    }

    Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|body| clean_text(&element_text(&body)))
        .unwrap_or_default()
}

/// Text under `root` with chrome tags skipped and a newline after each block.
/// Walks siblings and parents instead of recursing so deeply nested markup
/// cannot exhaust the stack.
fn element_text(root: &ElementRef) -> String {
    let mut text = String::new();
    let mut next = root.first_child();
    while let Some(node) = next {
        let mut descend = false;
        if let Some(el) = node.value().as_element() {
            descend = !SKIP_TAGS.contains(&el.name());
        } else if let Some(t) = node.value().as_text() {
            text.push_str(t);
        }
        if descend && let Some(child) = node.first_child() {
            next = Some(child);
            continue;
        }

        // Close finished elements until one has a sibling left to visit
        let mut current = node;
        next = loop {
            if let Some(el) = current.value().as_element()
                && BLOCK_TAGS.contains(&el.name())
            {
                text.push('\n');
            }
            if let Some(sibling) = current.next_sibling() {
                break Some(sibling);
            }
            match current.parent() {
                Some(parent) if parent.id() != root.id() => current = parent,
                _ => break None,
            }
        };
    }
    text
}

/// One line per non-blank block, inner whitespace collapsed
fn clean_text(text: &str) -> String {
    text.lines()
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
    <html>
      <head>
        <title>  Match   report </title>
        <meta name="description" content="Raja wins the derby">
        <script>var x = 1;</script>
      </head>
      <body>
        <nav>Home | Sports</nav>
        <article>
          <h1>Derby</h1>
          <p>Raja   won 2-1.</p>
          <script>track()</script>
          <p>Fans celebrated.</p>
        </article>
        <footer>copyright</footer>
      </body>
    </html>"#;

    #[test]
    fn test_extracts_title_description_and_article() {
        let payload = html_to_payload("https://news.example/derby", PAGE);
        assert_eq!(payload["url"], "https://news.example/derby");
        assert_eq!(payload["title"], "Match report");
        assert_eq!(payload["description"], "Raja wins the derby");
        assert_eq!(payload["content"], "Derby\nRaja won 2-1.\nFans celebrated.");
    }

    #[test]
    fn test_falls_back_to_body_without_article() {
        let payload = html_to_payload(
            "u",
            "<html><body><div>first</div><nav>menu</nav><p>second</p></body></html>",
        );
        assert_eq!(payload["content"], "first\nsecond");
        assert!(payload.get("title").is_none());
    }

    #[test]
    fn test_nested_blocks_and_skipped_chrome() {
        let payload = html_to_payload(
            "u",
            "<body><div><ul><li>one<br>two</li><li><aside>ad</aside>three</li></ul></div></body>",
        );
        assert_eq!(payload["content"], "one\ntwo\nthree");
    }

    #[test]
    fn test_deeply_nested_markup() {
        let depth = 20_000;
        let html = format!(
            "<html><body>{}deep{}</body></html>",
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        let payload = html_to_payload("u", &html);
        assert_eq!(payload["content"], "deep");
    }

    #[test]
    fn test_empty_document_keeps_url_only() {
        let payload = html_to_payload("u", "");
        assert_eq!(payload, json!({"url": "u"}));
    }
}
