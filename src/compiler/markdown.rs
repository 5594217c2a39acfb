//! Markdown → HTML rendering.
//!
//! Built on `pulldown-cmark` with a small event rewriting stage:
//!
//! | Feature          | How                                                    |
//! |------------------|--------------------------------------------------------|
//! | tables, ~~del~~  | `pulldown-cmark` extensions                            |
//! | task lists       | `pulldown-cmark` extensions                            |
//! | math             | `$inline$` / `$$display$$` → `<span class="math ...">` |
//! | fenced code      | highlighted by `syntect` (inline styles)               |
//! | heading anchors  | `id` derived from the heading text, de-duplicated      |
//! | bare URL links   | `https://...` in plain text becomes a link             |
//! | hard wraps       | every soft line break becomes `<br />`                 |

use crate::{config::MarkdownConfig, log, logger::Sink, utils::slug::slugify};
use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream, html,
};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;
use syntect::{
    highlighting::{Theme, ThemeSet},
    html::highlighted_html_for_string,
    parsing::SyntaxSet,
};

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"]+"#).unwrap());

/// Punctuation that ends a sentence rather than a URL.
const TRAILING_PUNCT: &[char] = &['.', ',', ':', ';', '!', '?', ')', ']', '\'', '"'];

/// Anchor used when a heading has no sluggable text.
const FALLBACK_ANCHOR: &str = "section";

pub struct MarkdownRenderer {
    options: Options,
    hard_wraps: bool,
    heading_anchors: bool,
    autolinks: bool,
    theme: Option<&'static Theme>,
}

impl MarkdownRenderer {
    pub fn new(config: &MarkdownConfig, sink: &Sink) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        if config.math {
            options.insert(Options::ENABLE_MATH);
        }

        let theme = THEMES.themes.get(&config.highlight_theme);
        if theme.is_none() {
            log!(sink => "markdown"; "unknown highlight theme `{}`, code blocks stay plain", config.highlight_theme);
        }

        Self {
            options,
            hard_wraps: config.hard_wraps,
            heading_anchors: config.heading_anchors,
            autolinks: config.autolinks,
            theme,
        }
    }

    /// Render a markdown body (front matter already removed).
    pub fn render(&self, body: &str) -> String {
        let parser = TextMergeStream::new(Parser::new_ext(body, self.options));
        let mut events = self.rewrite(parser);
        if self.heading_anchors {
            events = anchor_headings(events);
        }

        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }

    /// Code blocks, soft breaks and bare URLs.
    fn rewrite<'a>(&self, events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::new();
        // (language, accumulated source) of the code block being read
        let mut code: Option<(Option<String>, String)> = None;
        // Inside links and image alt text no autolinking happens.
        let mut link_depth = 0usize;

        for event in events {
            if let Some((_, source)) = code.as_mut() {
                match event {
                    Event::Text(text) => source.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some((lang, source)) = code.take() {
                            let html = self.highlight(lang.as_deref(), &source);
                            out.push(Event::Html(html.into()));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
                            .next()
                            .filter(|lang| !lang.is_empty())
                            .map(str::to_owned),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some((lang, String::new()));
                }
                Event::Start(tag @ (Tag::Link { .. } | Tag::Image { .. })) => {
                    link_depth += 1;
                    out.push(Event::Start(tag));
                }
                Event::End(tag @ (TagEnd::Link | TagEnd::Image)) => {
                    link_depth = link_depth.saturating_sub(1);
                    out.push(Event::End(tag));
                }
                Event::Text(text) if self.autolinks && link_depth == 0 => {
                    push_autolinked(text, &mut out);
                }
                Event::SoftBreak if self.hard_wraps => out.push(Event::HardBreak),
                other => out.push(other),
            }
        }

        out
    }

    fn highlight(&self, lang: Option<&str>, source: &str) -> String {
        if let (Some(lang), Some(theme)) = (lang, self.theme)
            && let Some(syntax) = SYNTAXES.find_syntax_by_token(lang)
            && let Ok(html) = highlighted_html_for_string(source, &SYNTAXES, syntax, theme)
        {
            return html;
        }

        let escaped = quick_xml::escape::escape(source);
        match lang {
            Some(lang) => format!(
                "<pre><code class=\"language-{}\">{escaped}</code></pre>\n",
                quick_xml::escape::escape(lang)
            ),
            None => format!("<pre><code>{escaped}</code></pre>\n"),
        }
    }
}

/// Split a text event around bare URLs, turning each into a link.
fn push_autolinked<'a>(text: CowStr<'a>, out: &mut Vec<Event<'a>>) {
    let mut last = 0;
    let mut linked = false;

    for found in BARE_URL.find_iter(&text) {
        let url = found.as_str().trim_end_matches(TRAILING_PUNCT);
        if !url.contains("://") || url.ends_with("://") {
            continue;
        }
        let start = found.start();
        if start > last {
            out.push(Event::Text(text[last..start].to_owned().into()));
        }
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: url.to_owned().into(),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(url.to_owned().into()));
        out.push(Event::End(TagEnd::Link));
        last = start + url.len();
        linked = true;
    }

    if !linked {
        out.push(Event::Text(text));
    } else if last < text.len() {
        out.push(Event::Text(text[last..].to_owned().into()));
    }
}

/// Give every heading without an explicit `{#id}` a unique slug id.
fn anchor_headings(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut used: FxHashSet<String> = FxHashSet::default();
    let mut open: Option<usize> = None;
    let mut text = String::new();

    for event in events {
        match &event {
            Event::Start(Tag::Heading { id, .. }) => {
                if let Some(id) = id {
                    used.insert((**id).to_owned());
                }
                open = Some(out.len());
                text.clear();
            }
            Event::Text(t) | Event::Code(t) if open.is_some() => text.push_str(t),
            Event::End(TagEnd::Heading(_)) => {
                if let Some(index) = open.take()
                    && let Event::Start(Tag::Heading { id, .. }) = &mut out[index]
                    && id.is_none()
                {
                    *id = Some(unique_anchor(&text, &mut used).into());
                }
            }
            _ => {}
        }
        out.push(event);
    }

    out
}

fn unique_anchor(text: &str, used: &mut FxHashSet<String>) -> String {
    let mut base = slugify(text);
    if base.is_empty() {
        base = FALLBACK_ANCHOR.to_owned();
    }
    let mut candidate = base.clone();
    let mut n = 0;
    while !used.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{base}-{n}");
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NullSink;
    use std::sync::Arc;

    fn renderer(config: MarkdownConfig) -> MarkdownRenderer {
        let sink: Sink = Arc::new(NullSink);
        MarkdownRenderer::new(&config, &sink)
    }

    fn render(body: &str) -> String {
        renderer(MarkdownConfig::default()).render(body)
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(render("Hi"), "<p>Hi</p>\n");
    }

    #[test]
    fn test_tables_and_strikethrough() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_heading_anchors_deduplicate() {
        let html = render("# Hello World\n\n## Hello World\n\n### Ünïcode Title");
        assert!(html.contains(r#"<h1 id="hello-world">"#));
        assert!(html.contains(r#"<h2 id="hello-world-1">"#));
        assert!(html.contains(r#"<h3 id="unicode-title">"#));
    }

    #[test]
    fn test_explicit_heading_id_kept() {
        let html = render("# Intro {#start}\n\n# Start");
        assert!(html.contains(r#"id="start""#));
        assert!(html.contains(r#"id="start-1""#));
    }

    #[test]
    fn test_heading_anchors_disabled() {
        let html = renderer(MarkdownConfig {
            heading_anchors: false,
            ..MarkdownConfig::default()
        })
        .render("# Title");
        assert_eq!(html, "<h1>Title</h1>\n");
    }

    #[test]
    fn test_hard_wraps() {
        assert!(render("one\ntwo").contains("one<br />\ntwo"));

        let soft = renderer(MarkdownConfig {
            hard_wraps: false,
            ..MarkdownConfig::default()
        })
        .render("one\ntwo");
        assert_eq!(soft, "<p>one\ntwo</p>\n");
    }

    #[test]
    fn test_bare_url_becomes_link() {
        let html = render("see https://example.com/a?b=1.");
        assert!(html.contains(r#"<a href="https://example.com/a?b=1">https://example.com/a?b=1</a>."#));
    }

    #[test]
    fn test_existing_links_not_relinked() {
        let html = render("[https://example.com](https://example.com)");
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_fenced_code_is_highlighted() {
        let html = render("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre style="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain() {
        let html = render("```nosuchlang\na < b\n```");
        assert_eq!(
            html,
            "<pre><code class=\"language-nosuchlang\">a &lt; b\n</code></pre>\n"
        );
    }

    #[test]
    fn test_math_spans() {
        let html = render("inline $x^2$ here");
        assert!(html.contains(r#"<span class="math math-inline">x^2</span>"#));
    }

    #[test]
    fn test_unique_anchor_fallback() {
        let mut used = FxHashSet::default();
        assert_eq!(unique_anchor("!!!", &mut used), "section");
        assert_eq!(unique_anchor("", &mut used), "section-1");
    }
}
