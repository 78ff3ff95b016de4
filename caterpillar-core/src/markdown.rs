use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const HIGHLIGHT_THEME: &str = "InspiredGitHub";

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Render a post body to HTML. Fenced code blocks with a known language
/// are highlighted with inline styles; everything else goes through the
/// stock pulldown-cmark HTML writer.
pub fn render_html(content: &str) -> String {
    let events: Vec<Event> = Parser::new_ext(content, options()).collect();
    let mut processed_events = Vec::with_capacity(events.len());
    let mut i = 0;

    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                let mut code_content = String::new();
                i += 1;

                while i < events.len() {
                    match &events[i] {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code_content.push_str(text),
                        _ => {}
                    }
                    i += 1;
                }

                processed_events.push(Event::Html(highlight(lang, &code_content).into()));
            }
            event => processed_events.push(event.clone()),
        }
        i += 1;
    }

    let mut out = String::new();
    html::push_html(&mut out, processed_events.into_iter());
    out
}

fn highlight(lang: &str, code: &str) -> String {
    let lang = lang.split_whitespace().next().unwrap_or_default();
    // Languages missing from the default set (Swift among them) stay plain
    let syntax = SYNTAX_SET.find_syntax_by_token(lang);

    let plain = || format!("<pre><code>{}</code></pre>\n", html_escape::encode_text(code));

    match (syntax, THEME_SET.themes.get(HIGHLIGHT_THEME)) {
        (Some(syntax), Some(theme)) if !lang.is_empty() => {
            highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).unwrap_or_else(|_| plain())
        }
        _ => plain(),
    }
}

/// Plain text of the first level-1 heading, if the body has one.
pub fn first_heading(content: &str) -> Option<String> {
    first_text_block(content, |tag| {
        matches!(tag, Tag::Heading { level: HeadingLevel::H1, .. })
    })
}

/// Plain text of the first paragraph, used as a fallback description.
pub fn first_paragraph(content: &str) -> Option<String> {
    first_text_block(content, |tag| matches!(tag, Tag::Paragraph))
}

fn first_text_block(content: &str, wanted: impl Fn(&Tag) -> bool) -> Option<String> {
    let mut depth = 0usize;
    let mut text_buf = String::new();

    for event in Parser::new_ext(content, options()) {
        match event {
            Event::Start(tag) if depth == 0 && wanted(&tag) => depth = 1,
            Event::Start(_) if depth > 0 => depth += 1,
            Event::End(_) if depth == 1 => {
                let text = text_buf.split_whitespace().collect::<Vec<_>>().join(" ");
                if text.is_empty() {
                    depth = 0;
                    continue;
                }
                return Some(text);
            }
            Event::End(_) if depth > 1 => depth -= 1,
            Event::Text(text) | Event::Code(text) if depth > 0 => text_buf.push_str(&text),
            Event::SoftBreak | Event::HardBreak if depth > 0 => text_buf.push(' '),
            _ => {}
        }
    }

    None
}

/// Lowercase, ASCII-alphanumeric words joined by single dashes.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
