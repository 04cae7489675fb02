//! Markdown rendering with sanitization and optional syntax highlighting

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::HighlightConfig;

/// Schemes a link may point at; anything else with a scheme is dropped
const SAFE_LINK_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Inline image payloads allowed in `data:` image sources
const SAFE_DATA_IMAGES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
    "image/avif",
];

struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

/// Markdown renderer producing sanitized HTML
pub struct MarkdownRenderer {
    highlighter: Option<Highlighter>,
}

impl MarkdownRenderer {
    /// Create a renderer without code highlighting
    pub fn new() -> Self {
        Self { highlighter: None }
    }

    /// Create from the site's highlight settings
    pub fn with_options(config: &HighlightConfig) -> Self {
        if !config.enable {
            return Self::new();
        }

        Self {
            highlighter: Some(Highlighter {
                syntax_set: SyntaxSet::load_defaults_newlines(),
                theme_set: ThemeSet::load_defaults(),
                theme_name: config.theme.clone(),
                line_numbers: config.line_number,
            }),
        }
    }

    /// Render markdown to HTML.
    ///
    /// Raw HTML in the source is emitted as escaped text, and link or image
    /// destinations with scripting schemes are neutralised, so the output
    /// carries no executable content.
    pub fn render(&self, markdown: &str) -> String {
        // Front-matter is split off before rendering, so no metadata blocks
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut code_block: Option<Option<String>> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) if self.highlighter.is_some() => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(html_escape),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some(lang);
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) if code_block.is_some() => {
                    let lang = code_block.take().flatten();
                    let highlighted = self.highlight_code(&code_block_content, lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                }
                Event::Text(text) if code_block.is_some() => {
                    code_block_content.push_str(&text);
                }
                Event::Html(raw) | Event::InlineHtml(raw) => {
                    events.push(Event::Text(raw));
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let dest_url = if is_safe_link(&dest_url) {
                        dest_url
                    } else {
                        tracing::debug!("Dropping unsafe link destination: {}", dest_url);
                        CowStr::from("#")
                    };
                    events.push(Event::Start(Tag::Link {
                        link_type,
                        dest_url,
                        title,
                        id,
                    }));
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let dest_url = if is_safe_image(&dest_url) {
                        dest_url
                    } else {
                        tracing::debug!("Dropping unsafe image source: {}", dest_url);
                        CowStr::from("")
                    };
                    events.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url,
                        title,
                        id,
                    }));
                }
                other => events.push(other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        html_output
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang_name = lang.unwrap_or("text");
        let Some(hl) = &self.highlighter else {
            return plain_code_block(code, lang_name);
        };

        let syntax = hl
            .syntax_set
            .find_syntax_by_token(lang_name)
            .or_else(|| hl.syntax_set.find_syntax_by_extension(lang_name))
            .unwrap_or_else(|| hl.syntax_set.find_syntax_plain_text());

        let theme = match hl
            .theme_set
            .themes
            .get(&hl.theme_name)
            .or_else(|| hl.theme_set.themes.values().next())
        {
            Some(theme) => theme,
            None => return plain_code_block(code, lang_name),
        };

        match highlighted_html_for_string(code, &hl.syntax_set, syntax, theme) {
            Ok(highlighted) if hl.line_numbers => add_line_numbers(&highlighted, lang_name),
            Ok(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                lang_name, highlighted
            ),
            Err(e) => {
                tracing::debug!("Highlighting failed for {}: {}", lang_name, e);
                plain_code_block(code, lang_name)
            }
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Add line numbers to highlighted code
fn add_line_numbers(code: &str, lang: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();

    let gutter = (1..=lines.len())
        .map(|i| format!(r#"<span class="line-number">{}</span>"#, i))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
        lang,
        gutter,
        lines.join("\n")
    )
}

fn plain_code_block(code: &str, lang: &str) -> String {
    format!(
        r#"<pre><code class="language-{}">{}</code></pre>"#,
        lang,
        html_escape(code)
    )
}

/// Split a URL into its lowercased scheme and the remainder, if it has a
/// scheme before any path, query or fragment
fn split_scheme(url: &str) -> Option<(String, String)> {
    // Browsers ignore embedded whitespace and control characters in schemes
    let cleaned: String = url
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    let (scheme, rest) = cleaned.split_once(':')?;
    if scheme.is_empty() || scheme.contains(['/', '?', '#']) {
        return None;
    }
    Some((scheme.to_ascii_lowercase(), rest.to_ascii_lowercase()))
}

fn is_safe_link(url: &str) -> bool {
    match split_scheme(url) {
        Some((scheme, _)) => SAFE_LINK_SCHEMES.contains(&scheme.as_str()),
        None => true,
    }
}

fn is_safe_image(url: &str) -> bool {
    match split_scheme(url) {
        None => true,
        Some((scheme, _)) if scheme == "http" || scheme == "https" => true,
        Some((scheme, payload)) if scheme == "data" => SAFE_DATA_IMAGES
            .iter()
            .any(|mime| payload.starts_with(&format!("{};", mime))),
        Some(_) => false,
    }
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
