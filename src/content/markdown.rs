//! Markdown rendering
//!
//! Every HTML string produced here has been through the sanitizer; there is
//! no public way to get the raw pulldown-cmark output.

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};

use super::sanitize::{sanitize_markdown_html, SanitizeOptions};

/// Public prefix that relative image paths are flattened into
const IMAGE_ROUTE: &str = "/images";

lazy_static! {
    static ref RENDERER: MarkdownRenderer = MarkdownRenderer::new();
    static ref IMG_TAG: Regex = Regex::new(r"(?is)<img\b([^>]*?)\s*/?>").expect("valid pattern");
    // Attribute names must follow whitespace, so `data-src` is not `src`
    static ref SRC_ATTR: Regex =
        Regex::new(r#"(?is)(^|\s)src\s*=\s*"([^"]*)""#).expect("valid pattern");
    static ref LOADING_ATTR: Regex =
        Regex::new(r"(?i)(?:^|\s)loading\s*=").expect("valid pattern");
    static ref URL_SCHEME: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("valid pattern");
}

/// Markdown renderer
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    fn new() -> Self {
        // Front-matter is split off before rendering, so no metadata blocks.
        // No footnotes: their ids and wrapper divs do not survive the sanitizer.
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS,
        }
    }

    /// Process-wide renderer, built on first use
    pub fn global() -> &'static MarkdownRenderer {
        &RENDERER
    }

    /// Render Markdown to sanitized HTML.
    ///
    /// `on_sanitized` fires when the sanitizer had to drop something the
    /// author wrote.
    pub fn render(
        &self,
        markdown: &str,
        slug: Option<&str>,
        on_sanitized: Option<&dyn Fn(Option<&str>)>,
    ) -> String {
        let raw = self.render_unsanitized(markdown);
        let with_images = rewrite_images(&raw);
        sanitize_markdown_html(&with_images, &SanitizeOptions { slug, on_sanitized })
    }

    fn render_unsanitized(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);

        // Fenced info strings like "rust,ignore" keep only the language token
        let events = parser.map(|event| match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                match code_language(&info) {
                    Some(lang) => Event::Html(CowStr::from(format!(
                        "<pre><code class=\"language-{}\">",
                        lang
                    ))),
                    None => Event::Html(CowStr::Borrowed("<pre><code>")),
                }
            }
            Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)) => {
                Event::Html(CowStr::Borrowed("<pre><code>"))
            }
            Event::End(TagEnd::CodeBlock) => Event::Html(CowStr::Borrowed("</code></pre>\n")),
            other => other,
        });

        let mut html_output = String::new();
        html::push_html(&mut html_output, events);
        html_output
    }
}

fn code_language(info: &str) -> Option<String> {
    let token = info.split([',', ' ', '\t', '{']).next()?.trim();
    let lang: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'))
        .collect();
    (!lang.is_empty()).then_some(lang)
}

/// Point relative image sources at the flat public image directory and mark
/// every image for lazy loading.
///
/// Only the file name survives, so `a/x.png` and `b/x.png` both become
/// `/images/x.png`.
fn rewrite_images(html: &str) -> String {
    IMG_TAG
        .replace_all(html, |caps: &Captures| {
            let attrs = SRC_ATTR.replace(&caps[1], |src: &Captures| {
                format!("{}src=\"{}\"", &src[1], public_image_path(&src[2]))
            });
            if LOADING_ATTR.is_match(&attrs) {
                format!("<img{} />", attrs)
            } else {
                format!("<img{} loading=\"lazy\" />", attrs)
            }
        })
        .into_owned()
}

fn public_image_path(src: &str) -> String {
    let src = src.trim();
    if src.is_empty() || src.starts_with('/') || URL_SCHEME.is_match(src) {
        return src.to_string();
    }
    let file_name = src.rsplit(['/', '\\']).next().unwrap_or(src);
    format!("{}/{}", IMAGE_ROUTE, file_name)
}
