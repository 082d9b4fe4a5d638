//! Rendering of a single content file into an HTML document.
//!
//! The build treats rendering as a pure function from a source path to an
//! HTML string behind the [`Renderer`] trait. [`MarkdownRenderer`] is the
//! production implementation: [pulldown-cmark](https://docs.rs/pulldown-cmark)
//! converts the body and [maud](https://maud.lambda.xyz/) wraps it in a
//! document shell. Maud interpolation is auto-escaped, so titles taken from
//! content can never inject markup into `<head>`.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Template error: {0}")]
    Template(String),
}

/// Turns one content file into a complete HTML document.
///
/// Implementations are shared across the render workers, hence `Sync`.
pub trait Renderer: Sync {
    fn render(&self, source: &Path) -> Result<String, RenderError>;
}

/// Markdown → HTML renderer used by the `build` command.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    site_title: String,
}

impl MarkdownRenderer {
    pub fn new(site_title: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
        }
    }

    /// Render Markdown text; `fallback_title` is used when the text has no
    /// top-level heading.
    pub fn render_markdown(&self, markdown: &str, fallback_title: &str) -> Markup {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        let title = first_heading(markdown, options).unwrap_or_else(|| fallback_title.to_string());

        let mut body_html = String::new();
        md_html::push_html(&mut body_html, Parser::new_ext(markdown, options));

        let page_title = if title.is_empty() || title == self.site_title {
            self.site_title.clone()
        } else {
            format!("{} | {}", title, self.site_title)
        };

        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (page_title) }
                    link rel="stylesheet" href="/static/style.css";
                }
                body {
                    main {
                        article {
                            (PreEscaped(body_html))
                        }
                    }
                }
            }
        }
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, source: &Path) -> Result<String, RenderError> {
        let markdown = fs::read_to_string(source)?;
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| RenderError::Template(format!("{} has no file name", source.display())))?;
        Ok(self.render_markdown(&markdown, &fallback_title(stem)).into_string())
    }
}

/// Plain text of the first `# heading`, if any.
fn first_heading(markdown: &str, options: Options) -> Option<String> {
    let mut in_heading = false;
    let mut text = String::new();
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_heading = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                return Some(text.trim().to_string());
            }
            Event::Text(t) | Event::Code(t) if in_heading => text.push_str(&t),
            _ => {}
        }
    }
    None
}

/// `my-first-post` → `my first post`; `index` has no title of its own.
fn fallback_title(stem: &str) -> String {
    if stem == "index" {
        String::new()
    } else {
        stem.replace(['-', '_'], " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn renderer() -> MarkdownRenderer {
        MarkdownRenderer::new("Notebook")
    }

    #[test]
    fn renders_markdown_body() {
        let html = renderer()
            .render_markdown("# Hello\n\nSome *emphasis*.", "fallback")
            .into_string();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn title_from_first_heading() {
        let html = renderer()
            .render_markdown("intro\n\n# The `Real` Title\n\n# Second", "fallback")
            .into_string();
        assert!(html.contains("<title>The Real Title | Notebook</title>"));
    }

    #[test]
    fn title_falls_back_to_file_name() {
        let html = renderer()
            .render_markdown("no heading here", &fallback_title("my-first_post"))
            .into_string();
        assert!(html.contains("<title>my first post | Notebook</title>"));
    }

    #[test]
    fn index_without_heading_uses_site_title() {
        let html = renderer()
            .render_markdown("welcome", &fallback_title("index"))
            .into_string();
        assert!(html.contains("<title>Notebook</title>"));
    }

    #[test]
    fn title_is_escaped() {
        let html = renderer()
            .render_markdown("# a &lt;script&gt; b", "x")
            .into_string();
        assert!(html.contains("<title>a &lt;script&gt; b | Notebook</title>"));
    }

    #[test]
    fn tables_are_enabled() {
        let html = renderer()
            .render_markdown("| a | b |\n|---|---|\n| 1 | 2 |", "t")
            .into_string();
        assert!(html.contains("<table>"));
    }

    #[test]
    fn render_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("about.md");
        std::fs::write(&path, "Hi there").unwrap();

        let html = renderer().render(&path).unwrap();
        assert!(html.contains("<p>Hi there</p>"));
        assert!(html.contains("<title>about | Notebook</title>"));
    }

    #[test]
    fn render_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = renderer().render(&tmp.path().join("gone.md")).unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[test]
    fn render_non_utf8_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("binary.md");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(renderer().render(&path), Err(RenderError::Io(_))));
    }
}
