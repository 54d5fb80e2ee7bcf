//! Markdown to standalone HTML page rendering.

use pulldown_cmark::{Options, Parser, html};
use pulldown_cmark_escape::{escape_href, escape_html};

const STYLE: &str = r"
    body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6;
           max-width: 800px; margin: 0 auto; padding: 20px; color: #333; background-color: #fff; }
    h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; font-size: 2.2em; }
    h2 { color: #34495e; margin-top: 30px; border-left: 4px solid #3498db; padding-left: 15px; }
    ul, ol { margin: 15px 0; padding-left: 30px; }
    li { margin-bottom: 8px; }
    .recipe-photo { display: block; max-width: 100%; margin: 20px auto; border-radius: 8px; }
    @media (max-width: 600px) { body { padding: 15px; font-size: 14px; } h1 { font-size: 1.8em; } }
";

/// Renders translated recipes as complete HTML documents.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    lang: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new("fr")
    }
}

impl HtmlRenderer {
    #[must_use]
    pub fn new(lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
        }
    }

    /// Render `markdown` into a page titled `title`.
    ///
    /// With a `photo_url` the photo is shown above the recipe body.
    #[must_use]
    pub fn render(&self, markdown: &str, title: &str, photo_url: Option<&str>) -> String {
        let mut body = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut body, Parser::new_ext(markdown, Options::ENABLE_TABLES));

        let photo = photo_url.map_or_else(String::new, |url| {
            let mut src = String::new();
            let _ = escape_href(&mut src, url);
            format!(
                "<img class=\"recipe-photo\" src=\"{src}\" alt=\"{}\">\n",
                attribute(title)
            )
        });

        format!(
            "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n\
             <meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
             {photo}{body}</body>\n</html>\n",
            lang = attribute(&self.lang),
            title = attribute(title),
        )
    }
}

/// `text` escaped for use inside a quoted attribute or as element text.
fn attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = escape_html(&mut escaped, text);
    escaped
}
