//! Markdown preview rendering.
//!
//! Rendering itself is pulldown-cmark. Around it sit the pieces the preview
//! pane needs: finding local images so the app can swap them for data URIs,
//! rewriting those sources during rendering, and a revision gate so a slow
//! render never overwrites a newer one.
//!
//! Raw HTML in a note reaches the webview, which can call the shell, so the
//! rendered output is sanitized: event handler attributes, script URLs and
//! elements that run or embed code are removed.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use regex::{Captures, Regex};

pub const RENDER_DELAY: Duration = Duration::from_millis(150);

fn html_img_re() -> &'static Regex {
    static RE_IMG: OnceLock<Regex> = OnceLock::new();
    RE_IMG.get_or_init(|| Regex::new(r#"(<img\b[^>]*?\bsrc=")([^"]+)(")"#).unwrap())
}

/// Comments and other markup the browser skips over as a unit.
fn skipped_re() -> &'static Regex {
    static RE_SKIPPED: OnceLock<Regex> = OnceLock::new();
    RE_SKIPPED.get_or_init(|| {
        Regex::new(r"(?s)<!--(?:-?>|.*?--!?>|.*\z)|<[!?][^>]*>|</[^A-Za-z>][^>]*>").unwrap()
    })
}

/// A start or end tag. Quotes only open a value right after `=`, as in the
/// browser tokenizer.
fn tag_re() -> &'static Regex {
    static RE_TAG: OnceLock<Regex> = OnceLock::new();
    RE_TAG.get_or_init(|| {
        Regex::new(r#"<(/?)([A-Za-z][^\s/>]*)((?:=\s*"[^"]*"|=\s*'[^']*'|[^>])*)>"#).unwrap()
    })
}

fn attr_re() -> &'static Regex {
    static RE_ATTR: OnceLock<Regex> = OnceLock::new();
    RE_ATTR.get_or_init(|| {
        Regex::new(r#"([^\s/>][^\s/>=]*)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s>]*))?"#).unwrap()
    })
}

/// Dropped with their closing tags. Their content stays and is sanitized like
/// any other markup.
const BLOCKED_ELEMENTS: &[&str] = &[
    "script", "iframe", "frame", "frameset", "object", "embed", "applet", "base", "meta",
    "link", "form", "style", "noscript", "noembed", "noframes", "template", "textarea",
    "title", "xmp", "plaintext",
];

const SCRIPT_URL_PREFIXES: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH
}

/// True for sources that must be loaded from disk rather than fetched.
pub fn is_local_source(src: &str) -> bool {
    let src = src.trim();
    if src.is_empty() || src.starts_with('#') || src.starts_with("//") {
        return false;
    }
    !has_scheme(src) || src.starts_with("file:")
}

fn has_scheme(src: &str) -> bool {
    match src.split_once(':') {
        // A single letter before the colon is a Windows drive, not a scheme.
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Path handed to path resolution for a local source. A leading `/` means
/// "from the document folder", not the filesystem root; `file://` URLs are
/// already absolute.
pub fn relative_part(src: &str) -> &str {
    let src = src.trim();
    if let Some(absolute) = src.strip_prefix("file://") {
        return absolute;
    }
    src.strip_prefix('/').unwrap_or(src)
}

/// Local image sources referenced by `markdown`, in first-seen order.
pub fn local_images(markdown: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |src: &str| {
        if is_local_source(src) && !found.iter().any(|s| s == src) {
            found.push(src.to_string());
        }
    };

    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::Image { dest_url, .. }) => push(&*dest_url),
            Event::Html(raw) | Event::InlineHtml(raw) => {
                for cap in html_img_re().captures_iter(&raw) {
                    push(&cap[2]);
                }
            }
            _ => {}
        }
    }
    found
}

/// Renders `markdown` to HTML, replacing image sources found in `images`.
pub fn render_html(markdown: &str, images: &HashMap<String, String>) -> String {
    let events = Parser::new_ext(markdown, options()).map(|event| match event {
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = match images.get(&*dest_url) {
                Some(resolved) => CowStr::from(resolved.clone()),
                None => dest_url,
            };
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            })
        }
        Event::Html(raw) => Event::Html(rewrite_html_images(raw, images)),
        Event::InlineHtml(raw) => Event::InlineHtml(rewrite_html_images(raw, images)),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    sanitize_html(&out)
}

/// Strips everything from `html` that could run script once it is assigned to
/// `innerHTML`.
pub fn sanitize_html(html: &str) -> String {
    let html = skipped_re().replace_all(html, "");
    tag_re().replace_all(&html, sanitize_tag).into_owned()
}

fn sanitize_tag(cap: &Captures) -> String {
    let name = &cap[2];
    if BLOCKED_ELEMENTS.iter().any(|b| b.eq_ignore_ascii_case(name)) {
        return String::new();
    }
    let rest = &cap[3];
    let mut tag = format!("<{}{name}", &cap[1]);
    for attr in attr_re().captures_iter(rest) {
        let value = attr.get(2).map_or("", |v| v.as_str());
        if is_unsafe_attr(&attr[1], value) {
            continue;
        }
        tag.push(' ');
        tag.push_str(&attr[0]);
    }
    if rest.trim_end().ends_with('/') {
        tag.push_str(" /");
    }
    tag.push('>');
    tag
}

fn is_unsafe_attr(name: &str, value: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name.starts_with("on") || name == "srcdoc" {
        return true;
    }
    let value: String = value
        .trim_matches(['"', '\''])
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_URL_PREFIXES.iter().any(|prefix| value.starts_with(prefix))
}

fn rewrite_html_images<'a>(raw: CowStr<'a>, images: &HashMap<String, String>) -> CowStr<'a> {
    if images.is_empty() || !raw.contains("<img") {
        return raw;
    }
    let rewritten = html_img_re().replace_all(&raw, |cap: &Captures| match images.get(&cap[2]) {
        Some(resolved) => format!("{}{}{}", &cap[1], resolved, &cap[3]),
        None => cap[0].to_string(),
    });
    CowStr::from(rewritten.into_owned())
}

/// Links that should leave the app instead of navigating the webview.
pub fn is_external_link(href: &str) -> bool {
    let href = href.trim();
    !href.is_empty() && !href.starts_with('#')
}

/// Orders asynchronous renders: only the most recently started one may land.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderGate {
    latest: u64,
}

impl RenderGate {
    pub fn begin(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn accepts(&self, revision: u64) -> bool {
        revision == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_gfm_tables_and_tasks() {
        let html = render_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done\n", &HashMap::new());
        assert!(html.contains("<table>"));
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn collects_only_local_images_once() {
        let md = "![a](./img/a.png) ![b](https://x.test/b.png) ![c](/c.png) ![a2](./img/a.png)\n\n<img src=\"d.gif\" alt=\"d\">\n";
        assert_eq!(local_images(md), ["./img/a.png", "/c.png", "d.gif"]);
    }

    #[test]
    fn resolved_sources_replace_markdown_and_html_images() {
        let mut images = HashMap::new();
        images.insert("./a.png".to_string(), "data:image/png;base64,AAA".to_string());
        images.insert("b.png".to_string(), "data:image/png;base64,BBB".to_string());

        let html = render_html("![a](./a.png)\n\n<img src=\"b.png\">\n", &images);
        assert!(html.contains("src=\"data:image/png;base64,AAA\""));
        assert!(html.contains("src=\"data:image/png;base64,BBB\""));
    }

    #[test]
    fn unresolved_images_keep_their_source() {
        let html = render_html("![a](missing.png)", &HashMap::new());
        assert!(html.contains("src=\"missing.png\""));
    }

    #[test]
    fn event_handlers_do_not_survive_rendering() {
        let html = render_html(
            "<img src=x onerror=\"__TAURI__.core.invoke('write_file')\">\n\ntext <span OnClick='x'>hi</span>\n",
            &HashMap::new(),
        );
        let lower = html.to_ascii_lowercase();
        assert!(!lower.contains("onerror"), "{html}");
        assert!(!lower.contains("onclick"), "{html}");
        assert!(html.contains("<img src=x>"), "{html}");
        assert!(html.contains("<span>hi</span>"), "{html}");
    }

    #[test]
    fn script_elements_and_urls_are_removed() {
        let md = "<script>alert(1)</script>\n\n<iframe srcdoc=\"x\"></iframe>\n\n\
                  <a href=\" JavaScript:alert(1)\">a</a> [b](javascript:alert(2)) [c](https://ok.test)\n";
        let html = render_html(md, &HashMap::new()).to_ascii_lowercase();
        assert!(!html.contains("<script"), "{html}");
        assert!(!html.contains("<iframe"), "{html}");
        assert!(!html.contains("javascript:"), "{html}");
        assert!(html.contains("href=\"https://ok.test\""), "{html}");
    }

    #[test]
    fn comments_cannot_smuggle_tags_past_the_sanitizer() {
        let html = render_html("<!--<img src=\"--><img src=x onerror=alert(1)>\">\n", &HashMap::new());
        assert!(!html.contains("onerror"), "{html}");
    }

    #[test]
    fn sanitizing_keeps_ordinary_markup() {
        let html = render_html("![x onload=y](a.png)\n\n**bold** <br/>\n", &HashMap::new());
        assert!(html.contains("alt=\"x onload=y\""), "{html}");
        assert!(html.contains("<strong>bold</strong>"), "{html}");
        assert!(html.contains("<br />"), "{html}");
    }

    #[test]
    fn classifies_sources() {
        assert!(is_local_source("img.png"));
        assert!(is_local_source("C:/pics/img.png"));
        assert!(is_local_source("file:///tmp/a.png"));
        assert!(!is_local_source("http://x.test/a.png"));
        assert!(!is_local_source("data:image/png;base64,AA"));
        assert!(!is_local_source("#anchor"));
        assert_eq!(relative_part("/img/a.png"), "img/a.png");
        assert_eq!(relative_part("./a.png"), "./a.png");
        assert_eq!(relative_part("file:///tmp/a.png"), "/tmp/a.png");
    }

    #[test]
    fn fragment_links_stay_in_the_preview() {
        assert!(is_external_link("https://example.com"));
        assert!(!is_external_link("#section"));
        assert!(!is_external_link(""));
    }

    #[test]
    fn gate_rejects_superseded_renders() {
        let mut gate = RenderGate::default();
        let first = gate.begin();
        let second = gate.begin();
        assert!(!gate.accepts(first));
        assert!(gate.accepts(second));
    }
}
