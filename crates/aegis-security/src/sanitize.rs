//! Input and HTML sanitization (spec §4.4.2).
//!
//! This is defense-in-depth, not a sole XSS barrier — callers must still
//! use context-correct output escaping. The tag/attribute stripping here
//! is regex-based rather than a full HTML parse, matching the source
//! system's own best-effort scrub; it trades perfect parsing fidelity for
//! the same pragmatic coverage (script/iframe/object/embed/form blocks,
//! inline event handlers, dangerous URI schemes).

use aegis_core::config;
use once_cell_lite::Lazy;
use regex::Regex;

/// Resolved sanitize configuration (spec §6.1: `SANITIZE_MAX_LEN`,
/// `SANITIZE_ALLOWED_TAGS`).
#[derive(Debug, Clone)]
pub struct SanitizeConfig {
    pub max_len: usize,
    pub allowed_tags: Vec<String>,
}

impl SanitizeConfig {
    pub fn resolve() -> Self {
        let max_len: usize = config::resolve(None, "SANITIZE_MAX_LEN", 1000);
        let allowed_tags = std::env::var("SANITIZE_ALLOWED_TAGS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self { max_len, allowed_tags }
    }

    pub fn default_for_tests() -> Self {
        Self {
            max_len: 1000,
            allowed_tags: Vec::new(),
        }
    }

    /// [`CleanTextOptions`] seeded from this config's `max_len`, with
    /// trimming and XSS scrubbing on — the process-wide default a call
    /// site starts from before overriding individual fields.
    pub fn default_text_options(&self) -> CleanTextOptions {
        CleanTextOptions {
            max_length: self.max_len,
            ..Default::default()
        }
    }

    /// [`CleanHtmlOptions`] seeded from this config's `allowed_tags`.
    pub fn default_html_options(&self) -> CleanHtmlOptions {
        CleanHtmlOptions {
            allowed_tags: self.allowed_tags.clone(),
            ..Default::default()
        }
    }
}

/// Options for [`clean_text`]. Distinct from [`SanitizeConfig`] because a
/// single call site may want different trimming/length behavior than the
/// process-wide default.
#[derive(Debug, Clone)]
pub struct CleanTextOptions {
    pub trim: bool,
    pub scrub_xss: bool,
    pub max_length: usize,
}

impl Default for CleanTextOptions {
    fn default() -> Self {
        Self {
            trim: true,
            scrub_xss: true,
            max_length: 1000,
        }
    }
}

static DANGEROUS_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

fn on_event_attr_re() -> &'static Regex {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bon\w+\s*=").unwrap());
    RE.get()
}

fn scrub_xss_patterns(input: &str) -> String {
    let mut out = input.replace(['<', '>'], "");
    for scheme in DANGEROUS_SCHEMES.iter() {
        out = replace_ci(&out, scheme, "");
    }
    out = on_event_attr_re().replace_all(&out, "").into_owned();
    out
}

fn replace_ci(haystack: &str, needle: &str, replacement: &str) -> String {
    let re = Regex::new(&regex::escape(needle)).unwrap();
    let re = Regex::new(&format!("(?i){}", re.as_str())).unwrap();
    re.replace_all(haystack, replacement).into_owned()
}

/// `cleanText`: empty string for non-string callers (modeled here by
/// requiring a `&str`, since Rust callers already know the type);
/// optionally trims, strips the XSS-relevant substrings, and truncates.
pub fn clean_text(input: &str, options: &CleanTextOptions) -> String {
    let mut value = input.to_string();

    if options.trim {
        value = value.trim().to_string();
    }

    if options.scrub_xss {
        value = scrub_xss_patterns(&value);
    }

    truncate_chars(&value, options.max_length)
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// Options for [`clean_html`].
#[derive(Debug, Clone, Default)]
pub struct CleanHtmlOptions {
    /// Remove every tag, leaving only text content.
    pub strip_all: bool,
    /// Tag allow-list (lowercase). Ignored if `strip_all` is set.
    pub allowed_tags: Vec<String>,
}

static DANGEROUS_BLOCK_TAGS: [&str; 5] = ["script", "iframe", "object", "embed", "form"];

fn dangerous_block_re(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap()
}

fn any_tag_re() -> &'static Regex {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap());
    RE.get()
}

/// Unlike [`on_event_attr_re`] (which only drops the `on<word>=` name,
/// correct for plain text where there's no trailing quoted value to
/// orphan), this also consumes the attribute's value so `clean_html`
/// doesn't leave `"evil()">` behind after the name is gone.
fn on_event_html_attr_re() -> &'static Regex {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"(?i)\son\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap());
    RE.get()
}

/// `cleanHtml`: removes dangerous blocks and inline event handlers and
/// dangerous URI schemes unconditionally, then either strips every tag
/// (`strip_all`) or removes any tag not on `allowed_tags`, preserving
/// inner text either way.
pub fn clean_html(input: &str, options: &CleanHtmlOptions) -> String {
    let mut value = input.to_string();

    for tag in DANGEROUS_BLOCK_TAGS {
        value = dangerous_block_re(tag).replace_all(&value, "").into_owned();
    }

    value = on_event_html_attr_re().replace_all(&value, "").into_owned();
    for scheme in DANGEROUS_SCHEMES.iter() {
        value = replace_ci(&value, scheme, "");
    }

    if options.strip_all {
        return any_tag_re().replace_all(&value, "").into_owned();
    }

    if !options.allowed_tags.is_empty() {
        let allowed = &options.allowed_tags;
        value = any_tag_re()
            .replace_all(&value, |caps: &regex::Captures| {
                let tag_name = caps[1].to_lowercase();
                if allowed.iter().any(|t| t == &tag_name) {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned();
    }

    value
}

/// `escapeHtml`: replaces each of `& < > " ' / ` \`` and `=` with its HTML
/// entity. Unlike [`clean_text`]/[`clean_html`] this never removes
/// content — it is the correct choice at an output boundary.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            other => out.push(other),
        }
    }
    out
}

/// A tiny `once_cell`-free lazy-static shim so this crate doesn't need to
/// pull in `once_cell` for two regexes; mirrors the pattern used for the
/// in-memory cache's compiled glob (aegis-cache's `pattern` module).
mod once_cell_lite {
    use std::sync::OnceLock;

    pub struct Lazy<T> {
        cell: OnceLock<T>,
        init: fn() -> T,
    }

    impl<T> Lazy<T> {
        pub const fn new(init: fn() -> T) -> Self {
            Self {
                cell: OnceLock::new(),
                init,
            }
        }

        pub fn get(&self) -> &T {
            self.cell.get_or_init(self.init)
        }
    }
}
