//! Image reference scanning.
//!
//! Finds embedded images in converted markdown and reports the byte span of
//! each reference's *path*, so the relocator can splice in a new path while
//! leaving alt text, titles and other HTML attributes untouched.
//!
//! Only relative paths are references. URLs with a scheme (`https:`,
//! `data:`, nbconvert's `attachment:`), protocol-relative `//host` targets
//! and site-absolute `/…` targets already resolve on the published site and
//! are skipped. Code is skipped as well: an image inside a fenced block, an
//! indented block (nbconvert's stream output) or an inline code span is
//! text, not an embedded image.

use crate::config::ReferenceSyntax;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::debug;

/// One embedded image found in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Syntax the reference was written in.
    pub syntax: ReferenceSyntax,
    /// Byte span of the path inside the scanned text, brackets excluded.
    pub span: Range<usize>,
    /// The path exactly as written.
    pub path: String,
}

// `![alt](path)`, `![alt](<path with spaces>)`, `![alt](path "title")`,
// `![alt](result(1).png)` (one level of balanced parens)
static RE_MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"!\[(?:[^\]\\]|\\.)*\]\(\s*(?:<([^>\n]*)>|((?:[^\s()]|\([^\s()]*\))+))(?:\s+(?:"[^"]*"|'[^']*'|\([^)]*\)))?\s*\)"#,
    )
    .unwrap()
});

// `<img ... src="path" ...>`, single-quoted or unquoted
static RE_HTML_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img(?:\s[^>]*?)?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#)
        .unwrap()
});

static RE_URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})").unwrap());

static RE_LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(?:[-*+]|\d{1,9}[.)])(?:\s|$)").unwrap());

static RE_BACKTICKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+").unwrap());

/// Find every relocatable image reference, ordered by position.
pub fn find_references(text: &str, syntaxes: &[ReferenceSyntax]) -> Vec<ImageReference> {
    let code = code_ranges(text);
    let in_code = |pos: usize| code.iter().any(|r| r.contains(&pos));

    let mut refs = Vec::new();
    for &syntax in syntaxes {
        let re: &Regex = match syntax {
            ReferenceSyntax::Markdown => &RE_MARKDOWN_IMAGE,
            ReferenceSyntax::Html => &RE_HTML_IMAGE,
        };
        for caps in re.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if in_code(whole.start()) {
                continue;
            }
            let Some(m) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
                continue;
            };
            let raw = m.as_str();
            let path = raw.trim();
            if !is_relocatable(path) {
                debug!("Leaving non-relative image target as is: {}", raw);
                continue;
            }
            let start = m.start() + (raw.len() - raw.trim_start().len());
            refs.push(ImageReference {
                syntax,
                span: start..start + path.len(),
                path: path.to_string(),
            });
        }
    }
    refs.sort_by_key(|r| r.span.start);
    // A pathological `![x](<img src="y">)` matches both syntaxes.
    refs.dedup_by(|later, kept| later.span.start < kept.span.end);
    refs
}

/// Whether an image target is a relative file path we should relocate.
pub fn is_relocatable(target: &str) -> bool {
    let target = target.trim();
    !(target.is_empty()
        || target.starts_with('/')
        || target.starts_with('\\')
        || target.starts_with('#')
        || RE_URL_SCHEME.is_match(target))
}

/// Splice new paths into `text`. `replacements` must be sorted and disjoint.
pub fn splice(text: &str, replacements: &[(Range<usize>, String)]) -> String {
    let mut out = String::with_capacity(text.len() + replacements.len() * 32);
    let mut cursor = 0;
    for (span, new_path) in replacements {
        out.push_str(&text[cursor..span.start]);
        out.push_str(new_path);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Byte ranges that hold code rather than prose, in no particular order.
fn code_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = fenced_code_ranges(text);
    let indented = indented_code_ranges(text, &ranges);
    ranges.extend(indented);
    let spans = code_span_ranges(text, &ranges);
    ranges.extend(spans);
    ranges
}

/// Byte ranges covered by fenced code blocks (fence lines included).
///
/// An unterminated fence runs to the end of the text, as in CommonMark.
fn fenced_code_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<(usize, char, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let Some(caps) = RE_FENCE.captures(line) else {
            continue;
        };
        let fence = &caps[1];
        let ch = fence.chars().next().unwrap_or('`');
        match open {
            None => open = Some((line_start, ch, fence.len())),
            Some((start, open_ch, open_len)) => {
                let closes = ch == open_ch
                    && fence.len() >= open_len
                    && line[caps.get(0).map_or(0, |m| m.end())..].trim().is_empty();
                if closes {
                    ranges.push(start..offset);
                    open = None;
                }
            }
        }
    }
    if let Some((start, _, _)) = open {
        ranges.push(start..text.len());
    }
    ranges
}

/// Byte ranges of indented code blocks outside `fenced`.
///
/// A block opens on a line indented by four spaces or a tab that follows a
/// blank line, and runs until the next non-blank line that is not indented.
/// Indented lines under a list item are continuation text, not code.
fn indented_code_ranges(text: &str, fenced: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<Range<usize>> = None;
    let mut prev_blank = true;
    let mut in_list = false;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if fenced.iter().any(|r| r.contains(&line_start)) {
            ranges.extend(open.take());
            prev_blank = false;
            in_list = false;
            continue;
        }
        if line.trim().is_empty() {
            prev_blank = true;
            continue;
        }

        let indented = line.starts_with("    ") || line.starts_with('\t');
        if indented {
            if let Some(block) = open.as_mut() {
                block.end = offset;
            } else if prev_blank && !in_list {
                open = Some(line_start..offset);
            }
        } else {
            ranges.extend(open.take());
            in_list = RE_LIST_ITEM.is_match(line) || (in_list && !prev_blank);
        }
        prev_blank = false;
    }
    ranges.extend(open);
    ranges
}

/// Byte ranges of inline code spans outside the `blocks` already found.
///
/// A run of N backticks opens a span that the next run of exactly N closes,
/// within the same paragraph. An opener with no closer is literal text.
fn code_span_ranges(text: &str, blocks: &[Range<usize>]) -> Vec<Range<usize>> {
    let runs: Vec<Range<usize>> = RE_BACKTICKS
        .find_iter(text)
        .map(|m| m.range())
        .filter(|run| !blocks.iter().any(|b| b.contains(&run.start)))
        .collect();

    let mut ranges = Vec::new();
    let mut i = 0;
    while i < runs.len() {
        let opener = &runs[i];
        let closer = runs[i + 1..].iter().position(|run| {
            run.len() == opener.len() && !text[opener.end..run.start].contains("\n\n")
        });
        match closer {
            Some(j) => {
                let close = &runs[i + 1 + j];
                ranges.push(opener.start..close.end);
                i += j + 2;
            }
            None => i += 1,
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(text: &str) -> Vec<ImageReference> {
        find_references(text, &ReferenceSyntax::all())
    }

    #[test]
    fn plain_markdown_image() {
        let text = "intro ![alt](images/a.png) outro";
        let refs = all(text);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "images/a.png");
        assert_eq!(&text[refs[0].span.clone()], "images/a.png");
        assert_eq!(refs[0].syntax, ReferenceSyntax::Markdown);
    }

    #[test]
    fn nbconvert_output_image() {
        let text = "![png](gradients_files/gradients_3_0.png)\n";
        assert_eq!(all(text)[0].path, "gradients_files/gradients_3_0.png");
    }

    #[test]
    fn title_and_angle_brackets() {
        let text = r#"![a](img/x.png "Figure 1") and ![b](<img/with space.png>)"#;
        let refs = all(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].path, "img/x.png");
        assert_eq!(refs[1].path, "img/with space.png");
        assert_eq!(&text[refs[1].span.clone()], "img/with space.png");
    }

    #[test]
    fn html_img_tags() {
        let text = r#"<img width="300" src="figs/plot.svg" alt="plot"> <IMG SRC='b.jpg'>"#;
        let refs = all(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].path, "figs/plot.svg");
        assert_eq!(refs[0].syntax, ReferenceSyntax::Html);
        assert_eq!(refs[1].path, "b.jpg");
    }

    #[test]
    fn html_data_src_is_not_src() {
        let refs = all(r#"<img data-src="lazy.png" src="real.png">"#);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "real.png");
    }

    #[test]
    fn syntax_filter() {
        let text = r#"![a](a.png) <img src="b.png">"#;
        let md = find_references(text, &[ReferenceSyntax::Markdown]);
        assert_eq!(md.len(), 1);
        assert_eq!(md[0].path, "a.png");
        let html = find_references(text, &[ReferenceSyntax::Html]);
        assert_eq!(html.len(), 1);
        assert_eq!(html[0].path, "b.png");
    }

    #[test]
    fn ordered_by_position_across_syntaxes() {
        let text = r#"<img src="first.png"> ![x](second.png) <img src="third.png">"#;
        let paths: Vec<_> = all(text).into_iter().map(|r| r.path).collect();
        assert_eq!(paths, ["first.png", "second.png", "third.png"]);
    }

    #[test]
    fn non_relative_targets_skipped() {
        let text = "![a](https://x.org/a.png) ![b](/assets/img/p/b.png) \
                    ![c](attachment:c.png) ![d](data:image/png;base64,AAAA) ![e](//cdn/e.png)";
        assert!(all(text).is_empty());
    }

    #[test]
    fn plain_links_are_not_images() {
        assert!(all("[not an image](images/a.png)").is_empty());
    }

    #[test]
    fn fenced_code_skipped() {
        let text = "```python\nprint('![a](in_code.png)')\n```\n![b](real.png)\n~~~\n![c](tilde.png)\n~~~\n";
        let refs = all(text);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "real.png");
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        assert!(all("```\n![a](a.png)\n").is_empty());
    }

    #[test]
    fn balanced_parens_stay_in_path() {
        let text = "![r](figs/result(1).png) and ![s](b.png \"t\")";
        let refs = all(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].path, "figs/result(1).png");
        assert_eq!(&text[refs[0].span.clone()], "figs/result(1).png");
        assert_eq!(refs[1].path, "b.png");
    }

    #[test]
    fn unbalanced_paren_ends_path() {
        let refs = all("(see ![a](a.png))");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "a.png");
    }

    #[test]
    fn inline_code_span_skipped() {
        let text = "Write `![alt](path/to/img.png)` or ``![x](`tick`.png)`` to embed. ![b](real.png)";
        let refs = all(text);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "real.png");
    }

    #[test]
    fn unmatched_backtick_is_literal() {
        let refs = all("a ` stray tick ![b](real.png)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "real.png");
    }

    #[test]
    fn indented_code_block_skipped() {
        let text = "Output:\n\n    ![x](indented.png)\n    more output\n\n![b](real.png)\n";
        let refs = all(text);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "real.png");
    }

    #[test]
    fn indented_list_continuation_is_not_code() {
        let text = "- first figure\n\n    ![a](in_list.png)\n";
        let refs = all(text);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "in_list.png");
    }

    #[test]
    fn indented_line_without_blank_is_paragraph_text() {
        let refs = all("some text\n    ![a](lazy.png)\n");
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn unquoted_html_src() {
        let text = "<img src=plot.png width=300> <img alt=x SRC=b.jpg>";
        let refs = all(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].path, "plot.png");
        assert_eq!(&text[refs[0].span.clone()], "plot.png");
        assert_eq!(refs[1].path, "b.jpg");
    }

    #[test]
    fn surrounding_whitespace_trimmed_from_path() {
        let text = r#"![a](< img.png >) <img src=" b.png">"#;
        let refs = all(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].path, "img.png");
        assert_eq!(&text[refs[0].span.clone()], "img.png");
        assert_eq!(refs[1].path, "b.png");
        assert_eq!(&text[refs[1].span.clone()], "b.png");
    }

    #[test]
    fn no_references_in_plain_text() {
        assert!(all("# Title\n\nJust prose.\n").is_empty());
    }

    #[test]
    fn is_relocatable_cases() {
        assert!(is_relocatable("images/a.png"));
        assert!(is_relocatable("../shared/a.png"));
        assert!(is_relocatable("a.png"));
        assert!(!is_relocatable(""));
        assert!(!is_relocatable("/abs.png"));
        assert!(!is_relocatable("http://x/a.png"));
        assert!(!is_relocatable("#anchor"));
    }

    #[test]
    fn splice_replaces_spans_only() {
        let text = "![a](x.png) and ![b](y.png)";
        let refs = all(text);
        let replacements: Vec<_> = refs
            .iter()
            .map(|r| (r.span.clone(), format!("/img/{}", r.path)))
            .collect();
        assert_eq!(
            splice(text, &replacements),
            "![a](/img/x.png) and ![b](/img/y.png)"
        );
    }

    #[test]
    fn splice_without_replacements_is_identity() {
        assert_eq!(splice("unchanged", &[]), "unchanged");
    }
}
