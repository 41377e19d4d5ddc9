use pulldown_cmark::{Event, Parser, Tag};
use std::ops::Range;

/// Byte ranges of a markdown document where commands must not be recognised:
/// code (inline and block), block quotes, and raw HTML.
#[derive(Debug)]
pub struct IgnoreBlocks {
    ignore: Vec<Range<usize>>,
}

impl IgnoreBlocks {
    pub fn new(s: &str) -> IgnoreBlocks {
        let mut ignore: Vec<Range<usize>> = Vec::new();
        // The offset of a `Start` event spans the whole element, so nested
        // elements fall inside the range that was already recorded.
        for (event, range) in Parser::new(s).into_offset_iter() {
            let ignored = matches!(
                event,
                Event::Start(Tag::CodeBlock(_) | Tag::BlockQuote(_) | Tag::HtmlBlock)
                    | Event::Code(_)
                    | Event::InlineHtml(_)
            );
            if !ignored {
                continue;
            }
            let covered = ignore
                .last()
                .is_some_and(|last| last.start <= range.start && range.end <= last.end);
            if !covered {
                ignore.push(range);
            }
        }
        IgnoreBlocks { ignore }
    }

    /// Returns the first ignored range sharing at least one byte with `region`.
    pub fn overlaps_ignore(&self, region: Range<usize>) -> Option<Range<usize>> {
        self.ignore
            .iter()
            .find(|ignore| ignore.start < region.end && region.start < ignore.end)
            .cloned()
    }
}

#[cfg(test)]
fn ignored(s: &str) -> Vec<&str> {
    IgnoreBlocks::new(s)
        .ignore
        .iter()
        .map(|range| s[range.clone()].trim_end())
        .collect()
}

#[test]
fn inline_code() {
    assert_eq!(ignored("run `/approve` to approve"), ["`/approve`"]);
}

#[test]
fn fenced_code() {
    assert_eq!(
        ignored("before\n\n```\n/approve\n```\n\n/approve\n"),
        ["```\n/approve\n```"]
    );
}

#[test]
fn nested_block_quote_is_one_range() {
    assert_eq!(
        ignored("> quoted\n> > /approve\n\nafter"),
        ["> quoted\n> > /approve"]
    );
}

#[test]
fn html_comment() {
    assert_eq!(ignored("<!--\n/approve\n-->\n"), ["<!--\n/approve\n-->"]);
}

#[test]
fn plain_text_is_not_ignored() {
    assert!(ignored("/approve\n/lgtm cancel").is_empty());
}

#[test]
fn touching_region_does_not_overlap() {
    let body = "`code`/approve";
    let blocks = IgnoreBlocks::new(body);
    assert_eq!(blocks.overlaps_ignore(6..14), None);
    assert_eq!(blocks.overlaps_ignore(3..8), Some(0..6));
}
