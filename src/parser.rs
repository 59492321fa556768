use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::ParseError;

/// Channel-level metadata of a parsed feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedContent {
    pub title: String,
    pub description: String,
}

/// A single `<item>` from a feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent {
    pub title: String,
    pub description: String,
    pub link: String,
}

/// Result of parsing one feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChannel {
    pub feed: FeedContent,
    pub posts: Vec<PostContent>,
}

/// Which element's text content is being collected.
#[derive(Clone, Copy)]
enum Capture {
    FeedTitle,
    FeedDescription,
    PostTitle,
    PostDescription,
    PostLink,
}

#[derive(Default)]
struct PostBuilder {
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
}

impl PostBuilder {
    fn build(self) -> PostContent {
        PostContent {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
        }
    }
}

/// Parse an RSS 2.0-style document into channel metadata and items.
///
/// The input is untrusted: anything that cannot be read as XML yields
/// `ParseError::MalformedXml`, well-formed XML without a `<channel>`
/// yields `ParseError::MissingChannel`. Missing `title`, `description`
/// or `link` fields default to the empty string rather than failing.
/// Items are returned in document order.
pub fn parse(xml: &str) -> Result<ParsedChannel, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut saw_element = false;
    let mut saw_channel = false;
    let mut in_channel = false;

    let mut feed_title: Option<String> = None;
    let mut feed_description: Option<String> = None;

    let mut posts = Vec::new();
    let mut current_item: Option<PostBuilder> = None;
    let mut capture: Option<Capture> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                saw_element = true;
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                capture = None;

                match name.as_str() {
                    "channel" => {
                        saw_channel = true;
                        in_channel = true;
                    }
                    "item" => {
                        current_item = Some(PostBuilder::default());
                    }
                    "title" if current_item.is_some() => capture = Some(Capture::PostTitle),
                    "description" if current_item.is_some() => {
                        capture = Some(Capture::PostDescription)
                    }
                    "link" if current_item.is_some() => capture = Some(Capture::PostLink),
                    "title" if in_channel => capture = Some(Capture::FeedTitle),
                    "description" if in_channel => capture = Some(Capture::FeedDescription),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                saw_element = true;
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    // A self-closing <channel/> still counts as a channel.
                    "channel" => saw_channel = true,
                    // A self-closing <item/> is still an item, with every
                    // field at its empty-string default.
                    "item" => posts.push(PostBuilder::default().build()),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                capture = None;

                match name.as_str() {
                    "channel" => in_channel = false,
                    "item" => {
                        if let Some(builder) = current_item.take() {
                            posts.push(builder.build());
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|_| ParseError::MalformedXml)?
                    .to_string();
                // Non-whitespace text outside the root element means the
                // input is not an XML document.
                if depth == 0 {
                    if !text.is_empty() {
                        return Err(ParseError::MalformedXml);
                    }
                    continue;
                }
                apply_text(
                    capture,
                    text,
                    &mut feed_title,
                    &mut feed_description,
                    &mut current_item,
                );
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                if depth == 0 {
                    continue;
                }
                apply_text(
                    capture,
                    text,
                    &mut feed_title,
                    &mut feed_description,
                    &mut current_item,
                );
            }
            Ok(Event::Eof) => break,
            Err(_) => return Err(ParseError::MalformedXml),
            _ => {}
        }
    }

    if !saw_element || depth != 0 {
        return Err(ParseError::MalformedXml);
    }
    if !saw_channel {
        return Err(ParseError::MissingChannel);
    }

    Ok(ParsedChannel {
        feed: FeedContent {
            title: feed_title.unwrap_or_default(),
            description: feed_description.unwrap_or_default(),
        },
        posts,
    })
}

/// Assign collected text to the field it belongs to. The first text seen
/// for a field wins, so the channel's own title is never overwritten by
/// a later channel's.
fn apply_text(
    capture: Option<Capture>,
    text: String,
    feed_title: &mut Option<String>,
    feed_description: &mut Option<String>,
    current_item: &mut Option<PostBuilder>,
) {
    match capture {
        Some(Capture::FeedTitle) => {
            if feed_title.is_none() {
                *feed_title = Some(text);
            }
        }
        Some(Capture::FeedDescription) => {
            if feed_description.is_none() {
                *feed_description = Some(text);
            }
        }
        Some(Capture::PostTitle) => {
            if let Some(item) = current_item {
                if item.title.is_none() {
                    item.title = Some(text);
                }
            }
        }
        Some(Capture::PostDescription) => {
            if let Some(item) = current_item {
                if item.description.is_none() {
                    item.description = Some(text);
                }
            }
        }
        Some(Capture::PostLink) => {
            if let Some(item) = current_item {
                if item.link.is_none() {
                    item.link = Some(text);
                }
            }
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_ITEM_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <description>Example feed for tests</description>
    <item>
      <title>First</title>
      <description>First post</description>
      <link>https://example.com/1</link>
    </item>
    <item>
      <title>Second</title>
      <description>Second post</description>
      <link>https://example.com/2</link>
    </item>
    <item>
      <title>Third</title>
      <description>Third post</description>
      <link>https://example.com/3</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_in_document_order() {
        let parsed = parse(THREE_ITEM_FEED).unwrap();

        assert_eq!(parsed.feed.title, "Example Feed");
        assert_eq!(parsed.feed.description, "Example feed for tests");
        assert_eq!(parsed.posts.len(), 3);

        let links: Vec<&str> = parsed.posts.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3"
            ]
        );
    }

    #[test]
    fn plain_text_is_malformed_xml() {
        assert_eq!(parse("not xml"), Err(ParseError::MalformedXml));
    }

    #[test]
    fn empty_input_is_malformed_xml() {
        assert_eq!(parse(""), Err(ParseError::MalformedXml));
    }

    #[test]
    fn mismatched_tags_are_malformed_xml() {
        assert_eq!(
            parse("<rss><channel></rss></channel>"),
            Err(ParseError::MalformedXml)
        );
    }

    #[test]
    fn unclosed_root_is_malformed_xml() {
        assert_eq!(parse("<rss><channel>"), Err(ParseError::MalformedXml));
    }

    #[test]
    fn xml_without_channel_is_missing_channel() {
        assert_eq!(parse("<rss></rss>"), Err(ParseError::MissingChannel));
    }

    #[test]
    fn html_document_is_missing_channel() {
        let html = "<html><head><title>A page</title></head><body>hi</body></html>";
        assert_eq!(parse(html), Err(ParseError::MissingChannel));
    }

    #[test]
    fn missing_fields_default_to_empty_strings() {
        let xml = r#"<rss><channel><item><link>https://example.com/a</link></item></channel></rss>"#;
        let parsed = parse(xml).unwrap();

        assert_eq!(parsed.feed.title, "");
        assert_eq!(parsed.feed.description, "");
        assert_eq!(parsed.posts.len(), 1);
        assert_eq!(parsed.posts[0].title, "");
        assert_eq!(parsed.posts[0].description, "");
        assert_eq!(parsed.posts[0].link, "https://example.com/a");
    }

    #[test]
    fn item_titles_do_not_leak_into_channel_metadata() {
        let xml = r#"<rss><channel>
            <item><title>Item title</title><link>https://example.com/a</link></item>
            <title>Channel title</title>
        </channel></rss>"#;
        let parsed = parse(xml).unwrap();

        assert_eq!(parsed.feed.title, "Channel title");
        assert_eq!(parsed.posts[0].title, "Item title");
    }

    #[test]
    fn cdata_content_is_honored() {
        let xml = r#"<rss><channel>
            <title><![CDATA[Feed & Friends]]></title>
            <item>
              <title><![CDATA[<b>Bold</b> title]]></title>
              <link>https://example.com/cdata</link>
            </item>
        </channel></rss>"#;
        let parsed = parse(xml).unwrap();

        assert_eq!(parsed.feed.title, "Feed & Friends");
        assert_eq!(parsed.posts[0].title, "<b>Bold</b> title");
    }

    #[test]
    fn entities_are_unescaped() {
        let xml = r#"<rss><channel><title>Cats &amp; Dogs</title></channel></rss>"#;
        let parsed = parse(xml).unwrap();
        assert_eq!(parsed.feed.title, "Cats & Dogs");
    }

    #[test]
    fn empty_channel_yields_no_posts() {
        let parsed = parse("<rss><channel></channel></rss>").unwrap();
        assert!(parsed.posts.is_empty());
    }

    #[test]
    fn self_closing_channel_is_still_a_channel() {
        let parsed = parse("<rss><channel/></rss>").unwrap();
        assert_eq!(parsed.feed.title, "");
        assert!(parsed.posts.is_empty());
    }

    #[test]
    fn self_closing_item_defaults_every_field() {
        let parsed = parse("<rss><channel><item/></channel></rss>").unwrap();
        assert_eq!(parsed.posts.len(), 1);
        assert_eq!(parsed.posts[0].link, "");
    }

    #[test]
    fn deterministic_for_identical_input() {
        assert_eq!(parse(THREE_ITEM_FEED), parse(THREE_ITEM_FEED));
    }
}
