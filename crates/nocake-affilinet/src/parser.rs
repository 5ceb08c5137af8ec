//! Streaming product feed parser using quick-xml
//!
//! A feed is one root element whose children are product nodes:
//!
//! ```xml
//! <Products>
//!   <Product ArticleNumber="A1">
//!     <Price><DisplayPrice>19.99 EUR</DisplayPrice></Price>
//!     <Details><Title>Mug</Title>...</Details>
//!     ...
//!   </Product>
//! </Products>
//! ```
//!
//! Products are yielded one at a time; memory use is bounded by the largest
//! single node. Only the first element of each name is read at every level, so
//! a second `<Img>` or `<Product>` deeplink is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// One product node, field by field. `None` means the element was absent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawProductRecord {
    pub article_number: Option<String>,
    pub display_price: Option<String>,
    pub title: Option<String>,
    pub description_short: Option<String>,
    pub keywords: Option<String>,
    pub brand: Option<String>,
    pub deeplink: Option<String>,
    pub image_url: Option<String>,
    pub image_width: Option<String>,
    pub image_height: Option<String>,
    pub category_path: Option<String>,
}

/// Text elements read from a product node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    DisplayPrice,
    Title,
    DescriptionShort,
    Keywords,
    Brand,
    Deeplink,
    ImageUrl,
    ImageWidth,
    ImageHeight,
    CategoryPath,
}

impl Field {
    const ALL: [Field; 10] = [
        Field::DisplayPrice,
        Field::Title,
        Field::DescriptionShort,
        Field::Keywords,
        Field::Brand,
        Field::Deeplink,
        Field::ImageUrl,
        Field::ImageWidth,
        Field::ImageHeight,
        Field::CategoryPath,
    ];

    /// Element path below the product node
    fn path(self) -> &'static [&'static str] {
        match self {
            Field::DisplayPrice => &["Price", "DisplayPrice"],
            Field::Title => &["Details", "Title"],
            Field::DescriptionShort => &["Details", "DescriptionShort"],
            Field::Keywords => &["Details", "Keywords"],
            Field::Brand => &["Details", "Brand"],
            Field::Deeplink => &["Deeplinks", "Product"],
            Field::ImageUrl => &["Images", "Img", "URL"],
            Field::ImageWidth => &["Images", "Img", "Width"],
            Field::ImageHeight => &["Images", "Img", "Height"],
            Field::CategoryPath => &["CategoryPath", "ProductCategoryPath"],
        }
    }

    fn slot(self, record: &mut RawProductRecord) -> &mut Option<String> {
        match self {
            Field::DisplayPrice => &mut record.display_price,
            Field::Title => &mut record.title,
            Field::DescriptionShort => &mut record.description_short,
            Field::Keywords => &mut record.keywords,
            Field::Brand => &mut record.brand,
            Field::Deeplink => &mut record.deeplink,
            Field::ImageUrl => &mut record.image_url,
            Field::ImageWidth => &mut record.image_width,
            Field::ImageHeight => &mut record.image_height,
            Field::CategoryPath => &mut record.category_path,
        }
    }

    fn matching(path: &[&[u8]]) -> Option<Field> {
        Field::ALL.into_iter().find(|field| {
            let expected = field.path();
            expected.len() == path.len()
                && expected.iter().zip(path).all(|(a, b)| a.as_bytes() == *b)
        })
    }
}

/// Open element inside a product node
struct Frame {
    name: Vec<u8>,
    /// This element and all its ancestors are the first of their name
    first: bool,
    field: Option<Field>,
    seen_children: Vec<Vec<u8>>,
}

impl Frame {
    fn product() -> Self {
        Self {
            name: Vec::new(),
            first: true,
            field: None,
            seen_children: Vec::new(),
        }
    }

    /// Record a child named `name`; true if no earlier sibling had that name
    fn note_child(&mut self, name: &[u8]) -> bool {
        if self.seen_children.iter().any(|seen| seen == name) {
            false
        } else {
            self.seen_children.push(name.to_vec());
            true
        }
    }
}

/// How reading one product node ended
enum NodeEnd {
    Complete,
    /// Node consumed but its content could not be decoded
    Malformed(String),
}

/// Counters for one feed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    /// Product nodes yielded
    pub products: usize,
    /// Malformed product nodes skipped
    pub skipped: usize,
}

/// Lazy sequence of product records from an XML feed.
///
/// Malformed nodes are skipped with a warning. A structural error or a
/// truncated document ends the sequence; everything yielded before stays valid.
pub struct ProductStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    node_buf: Vec<u8>,
    depth: usize,
    done: bool,
    stats: StreamStats,
}

impl ProductStream<BufReader<File>> {
    /// Stream products from a feed file on disk
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

impl<R: BufRead> ProductStream<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            node_buf: Vec::new(),
            depth: 0,
            done: false,
            stats: StreamStats::default(),
        }
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    fn finish(&mut self, reason: Option<String>) -> Option<RawProductRecord> {
        if let Some(reason) = reason {
            log::warn!(
                "Feed ended early after {} products: {reason}",
                self.stats.products
            );
        }
        self.done = true;
        None
    }

    /// Count and report the outcome of one product node
    fn settle(&mut self, record: RawProductRecord, end: NodeEnd) -> Option<RawProductRecord> {
        match end {
            NodeEnd::Complete => {
                self.stats.products += 1;
                Some(record)
            }
            NodeEnd::Malformed(reason) => {
                self.stats.skipped += 1;
                log::warn!(
                    "Skipping malformed product {}: {reason}",
                    record.article_number.as_deref().unwrap_or("(no article number)")
                );
                None
            }
        }
    }
}

impl<R: BufRead> Iterator for ProductStream<R> {
    type Item = RawProductRecord;

    fn next(&mut self) -> Option<RawProductRecord> {
        while !self.done {
            self.buf.clear();
            let (record, end) = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) if self.depth == 1 => {
                    let mut record = RawProductRecord::default();
                    let attr = read_attributes(&e, &mut record);
                    match read_product(&mut self.reader, &mut self.node_buf, &mut record) {
                        Ok(end) => (record, attr.unwrap_or(end)),
                        Err(reason) => return self.finish(Some(reason)),
                    }
                }
                Ok(Event::Empty(e)) if self.depth == 1 => {
                    let mut record = RawProductRecord::default();
                    let end = read_attributes(&e, &mut record).unwrap_or(NodeEnd::Complete);
                    (record, end)
                }
                Ok(Event::Start(_)) => {
                    self.depth += 1;
                    continue;
                }
                Ok(Event::End(_)) => {
                    self.depth = self.depth.saturating_sub(1);
                    continue;
                }
                Ok(Event::Eof) if self.depth == 0 => return self.finish(None),
                Ok(Event::Eof) => return self.finish(Some("unexpected end of document".into())),
                Err(e) => {
                    let position = self.reader.error_position();
                    return self.finish(Some(format!("XML error at byte {position}: {e}")));
                }
                Ok(_) => continue,
            };

            if let Some(record) = self.settle(record, end) {
                return Some(record);
            }
        }
        None
    }
}

impl<R: BufRead> std::iter::FusedIterator for ProductStream<R> {}

/// Copy the product node's attributes; `Some` if one could not be decoded
fn read_attributes(start: &BytesStart<'_>, record: &mut RawProductRecord) -> Option<NodeEnd> {
    let attr = match start.try_get_attribute("ArticleNumber") {
        Ok(Some(attr)) => attr,
        Ok(None) => return None,
        Err(e) => return Some(NodeEnd::Malformed(format!("attribute: {e}"))),
    };
    match attr.unescape_value() {
        Ok(value) => {
            record.article_number = Some(value.into_owned());
            None
        }
        Err(e) => Some(NodeEnd::Malformed(format!("ArticleNumber: {e}"))),
    }
}

/// Read the rest of a product node up to its end tag.
///
/// Content errors mark the node malformed but keep consuming it. `Err` means
/// the document itself is broken.
fn read_product<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    record: &mut RawProductRecord,
) -> Result<NodeEnd, String> {
    let mut stack = vec![Frame::product()];
    let mut malformed: Option<String> = None;

    loop {
        buf.clear();
        match reader.read_event_into(buf) {
            Ok(Event::Start(e)) => {
                let frame = open_child(&mut stack, e.name().as_ref());
                if let Some(field) = frame.field {
                    *field.slot(record) = Some(String::new());
                }
                stack.push(frame);
            }
            Ok(Event::Empty(e)) => {
                let frame = open_child(&mut stack, e.name().as_ref());
                if let Some(field) = frame.field {
                    *field.slot(record) = Some(String::new());
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
                if stack.is_empty() {
                    return Ok(match malformed {
                        Some(reason) => NodeEnd::Malformed(reason),
                        None => NodeEnd::Complete,
                    });
                }
            }
            Ok(Event::Text(e)) => {
                let Some(field) = current_field(&stack) else {
                    continue;
                };
                match e.unescape() {
                    Ok(text) => append(field.slot(record), &text),
                    Err(e) => {
                        malformed.get_or_insert_with(|| e.to_string());
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(field) = current_field(&stack) {
                    append(field.slot(record), &String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => return Err("unexpected end of document".into()),
            Err(e) => {
                let position = reader.error_position();
                return Err(format!("XML error at byte {position}: {e}"));
            }
            Ok(_) => {}
        }
    }
}

/// Frame for a child of the innermost open element
fn open_child(stack: &mut [Frame], name: &[u8]) -> Frame {
    let Some(parent) = stack.last_mut() else {
        return Frame::product();
    };
    let first = parent.note_child(name) && parent.first;

    let field = if first {
        let mut path: Vec<&[u8]> = stack[1..].iter().map(|f| f.name.as_slice()).collect();
        path.push(name);
        Field::matching(&path)
    } else {
        None
    };

    Frame {
        name: name.to_vec(),
        first,
        field,
        seen_children: Vec::new(),
    }
}

fn current_field(stack: &[Frame]) -> Option<Field> {
    stack.last().and_then(|frame| frame.field)
}

fn append(slot: &mut Option<String>, text: &str) {
    slot.get_or_insert_with(String::new).push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> (Vec<RawProductRecord>, StreamStats) {
        let mut stream = ProductStream::new(xml.as_bytes());
        let records: Vec<_> = stream.by_ref().collect();
        (records, stream.stats())
    }

    const PRODUCT: &str = r#"
        <Product ArticleNumber="A-1">
            <Price><DisplayPrice>19.99 EUR</DisplayPrice></Price>
            <Details>
                <Title>Mug &amp; Saucer</Title>
                <DescriptionShort><![CDATA[<b>Fine</b> china]]></DescriptionShort>
                <Keywords>mug, cup ,,tea</Keywords>
                <Brand>ACME</Brand>
            </Details>
            <Deeplinks><Product>https://shop/a1</Product><Product>https://shop/other</Product></Deeplinks>
            <Images>
                <Img><URL>https://img/1.jpg</URL><Width>120</Width><Height>80</Height></Img>
                <Img><URL>https://img/2.jpg</URL><Width>999</Width></Img>
            </Images>
            <CategoryPath><ProductCategoryPath>Home &gt; Kitchen</ProductCategoryPath></CategoryPath>
        </Product>"#;

    #[test]
    fn full_product() {
        let xml = format!("<Products>{PRODUCT}</Products>");
        let (records, stats) = parse(&xml);
        assert_eq!(stats.products, 1);
        assert_eq!(
            records[0],
            RawProductRecord {
                article_number: Some("A-1".into()),
                display_price: Some("19.99 EUR".into()),
                title: Some("Mug & Saucer".into()),
                description_short: Some("<b>Fine</b> china".into()),
                keywords: Some("mug, cup ,,tea".into()),
                brand: Some("ACME".into()),
                deeplink: Some("https://shop/a1".into()),
                image_url: Some("https://img/1.jpg".into()),
                image_width: Some("120".into()),
                image_height: Some("80".into()),
                category_path: Some("Home > Kitchen".into()),
            }
        );
    }

    #[test]
    fn only_first_image_is_read() {
        let xml = r#"<Products><Product ArticleNumber="B">
            <Images><Img><URL>first</URL></Img><Img><URL>second</URL><Width>5</Width></Img></Images>
        </Product></Products>"#;
        let (records, _) = parse(xml);
        assert_eq!(records[0].image_url.as_deref(), Some("first"));
        assert_eq!(records[0].image_width, None);
    }

    #[test]
    fn absent_and_empty_elements() {
        let xml = r#"<Products><Product ArticleNumber="C"><Details><Brand/><Title></Title></Details></Product><Empty ArticleNumber="D"/></Products>"#;
        let (records, stats) = parse(xml);
        assert_eq!(stats.products, 2);
        assert_eq!(records[0].brand.as_deref(), Some(""));
        assert_eq!(records[0].title.as_deref(), Some(""));
        assert_eq!(records[0].keywords, None);
        assert_eq!(records[0].display_price, None);
        assert_eq!(records[1].article_number.as_deref(), Some("D"));
    }

    #[test]
    fn malformed_node_is_skipped() {
        let xml = r#"<Products>
            <Product ArticleNumber="ok1"><Details><Title>One</Title></Details></Product>
            <Product ArticleNumber="bad"><Details><Title>Broken &bogus; entity</Title></Details></Product>
            <Product ArticleNumber="ok2"><Details><Title>Two</Title></Details></Product>
        </Products>"#;
        let (records, stats) = parse(xml);
        let ids: Vec<_> = records
            .iter()
            .map(|r| r.article_number.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["ok1", "ok2"]);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn truncated_feed_keeps_earlier_records() {
        let xml = r#"<Products>
            <Product ArticleNumber="1"><Details><Title>One</Title></Details></Product>
            <Product ArticleNumber="2"><Details><Title>Tw"#;
        let (records, stats) = parse(xml);
        assert_eq!(records.len(), 1);
        assert_eq!(stats.products, 1);
    }

    #[test]
    fn mismatched_tags_end_stream() {
        let xml = r#"<Products>
            <Product ArticleNumber="1"></Product>
            <Product ArticleNumber="2"><Details></Oops></Product>
            <Product ArticleNumber="3"></Product>
        </Products>"#;
        let (records, _) = parse(xml);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn broken_before_first_product_is_empty() {
        let (records, stats) = parse("<Products><<<");
        assert!(records.is_empty());
        assert_eq!(stats, StreamStats::default());

        let (records, _) = parse("");
        assert!(records.is_empty());
    }

    #[test]
    fn stream_is_fused() {
        let mut stream = ProductStream::new("<Products><Product></Nope>".as_bytes());
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn open_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, format!("<?xml version=\"1.0\"?><Products>{PRODUCT}{PRODUCT}</Products>")).unwrap();
        let stream = ProductStream::open(&path).unwrap();
        assert_eq!(stream.count(), 2);
    }
}
