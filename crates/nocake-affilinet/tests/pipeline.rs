//! End-to-end import runs against an in-memory search engine
//!
//! Feeds are written to a temp dir by a fixture source; no network access.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use nocake_affilinet::{
    CatalogFetcher, FeedRetriever, ImportConfig, ImportError, ImportPipeline, ListDescriptor,
    RetrieveError,
};
use nocake_search::{MemoryEngine, SearchEngine};
use tempfile::TempDir;

enum Feed {
    Xml(String),
    Unavailable,
    Broken,
}

struct FixtureSource {
    dir: TempDir,
    catalog: Option<String>,
    feeds: BTreeMap<u32, Feed>,
    retrieved: RefCell<Vec<u32>>,
}

impl FixtureSource {
    fn new(catalog: &str) -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            catalog: Some(catalog.to_string()),
            feeds: BTreeMap::new(),
            retrieved: RefCell::new(Vec::new()),
        }
    }

    fn feed(mut self, list_id: u32, feed: Feed) -> Self {
        self.feeds.insert(list_id, feed);
        self
    }
}

impl CatalogFetcher for FixtureSource {
    fn fetch_catalog(&self) -> Result<String, ImportError> {
        self.catalog
            .clone()
            .ok_or_else(|| ImportError::CatalogUnavailable("HTTP 503".to_string()))
    }
}

impl FeedRetriever for FixtureSource {
    fn retrieve(
        &self,
        list: &ListDescriptor,
        _force_download: bool,
    ) -> Result<PathBuf, RetrieveError> {
        self.retrieved.borrow_mut().push(list.list_id);
        match self.feeds.get(&list.list_id) {
            Some(Feed::Xml(xml)) => {
                let path = self.dir.path().join(format!("{}.xml", list.list_id));
                std::fs::write(&path, xml)?;
                Ok(path)
            }
            Some(Feed::Unavailable) | None => Err(RetrieveError::Unavailable { status: Some(404) }),
            Some(Feed::Broken) => Err(RetrieveError::Io(std::io::Error::other("disk full"))),
        }
    }
}

fn feed(list_id: u32, count: usize) -> Feed {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Products>\n");
    for i in 0..count {
        xml.push_str(&format!(
            r#"<Product ArticleNumber="P{i}">
                <Price><DisplayPrice>{i}.50 EUR</DisplayPrice></Price>
                <Details><Title>Item {i} of {list_id}</Title><Keywords>a, b</Keywords></Details>
                <CategoryPath><ProductCategoryPath>Home &gt; Garden</ProductCategoryPath></CategoryPath>
            </Product>
"#
        ));
    }
    xml.push_str("</Products>\n");
    Feed::Xml(xml)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn config() -> ImportConfig {
    ImportConfig {
        batch_size: 3,
        ..Default::default()
    }
}

const TWO_LISTS: &str = "ListID;Titel;Products\n10;Garden;4\n20;Kitchen;2\n";

#[test]
fn success_publishes_new_index_and_removes_old() {
    let engine = MemoryEngine::new();
    engine.seed_index("nocake_20231231_1", &["nocake"]);
    engine.seed_index("nocake_20231230_1", &[]);

    let source = FixtureSource::new(TWO_LISTS)
        .feed(10, feed(10, 4))
        .feed(20, feed(20, 2));

    let summary = ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap();

    assert_eq!(summary.index, "nocake_20240101_1");
    assert_eq!(summary.lists_imported, 2);
    assert_eq!(summary.documents, 6);
    assert_eq!(summary.failed_documents, 0);

    assert_eq!(engine.index_names(), vec!["nocake_20240101_1"]);
    assert_eq!(
        engine.get_alias("nocake").unwrap(),
        vec!["nocake_20240101_1".to_string()]
    );

    let docs = engine.documents("nocake_20240101_1");
    assert_eq!(docs.len(), 6);
    let mug = &docs["affilinet-10-P1"];
    assert_eq!(mug["list"], "affilinet-10");
    assert_eq!(mug["price"]["value"], 1);
    assert_eq!(mug["price"]["currency"], "EUR");
    assert_eq!(mug["categories"][1], "Garden");
    assert!(docs.contains_key("affilinet-20-P0"));

    // catalog order: smallest list first
    assert_eq!(*source.retrieved.borrow(), vec![20, 10]);
}

#[test]
fn index_created_with_product_schema() {
    let engine = MemoryEngine::new();
    let source = FixtureSource::new(TWO_LISTS)
        .feed(10, feed(10, 1))
        .feed(20, feed(20, 1));

    ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap();

    let body = engine.index_body("nocake_20240101_1").unwrap();
    assert_eq!(body, nocake_affilinet::product_index("german"));
}

#[test]
fn ignored_lists_never_reach_bulk() {
    let engine = MemoryEngine::new();
    let catalog = "ListID;Titel;Products\n4745;Ignored;1\n10;Garden;1\n3661;Also ignored;1\n";
    let source = FixtureSource::new(catalog)
        .feed(4745, feed(4745, 5))
        .feed(10, feed(10, 1))
        .feed(3661, feed(3661, 5));

    let summary = ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap();

    assert_eq!(summary.lists_ignored, 2);
    assert_eq!(*source.retrieved.borrow(), vec![10]);
    for call in engine.bulk_calls() {
        for id in &call.ids {
            assert!(id.starts_with("affilinet-10-"), "{id}");
        }
    }
}

#[test]
fn unavailable_feed_is_skipped() {
    let engine = MemoryEngine::new();
    let source = FixtureSource::new(TWO_LISTS)
        .feed(10, feed(10, 2))
        .feed(20, Feed::Unavailable);

    let summary = ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap();

    assert_eq!(summary.lists_unavailable, 1);
    assert_eq!(summary.lists_imported, 1);
    assert_eq!(engine.aliases_of("nocake_20240101_1"), vec!["nocake"]);
}

#[test]
fn fatal_feed_error_keeps_alias_and_drops_new_index() {
    let engine = MemoryEngine::new();
    engine.seed_index("nocake_20231231_1", &["nocake"]);

    let source = FixtureSource::new(TWO_LISTS)
        .feed(20, feed(20, 2))
        .feed(10, Feed::Broken);

    let err = ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap_err();
    assert!(format!("{err:#}").contains("disk full"), "{err:#}");

    assert_eq!(engine.index_names(), vec!["nocake_20231231_1"]);
    assert_eq!(
        engine.get_alias("nocake").unwrap(),
        vec!["nocake_20231231_1".to_string()]
    );
}

#[test]
fn fatal_feed_error_on_first_run_leaves_no_alias() {
    let engine = MemoryEngine::new();
    let source = FixtureSource::new(TWO_LISTS)
        .feed(20, feed(20, 2))
        .feed(10, Feed::Broken);

    assert!(ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .is_err());

    assert!(!engine.alias_exists("nocake").unwrap());
    assert!(engine.index_names().is_empty());
}

#[test]
fn index_creation_failure_keeps_previous_generation() {
    let engine = MemoryEngine::new();
    engine.seed_index("nocake_20231231_1", &["nocake"]);
    engine.set_fail_create(true);

    let source = FixtureSource::new(TWO_LISTS)
        .feed(10, feed(10, 4))
        .feed(20, feed(20, 2));

    let err = ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("(6 of 6 documents failed)"),
        "{err:#}"
    );

    // every list was still read and sent to the missing index
    assert_eq!(*source.retrieved.borrow(), vec![20, 10]);
    let calls = engine.bulk_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|call| call.index == "nocake_20240101_1"));

    assert_eq!(engine.index_names(), vec!["nocake_20231231_1"]);
    assert_eq!(
        engine.get_alias("nocake").unwrap(),
        vec!["nocake_20231231_1".to_string()]
    );
}

#[test]
fn catalog_failure_creates_nothing() {
    let engine = MemoryEngine::new();
    let mut source = FixtureSource::new("");
    source.catalog = None;

    assert!(
        ImportPipeline::new(config(), &source, &engine)
            .run(today())
            .is_err()
    );
    assert!(engine.index_names().is_empty());

    let source = FixtureSource::new("ListID;Titel;Products\n");
    assert!(
        ImportPipeline::new(config(), &source, &engine)
            .run(today())
            .is_err()
    );
    assert!(engine.index_names().is_empty());
}

#[test]
fn bulk_failures_do_not_abort() {
    let engine = MemoryEngine::new();
    engine.set_fail_bulk(true);
    let source = FixtureSource::new(TWO_LISTS)
        .feed(10, feed(10, 4))
        .feed(20, feed(20, 2));

    let summary = ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap();

    assert_eq!(summary.documents, 0);
    assert_eq!(summary.failed_documents, 6);
    // 4 docs at batch size 3 → 2 requests, 2 docs → 1 request
    assert_eq!(summary.flushes, 3);
    assert_eq!(engine.aliases_of("nocake_20240101_1"), vec!["nocake"]);
}

#[test]
fn leftover_generation_from_same_day_is_replaced() {
    let engine = MemoryEngine::new();
    engine.seed_index("nocake_20240101_1", &[]);
    engine.seed_index("nocake_20231231_1", &["nocake"]);

    let source = FixtureSource::new(TWO_LISTS)
        .feed(10, feed(10, 1))
        .feed(20, feed(20, 1));

    let summary = ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap();

    assert_eq!(summary.index, "nocake_20240101_2");
    assert_eq!(engine.index_names(), vec!["nocake_20240101_2"]);
}

#[test]
fn malformed_products_are_skipped() {
    let engine = MemoryEngine::new();
    let xml = r#"<Products>
        <Product ArticleNumber="good"><Details><Title>ok</Title></Details></Product>
        <Product ArticleNumber="bad"><Details><Title>&nope;</Title></Details></Product>
    </Products>"#;
    let source = FixtureSource::new("ListID;Titel;Products\n10;Garden;2\n")
        .feed(10, Feed::Xml(xml.to_string()));

    let summary = ImportPipeline::new(config(), &source, &engine)
        .run(today())
        .unwrap();

    assert_eq!(summary.documents, 1);
    assert_eq!(summary.skipped_products, 1);
    assert!(
        engine
            .documents("nocake_20240101_1")
            .contains_key("affilinet-10-good")
    );
}
