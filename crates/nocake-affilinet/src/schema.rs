//! Index settings and mappings for product documents

use serde_json::{Value, json};

/// Name of the custom case-insensitive exact-match analyzer
pub const LOWER_KEYWORD: &str = "lower_keyword";

/// Create-index body for a product generation.
///
/// One shard without replicas: the index is written once per import and read
/// afterwards, so capacity is added through replicas. `title` and
/// `description` use the language `analyzer` (e.g. `german`).
pub fn product_index(analyzer: &str) -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "analysis": {
                "analyzer": {
                    LOWER_KEYWORD: {
                        "type": "custom",
                        "tokenizer": "keyword",
                        "filter": ["lowercase"]
                    }
                }
            }
        },
        "mappings": {
            "_source": { "enabled": true },
            "dynamic": false,
            "properties": {
                "list": { "type": "keyword" },
                "price": {
                    "type": "nested",
                    "properties": {
                        "value": { "type": "scaled_float", "scaling_factor": 100 },
                        "currency": { "type": "keyword" }
                    }
                },
                "articlenumber": { "type": "keyword" },
                "link": { "enabled": false },
                "title": { "type": "text", "analyzer": analyzer },
                "description": { "type": "text", "analyzer": analyzer },
                "keywords": { "type": "text", "analyzer": LOWER_KEYWORD },
                "categories": { "type": "text", "analyzer": LOWER_KEYWORD },
                "brand": { "type": "text", "analyzer": LOWER_KEYWORD },
                "image": { "enabled": false }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings() {
        let body = product_index("german");
        assert_eq!(body["settings"]["number_of_shards"], 1);
        assert_eq!(body["settings"]["number_of_replicas"], 0);
        let analyzer = &body["settings"]["analysis"]["analyzer"]["lower_keyword"];
        assert_eq!(analyzer["tokenizer"], "keyword");
        assert_eq!(analyzer["filter"][0], "lowercase");
    }

    #[test]
    fn field_mappings() {
        let body = product_index("german");
        let mappings = &body["mappings"];
        assert_eq!(mappings["dynamic"], false);
        assert_eq!(mappings["_source"]["enabled"], true);

        let props = &mappings["properties"];
        assert_eq!(props["list"]["type"], "keyword");
        assert_eq!(props["price"]["type"], "nested");
        assert_eq!(props["price"]["properties"]["value"]["scaling_factor"], 100);
        assert_eq!(props["price"]["properties"]["currency"]["type"], "keyword");
        assert_eq!(props["link"]["enabled"], false);
        assert_eq!(props["image"]["enabled"], false);
        assert_eq!(props["title"]["analyzer"], "german");
        assert_eq!(props["description"]["analyzer"], "german");
        for field in ["keywords", "categories", "brand"] {
            assert_eq!(props[field]["analyzer"], LOWER_KEYWORD, "{field}");
        }
    }

    #[test]
    fn analyzer_is_configurable() {
        let body = product_index("english");
        assert_eq!(body["mappings"]["properties"]["title"]["analyzer"], "english");
    }
}
