//! Catalog of product lists
//!
//! The network publishes its catalog as `;`-separated text with a header row.
//! Only three columns matter: `ListID`, `Titel` and `Products`.

use crate::error::ImportError;

const DELIMITER: char = ';';

/// One product list offered by the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDescriptor {
    pub list_id: u32,
    pub title: String,
    pub expected_product_count: u64,
}

impl ListDescriptor {
    /// Tag stored on every document of this list, e.g. `affilinet-42`
    pub fn list_tag(&self) -> String {
        format!("affilinet-{}", self.list_id)
    }
}

/// Parse catalog text into list descriptors, smallest lists first.
///
/// Rows with an unparsable `ListID` are skipped with a warning; an unparsable
/// product count counts as 0. Ties keep catalog order.
pub fn parse_catalog(text: &str) -> Result<Vec<ListDescriptor>, ImportError> {
    let text = text.replace("<br>", "");
    let mut records = split_records(&text, DELIMITER)
        .into_iter()
        .filter(|record| !(record.len() == 1 && record[0].trim().is_empty()));

    let Some(header) = records.next() else {
        return Err(ImportError::EmptyCatalog);
    };
    let column = |name: &str| header.iter().position(|h| h.trim() == name);

    let id_col = column("ListID").ok_or_else(|| {
        ImportError::CatalogUnavailable("catalog has no ListID column".to_string())
    })?;
    let title_col = column("Titel");
    let count_col = column("Products");

    let mut lists = Vec::new();
    for record in records {
        let raw_id = field(&record, Some(id_col));
        let Ok(list_id) = raw_id.parse::<u32>() else {
            log::warn!("Skipping catalog row with invalid ListID '{raw_id}'");
            continue;
        };
        lists.push(ListDescriptor {
            list_id,
            title: field(&record, title_col),
            expected_product_count: field(&record, count_col).parse().unwrap_or(0),
        });
    }

    if lists.is_empty() {
        return Err(ImportError::EmptyCatalog);
    }

    // stable
    lists.sort_by_key(|list| list.expected_product_count);
    Ok(lists)
}

/// Trimmed value of column `col`, empty when the row is short
fn field(record: &[String], col: Option<usize>) -> String {
    col.and_then(|c| record.get(c))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Split delimited text into records of fields.
///
/// Fields may be wrapped in double quotes, in which case they can contain the
/// delimiter and line breaks, and `""` stands for one quote.
fn split_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\n' => {
                if field.ends_with('\r') {
                    field.pop();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if field.ends_with('\r') {
        field.pop();
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = "ListID;Titel;Products\n\
                           10;Shoes;300\n\
                           11;Books;20\n\
                           12;Toys;300\n\
                           13;Games;5\n";

    #[test]
    fn sorted_ascending_and_stable() {
        let lists = parse_catalog(CATALOG).unwrap();
        let ids: Vec<u32> = lists.iter().map(|l| l.list_id).collect();
        assert_eq!(ids, vec![13, 11, 10, 12]);
        assert_eq!(lists[0].title, "Games");
        assert_eq!(lists[0].expected_product_count, 5);
        assert_eq!(lists[0].list_tag(), "affilinet-13");
    }

    #[test]
    fn br_markers_and_crlf_removed() {
        let text = "ListID;Titel;Products<br>\r\n7;Garden<br>;12\r\n";
        let lists = parse_catalog(text).unwrap();
        assert_eq!(
            lists,
            vec![ListDescriptor {
                list_id: 7,
                title: "Garden".to_string(),
                expected_product_count: 12,
            }]
        );
    }

    #[test]
    fn columns_located_by_header() {
        let text = "Products;Extra;ListID;Titel\n4;x;99;Reordered\n";
        let lists = parse_catalog(text).unwrap();
        assert_eq!(lists[0].list_id, 99);
        assert_eq!(lists[0].title, "Reordered");
        assert_eq!(lists[0].expected_product_count, 4);
    }

    #[test]
    fn quoted_fields() {
        let text = "ListID;Titel;Products\n5;\"Tea; \"\"Green\"\"\";1\n";
        let lists = parse_catalog(text).unwrap();
        assert_eq!(lists[0].title, "Tea; \"Green\"");
    }

    #[test]
    fn bad_rows_skipped_and_counts_default_to_zero() {
        let text = "ListID;Titel;Products\nabc;Broken;1\n8;NoCount;many\n";
        let lists = parse_catalog(text).unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].list_id, 8);
        assert_eq!(lists[0].expected_product_count, 0);
    }

    #[test]
    fn empty_catalog() {
        assert!(matches!(parse_catalog(""), Err(ImportError::EmptyCatalog)));
        assert!(matches!(
            parse_catalog("ListID;Titel;Products\n"),
            Err(ImportError::EmptyCatalog)
        ));
    }

    #[test]
    fn missing_id_column() {
        assert!(matches!(
            parse_catalog("Name;Products\nfoo;1\n"),
            Err(ImportError::CatalogUnavailable(_))
        ));
    }
}
