//! Document search
//!
//! Linear scan over the collection: a document matches when the lowercased
//! query is a substring of its lowercased name or extracted text. No index,
//! tokenization, or ranking; order of the input collection is preserved.

use crate::models::Document;

/// Whether a query should be treated as "no filter"
pub fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}

/// Check a single document against an already-lowercased query
pub fn matches(doc: &Document, lower_query: &str) -> bool {
    doc.name.to_lowercase().contains(lower_query)
        || doc
            .extracted_text
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(lower_query))
}

/// Filter documents by a free-text query
///
/// Blank queries return every document. The query itself is not trimmed
/// for matching, so surrounding spaces are significant.
pub fn filter<'a>(docs: &'a [Document], query: &str) -> Vec<&'a Document> {
    if is_blank(query) {
        return docs.iter().collect();
    }

    let lower_query = query.to_lowercase();
    docs.iter().filter(|doc| matches(doc, &lower_query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;

    fn doc(name: &str, text: Option<&str>) -> Document {
        Document::new(name, vec![Page::new("a.jpg")], text.map(String::from))
    }

    #[test]
    fn test_blank_query_returns_all_in_order() {
        let docs = vec![doc("One", None), doc("Two", None), doc("Three", None)];

        for query in ["", "   ", "\t\n"] {
            let results = filter(&docs, query);
            let names: Vec<_> = results.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, vec!["One", "Two", "Three"]);
        }
    }

    #[test]
    fn test_case_insensitive_name_and_text() {
        let docs = vec![doc("Invoice March", Some("Total: $42"))];

        assert_eq!(filter(&docs, "invoice").len(), 1);
        assert_eq!(filter(&docs, "MARCH").len(), 1);
        assert_eq!(filter(&docs, "total").len(), 1);
        assert_eq!(filter(&docs, "$42").len(), 1);
        assert!(filter(&docs, "xyz").is_empty());
    }

    #[test]
    fn test_documents_without_text_match_on_name_only() {
        let docs = vec![doc("Lease", None), doc("Notes", Some("lease renewal"))];

        let results = filter(&docs, "lease");
        assert_eq!(results.len(), 2);

        let results = filter(&docs, "renewal");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Notes");
    }

    #[test]
    fn test_substring_not_tokenized() {
        let docs = vec![doc("Tax return 2023", None)];
        assert_eq!(filter(&docs, "x ret").len(), 1);
        assert!(filter(&docs, "return tax").is_empty());
    }

    #[test]
    fn test_surrounding_spaces_are_significant() {
        let docs = vec![doc("Tax", None)];
        assert!(filter(&docs, " Tax ").is_empty());
    }

    #[test]
    fn test_preserves_input_order() {
        let docs = vec![
            doc("b receipt", None),
            doc("other", None),
            doc("a receipt", None),
        ];
        let names: Vec<_> = filter(&docs, "receipt")
            .into_iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(names, vec!["b receipt", "a receipt"]);
    }
}
