//! Channel search: a stable, case-insensitive substring filter on names.

use tv_proto::ChannelRecord;

/// Trim and lower-case a raw query.
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn matches(record: &ChannelRecord, normalized_query: &str) -> bool {
    normalized_query.is_empty() || record.name.to_lowercase().contains(normalized_query)
}

/// Records whose name contains `query`, in catalog order.  An empty query
/// returns the whole catalog.
pub fn filter(catalog: &[ChannelRecord], query: &str) -> Vec<ChannelRecord> {
    let query = normalize_query(query);
    if query.is_empty() {
        return catalog.to_vec();
    }
    catalog
        .iter()
        .filter(|record| matches(record, &query))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<ChannelRecord> {
        vec![
            ChannelRecord::new("BBC", "a"),
            ChannelRecord::new("CNN", "b"),
            ChannelRecord::new("BBC Arabic", "c").with_logo("bbc.png"),
            ChannelRecord::new("Al Jazeera", "bbc-in-url"),
        ]
    }

    /// `needle` appears in `haystack` in order (not necessarily contiguous).
    fn is_subsequence(needle: &[ChannelRecord], haystack: &[ChannelRecord]) -> bool {
        let mut it = haystack.iter();
        needle.iter().all(|n| it.any(|h| h == n))
    }

    #[test]
    fn test_scenario_bb() {
        let filtered = filter(&catalog()[..2], "bb");
        assert_eq!(filtered, vec![ChannelRecord::new("BBC", "a")]);
    }

    #[test]
    fn test_empty_query_is_identity() {
        assert_eq!(filter(&catalog(), ""), catalog());
        assert_eq!(filter(&catalog(), "   "), catalog());
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        let filtered = filter(&catalog(), "  bBc ");
        let names: Vec<_> = filtered.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["BBC", "BBC Arabic"]);
    }

    #[test]
    fn test_url_and_logo_are_not_matched() {
        let filtered = filter(&catalog(), "png");
        assert!(filtered.is_empty());
        let filtered = filter(&catalog(), "in-url");
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_results_are_ordered_subsequence() {
        let catalog = catalog();
        for q in ["", "b", "a", "c", "z", "bbc", " AL ", "jazeera"] {
            let filtered = filter(&catalog, q);
            assert!(is_subsequence(&filtered, &catalog), "query {:?}", q);
            let norm = normalize_query(q);
            assert!(filtered
                .iter()
                .all(|r| r.name.to_lowercase().contains(&norm)));
        }
    }

    #[test]
    fn test_non_ascii_names() {
        let catalog = vec![
            ChannelRecord::new("قناة الجزيرة", "a"),
            ChannelRecord::new("ÉCOLE TV", "b"),
        ];
        assert_eq!(filter(&catalog, "الجزيرة").len(), 1);
        assert_eq!(filter(&catalog, "école").len(), 1);
    }
}
