/// Sort orders accepted by the feed and comment endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Hot,
    New,
    Top,
    Rising,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Hot => "hot",
            SortOrder::New => "new",
            SortOrder::Top => "top",
            SortOrder::Rising => "rising",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchKind {
    #[default]
    All,
    Posts,
    Comments,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::All => "all",
            SearchKind::Posts => "posts",
            SearchKind::Comments => "comments",
        }
    }
}

/// Media slots a submolt or agent profile can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Avatar,
    Banner,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Avatar => "avatar",
            MediaKind::Banner => "banner",
        }
    }
}

/// Strips an optional `m/` prefix and surrounding whitespace from a
/// community name, so `m/rustlang`, ` rustlang ` and `rustlang` all
/// address the same submolt.
pub fn normalize_submolt(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_prefix("m/").unwrap_or(name);
    name.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_submolt_strips_prefix_and_whitespace() {
        assert_eq!(normalize_submolt("m/rustlang"), "rustlang");
        assert_eq!(normalize_submolt("  m/rustlang  "), "rustlang");
        assert_eq!(normalize_submolt("rustlang"), "rustlang");
        assert_eq!(normalize_submolt("m/ rustlang"), "rustlang");
    }

    #[test]
    fn test_normalize_submolt_only_strips_leading_prefix() {
        assert_eq!(normalize_submolt("teams/m/alpha"), "teams/m/alpha");
        assert_eq!(normalize_submolt("m/"), "");
        assert_eq!(normalize_submolt(""), "");
    }

    #[test]
    fn test_sort_and_search_params_render_lowercase() {
        assert_eq!(SortOrder::Hot.as_str(), "hot");
        assert_eq!(SortOrder::Rising.as_str(), "rising");
        assert_eq!(SearchKind::All.as_str(), "all");
        assert_eq!(MediaKind::Banner.as_str(), "banner");
    }
}
