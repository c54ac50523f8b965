//! Tool identifier helpers shared by the collector, the store and the CLI.

use std::collections::HashSet;
use std::hash::Hash;

use url::Url;

/// Path prefix of a tool page.
pub const TOOL_PATH: &str = "/tool/";

/// Tool identifier from a category-file line: either an absolute tool URL
/// (`.../tool/<id>`) or an already-bare identifier. Query strings, fragments
/// and a trailing slash are dropped. Other on-site links yield `None`.
pub fn tool_from_url(line: &str) -> Option<String> {
    let line = line.trim();
    let id = match Url::parse(line) {
        Ok(url) => url
            .path()
            .strip_prefix(TOOL_PATH)?
            .trim_end_matches('/')
            .to_string(),
        Err(_) => line
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
    };
    is_tool_id(&id).then_some(id)
}

/// A single, non-empty path segment that stays inside `data/`.
pub fn is_tool_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', ':'])
}

/// Best-effort slug for a human-readable tool name. Not guaranteed to match
/// the site's own slug (punctuation and accents are kept as-is).
pub fn tool_to_url(name: &str) -> String {
    name.to_lowercase().replace(" | ", " ").replace(' ', "-")
}

/// Drop repeats, keeping the first occurrence of each item in place.
pub fn dedup_preserving_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_from_url() {
        assert_eq!(
            tool_from_url("https://www.futurepedia.io/tool/chatgpt"),
            Some("chatgpt".into())
        );
        assert_eq!(
            tool_from_url("https://www.futurepedia.io/tool/chatgpt/?ref=list#top"),
            Some("chatgpt".into())
        );
        assert_eq!(tool_from_url("  jasper-ai \r"), Some("jasper-ai".into()));
        assert_eq!(tool_from_url(""), None);
        assert_eq!(tool_from_url("https://"), None);
    }

    #[test]
    fn only_tool_pages_and_plain_ids_are_tools() {
        assert_eq!(tool_from_url("https://www.futurepedia.io/"), None);
        assert_eq!(tool_from_url("https://www.futurepedia.io/ai-tools/video"), None);
        assert_eq!(tool_from_url("https://www.futurepedia.io/tool/"), None);
        assert_eq!(tool_from_url("https://www.futurepedia.io/tool/a/b"), None);
        assert_eq!(tool_from_url(".."), None);
        assert_eq!(tool_from_url("."), None);
        assert_eq!(tool_from_url("../secrets"), None);
        assert_eq!(tool_from_url("a\\b"), None);
        assert_eq!(tool_from_url("mgrworkbench.ai"), Some("mgrworkbench.ai".into()));
        assert_eq!(tool_from_url("tome/"), Some("tome".into()));
    }

    #[test]
    fn test_tool_to_url() {
        assert_eq!(
            tool_to_url("This Resume Does Not Exist"),
            "this-resume-does-not-exist"
        );
        assert_eq!(tool_to_url("MgrWorkbench.ai"), "mgrworkbench.ai");
        assert_eq!(tool_to_url("Tome | AI Slides"), "tome-ai-slides");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let links = vec!["b", "a", "b", "c", "a", "d"];
        assert_eq!(dedup_preserving_order(links), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn dedup_of_unique_input_is_identity() {
        let links = vec![3, 1, 2];
        assert_eq!(dedup_preserving_order(links.clone()), links);
    }
}
