use std::fmt;

use serde::Serialize;

/// Fields pulled out of one tool page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolRecord {
    pub description: Option<String>,
    pub date: Option<String>,
    pub features: Vec<String>,
    pub use_cases: Vec<String>,
    pub categories: Vec<String>,
}

/// Optional sections a usable record can lack. The description is never
/// one of them: without it the page is `Unusable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Field {
    Date,
    Features,
    Categories,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Date => "date",
            Field::Features => "features",
            Field::Categories => "categories",
        };
        f.write_str(name)
    }
}

/// Why a page yielded no description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unusable {
    /// Neither "Product Information" nor "Visit website" appeared.
    NoMarkers,
    NoVisitWebsite,
    NoProductInformation,
    /// Both markers seen but the page ended before a content line.
    NoDescriptionLine,
}

impl fmt::Display for Unusable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Unusable::NoMarkers => "no product information block",
            Unusable::NoVisitWebsite => "no \"Visit website\" marker",
            Unusable::NoProductInformation => "no \"Product Information\" marker",
            Unusable::NoDescriptionLine => "nothing after \"Visit website\"",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Complete(ToolRecord),
    Partial { record: ToolRecord, missing: Vec<Field> },
    Unusable(Unusable),
}

impl Extraction {
    pub fn record(&self) -> Option<&ToolRecord> {
        match self {
            Extraction::Complete(record) | Extraction::Partial { record, .. } => Some(record),
            Extraction::Unusable(_) => None,
        }
    }

    pub fn status(&self) -> String {
        match self {
            Extraction::Complete(_) => "complete".to_string(),
            Extraction::Partial { missing, .. } => {
                let names: Vec<String> = missing.iter().map(Field::to_string).collect();
                format!("partial (missing {})", names.join(", "))
            }
            Extraction::Unusable(reason) => format!("unusable ({})", reason),
        }
    }
}

/// Split at the first entry starting with `prefix` (case-insensitive).
/// Everything from that entry on is use cases; the rest stays features.
pub fn split_features_use_cases(
    mut features: Vec<String>,
    prefix: &str,
) -> (Vec<String>, Vec<String>) {
    let prefix = prefix.to_lowercase();
    match features
        .iter()
        .position(|f| f.to_lowercase().starts_with(&prefix))
    {
        Some(idx) => {
            let use_cases = features.split_off(idx);
            (features, use_cases)
        }
        None => (features, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn split_at_first_use_cases_entry() {
        let (features, use_cases) =
            split_features_use_cases(strings(&["a", "b", "Use Cases: do X", "c"]), "use cases");
        assert_eq!(features, strings(&["a", "b"]));
        assert_eq!(use_cases, strings(&["Use Cases: do X", "c"]));
    }

    #[test]
    fn split_is_case_insensitive_and_uses_first_match() {
        let (features, use_cases) = split_features_use_cases(
            strings(&["a", "USE CASES", "b", "use cases again"]),
            "use cases",
        );
        assert_eq!(features, strings(&["a"]));
        assert_eq!(use_cases, strings(&["USE CASES", "b", "use cases again"]));
    }

    #[test]
    fn no_use_cases_leaves_features_alone() {
        let input = strings(&["a", "because use cases", "c"]);
        let (features, use_cases) = split_features_use_cases(input.clone(), "use cases");
        assert_eq!(features, input);
        assert!(use_cases.is_empty());
    }

    #[test]
    fn status_strings() {
        let partial = Extraction::Partial {
            record: ToolRecord::default(),
            missing: vec![Field::Date, Field::Categories],
        };
        assert_eq!(partial.status(), "partial (missing date, categories)");
        assert!(partial.record().is_some());
        let unusable = Extraction::Unusable(Unusable::NoVisitWebsite);
        assert!(unusable.record().is_none());
    }
}
