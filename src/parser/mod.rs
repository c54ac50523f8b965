pub mod lines;
pub mod machine;
pub mod record;

pub use record::{Extraction, Field};

/// Marker text for one layout of the tool page. The site has shipped
/// pages with and without an "Added on" block.
#[derive(Debug, Clone)]
pub struct Markers {
    pub product_information: &'static str,
    pub visit_website: &'static str,
    pub added_on: Option<&'static str>,
    /// Any line ending with this opens the features list ("Top Features", "Key Features").
    pub features_suffix: &'static str,
    pub categories: &'static str,
    pub view_all_categories: &'static str,
    pub use_cases_prefix: &'static str,
    pub category_noise: &'static [&'static str],
}

impl Markers {
    pub const DATED: Markers = Markers {
        product_information: "Product Information",
        visit_website: "Visit website",
        added_on: Some("Added on"),
        features_suffix: "Features",
        categories: "Categories",
        view_all_categories: "View All Categories",
        use_cases_prefix: "use cases",
        category_noise: &["Browse", "."],
    };

    pub const UNDATED: Markers = Markers {
        added_on: None,
        ..Markers::DATED
    };

    pub fn for_layout(with_date: bool) -> &'static Markers {
        if with_date {
            &Markers::DATED
        } else {
            &Markers::UNDATED
        }
    }

    pub fn has_date(&self) -> bool {
        self.added_on.is_some()
    }
}

/// Two passes: raw text → classified lines → state machine.
pub fn extract(raw: &str, markers: &Markers) -> Extraction {
    let mut machine = machine::Machine::new(markers);
    for line in lines::classify_lines(raw, markers) {
        machine.step(line);
    }
    machine.finish()
}

// ── Tests ──
