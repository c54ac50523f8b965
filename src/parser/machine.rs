use std::sync::LazyLock;

use regex::Regex;

use super::lines::{Line, Marker};
use super::record::{split_features_use_cases, Extraction, Field, ToolRecord, Unusable};
use super::Markers;

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Progress towards the description line. Product Information and
/// Visit website may arrive in either order; both are needed to arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Description {
    Closed,
    AwaitingVisit,
    VisitSeen,
    Armed,
}

/// Which list absorbs plain content lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Outside,
    Features,
    Categories,
}

pub struct Machine<'m> {
    markers: &'m Markers,
    description: Description,
    date_pending: bool,
    region: Region,
    saw_features: bool,
    saw_categories: bool,
    record: ToolRecord,
}

impl<'m> Machine<'m> {
    pub fn new(markers: &'m Markers) -> Self {
        Machine {
            markers,
            description: Description::Closed,
            date_pending: false,
            region: Region::Outside,
            saw_features: false,
            saw_categories: false,
            record: ToolRecord::default(),
        }
    }

    pub fn step(&mut self, line: Line<'_>) {
        match line {
            Line::Blank => {}
            Line::Marker(marker) => self.transition(marker),
            Line::Content(text) => self.absorb(text),
        }
    }

    fn transition(&mut self, marker: Marker) {
        match marker {
            Marker::ProductInformation => {
                self.description = match self.description {
                    Description::Closed => Description::AwaitingVisit,
                    Description::VisitSeen => Description::Armed,
                    other => other,
                };
            }
            Marker::VisitWebsite => {
                self.description = match self.description {
                    Description::Closed => Description::VisitSeen,
                    Description::AwaitingVisit => Description::Armed,
                    other => other,
                };
            }
            Marker::AddedOn => self.date_pending = true,
            Marker::Features => {
                self.region = Region::Features;
                self.saw_features = true;
                self.record.features.clear();
            }
            Marker::Categories => {
                self.region = Region::Categories;
                self.saw_categories = true;
                self.record.categories.clear();
            }
            Marker::ViewAllCategories => {
                if self.region == Region::Categories {
                    self.region = Region::Outside;
                }
            }
        }
    }

    fn absorb(&mut self, text: &str) {
        if self.description == Description::Armed {
            // Visit website stays open: a later Product Information re-arms
            // and the next capture replaces this one.
            self.record.description = Some(text.to_string());
            self.description = Description::VisitSeen;
        } else if self.date_pending {
            self.record.date = Some(text.to_string());
            self.date_pending = false;
        } else {
            match self.region {
                Region::Features => self.record.features.push(text.to_string()),
                Region::Categories if !is_category_noise(text, self.markers) => {
                    self.record.categories.push(text.to_string())
                }
                _ => {}
            }
        }
    }

    pub fn finish(self) -> Extraction {
        let mut record = self.record;
        if record.description.is_none() {
            let reason = match self.description {
                Description::Closed => Unusable::NoMarkers,
                Description::AwaitingVisit => Unusable::NoVisitWebsite,
                Description::VisitSeen => Unusable::NoProductInformation,
                Description::Armed => Unusable::NoDescriptionLine,
            };
            return Extraction::Unusable(reason);
        }

        let (features, use_cases) =
            split_features_use_cases(std::mem::take(&mut record.features), self.markers.use_cases_prefix);
        record.features = features;
        record.use_cases = use_cases;

        let mut missing = Vec::new();
        if self.markers.added_on.is_some() && record.date.is_none() {
            missing.push(Field::Date);
        }
        if !self.saw_features {
            missing.push(Field::Features);
        }
        if !self.saw_categories {
            missing.push(Field::Categories);
        }

        if missing.is_empty() {
            Extraction::Complete(record)
        } else {
            Extraction::Partial { record, missing }
        }
    }
}

/// Pagination counters, "Browse" links and separators scraped alongside
/// the category tags.
pub fn is_category_noise(line: &str, markers: &Markers) -> bool {
    markers.category_noise.iter().any(|n| *n == line) || NUMERIC_RE.is_match(line)
}
