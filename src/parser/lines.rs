use super::Markers;

/// Section boundary lines. Consumed by the state machine, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    ProductInformation,
    AddedOn,
    VisitWebsite,
    Features,
    Categories,
    ViewAllCategories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Marker(Marker),
    Content(&'a str),
}

/// Classify every line of a raw record. Lines are trimmed first; marker
/// precedence follows the declaration order of [`Marker`].
pub fn classify_lines<'a>(raw: &'a str, markers: &Markers) -> Vec<Line<'a>> {
    raw.lines().map(|l| classify(l.trim(), markers)).collect()
}

fn classify<'a>(line: &'a str, markers: &Markers) -> Line<'a> {
    if line.is_empty() {
        Line::Blank
    } else if line == markers.product_information {
        Line::Marker(Marker::ProductInformation)
    } else if markers.added_on == Some(line) {
        Line::Marker(Marker::AddedOn)
    } else if line == markers.visit_website {
        Line::Marker(Marker::VisitWebsite)
    } else if line.ends_with(markers.features_suffix) {
        Line::Marker(Marker::Features)
    } else if line == markers.categories {
        Line::Marker(Marker::Categories)
    } else if line == markers.view_all_categories {
        Line::Marker(Marker::ViewAllCategories)
    } else {
        Line::Content(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_and_content() {
        let raw = "Product Information\n\n  Visit website \r\nAcme\nTop Features\nKey Features\nCategories\nView All Categories";
        let lines = classify_lines(raw, &Markers::DATED);
        assert_eq!(
            lines,
            vec![
                Line::Marker(Marker::ProductInformation),
                Line::Blank,
                Line::Marker(Marker::VisitWebsite),
                Line::Content("Acme"),
                Line::Marker(Marker::Features),
                Line::Marker(Marker::Features),
                Line::Marker(Marker::Categories),
                Line::Marker(Marker::ViewAllCategories),
            ]
        );
    }

    #[test]
    fn markers_are_exact_except_features() {
        let lines = classify_lines("product information\nVisit website now\nFeatures list", &Markers::DATED);
        assert!(lines.iter().all(|l| matches!(l, Line::Content(_))));
    }

    #[test]
    fn undated_profile_treats_added_on_as_content() {
        let lines = classify_lines("Added on", &Markers::UNDATED);
        assert_eq!(lines, vec![Line::Content("Added on")]);
        let lines = classify_lines("Added on", &Markers::DATED);
        assert_eq!(lines, vec![Line::Marker(Marker::AddedOn)]);
    }
}
