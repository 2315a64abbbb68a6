/// Opening token expected at the start of every generated document.
pub const DOCTYPE_MARKER: &str = "<!DOCTYPE";

/// Strip any preamble the model emitted before the document itself.
///
/// Trims surrounding whitespace, then drops everything ahead of the first
/// `<!DOCTYPE` unless the text already opens with a declaration. Text with
/// no marker at all passes through trimmed but otherwise untouched; this is
/// best effort, not a well-formedness guarantee.
pub fn normalize_document(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("<!") {
        return trimmed.to_string();
    }

    match trimmed.find(DOCTYPE_MARKER) {
        Some(idx) => trimmed[idx..].to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_document;

    #[test]
    fn normalized_input_is_returned_unchanged() {
        let html = "<!DOCTYPE html>\n<html><body></body></html>";
        assert_eq!(normalize_document(html), html);
        assert_eq!(normalize_document(&normalize_document(html)), html);
    }

    #[test]
    fn preamble_before_marker_is_dropped() {
        let raw = "Sure! Here is your website:\n\n<!DOCTYPE html>\n<html></html>";
        assert_eq!(normalize_document(raw), "<!DOCTYPE html>\n<html></html>");
    }

    #[test]
    fn markerless_text_passes_through_trimmed() {
        let raw = "  <html><body>no doctype here</body></html>\n";
        assert_eq!(
            normalize_document(raw),
            "<html><body>no doctype here</body></html>"
        );
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let raw = "\n\n<!DOCTYPE html><html></html>  ";
        assert_eq!(normalize_document(raw), "<!DOCTYPE html><html></html>");
    }

    #[test]
    fn other_declarations_are_left_alone() {
        // Anything already opening with "<!" counts as a declaration start.
        let raw = "<!-- generated --><!DOCTYPE html><html></html>";
        assert_eq!(normalize_document(raw), raw);
    }
}
