use crate::report::report_model::{LocatorReport, ModalReport};

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a locator report for terminal output.
///
/// ```text
/// === Elements: https://site.test/ ===
///
///   visible   <button> /html[1]/body[1]/button[1] #open
///   revealed  <div> /html[1]/body[1]/div[1] (by /html[1]/body[1]/button[1])
///
/// === 2 elements, 1 revealed by activators ===
/// ```
pub fn format_locator_report(report: &LocatorReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Elements: {} ===\n\n", report.final_url));

    for entry in &report.elements {
        let state = if entry.displayed_from_start {
            "visible "
        } else {
            "revealed"
        };
        out.push_str(&format!("  {}  <{}> {}", state, entry.tag, entry.selector));
        if let Some(ref id) = entry.element_id {
            out.push_str(&format!(" #{}", id));
        }
        if let Some(ref activator) = entry.activator {
            out.push_str(&format!(" (by {})", activator));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "\n=== {} elements, {} revealed by activators ===\n",
        report.elements.len(),
        report.revealed().count()
    ));
    out
}

pub fn format_modal_report(report: &ModalReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Modals: {} ===\n\n", report.url));

    for entry in &report.modals {
        out.push_str(&format!("  <{}> {}\n", entry.activator_tag, entry.activator));
        for modal in &entry.modal {
            out.push_str(&format!("      opens {}\n", modal));
        }
    }

    out.push_str(&format!(
        "\n=== {} of {} activators open a modal ({} divs ignored) ===\n",
        report.modals.len(),
        report.probed,
        report.ignored_elements
    ));
    out
}
