//! Builds the single instruction prompt sent to the completion service.
//!
//! Pure string assembly: same entries in, same prompt out. The caller is
//! responsible for the submission guard (no blank terms).

use crate::session::ProductEntry;

/// Fixed instruction preamble. The comparison dimensions and the closing
/// summary/recommendation request are part of the contract with the model,
/// so they live in one place.
const PREAMBLE: &str = "\
You are a professional insurance claims and product expert for the Taiwanese market. \
Compare the insurance policies listed below.
Present the comparison as a clear Markdown table covering: coverage scope, \
exclusions, key differences, and relative strengths and weaknesses.
After the table, add an objective summary followed by sales and planning \
recommendations for an agent team.

";

/// Label for an entry: the user-supplied name, or "Product {i}" (1-based)
/// when the name field was left blank.
fn entry_label(entry: &ProductEntry, index: usize) -> String {
    let name = entry.name.trim();
    if name.is_empty() {
        format!("Product {}", index + 1)
    } else {
        name.to_string()
    }
}

/// Compose the full prompt from the entries in index order.
pub fn compose(entries: &[ProductEntry]) -> String {
    let mut prompt = String::from(PREAMBLE);
    for (i, entry) in entries.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] policy terms:\n{}\n\n",
            entry_label(entry, i),
            entry.terms
        ));
    }
    prompt
}
