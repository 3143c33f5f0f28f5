//! Session-scoped state: API key, product count and the policy entries.
//!
//! Everything here lives only for the duration of the process. Nothing is
//! written to disk and the key is never logged.

/// Minimum number of products that can be compared side by side.
pub const MIN_PRODUCTS: usize = 2;
/// Maximum number of products (more than 5 makes the columns unreadable).
pub const MAX_PRODUCTS: usize = 5;

/// One product under comparison: a short display name and the pasted
/// policy terms. Entries are keyed by position only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductEntry {
    pub name: String,
    pub terms: String,
}

impl ProductEntry {
    /// True once the user has pasted something into the terms field.
    pub fn has_terms(&self) -> bool {
        !self.terms.trim().is_empty()
    }
}

/// State owned by one interactive session.
#[derive(Debug, Clone)]
pub struct Session {
    /// User-supplied Gemini API key. Empty until entered.
    pub api_key: String,
    /// How many product columns are shown, always in [MIN_PRODUCTS, MAX_PRODUCTS].
    pub product_count: usize,
    /// Exactly `product_count` entries, positionally indexed.
    pub entries: Vec<ProductEntry>,
}

impl Default for Session {
    fn default() -> Self {
        // The original form opens with three columns by default.
        Self::new(3)
    }
}

impl Session {
    pub fn new(product_count: usize) -> Self {
        let product_count = product_count.clamp(MIN_PRODUCTS, MAX_PRODUCTS);
        Self {
            api_key: String::new(),
            product_count,
            entries: vec![ProductEntry::default(); product_count],
        }
    }

    /// Whether the user has entered an API key. Until then the form is
    /// disabled and no call is ever attempted.
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Resize to `count` columns (clamped). Shrinking drops trailing
    /// entries, growing appends blank ones; surviving entries keep their
    /// position and content.
    pub fn set_product_count(&mut self, count: usize) {
        self.product_count = count.clamp(MIN_PRODUCTS, MAX_PRODUCTS);
        self.entries
            .resize(self.product_count, ProductEntry::default());
    }

    /// Index of the first entry with blank terms, if any. Used as the
    /// submission guard: while this is `Some`, no request is made.
    pub fn first_blank_entry(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.has_terms())
    }
}
