pub const QUICK_QUERIES: [&str; 4] = [
    "Show salinity profiles near the equator in March 2023",
    "Compare BGC parameters in Arabian Sea last 6 months",
    "Find nearest ARGO floats to 20°N, 65°E",
    "Temperature profiles at 200m depth in Indian Ocean",
];

/// Example queries offered as one-click inputs until the first user turn.
#[derive(Debug, Clone, Copy)]
pub struct QuickQueryProvider {
    queries: &'static [&'static str],
}

impl QuickQueryProvider {
    pub fn new(queries: &'static [&'static str]) -> Self {
        Self { queries }
    }

    pub fn queries(&self) -> &'static [&'static str] {
        self.queries
    }

    pub fn get(&self, index: usize) -> Option<&'static str> {
        self.queries.get(index).copied()
    }

    /// Only the seed welcome message is present.
    pub fn is_visible(&self, message_count: usize) -> bool {
        message_count == 1
    }
}

impl Default for QuickQueryProvider {
    fn default() -> Self {
        Self::new(&QUICK_QUERIES)
    }
}
