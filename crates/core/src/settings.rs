//! Walk configuration
//!
//! Settings are assumptions about the catalog being walked, not tunables.
//! Each `assume_*` flag trades generality for speed: turning one on is only
//! correct when the catalog actually honors the convention it names.

/// Configuration for walking one catalog
#[derive(Debug, Clone)]
pub struct WalkSettings {
    /// Href of the root catalog document
    pub catalog_href: String,

    /// Catalog follows the STAC best-practice layout: collections live at
    /// `{catalog}/{collection_id}/collection.json` and items at
    /// `{collection}/{item_id}/{item_id}.json`. Enables direct lookup by id
    /// without walking.
    pub assume_best_practice_layout: bool,

    /// Collection extents follow the STAC rule: when several bboxes or intervals
    /// are declared, the first aggregates the rest and can be dropped in
    /// favor of the finer ones.
    pub assume_extent_spec: bool,

    /// Link hrefs are already absolute, so per-link resolution against the
    /// declaring document can be skipped.
    pub assume_absolute_hrefs: bool,
}

impl WalkSettings {
    /// Settings for a catalog rooted at `catalog_href`, with no layout
    /// assumptions except STAC-conformant extents
    pub fn new(catalog_href: impl Into<String>) -> Self {
        WalkSettings {
            catalog_href: catalog_href.into(),
            assume_best_practice_layout: false,
            assume_extent_spec: true,
            assume_absolute_hrefs: false,
        }
    }

    /// Assume (or not) the best-practice id-addressable layout
    pub fn with_best_practice_layout(mut self, assume: bool) -> Self {
        self.assume_best_practice_layout = assume;
        self
    }

    /// Assume (or not) STAC-conformant aggregate extents
    pub fn with_extent_spec(mut self, assume: bool) -> Self {
        self.assume_extent_spec = assume;
        self
    }

    /// Assume (or not) that link hrefs are absolute
    pub fn with_absolute_hrefs(mut self, assume: bool) -> Self {
        self.assume_absolute_hrefs = assume;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WalkSettings::new("file:///data/catalog.json");
        assert_eq!(settings.catalog_href, "file:///data/catalog.json");
        assert!(!settings.assume_best_practice_layout);
        assert!(settings.assume_extent_spec);
        assert!(!settings.assume_absolute_hrefs);
    }

    #[test]
    fn test_builders() {
        let settings = WalkSettings::new("file:///data/catalog.json")
            .with_best_practice_layout(true)
            .with_extent_spec(false)
            .with_absolute_hrefs(true);
        assert!(settings.assume_best_practice_layout);
        assert!(!settings.assume_extent_spec);
        assert!(settings.assume_absolute_hrefs);
    }
}
