use serde::{Deserialize, Serialize};

/// One entry of the gift catalog. The catalog itself is reference data
/// owned elsewhere; this layer only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftCatalogEntry {
    pub name: String,
    /// Price in diamonds.
    pub price: i64,
    /// Sending this gift follows the host automatically.
    pub triggers_auto_follow: bool,
}

/// Read-only gift catalog lookup.
pub trait GiftCatalog: Send + Sync {
    fn get(&self, name: &str) -> Option<GiftCatalogEntry>;
}

/// In-process catalog backed by a fixed entry list.
#[derive(Debug, Clone)]
pub struct StaticGiftCatalog {
    entries: Vec<GiftCatalogEntry>,
}

impl StaticGiftCatalog {
    #[must_use]
    pub const fn new(entries: Vec<GiftCatalogEntry>) -> Self {
        Self { entries }
    }
}

impl Default for StaticGiftCatalog {
    fn default() -> Self {
        Self::new(vec![
            GiftCatalogEntry {
                name: "rose".to_string(),
                price: 1,
                triggers_auto_follow: false,
            },
            GiftCatalogEntry {
                name: "heart".to_string(),
                price: 5,
                triggers_auto_follow: false,
            },
            GiftCatalogEntry {
                name: "perfume".to_string(),
                price: 50,
                triggers_auto_follow: false,
            },
            GiftCatalogEntry {
                name: "sports_car".to_string(),
                price: 1_000,
                triggers_auto_follow: true,
            },
            GiftCatalogEntry {
                name: "castle".to_string(),
                price: 20_000,
                triggers_auto_follow: true,
            },
        ])
    }
}

impl GiftCatalog for StaticGiftCatalog {
    fn get(&self, name: &str) -> Option<GiftCatalogEntry> {
        self.entries.iter().find(|e| e.name == name).cloned()
    }
}
