use serde::{Deserialize, Serialize};

/// One harvested business record.
///
/// `name` is the only mandatory field; everything else is independently
/// and unpredictably absent on the surface. Absent fields stay `None`
/// (serialized as `null`) and are never defaulted to an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub rating: Option<String>,
    pub review_count: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub hours: Option<String>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rating: None,
            review_count: None,
            category: None,
            address: None,
            phone: None,
            website: None,
            hours: None,
        }
    }

    /// Key used for deduplication: the displayed name, verbatim.
    ///
    /// Known weakness: two distinct real-world entities sharing a
    /// displayed name collide and only the first is kept. A stable
    /// surface-provided id could replace this without changing the
    /// dedupe contract.
    pub fn identity_key(&self) -> &str {
        &self.name
    }
}
