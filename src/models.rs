use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One scraped listing: snake_case field name → value, `None` when the page
/// did not provide it. Field presence varies per listing, so this stays a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingRecord(IndexMap<String, Option<String>>);

impl ListingRecord {
    /// Later inserts win on key collision
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value);
    }
}

#[cfg(test)]
impl ListingRecord {
    /// Value of `key`, `None` both when absent and when recorded as empty
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

impl From<IndexMap<String, String>> for ListingRecord {
    fn from(features: IndexMap<String, String>) -> Self {
        Self(features.into_iter().map(|(k, v)| (k, Some(v))).collect())
    }
}

/// Detail-page fields that are not part of the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub title: String,
    pub photo_src: Option<String>,
    pub agent_name: Option<String>,
    pub agent_image_src: Option<String>,
    /// `None` for listings without an agent
    pub agent_link: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overrides_but_keeps_position() {
        let mut record = ListingRecord::default();
        record.insert("rental_price", Some("€1,500".to_string()));
        record.insert("description", Some("from features".to_string()));
        record.insert("url", None);
        record.insert("description", Some("from page".to_string()));

        assert_eq!(record.get("description"), Some("from page"));
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["rental_price", "description", "url"]);
    }

    #[test]
    fn test_absent_value_serializes_as_null() {
        let mut record = ListingRecord::default();
        record.insert("postal_code", None);
        record.insert("agent", Some("Agency".to_string()));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"postal_code":null,"agent":"Agency"}"#);
        assert!(record.contains_key("postal_code"));
        assert_eq!(record.get("postal_code"), None);
    }

    #[test]
    fn test_from_features() {
        let mut features = IndexMap::new();
        features.insert("living_area".to_string(), "85 m²".to_string());

        let record = ListingRecord::from(features);
        assert_eq!(record.iter().collect::<Vec<_>>(), vec![("living_area", Some("85 m²"))]);
    }
}
