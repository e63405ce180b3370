//! Tariff identification carried through from the declaration

use serde::{Deserialize, Serialize};

/// Product metadata attached to a graph, treated as opaque strings and
/// echoed into traces and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffMetadata {
    /// Product code, e.g. "MOTOR_PRIVATE".
    pub product: String,
    /// Tariff version tag, e.g. "2024_09".
    pub version: String,
    /// 3-letter currency code.
    pub currency: String,
    /// Effective date in ISO format, when declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TariffMetadata {
    pub fn new(
        product: impl Into<String>,
        version: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            version: version.into(),
            currency: currency.into(),
            effective_date: None,
            author: None,
            description: None,
        }
    }

    pub fn with_effective_date(mut self, date: impl Into<String>) -> Self {
        self.effective_date = Some(date.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted_from_json() {
        let metadata = TariffMetadata::new("MOTOR_PRIVATE", "2024_09", "EUR");
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["product"], "MOTOR_PRIVATE");
        assert_eq!(json["currency"], "EUR");
        assert!(json.get("author").is_none());

        let enriched = metadata
            .with_effective_date("2024-09-01")
            .with_author("Actuarial Team");
        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["effective_date"], "2024-09-01");
        assert_eq!(json["author"], "Actuarial Team");
    }
}
