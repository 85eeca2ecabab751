use serde::Deserialize;

/// OData collection envelope. Records are kept raw; projection happens in the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ODataResponse {
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
    #[serde(rename = "@odata.count", default)]
    pub count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_value_and_count() {
        let body = r#"{"@odata.context":"$metadata#Property","@odata.count":12,"value":[{"ListingKey":"X1"}]}"#;
        let page: ODataResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.count, Some(12));
        assert_eq!(page.value.len(), 1);
        assert_eq!(page.value[0]["ListingKey"], "X1");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let page: ODataResponse = serde_json::from_str("{}").unwrap();
        assert!(page.value.is_empty());
        assert_eq!(page.count, None);
    }
}
