use serde::Deserialize;

/// Body of `POST /trigger-sync`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerSyncRequest {
    /// Catalog name, parsed case-insensitively. Defaults to IDX.
    #[serde(rename = "type")]
    pub sync_type: Option<String>,
    #[serde(default)]
    pub reset: bool,
    pub limit: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_uses_defaults() {
        let req: TriggerSyncRequest = serde_json::from_str("{}").unwrap();
        assert!(req.sync_type.is_none());
        assert!(!req.reset);
        assert!(req.limit.is_none());
    }

    #[test]
    fn reads_type_field() {
        let req: TriggerSyncRequest =
            serde_json::from_str(r#"{"type":"vow","reset":true,"limit":50}"#).unwrap();
        assert_eq!(req.sync_type.as_deref(), Some("vow"));
        assert!(req.reset);
        assert_eq!(req.limit, Some(50));
    }
}
