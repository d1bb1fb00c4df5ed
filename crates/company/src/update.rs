//! Explicit-presence field updates.
//!
//! Update commands distinguish "leave unchanged", "clear", and "set" for every
//! optional field. Omission never changes a field; clearing is always an
//! explicit instruction. The same tri-state travels verbatim in the update
//! event so replay and the read-side fold see exactly what the caller asked.

use serde::{Deserialize, Serialize};

/// Tri-state update instruction for one optional field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldUpdate<T> {
    /// Leave the current value untouched.
    Keep,
    /// Remove the current value.
    Clear,
    /// Replace the current value.
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }

    /// Build from an optional value: `Some` sets, `None` clears.
    ///
    /// For callers that always overwrite every field (the original wire
    /// behavior); explicit-presence callers construct variants directly.
    pub fn overwrite(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldUpdate::Set(v),
            None => FieldUpdate::Clear,
        }
    }
}

impl<T: Clone> FieldUpdate<T> {
    /// Resolve the update against the current value.
    pub fn resolve(&self, current: Option<T>) -> Option<T> {
        match self {
            FieldUpdate::Keep => current,
            FieldUpdate::Clear => None,
            FieldUpdate::Set(v) => Some(v.clone()),
        }
    }
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_preserves_current_value() {
        let update: FieldUpdate<String> = FieldUpdate::Keep;
        assert_eq!(update.resolve(Some("1111".to_string())), Some("1111".to_string()));
        assert_eq!(update.resolve(None), None);
    }

    #[test]
    fn clear_removes_current_value() {
        let update: FieldUpdate<String> = FieldUpdate::Clear;
        assert_eq!(update.resolve(Some("1111".to_string())), None);
    }

    #[test]
    fn set_overwrites_current_value() {
        let update = FieldUpdate::Set("2222".to_string());
        assert_eq!(update.resolve(Some("1111".to_string())), Some("2222".to_string()));
    }

    #[test]
    fn overwrite_maps_absence_to_clear() {
        let update = FieldUpdate::overwrite(Some("2222".to_string()));
        assert_eq!(update.resolve(Some("1111".to_string())), Some("2222".to_string()));

        let update: FieldUpdate<String> = FieldUpdate::overwrite(None);
        assert_eq!(update.resolve(Some("1111".to_string())), None);
        assert!(!update.is_keep());
    }

    #[test]
    fn missing_json_field_defaults_to_keep() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default)]
            tax_id: FieldUpdate<String>,
        }

        let patch: Patch = serde_json::from_str("{}").unwrap();
        assert!(patch.tax_id.is_keep());

        let patch: Patch = serde_json::from_str(r#"{"tax_id":"clear"}"#).unwrap();
        assert_eq!(patch.tax_id, FieldUpdate::Clear);

        let patch: Patch = serde_json::from_str(r#"{"tax_id":{"set":"9"}}"#).unwrap();
        assert_eq!(patch.tax_id, FieldUpdate::Set("9".to_string()));
    }
}
