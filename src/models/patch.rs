//! Partial-update fields for nullable columns.
//!
//! An absent key leaves the column alone, an explicit `null` clears it.

use serde::{Deserialize, Deserializer};

/// `None` when the key is absent, `Some(None)` for `null`, `Some(Some(v))` for a value.
pub type Nullable<T> = Option<Option<T>>;

/// Use with `#[serde(default, deserialize_with = "patch::nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The value to store, given what the row currently holds.
pub fn apply<T>(field: Nullable<T>, current: Option<T>) -> Option<T> {
    match field {
        Some(value) => value,
        None => current,
    }
}

/// SQL bind pair for `CASE WHEN $present THEN $value ELSE column END`.
pub fn binds<T>(field: &Nullable<T>) -> (bool, Option<&T>) {
    (field.is_some(), field.as_ref().and_then(Option::as_ref))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "nullable")]
        notes: Nullable<String>,
    }

    #[test]
    fn null_and_absent_are_distinct() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        let cleared: Body = serde_json::from_str(r#"{"notes":null}"#).unwrap();
        let set: Body = serde_json::from_str(r#"{"notes":"limps"}"#).unwrap();

        assert_eq!(absent.notes, None);
        assert_eq!(cleared.notes, Some(None));
        assert_eq!(set.notes, Some(Some("limps".to_string())));
    }

    #[test]
    fn apply_keeps_clears_or_replaces() {
        let old = || Some("old note".to_string());
        assert_eq!(apply(None, old()), old());
        assert_eq!(apply(Some(None), old()), None);
        assert_eq!(apply(Some(Some("new".to_string())), old()).as_deref(), Some("new"));
    }

    #[test]
    fn binds_report_presence() {
        assert_eq!(binds::<String>(&None), (false, None));
        assert_eq!(binds::<String>(&Some(None)), (true, None));
        let value = Some(Some(3));
        assert_eq!(binds(&value), (true, Some(&3)));
    }
}
