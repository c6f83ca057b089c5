//! Deep merge of raw TOML trees.
//!
//! Merging operates on [`toml::Value`] rather than deserialized structs so
//! that a key absent from an upper layer never resets the lower layer's
//! value to a default.

/// Recursively merge `overlay` into `base`.
///
/// Tables merge per key. Scalars and arrays from the overlay replace the
/// base value; arrays are not concatenated, so `[[oidc.rules]]` in an upper
/// file replaces the lower file's rules.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_merge_and_arrays_replace() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [github]
            enabled = false
            client_id = ""
            [oidc]
            extra_claims = ["a", "b"]
            "#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
            [github]
            enabled = true
            [oidc]
            extra_claims = ["c"]
            [anonymous]
            enabled = true
            "#,
        )
        .unwrap();

        deep_merge(&mut base, &overlay);
        assert_eq!(base["github"]["enabled"].as_bool(), Some(true));
        assert_eq!(base["github"]["client_id"].as_str(), Some(""));
        assert_eq!(base["oidc"]["extra_claims"].as_array().unwrap().len(), 1);
        assert_eq!(base["anonymous"]["enabled"].as_bool(), Some(true));
    }
}
