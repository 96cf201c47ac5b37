//! Conversion between a Rhai [`Scope`] and a JSON namespace snapshot, so an
//! agent's variable bindings survive across turns and process restarts.

use rhai::{Dynamic, Scope};

/// Serialize every variable currently bound in `scope` to a JSON object.
/// A variable whose value cannot be represented as JSON (a function
/// pointer, a native closure) is skipped with a warning rather than
/// failing the whole snapshot.
pub fn scope_to_json(scope: &Scope) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, _, value) in scope.iter() {
        match rhai::serde::from_dynamic::<serde_json::Value>(value) {
            Ok(json) => {
                map.insert(name.to_string(), json);
            }
            Err(err) => {
                tracing::warn!(variable = name, error = %err, "skipping non-serializable variable in sandbox snapshot");
            }
        }
    }
    serde_json::Value::Object(map)
}

/// Rebuild a [`Scope`] from a JSON namespace snapshot. A value that fails
/// to convert to a Rhai [`Dynamic`] is skipped with a warning; the rest of
/// the namespace still restores.
pub fn json_to_scope(namespace: &serde_json::Value) -> Scope<'static> {
    let mut scope = Scope::new();
    let Some(map) = namespace.as_object() else {
        return scope;
    };
    for (name, value) in map {
        match rhai::serde::to_dynamic(value.clone()) {
            Ok(dynamic) => scope.push_dynamic(name.clone(), dynamic),
            Err(err) => {
                tracing::warn!(variable = name, error = %err, "skipping non-restorable variable in sandbox snapshot");
            }
        }
    }
    scope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars_and_arrays() {
        let mut scope = Scope::new();
        scope.push("count", 3_i64);
        scope.push("label", "agent-1".to_string());
        scope.push("items", vec!["a".to_string(), "b".to_string()]);

        let json = scope_to_json(&scope);
        assert_eq!(json["count"], 3);
        assert_eq!(json["label"], "agent-1");

        let restored = json_to_scope(&json);
        let dynamic: Dynamic = restored.get_value("count").unwrap();
        assert_eq!(dynamic.as_int().unwrap(), 3);
    }

    #[test]
    fn empty_namespace_yields_empty_scope() {
        let scope = json_to_scope(&serde_json::json!({}));
        assert_eq!(scope.len(), 0);
    }

    #[test]
    fn non_object_namespace_yields_empty_scope() {
        let scope = json_to_scope(&serde_json::json!("not an object"));
        assert_eq!(scope.len(), 0);
    }
}
