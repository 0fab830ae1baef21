use serde_json::Value;

/// 以點分隔路徑讀取巢狀 JSON 值
///
/// 回傳 `Some(&Value::Null)` 表示欄位存在但值為 null，`None` 表示路徑不存在。
/// 陣列可用數字索引，例如 `items.0.title`。
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = value;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_object_access() {
        let value = json!({"author": {"nickname": "小明", "stats": {"fans": 42}}});
        assert_eq!(get_path(&value, "author.nickname"), Some(&json!("小明")));
        assert_eq!(get_path(&value, "author.stats.fans"), Some(&json!(42)));
    }

    #[test]
    fn test_single_segment() {
        let value = json!({"title": "hello"});
        assert_eq!(get_path(&value, "title"), Some(&json!("hello")));
    }

    #[test]
    fn test_array_index_segment() {
        let value = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(get_path(&value, "items.1.id"), Some(&json!(2)));
        assert_eq!(get_path(&value, "items.5.id"), None);
        assert_eq!(get_path(&value, "items.x"), None);
    }

    #[test]
    fn test_empty_path_is_none() {
        let value = json!({"a": 1});
        assert_eq!(get_path(&value, ""), None);
    }

    #[test]
    fn test_missing_segment_is_none() {
        let value = json!({"a": {"b": 1}});
        assert_eq!(get_path(&value, "a.c"), None);
        assert_eq!(get_path(&value, "x.b"), None);
    }

    #[test]
    fn test_null_intermediate_is_none() {
        let value = json!({"a": null});
        assert_eq!(get_path(&value, "a.b"), None);
    }

    #[test]
    fn test_null_leaf_is_some_null() {
        // 欄位存在但為 null，與路徑不存在要能區分
        let value = json!({"a": {"b": null}});
        assert_eq!(get_path(&value, "a.b"), Some(&Value::Null));
    }

    #[test]
    fn test_scalar_traversal_is_none() {
        let value = json!({"a": 5});
        assert_eq!(get_path(&value, "a.b"), None);
    }
}
