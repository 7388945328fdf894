//! Wire form of the persisted collection: a JSON array of `{id, title, done}`
//! objects in display order.

use crate::error::StoreError;

use super::todo::Todo;

pub fn encode(items: &[Todo]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(items)?)
}

pub fn decode(blob: &str) -> Result<Vec<Todo>, StoreError> {
    Ok(serde_json::from_str(blob)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::todo::TodoId;

    #[test]
    fn decodes_blob_written_by_other_writers() {
        let blob = r#"[{"id":"1","title":"first","done":false},{"id":"2","title":"second","done":true}]"#;
        let items = decode(blob).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, TodoId::from("1"));
        assert!(items[1].done);
    }

    #[test]
    fn keeps_order() {
        let items = vec![Todo::create("a"), Todo::create("b"), Todo::create("c")];
        let back = decode(&encode(&items).unwrap()).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn rejects_malformed_blob() {
        assert!(matches!(decode("{not json"), Err(StoreError::Codec(_))));
        assert!(matches!(decode(r#"{"id":"1"}"#), Err(StoreError::Codec(_))));
    }
}
