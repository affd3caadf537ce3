//! 엔티티 ⇄ BSON 문서 매핑
//!
//! 엔티티의 serde 표현에서 [`Identifiable::ID_FIELD`] 필드를 `_id` 로 옮기고,
//! 읽을 때는 `_id` 를 식별자 문자열로 되돌려 [`Identifiable::set_id`] 로 채웁니다.

use mongodb::bson::{self, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::errors::{AppError, AppResult};
use crate::domain::entities::{bson_to_id, id_to_bson, Identifiable};

/// 엔티티를 저장용 문서로 변환합니다.
///
/// 식별자가 없으면 `_id` 를 넣지 않으므로 저장소가 새 ObjectId 를 할당합니다.
pub fn to_document<T>(entity: &T) -> AppResult<Document>
where
    T: Identifiable + Serialize,
{
    let mut document = bson::to_document(entity)?;
    document.remove(T::ID_FIELD);
    document.remove("_id");

    match entity.id() {
        Some(id) if !id.is_empty() => {
            let mut with_id = Document::new();
            with_id.insert("_id", id_to_bson(id));
            with_id.extend(document);
            Ok(with_id)
        }
        _ => Ok(document),
    }
}

/// 저장소 문서를 엔티티로 변환합니다.
///
/// `_id` 가 없거나 식별자로 표현할 수 없는 타입이면 `MappingError` 입니다.
pub fn from_document<T>(mut document: Document) -> AppResult<T>
where
    T: Identifiable + DeserializeOwned,
{
    let raw_id = document
        .remove("_id")
        .ok_or_else(|| AppError::MappingError("document has no _id".to_string()))?;
    let id = bson_to_id(&raw_id)
        .ok_or_else(|| AppError::MappingError(format!("unsupported _id value: {}", raw_id)))?;

    document.remove(T::ID_FIELD);
    let mut entity: T = bson::from_document(document)?;
    entity.set_id(id);
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId, Bson};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Player {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
    }

    impl Identifiable for Player {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Ticket {
        #[serde(default)]
        code: String,
        seat: i32,
    }

    impl Identifiable for Ticket {
        const ID_FIELD: &'static str = "code";

        fn id(&self) -> Option<&str> {
            Some(self.code.as_str()).filter(|code| !code.is_empty())
        }

        fn set_id(&mut self, id: String) {
            self.code = id;
        }
    }

    #[test]
    fn test_object_id_string_is_stored_as_object_id() {
        let oid = ObjectId::new();
        let player = Player { id: Some(oid.to_hex()), name: "Kim".to_string() };

        let document = to_document(&player).unwrap();

        assert_eq!(document, doc! { "_id": oid, "name": "Kim" });
    }

    #[test]
    fn test_entity_without_id_has_no_id_field() {
        let player = Player { id: None, name: "Kim".to_string() };

        assert_eq!(to_document(&player).unwrap(), doc! { "name": "Kim" });
    }

    #[test]
    fn test_document_round_trips_into_entity() {
        let oid = ObjectId::new();

        let player: Player = from_document(doc! { "_id": oid, "name": "Kim" }).unwrap();

        assert_eq!(player, Player { id: Some(oid.to_hex()), name: "Kim".to_string() });
    }

    #[test]
    fn test_custom_id_field() {
        let ticket = Ticket { code: "A-12".to_string(), seat: 12 };

        let document = to_document(&ticket).unwrap();
        assert_eq!(document, doc! { "_id": "A-12", "seat": 12 });

        let restored: Ticket = from_document(document).unwrap();
        assert_eq!(restored.code, "A-12");
        assert_eq!(restored.seat, 12);
    }

    #[test]
    fn test_missing_id_is_mapping_error() {
        let result: AppResult<Player> = from_document(doc! { "name": "Kim" });

        assert!(matches!(result, Err(AppError::MappingError(_))));
    }

    #[test]
    fn test_unsupported_id_type_is_mapping_error() {
        let result: AppResult<Player> = from_document(doc! { "_id": Bson::Boolean(true), "name": "Kim" });

        assert!(matches!(result, Err(AppError::MappingError(_))));
    }
}
