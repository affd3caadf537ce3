//! # Entity Contract
//!
//! 리포지토리에 저장되는 모든 엔티티가 만족해야 하는 식별자 계약과
//! 식별자 형식 관련 헬퍼를 제공합니다.
//!
//! ## 식별자 저장 규칙
//!
//! - 24자리 16진수 문자열은 BSON `ObjectId` 로 `_id` 에 저장됩니다.
//! - 그 외 문자열은 BSON 문자열로 `_id` 에 저장됩니다 (`save`/`insert` 에서만 가능).
//! - ID 기반 단건 조회/존재 확인/삭제는 유효한 ObjectId 문자열만 저장소로 보냅니다.
//!
//! ## 엔티티 정의 예제
//!
//! ```rust,ignore
//! use serde::{Deserialize, Serialize};
//! use mongo_repo_core::domain::entities::Identifiable;
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! pub struct Player {
//!     #[serde(default, skip_serializing_if = "Option::is_none")]
//!     pub id: Option<String>,
//!     pub name: String,
//!     pub score: i64,
//! }
//!
//! impl Identifiable for Player {
//!     fn id(&self) -> Option<&str> {
//!         self.id.as_deref()
//!     }
//!
//!     fn set_id(&mut self, id: String) {
//!         self.id = Some(id);
//!     }
//! }
//! ```

use mongodb::bson::{oid::ObjectId, Bson};

/// 영속 가능한 모든 도메인 객체의 기반 trait
///
/// 리포지토리는 이 trait 외에 엔티티 구조에 대해 아무것도 가정하지 않습니다.
/// 이 계층에서는 식별자 검증을 하지 않습니다.
pub trait Identifiable {
    /// 엔티티의 serde 표현에서 식별자를 담는 필드 이름
    ///
    /// 매핑 계층이 이 필드를 `_id` 로 옮기고, 읽을 때 다시 [`set_id`](Identifiable::set_id)
    /// 로 채웁니다. 엔티티의 ID 필드는 역직렬화 시 생략 가능해야 합니다
    /// (`#[serde(default)]`).
    const ID_FIELD: &'static str = "id";

    /// 현재 식별자. 아직 저장되지 않은 엔티티는 `None`
    fn id(&self) -> Option<&str>;

    /// 식별자를 설정합니다.
    fn set_id(&mut self, id: String);
}

/// 문자열이 유효한 문서 식별자(ObjectId) 형식인지 확인합니다.
pub fn is_valid_id(id: &str) -> bool {
    ObjectId::parse_str(id).is_ok()
}

/// 유효한 ObjectId 문자열이면 `ObjectId` 로 변환합니다.
pub fn parse_object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

/// 엔티티 식별자를 `_id` 에 저장할 BSON 값으로 변환합니다.
pub fn id_to_bson(id: &str) -> Bson {
    match ObjectId::parse_str(id) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(id.to_string()),
    }
}

/// 저장소의 `_id` 값을 엔티티 식별자 문자열로 변환합니다.
///
/// ObjectId 는 16진수 문자열로, 문자열은 그대로, 정수는 10진수 표기로 변환합니다.
/// 그 외 타입은 식별자로 표현할 수 없으므로 `None` 입니다.
pub fn bson_to_id(value: &Bson) -> Option<String> {
    match value {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) if !s.is_empty() => Some(s.clone()),
        Bson::Int32(n) => Some(n.to_string()),
        Bson::Int64(n) => Some(n.to_string()),
        _ => None,
    }
}
