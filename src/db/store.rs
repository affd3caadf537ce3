//! # Document Store Seam
//!
//! 리포지토리와 실제 저장소 사이의 경계입니다. 리포지토리는 이 trait 으로만
//! 저장소와 대화하며, 모든 연산은 컬렉션 이름으로 범위가 정해지고
//! BSON `Document` 를 주고받습니다.
//!
//! ## 구현체
//!
//! | 구현체 | 용도 |
//! |--------|------|
//! | [`MongoStore`](crate::db::mongo_store::MongoStore) | MongoDB 드라이버 기반 운영 저장소 |
//! | [`InMemoryStore`](crate::db::memory_store::InMemoryStore) | 프로세스 내 저장소 (테스트, 로컬 개발) |
//!
//! 저장소 에러는 재시도 없이 [`AppError`](crate::core::errors::AppError) 로
//! 변환되어 그대로 호출자에게 전달됩니다.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use log::warn;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use crate::core::errors::{AppError, AppResult};
use crate::domain::models::{BulkOperation, BulkWriteFailure, BulkWriteResult, Query};

/// 저장소 커서를 감싼 문서 스트림
///
/// 스트림을 drop 하면 저장소 측 커서도 해제됩니다.
pub type DocumentStream = BoxStream<'static, AppResult<Document>>;

/// 컬렉션 단위 문서 저장소
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 쿼리와 일치하는 문서 목록
    async fn find(&self, collection: &str, query: &Query) -> AppResult<Vec<Document>>;

    /// 쿼리와 일치하는 첫 문서 (쿼리의 정렬/skip 반영)
    async fn find_one(&self, collection: &str, query: &Query) -> AppResult<Option<Document>>;

    /// 필터와 일치하는 문서가 하나라도 있는지 확인합니다.
    async fn exists(&self, collection: &str, filter: Document) -> AppResult<bool> {
        let query = Query::matching(filter).limit(1);
        Ok(self.find_one(collection, &query).await?.is_some())
    }

    async fn count(&self, collection: &str, filter: Document) -> AppResult<u64>;

    /// `_id` 기준 upsert. `_id` 가 없으면 저장소가 새로 할당합니다.
    ///
    /// 저장된 문서의 `_id` 값을 반환합니다.
    async fn save(&self, collection: &str, document: Document) -> AppResult<Bson>;

    /// 새 문서 삽입. `_id` 충돌 시 `AppError::DuplicateKey`
    async fn insert(&self, collection: &str, document: Document) -> AppResult<Bson>;

    /// 필터와 일치하는 문서를 삭제하고 삭제된 개수를 반환합니다.
    async fn remove(&self, collection: &str, filter: Document) -> AppResult<u64>;

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> AppResult<Vec<Document>>;

    /// unordered 대량 쓰기. 개별 연산 실패가 나머지 연산을 중단시키지 않습니다.
    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<BulkOperation>,
    ) -> AppResult<BulkWriteResult>;

    /// 쿼리 결과를 커서 기반 스트림으로 엽니다.
    async fn stream(&self, collection: &str, query: &Query) -> AppResult<DocumentStream>;
}

/// unordered 대량 쓰기의 최종 결과. 실패가 하나라도 있으면 적용된 개수와 함께 에러로 돌려줍니다.
pub(crate) fn bulk_outcome(
    collection: &str,
    result: BulkWriteResult,
    failures: Vec<BulkWriteFailure>,
) -> AppResult<BulkWriteResult> {
    if failures.is_empty() {
        return Ok(result);
    }

    warn!("bulk write on {} partially applied: {:?}, {} failed", collection, result, failures.len());
    Err(AppError::BulkWriteError { result, failures })
}

/// 문서에 `_id` 가 없으면 새 ObjectId 를 할당하고, `_id` 값을 반환합니다.
pub fn assign_id(document: &mut Document) -> Bson {
    match document.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            document.insert("_id", id.clone());
            id
        }
    }
}
