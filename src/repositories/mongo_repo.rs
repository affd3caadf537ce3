//! # 범용 MongoDB 리포지토리
//!
//! [`Identifiable`] 을 구현한 임의의 엔티티 타입에 대해 하나의 컬렉션을 대상으로
//! CRUD, 페이지 조회, 집계, 대량 쓰기, 커서 스트리밍을 제공합니다.
//!
//! ## 동작 규칙
//!
//! - **ID 형식 검증**: `find_by_id`/`exists_by_id`/`delete_by_id` 는 유효한 ObjectId
//!   문자열만 저장소로 보냅니다. 잘못된 형식은 저장소 호출 없이 "없음"으로 처리됩니다.
//! - **save 는 upsert**: ID 가 있으면 해당 문서를 교체하거나 생성하고, 없으면
//!   저장소가 할당한 ID 를 엔티티에 기록해 반환합니다.
//! - **insert 는 충돌 거부**: 같은 ID 가 이미 있으면 `AppError::DuplicateKey` 이며
//!   기존 문서는 변경되지 않습니다.
//! - **대량 쓰기는 unordered**: 개별 실패가 나머지 연산을 멈추지 않습니다. 실패가
//!   있으면 `AppError::BulkWriteError` 에 적용된 개수와 실패 목록이 함께 담깁니다.
//! - **재시도 없음**: 저장소 에러는 그대로 호출자에게 전달됩니다.
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mongodb::bson::doc;
//! use mongo_repo_core::db::InMemoryStore;
//! use mongo_repo_core::domain::models::{PageRequest, Query, Sort, Update};
//! use mongo_repo_core::repositories::MongoRepo;
//!
//! let repo: MongoRepo<Player> = MongoRepo::new(Arc::new(InMemoryStore::new()), "players");
//!
//! let saved = repo.save(Player::new("Kim", 30)).await?;
//! let found = repo.find_by_id(saved.id().unwrap_or_default()).await?;
//!
//! let page = repo
//!     .find_all_paged(PageRequest::of(0, 20).with_sort(Sort::desc("score")))
//!     .await?;
//!
//! repo.update_multi(
//!     Query::matching(doc! { "team": "red" }),
//!     Update::new().inc("score", 10),
//!     true,
//! ).await?;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use log::debug;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::errors::{AppError, AppResult};
use crate::db::store::DocumentStore;
use crate::domain::entities::{bson_to_id, id_to_bson, parse_object_id, Identifiable};
use crate::domain::models::{
    Aggregation, BulkOperation, BulkWriteResult, Example, Page, PageRequest, Query, Sort, Update,
};
use crate::repositories::cursor::EntityCursor;
use crate::repositories::mapping::{from_document, to_document};

/// 하나의 컬렉션에 바인딩된 범용 리포지토리
///
/// 저장소 핸들(`Arc`)과 컬렉션 이름만 보유하므로 복제 비용이 낮고,
/// 여러 태스크에서 동시에 사용할 수 있습니다.
pub struct MongoRepo<T> {
    store: Arc<dyn DocumentStore>,
    collection: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for MongoRepo<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for MongoRepo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoRepo")
            .field("collection", &self.collection)
            .finish()
    }
}

impl<T> MongoRepo<T>
where
    T: Identifiable + Serialize + DeserializeOwned + Send + Sync,
{
    /// 저장소 핸들과 컬렉션 이름으로 리포지토리를 생성합니다.
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            _entity: PhantomData,
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    // ===== 조회 =====

    /// ID 로 엔티티를 조회합니다.
    ///
    /// # 반환값
    ///
    /// * `Ok(Some(T))` - 엔티티를 찾은 경우
    /// * `Ok(None)` - 없거나 ID 형식이 올바르지 않은 경우 (저장소 호출 없음)
    /// * `Err(AppError)` - 저장소 또는 매핑 오류
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<T>> {
        let Some(object_id) = parse_object_id(id) else {
            debug!("find_by_id skipped, malformed id on {}: {:?}", self.collection, id);
            return Ok(None);
        };

        debug!("find_by_id on {}: {}", self.collection, object_id);
        self.find_one_matching(Query::by_id(object_id)).await
    }

    /// ID 에 해당하는 엔티티가 존재하는지 확인합니다.
    ///
    /// 형식이 올바르지 않은 ID 는 저장소 호출 없이 `false` 입니다.
    pub async fn exists_by_id(&self, id: &str) -> AppResult<bool> {
        let Some(object_id) = parse_object_id(id) else {
            debug!("exists_by_id skipped, malformed id on {}: {:?}", self.collection, id);
            return Ok(false);
        };

        self.store
            .exists(&self.collection, doc! { "_id": object_id })
            .await
    }

    /// [`exists_by_id`](Self::exists_by_id) 와 동일합니다.
    pub async fn exists(&self, id: &str) -> AppResult<bool> {
        self.exists_by_id(id).await
    }

    pub async fn find_all(&self) -> AppResult<Vec<T>> {
        self.find(Query::new()).await
    }

    pub async fn find_all_sorted(&self, sort: Sort) -> AppResult<Vec<T>> {
        self.find(Query::new().with_sort(sort)).await
    }

    /// 페이지 단위 조회
    ///
    /// 전체 개수와 데이터를 별도의 저장소 호출로 가져옵니다. 두 호출 사이의
    /// 동시 쓰기는 메타데이터와 내용물의 불일치로 나타날 수 있습니다.
    pub async fn find_all_paged(&self, page: PageRequest) -> AppResult<Page<T>> {
        if page.size == 0 {
            return Err(AppError::ValidationError(
                "Page size must not be less than one".to_string(),
            ));
        }

        let total = self.count().await?;
        let content = self.find(Query::new().with_page(&page)).await?;

        Ok(Page::new(content, &page, total))
    }

    /// 쿼리와 일치하는 모든 엔티티
    pub async fn find(&self, query: Query) -> AppResult<Vec<T>> {
        debug!("find on {}: {:?}", self.collection, query.filter);

        self.store
            .find(&self.collection, &query)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// 컬렉션의 첫 엔티티 (필터 없음)
    pub async fn find_one(&self) -> AppResult<Option<T>> {
        self.find_one_matching(Query::new()).await
    }

    /// 쿼리와 일치하는 첫 엔티티
    pub async fn find_one_matching(&self, query: Query) -> AppResult<Option<T>> {
        self.store
            .find_one(&self.collection, &query)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn count(&self) -> AppResult<u64> {
        self.count_matching(Query::new()).await
    }

    pub async fn count_matching(&self, query: Query) -> AppResult<u64> {
        self.store.count(&self.collection, query.filter).await
    }

    // ===== 쓰기 =====

    /// 엔티티를 저장(upsert)합니다.
    ///
    /// ID 가 없는 엔티티는 저장소가 할당한 ID 를 받아 반환됩니다.
    pub async fn save(&self, mut entity: T) -> AppResult<T> {
        let document = to_document(&entity)?;
        let id = self.store.save(&self.collection, document).await?;
        debug!("saved into {}: {}", self.collection, id);

        sync_stored_id(&mut entity, &id)?;
        Ok(entity)
    }

    /// 엔티티를 하나씩 순서대로 저장합니다.
    ///
    /// 첫 실패에서 중단하며, 그 전에 저장된 엔티티는 되돌리지 않습니다.
    pub async fn save_all<I>(&self, entities: I) -> AppResult<Vec<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut saved = Vec::new();
        for entity in entities {
            saved.push(self.save(entity).await?);
        }
        Ok(saved)
    }

    /// 새 엔티티를 삽입합니다. ID 충돌 시 `AppError::DuplicateKey`
    pub async fn insert(&self, mut entity: T) -> AppResult<T> {
        let document = to_document(&entity)?;
        let id = self.store.insert(&self.collection, document).await?;
        debug!("inserted into {}: {}", self.collection, id);

        sync_stored_id(&mut entity, &id)?;
        Ok(entity)
    }

    /// 엔티티를 하나씩 순서대로 삽입합니다. 첫 실패에서 중단합니다.
    pub async fn insert_all<I>(&self, entities: I) -> AppResult<Vec<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut inserted = Vec::new();
        for entity in entities {
            inserted.push(self.insert(entity).await?);
        }
        Ok(inserted)
    }

    /// ID 로 삭제합니다. 형식이 올바르지 않은 ID 는 저장소 호출 없이 무시됩니다.
    pub async fn delete_by_id(&self, id: &str) -> AppResult<()> {
        let Some(object_id) = parse_object_id(id) else {
            debug!("delete_by_id skipped, malformed id on {}: {:?}", self.collection, id);
            return Ok(());
        };

        let deleted = self
            .store
            .remove(&self.collection, doc! { "_id": object_id })
            .await?;
        debug!("delete_by_id on {}: {} removed", self.collection, deleted);
        Ok(())
    }

    /// 엔티티의 ID 에 해당하는 문서를 삭제합니다. ID 가 없으면 아무것도 하지 않습니다.
    pub async fn delete(&self, entity: &T) -> AppResult<()> {
        match entity.id().filter(|id| !id.is_empty()) {
            Some(id) => {
                self.store
                    .remove(&self.collection, doc! { "_id": id_to_bson(id) })
                    .await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// 컬렉션의 모든 문서를 삭제합니다.
    pub async fn delete_all(&self) -> AppResult<()> {
        let deleted = self.store.remove(&self.collection, Document::new()).await?;
        debug!("delete_all on {}: {} removed", self.collection, deleted);
        Ok(())
    }

    pub async fn delete_entities(&self, entities: &[T]) -> AppResult<()> {
        for entity in entities {
            self.delete(entity).await?;
        }
        Ok(())
    }

    /// 주어진 ID 들을 하나의 unordered 대량 쓰기로 삭제합니다.
    pub async fn delete_all_by_ids(&self, ids: &[ObjectId]) -> AppResult<BulkWriteResult> {
        let operations = ids
            .iter()
            .map(|id| BulkOperation::DeleteMany { filter: doc! { "_id": *id } })
            .collect();

        self.store.bulk_write(&self.collection, operations).await
    }

    /// 쿼리와 일치하는 모든 문서를 삭제합니다.
    pub async fn delete_matching(&self, query: Query) -> AppResult<()> {
        let deleted = self.store.remove(&self.collection, query.filter).await?;
        debug!("delete_matching on {}: {} removed", self.collection, deleted);
        Ok(())
    }

    // ===== 업데이트 =====

    /// ID 에 해당하는 문서 하나를 업데이트합니다.
    pub async fn update_by_id(&self, id: ObjectId, update: Update) -> AppResult<()> {
        self.update_multi(Query::by_id(id), update, false).await?;
        Ok(())
    }

    /// 쿼리와 일치하는 첫 문서 하나를 업데이트합니다.
    pub async fn update(&self, query: Query, update: Update) -> AppResult<()> {
        self.update_multi(query, update, false).await?;
        Ok(())
    }

    /// 쿼리와 일치하는 문서를 업데이트합니다.
    ///
    /// `multi` 가 `true` 면 일치하는 모든 문서, `false` 면 첫 문서 하나만
    /// 업데이트합니다. 반환되는 개수는 저장소가 보고한 값 그대로이며,
    /// 일치하는 문서가 없어도 에러가 아닙니다.
    pub async fn update_multi(
        &self,
        query: Query,
        update: Update,
        multi: bool,
    ) -> AppResult<BulkWriteResult> {
        let filter = query.filter;
        let update = update.into_document();
        let operation = if multi {
            BulkOperation::UpdateMany { filter, update }
        } else {
            BulkOperation::UpdateOne { filter, update }
        };

        debug!("update on {} (multi: {})", self.collection, multi);
        self.store.bulk_write(&self.collection, vec![operation]).await
    }

    /// 엔티티들을 하나의 unordered 대량 쓰기로 삽입합니다.
    ///
    /// 삽입된 엔티티의 ID 는 호출자에게 돌려주지 않습니다.
    pub async fn write_in_bulk(&self, entities: Vec<T>) -> AppResult<BulkWriteResult> {
        let operations = entities
            .iter()
            .map(|entity| to_document(entity).map(BulkOperation::Insert))
            .collect::<AppResult<Vec<_>>>()?;

        self.store.bulk_write(&self.collection, operations).await
    }

    /// `(ID, 업데이트)` 쌍마다 문서 하나씩을 unordered 대량 쓰기로 업데이트합니다.
    pub async fn update_in_bulk(&self, updates: Vec<(ObjectId, Update)>) -> AppResult<BulkWriteResult> {
        let operations = updates
            .into_iter()
            .map(|(id, update)| BulkOperation::UpdateOne {
                filter: doc! { "_id": id },
                update: update.into_document(),
            })
            .collect();

        self.store.bulk_write(&self.collection, operations).await
    }

    // ===== 집계 / 스트리밍 =====

    /// 집계 파이프라인을 실행하고 결과를 출력 타입으로 변환합니다.
    pub async fn aggregate<O>(&self, aggregation: Aggregation) -> AppResult<Vec<O>>
    where
        O: DeserializeOwned,
    {
        self.store
            .aggregate(&self.collection, aggregation.into_pipeline())
            .await?
            .into_iter()
            .map(|document| bson::from_document(document).map_err(AppError::from))
            .collect()
    }

    /// 무작위 표본 `size` 개. 컬렉션이 더 작으면 전체를 반환합니다.
    pub async fn sample(&self, size: usize) -> AppResult<Vec<T>> {
        self.store
            .aggregate(&self.collection, Aggregation::sample_of(size).into_pipeline())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// 쿼리 결과를 커서로 엽니다. 커서가 drop 되면 저장소 커서도 해제됩니다.
    pub async fn stream(&self, query: Query) -> AppResult<EntityCursor<T>> {
        let documents = self.store.stream(&self.collection, &query).await?;
        Ok(EntityCursor::new(documents, self.collection.clone()))
    }

    /// 컬렉션 전체에 대한 커서
    pub async fn iterator(&self) -> AppResult<EntityCursor<T>> {
        self.stream(Query::new()).await
    }

    // ===== 지원하지 않는 연산 =====

    pub async fn find_all_by_id(&self, _ids: &[String]) -> AppResult<Vec<T>> {
        Err(AppError::unsupported("find_all_by_id"))
    }

    pub async fn find_one_by_example<S>(&self, _example: &Example<S>) -> AppResult<Option<S>> {
        Err(AppError::unsupported("find_one_by_example"))
    }

    pub async fn find_all_by_example<S>(&self, _example: &Example<S>) -> AppResult<Vec<S>> {
        Err(AppError::unsupported("find_all_by_example"))
    }

    pub async fn find_all_by_example_sorted<S>(
        &self,
        _example: &Example<S>,
        _sort: Sort,
    ) -> AppResult<Vec<S>> {
        Err(AppError::unsupported("find_all_by_example_sorted"))
    }

    pub async fn find_all_by_example_paged<S>(
        &self,
        _example: &Example<S>,
        _page: PageRequest,
    ) -> AppResult<Page<S>> {
        Err(AppError::unsupported("find_all_by_example_paged"))
    }

    pub async fn count_by_example<S>(&self, _example: &Example<S>) -> AppResult<u64> {
        Err(AppError::unsupported("count_by_example"))
    }

    pub async fn exists_by_example<S>(&self, _example: &Example<S>) -> AppResult<bool> {
        Err(AppError::unsupported("exists_by_example"))
    }
}

/// 저장된 `_id` 를 조회 시와 같은 표기로 엔티티에 기록합니다.
///
/// 새로 할당된 ID 뿐 아니라 대문자 16진수처럼 표기만 다른 ObjectId 도 소문자로 맞춥니다.
fn sync_stored_id<T: Identifiable>(entity: &mut T, id: &bson::Bson) -> AppResult<()> {
    let id = bson_to_id(id)
        .ok_or_else(|| AppError::MappingError(format!("unsupported _id value: {}", id)))?;
    if entity.id() != Some(id.as_str()) {
        entity.set_id(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::DocumentStream;
    use crate::db::InMemoryStore;
    use crate::domain::entities::is_valid_id;
    use async_trait::async_trait;
    use mongodb::bson::Bson;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Player {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        team: String,
        score: i64,
    }

    impl Player {
        fn new(name: &str, team: &str, score: i64) -> Self {
            Self {
                id: None,
                name: name.to_string(),
                team: team.to_string(),
                score,
            }
        }
    }

    impl Identifiable for Player {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    /// 어떤 메서드든 호출되면 패닉하는 저장소
    struct ForbiddenStore;

    #[async_trait]
    impl DocumentStore for ForbiddenStore {
        async fn find(&self, _: &str, _: &Query) -> AppResult<Vec<Document>> {
            panic!("store must not be called: find")
        }

        async fn find_one(&self, _: &str, _: &Query) -> AppResult<Option<Document>> {
            panic!("store must not be called: find_one")
        }

        async fn exists(&self, _: &str, _: Document) -> AppResult<bool> {
            panic!("store must not be called: exists")
        }

        async fn count(&self, _: &str, _: Document) -> AppResult<u64> {
            panic!("store must not be called: count")
        }

        async fn save(&self, _: &str, _: Document) -> AppResult<Bson> {
            panic!("store must not be called: save")
        }

        async fn insert(&self, _: &str, _: Document) -> AppResult<Bson> {
            panic!("store must not be called: insert")
        }

        async fn remove(&self, _: &str, _: Document) -> AppResult<u64> {
            panic!("store must not be called: remove")
        }

        async fn aggregate(&self, _: &str, _: Vec<Document>) -> AppResult<Vec<Document>> {
            panic!("store must not be called: aggregate")
        }

        async fn bulk_write(&self, _: &str, _: Vec<BulkOperation>) -> AppResult<BulkWriteResult> {
            panic!("store must not be called: bulk_write")
        }

        async fn stream(&self, _: &str, _: &Query) -> AppResult<DocumentStream> {
            panic!("store must not be called: stream")
        }
    }

    fn repo() -> MongoRepo<Player> {
        MongoRepo::new(Arc::new(InMemoryStore::new()), "players")
    }

    fn forbidden_repo() -> MongoRepo<Player> {
        MongoRepo::new(Arc::new(ForbiddenStore), "players")
    }

    async fn seeded() -> (MongoRepo<Player>, Vec<Player>) {
        let repo = repo();
        let players = repo
            .insert_all(vec![
                Player::new("Kim", "red", 30),
                Player::new("Lee", "blue", 10),
                Player::new("Park", "red", 20),
            ])
            .await
            .unwrap();
        (repo, players)
    }

    fn id_of(player: &Player) -> &str {
        player.id.as_deref().unwrap()
    }

    #[tokio::test]
    async fn test_malformed_ids_never_reach_store() {
        let repo = forbidden_repo();

        for id in ["", "not-an-object-id", "123", "507f1f77bcf86cd79943901z"] {
            assert_eq!(repo.find_by_id(id).await.unwrap(), None);
            assert!(!repo.exists_by_id(id).await.unwrap());
            assert!(!repo.exists(id).await.unwrap());
            repo.delete_by_id(id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_round_trips() {
        let repo = repo();

        let saved = repo.save(Player::new("Kim", "red", 30)).await.unwrap();

        assert!(is_valid_id(id_of(&saved)));
        assert_eq!(repo.find_by_id(id_of(&saved)).await.unwrap(), Some(saved.clone()));
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let repo = repo();

        let saved = repo.save(Player::new("Kim", "red", 30)).await.unwrap();
        let again = repo.save(saved.clone()).await.unwrap();

        assert_eq!(again, saved);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.find_all().await.unwrap(), vec![saved]);
    }

    #[tokio::test]
    async fn test_save_replaces_existing_document() {
        let (repo, players) = seeded().await;

        let mut kim = players[0].clone();
        kim.score = 99;
        repo.save(kim.clone()).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.find_by_id(id_of(&kim)).await.unwrap(), Some(kim));
    }

    #[tokio::test]
    async fn test_custom_string_id_is_kept_but_not_found_by_id() {
        let repo = repo();
        let mut player = Player::new("Kim", "red", 30);
        player.id = Some("player-7".to_string());

        let saved = repo.save(player).await.unwrap();

        assert_eq!(saved.id.as_deref(), Some("player-7"));
        assert_eq!(repo.find_by_id("player-7").await.unwrap(), None);
        assert_eq!(
            repo.find_one_matching(Query::by_id("player-7")).await.unwrap(),
            Some(saved)
        );
    }

    #[tokio::test]
    async fn test_save_all_assigns_ids_in_order() {
        let repo = repo();

        let saved = repo
            .save_all(vec![Player::new("Kim", "red", 30), Player::new("Lee", "blue", 10)])
            .await
            .unwrap();

        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|p| p.id.as_deref().is_some_and(is_valid_id)));
        assert_eq!(repo.find_all().await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_uppercase_object_id_round_trips() {
        let repo = repo();
        let mut player = Player::new("Kim", "red", 30);
        player.id = Some("507F1F77BCF86CD799439011".to_string());

        let saved = repo.save(player).await.unwrap();
        let found = repo.find_by_id(id_of(&saved)).await.unwrap();

        assert_eq!(saved.id.as_deref(), Some("507f1f77bcf86cd799439011"));
        assert_eq!(found, Some(saved));
    }

    #[tokio::test]
    async fn test_insert_normalizes_object_id() {
        let repo = repo();
        let mut player = Player::new("Lee", "blue", 10);
        player.id = Some("507F1F77BCF86CD799439012".to_string());

        let inserted = repo.insert(player).await.unwrap();

        assert_eq!(inserted.id.as_deref(), Some("507f1f77bcf86cd799439012"));
        assert_eq!(repo.find_all().await.unwrap(), vec![inserted]);
    }

    #[tokio::test]
    async fn test_insert_duplicate_fails_without_modification() {
        let (repo, players) = seeded().await;

        let mut impostor = Player::new("Impostor", "black", 0);
        impostor.id = players[0].id.clone();
        let result = repo.insert(impostor).await;

        assert!(matches!(result, Err(AppError::DuplicateKey(_))));
        assert_eq!(repo.find_by_id(id_of(&players[0])).await.unwrap(), Some(players[0].clone()));
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_insert_all_stops_at_first_failure() {
        let (repo, players) = seeded().await;

        let mut duplicate = Player::new("Duplicate", "red", 1);
        duplicate.id = players[1].id.clone();
        let result = repo
            .insert_all(vec![
                Player::new("Choi", "green", 40),
                duplicate,
                Player::new("Jung", "green", 50),
            ])
            .await;

        assert!(matches!(result, Err(AppError::DuplicateKey(_))));
        assert_eq!(repo.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let repo = repo();

        assert!(repo.find_all().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.find_one().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_three_then_delete_all() {
        let (repo, _) = seeded().await;

        assert_eq!(repo.count().await.unwrap(), 3);

        repo.delete_all().await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_multi_respects_flag() {
        let (repo, _) = seeded().await;
        let red = || Query::matching(doc! { "team": "red" });
        let zeroed = || Query::matching(doc! { "score": 0 });

        let single = repo
            .update_multi(red(), Update::new().set("score", 0_i64), false)
            .await
            .unwrap();
        assert_eq!(single.matched_count, 1);
        assert_eq!(repo.count_matching(zeroed()).await.unwrap(), 1);

        let multi = repo
            .update_multi(red(), Update::new().set("score", 0_i64), true)
            .await
            .unwrap();
        assert_eq!(multi.matched_count, 2);
        assert_eq!(repo.count_matching(zeroed()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_without_match_is_not_an_error() {
        let (repo, _) = seeded().await;

        let result = repo
            .update_multi(Query::matching(doc! { "team": "none" }), Update::new().inc("score", 1), true)
            .await
            .unwrap();

        assert_eq!(result.matched_count, 0);
    }

    #[tokio::test]
    async fn test_update_by_id_and_update_by_query() {
        let (repo, players) = seeded().await;
        let kim_id = ObjectId::parse_str(id_of(&players[0])).unwrap();

        repo.update_by_id(kim_id, Update::new().inc("score", 5)).await.unwrap();
        repo.update(Query::matching(doc! { "name": "Lee" }), Update::new().set("team", "red"))
            .await
            .unwrap();

        let kim = repo.find_by_id(id_of(&players[0])).await.unwrap().unwrap();
        let lee = repo.find_by_id(id_of(&players[1])).await.unwrap().unwrap();
        assert_eq!(kim.score, 35);
        assert_eq!(lee.team, "red");
    }

    #[tokio::test]
    async fn test_bulk_writes() {
        let (repo, players) = seeded().await;

        let inserted = repo
            .write_in_bulk(vec![Player::new("Choi", "green", 40), Player::new("Jung", "green", 50)])
            .await
            .unwrap();
        assert_eq!(inserted.inserted_count, 2);

        let updates = players
            .iter()
            .map(|p| (ObjectId::parse_str(id_of(p)).unwrap(), Update::new().set("team", "gold")))
            .collect();
        let updated = repo.update_in_bulk(updates).await.unwrap();
        assert_eq!(updated.modified_count, 3);
        assert_eq!(repo.count_matching(Query::matching(doc! { "team": "gold" })).await.unwrap(), 3);

        let ids: Vec<ObjectId> = players[..2]
            .iter()
            .map(|p| ObjectId::parse_str(id_of(p)).unwrap())
            .collect();
        let deleted = repo.delete_all_by_ids(&ids).await.unwrap();
        assert_eq!(deleted.deleted_count, 2);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bulk_write_failure_reports_applied_counts() {
        let (repo, players) = seeded().await;

        let result = repo
            .write_in_bulk(vec![
                players[0].clone(),
                Player::new("Choi", "green", 40),
                Player::new("Jung", "green", 50),
            ])
            .await;

        let error = result.unwrap_err();
        assert!(error.is_duplicate_key());
        match error {
            AppError::BulkWriteError { result, failures } => {
                assert_eq!(result.inserted_count, 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].index, Some(0));
            }
            other => panic!("Expected BulkWriteError, got {:?}", other),
        }
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_delete_variants() {
        let (repo, players) = seeded().await;

        repo.delete(&players[0]).await.unwrap();
        assert!(!repo.exists_by_id(id_of(&players[0])).await.unwrap());

        repo.delete(&Player::new("Unsaved", "red", 0)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);

        repo.delete_entities(&players[1..2]).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.delete_matching(Query::matching(doc! { "team": "red" })).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let (repo, players) = seeded().await;

        repo.delete_by_id(id_of(&players[1])).await.unwrap();
        repo.delete_by_id(&ObjectId::new().to_hex()).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.find_by_id(id_of(&players[1])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_sorted_and_filtered() {
        let (repo, _) = seeded().await;

        let sorted = repo.find_all_sorted(Sort::desc("score")).await.unwrap();
        let reds = repo
            .find(Query::matching(doc! { "team": "red" }).with_sort(Sort::asc("score")))
            .await
            .unwrap();

        fn names(players: &[Player]) -> Vec<&str> {
            players.iter().map(|p| p.name.as_str()).collect()
        }
        assert_eq!(names(&sorted), vec!["Kim", "Park", "Lee"]);
        assert_eq!(names(&reds), vec!["Park", "Kim"]);
    }

    #[tokio::test]
    async fn test_find_all_paged() {
        let repo = repo();
        repo.insert_all((1..=7).map(|n| Player::new(&format!("P{}", n), "red", n)))
            .await
            .unwrap();

        let last = repo
            .find_all_paged(PageRequest::of(2, 3).with_sort(Sort::asc("score")))
            .await
            .unwrap();

        assert_eq!(last.total_elements, 7);
        assert_eq!(last.total_pages(), 3);
        assert_eq!(last.content.len(), 1);
        assert_eq!(last.content[0].name, "P7");
        assert!(last.is_last());
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let repo = forbidden_repo();

        let result = repo.find_all_paged(PageRequest::of(0, 0)).await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_aggregate_into_output_type() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Total {
            total: i64,
        }

        let (repo, _) = seeded().await;

        let totals: Vec<Total> = repo
            .aggregate(Aggregation::new().matching(doc! { "team": "red" }).stage(doc! { "$count": "total" }))
            .await
            .unwrap();

        assert_eq!(totals, vec![Total { total: 2 }]);
    }

    #[tokio::test]
    async fn test_sample() {
        let (repo, _) = seeded().await;

        let sampled = repo.sample(2).await.unwrap();

        assert_eq!(sampled.len(), 2);
        assert!(sampled.iter().all(|p| p.id.as_deref().is_some_and(is_valid_id)));
        assert_eq!(repo.sample(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stream_and_iterator() {
        let (repo, _) = seeded().await;

        let reds = repo
            .stream(Query::matching(doc! { "team": "red" }))
            .await
            .unwrap()
            .try_collect_all()
            .await
            .unwrap();
        let mut all = repo.iterator().await.unwrap();
        let first = all.next().await.unwrap().unwrap();
        all.close();

        assert_eq!(reds.len(), 2);
        assert_eq!(first.name, "Kim");
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let repo = forbidden_repo();
        let example = Example::of(Player::new("Kim", "red", 30));

        let failures = vec![
            repo.find_all_by_id(&["507f1f77bcf86cd799439011".to_string()]).await.err(),
            repo.find_one_by_example(&example).await.err(),
            repo.find_all_by_example(&example).await.err(),
            repo.find_all_by_example_sorted(&example, Sort::asc("name")).await.err(),
            repo.find_all_by_example_paged(&example, PageRequest::of(0, 10)).await.err(),
            repo.count_by_example(&example).await.err(),
            repo.exists_by_example(&example).await.err(),
        ];

        assert!(failures.iter().all(|e| e.as_ref().is_some_and(AppError::is_unsupported)));
    }

    #[tokio::test]
    async fn test_repository_is_shareable_across_tasks() {
        let repo = repo();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.save(Player::new(&format!("P{}", n), "red", n)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 8);
        assert_eq!(repo.collection_name(), "players");
    }
}
