//! MongoDB 드라이버 기반 문서 저장소

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use log::debug;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{
        DeleteManyModel, DeleteOneModel, FindOneOptions, FindOptions, InsertOneModel,
        UpdateManyModel, UpdateOneModel, WriteModel,
    },
    results::UpdateResult,
    Collection, Namespace,
};

use crate::core::errors::{AppError, AppResult};
use crate::db::store::{assign_id, bulk_outcome, DocumentStore, DocumentStream};
use crate::db::Database;
use crate::domain::models::{BulkOperation, BulkWriteFailure, BulkWriteResult, Query};

/// [`Database`] 연결 위에서 동작하는 [`DocumentStore`]
///
/// 대량 쓰기는 서버가 MongoDB 8.0 이상이면 클라이언트 레벨 `bulkWrite` 명령 한 번으로,
/// 그보다 오래되었거나 버전을 모르면 컬렉션 단위 연산을 하나씩 실행합니다.
/// 어느 경우든 unordered 이며 실패는 [`AppError::BulkWriteError`] 로 보고됩니다.
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.get_database().collection::<Document>(name)
    }
}

impl MongoStore {
    /// `bulkWrite` 명령이 없는 서버용. 연산을 순서대로 실행하되 실패해도 계속 진행합니다.
    async fn bulk_write_per_operation(
        &self,
        collection: &str,
        operations: Vec<BulkOperation>,
    ) -> AppResult<BulkWriteResult> {
        let target = self.collection(collection);
        debug!("bulk write: {} operations on {} (per operation)", operations.len(), collection);

        let mut result = BulkWriteResult::empty();
        let mut failures = Vec::new();
        for (index, operation) in operations.into_iter().enumerate() {
            match apply_operation(&target, operation).await {
                Ok(partial) => result = result.merge(partial),
                Err(e) => failures.push(BulkWriteFailure::at(index, e)),
            }
        }

        bulk_outcome(collection, result, failures)
    }
}

async fn apply_operation(
    collection: &Collection<Document>,
    operation: BulkOperation,
) -> AppResult<BulkWriteResult> {
    let result = match operation {
        BulkOperation::Insert(document) => {
            collection.insert_one(document).await?;
            BulkWriteResult { inserted_count: 1, ..Default::default() }
        }
        BulkOperation::UpdateOne { filter, update } => {
            updated(collection.update_one(filter, update).await?)
        }
        BulkOperation::UpdateMany { filter, update } => {
            updated(collection.update_many(filter, update).await?)
        }
        BulkOperation::DeleteOne { filter } => BulkWriteResult {
            deleted_count: collection.delete_one(filter).await?.deleted_count,
            ..Default::default()
        },
        BulkOperation::DeleteMany { filter } => BulkWriteResult {
            deleted_count: collection.delete_many(filter).await?.deleted_count,
            ..Default::default()
        },
    };
    Ok(result)
}

fn updated(result: UpdateResult) -> BulkWriteResult {
    BulkWriteResult {
        matched_count: result.matched_count,
        modified_count: result.modified_count,
        upserted_count: u64::from(result.upserted_id.is_some()),
        ..Default::default()
    }
}

fn find_options(query: &Query) -> FindOptions {
    let mut options = FindOptions::default();
    options.sort = query.sort.clone();
    options.skip = query.skip;
    options.limit = query.limit;
    options.projection = query.projection.clone();
    options
}

fn find_one_options(query: &Query) -> FindOneOptions {
    let mut options = FindOneOptions::default();
    options.sort = query.sort.clone();
    options.skip = query.skip;
    options.projection = query.projection.clone();
    options
}

fn write_model(namespace: &Namespace, operation: BulkOperation) -> WriteModel {
    match operation {
        BulkOperation::Insert(document) => InsertOneModel::builder()
            .namespace(namespace.clone())
            .document(document)
            .build()
            .into(),
        BulkOperation::UpdateOne { filter, update } => UpdateOneModel::builder()
            .namespace(namespace.clone())
            .filter(filter)
            .update(update)
            .build()
            .into(),
        BulkOperation::UpdateMany { filter, update } => UpdateManyModel::builder()
            .namespace(namespace.clone())
            .filter(filter)
            .update(update)
            .build()
            .into(),
        BulkOperation::DeleteOne { filter } => DeleteOneModel::builder()
            .namespace(namespace.clone())
            .filter(filter)
            .build()
            .into(),
        BulkOperation::DeleteMany { filter } => DeleteManyModel::builder()
            .namespace(namespace.clone())
            .filter(filter)
            .build()
            .into(),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, collection: &str, query: &Query) -> AppResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(query.filter.clone())
            .with_options(find_options(query))
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn find_one(&self, collection: &str, query: &Query) -> AppResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one(query.filter.clone())
            .with_options(find_one_options(query))
            .await?)
    }

    async fn count(&self, collection: &str, filter: Document) -> AppResult<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn save(&self, collection: &str, mut document: Document) -> AppResult<Bson> {
        let id = assign_id(&mut document);

        self.collection(collection)
            .replace_one(doc! { "_id": id.clone() }, &document)
            .upsert(true)
            .await?;

        Ok(id)
    }

    async fn insert(&self, collection: &str, mut document: Document) -> AppResult<Bson> {
        let id = assign_id(&mut document);

        self.collection(collection).insert_one(&document).await?;

        Ok(id)
    }

    async fn remove(&self, collection: &str, filter: Document) -> AppResult<u64> {
        let result = self.collection(collection).delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> AppResult<Vec<Document>> {
        let cursor = self.collection(collection).aggregate(pipeline).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<BulkOperation>,
    ) -> AppResult<BulkWriteResult> {
        if operations.is_empty() {
            return Ok(BulkWriteResult::empty());
        }

        if !self.database.supports_client_bulk_write() {
            return self.bulk_write_per_operation(collection, operations).await;
        }

        let namespace = self.collection(collection).namespace();
        let models: Vec<WriteModel> = operations
            .into_iter()
            .map(|operation| write_model(&namespace, operation))
            .collect();

        debug!("bulk write: {} operations on {}", models.len(), namespace);

        let result = self
            .database
            .client()
            .bulk_write(models)
            .ordered(false)
            .await?;

        Ok(result.into())
    }

    async fn stream(&self, collection: &str, query: &Query) -> AppResult<DocumentStream> {
        let cursor = self
            .collection(collection)
            .find(query.filter.clone())
            .with_options(find_options(query))
            .await?;

        Ok(cursor.map(|item| item.map_err(AppError::from)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_options_carry_query() {
        let query = Query::matching(doc! { "team": "red" })
            .skip(5)
            .limit(10)
            .project(doc! { "name": 1 });

        let options = find_options(&query);

        assert_eq!(options.skip, Some(5));
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.projection, Some(doc! { "name": 1 }));
        assert_eq!(options.sort, None);
    }

    #[test]
    fn test_write_model_targets_namespace() {
        let namespace = Namespace::new("catalog", "players");

        let model = write_model(&namespace, BulkOperation::DeleteOne { filter: doc! { "_id": 1 } });

        match model {
            WriteModel::DeleteOne(delete) => {
                assert_eq!(delete.namespace, namespace);
                assert_eq!(delete.filter, doc! { "_id": 1 });
            }
            other => panic!("unexpected model: {:?}", other),
        }
    }

    #[test]
    fn test_per_operation_update_counts() {
        let mut upsert = UpdateResult::default();
        upsert.matched_count = 0;
        upsert.upserted_id = Some(Bson::Int32(7));
        let mut modified = UpdateResult::default();
        modified.matched_count = 3;
        modified.modified_count = 2;

        assert_eq!(updated(upsert).upserted_count, 1);
        let counts = updated(modified);
        assert_eq!((counts.matched_count, counts.modified_count, counts.upserted_count), (3, 2, 0));
    }
}
