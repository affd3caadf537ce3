//! # In-Memory Document Store
//!
//! 프로세스 메모리에서 동작하는 [`DocumentStore`] 구현입니다. MongoDB 서버 없이
//! 리포지토리 동작을 검증하거나 로컬 개발에 사용합니다.
//!
//! ## 지원 범위
//!
//! | 구분 | 지원 연산자 |
//! |------|-------------|
//! | 필터 | 필드 일치, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`, `$and`, `$or` |
//! | 업데이트 | `$set`, `$unset`, `$inc`, `$push` |
//! | 집계 단계 | `$match`, `$sort`, `$skip`, `$limit`, `$sample`, `$count`, `$project` |
//!
//! 점(`.`)으로 구분된 중첩 필드 경로를 지원합니다. 지원하지 않는 연산자는
//! `AppError::DatabaseError` 로 거부됩니다.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use mongodb::bson::{Bson, Document};
use rand::seq::SliceRandom;

use crate::core::errors::{AppError, AppResult};
use crate::db::store::{assign_id, bulk_outcome, DocumentStore, DocumentStream};
use crate::domain::models::{BulkOperation, BulkWriteFailure, BulkWriteResult, Query};

type Collections = HashMap<String, Vec<Document>>;

/// 컬렉션 이름별 문서 목록을 메모리에 보관하는 저장소
///
/// 문서는 삽입 순서대로 보관되며, 정렬 조건이 없는 조회는 삽입 순서를 따릅니다.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 컬렉션에 저장된 원본 문서의 복사본
    pub fn snapshot(&self, collection: &str) -> AppResult<Vec<Document>> {
        Ok(self.read()?.get(collection).cloned().unwrap_or_default())
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| AppError::InternalError("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|_| AppError::InternalError("in-memory store lock poisoned".to_string()))
    }

    fn query(&self, collection: &str, query: &Query) -> AppResult<Vec<Document>> {
        match self.read()?.get(collection) {
            Some(documents) => run_query(documents, query),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(&self, collection: &str, query: &Query) -> AppResult<Vec<Document>> {
        self.query(collection, query)
    }

    async fn find_one(&self, collection: &str, query: &Query) -> AppResult<Option<Document>> {
        let first = query.clone().limit(1);
        Ok(self.query(collection, &first)?.into_iter().next())
    }

    async fn count(&self, collection: &str, filter: Document) -> AppResult<u64> {
        let guard = self.read()?;
        let Some(documents) = guard.get(collection) else {
            return Ok(0);
        };

        let mut count = 0;
        for document in documents {
            if matches_filter(document, &filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn save(&self, collection: &str, mut document: Document) -> AppResult<Bson> {
        let id = assign_id(&mut document);
        let mut guard = self.write()?;
        let documents = guard.entry(collection.to_string()).or_default();

        match documents.iter_mut().find(|existing| existing.get("_id") == Some(&id)) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
        Ok(id)
    }

    async fn insert(&self, collection: &str, document: Document) -> AppResult<Bson> {
        let mut guard = self.write()?;
        let documents = guard.entry(collection.to_string()).or_default();
        insert_document(collection, documents, document)
    }

    async fn remove(&self, collection: &str, filter: Document) -> AppResult<u64> {
        let mut guard = self.write()?;
        match guard.get_mut(collection) {
            Some(documents) => delete_documents(documents, &filter, true),
            None => Ok(0),
        }
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> AppResult<Vec<Document>> {
        let documents = self.snapshot(collection)?;
        run_pipeline(documents, &pipeline)
    }

    async fn bulk_write(
        &self,
        collection: &str,
        operations: Vec<BulkOperation>,
    ) -> AppResult<BulkWriteResult> {
        let mut guard = self.write()?;
        let documents = guard.entry(collection.to_string()).or_default();

        let mut result = BulkWriteResult::empty();
        let mut failures = Vec::new();

        for (index, operation) in operations.into_iter().enumerate() {
            let outcome = match operation {
                BulkOperation::Insert(document) => insert_document(collection, documents, document)
                    .map(|_| BulkWriteResult { inserted_count: 1, ..Default::default() }),
                BulkOperation::UpdateOne { filter, update } => {
                    update_documents(documents, &filter, &update, false)
                }
                BulkOperation::UpdateMany { filter, update } => {
                    update_documents(documents, &filter, &update, true)
                }
                BulkOperation::DeleteOne { filter } => delete_documents(documents, &filter, false)
                    .map(|deleted| BulkWriteResult { deleted_count: deleted, ..Default::default() }),
                BulkOperation::DeleteMany { filter } => delete_documents(documents, &filter, true)
                    .map(|deleted| BulkWriteResult { deleted_count: deleted, ..Default::default() }),
            };

            match outcome {
                Ok(partial) => result = result.merge(partial),
                Err(e) => failures.push(BulkWriteFailure::at(index, e)),
            }
        }

        bulk_outcome(collection, result, failures)
    }

    async fn stream(&self, collection: &str, query: &Query) -> AppResult<DocumentStream> {
        let documents = self.query(collection, query)?;
        Ok(stream::iter(documents.into_iter().map(Ok)).boxed())
    }
}

fn insert_document(collection: &str, documents: &mut Vec<Document>, mut document: Document) -> AppResult<Bson> {
    let id = assign_id(&mut document);

    if documents.iter().any(|existing| existing.get("_id") == Some(&id)) {
        return Err(AppError::DuplicateKey(format!(
            "E11000 duplicate key error collection: {} index: _id_ dup key: {{ _id: {} }}",
            collection, id
        )));
    }

    documents.push(document);
    Ok(id)
}

fn update_documents(
    documents: &mut [Document],
    filter: &Document,
    update: &Document,
    multi: bool,
) -> AppResult<BulkWriteResult> {
    let mut result = BulkWriteResult::empty();

    for document in documents.iter_mut() {
        if !matches_filter(document, filter)? {
            continue;
        }

        let mut updated = document.clone();
        apply_update(&mut updated, update)?;
        if updated.get("_id") != document.get("_id") {
            return Err(AppError::DatabaseError(
                "Performing an update on the path '_id' would modify the immutable field '_id'".to_string(),
            ));
        }

        result.matched_count += 1;
        if updated != *document {
            *document = updated;
            result.modified_count += 1;
        }

        if !multi {
            break;
        }
    }

    Ok(result)
}

fn delete_documents(documents: &mut Vec<Document>, filter: &Document, multi: bool) -> AppResult<u64> {
    let mut deleted = 0;
    let mut index = 0;

    while index < documents.len() {
        if (multi || deleted == 0) && matches_filter(&documents[index], filter)? {
            documents.remove(index);
            deleted += 1;
        } else {
            index += 1;
        }
    }

    Ok(deleted)
}

// 조회

fn run_query(documents: &[Document], query: &Query) -> AppResult<Vec<Document>> {
    let mut matched = filter_documents(documents, &query.filter)?;

    if let Some(sort) = &query.sort {
        sort_documents(&mut matched, sort);
    }

    let skip = query.skip.unwrap_or(0) as usize;
    // 음수 limit 은 절댓값, 0 은 제한 없음
    let limit = query
        .limit
        .map(|limit| limit.unsigned_abs() as usize)
        .filter(|limit| *limit > 0);

    let window = matched.into_iter().skip(skip);
    let page: Vec<Document> = match limit {
        Some(limit) => window.take(limit).collect(),
        None => window.collect(),
    };

    Ok(match &query.projection {
        Some(projection) => page.into_iter().map(|d| project(d, projection)).collect(),
        None => page,
    })
}

fn filter_documents(documents: &[Document], filter: &Document) -> AppResult<Vec<Document>> {
    let mut matched = Vec::new();
    for document in documents {
        if matches_filter(document, filter)? {
            matched.push(document.clone());
        }
    }
    Ok(matched)
}

fn matches_filter(document: &Document, filter: &Document) -> AppResult<bool> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches_filter(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches_filter(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            other if other.starts_with('$') => return Err(unknown_operator(other)),
            path => {
                let value = lookup(document, path);
                match condition {
                    Bson::Document(operators) if is_operator_document(operators) => {
                        matches_operators(value, operators)?
                    }
                    expected => equals_condition(value, expected),
                }
            }
        };

        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_operators(value: Option<&Bson>, operators: &Document) -> AppResult<bool> {
    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "$eq" => equals_condition(value, operand),
            "$ne" => !equals_condition(value, operand),
            "$gt" => compare_operand(value, operand) == Some(Ordering::Greater),
            "$gte" => matches!(compare_operand(value, operand), Some(Ordering::Greater | Ordering::Equal)),
            "$lt" => compare_operand(value, operand) == Some(Ordering::Less),
            "$lte" => matches!(compare_operand(value, operand), Some(Ordering::Less | Ordering::Equal)),
            "$in" => candidates(operator, operand)?
                .iter()
                .any(|candidate| equals_condition(value, candidate)),
            "$nin" => !candidates(operator, operand)?
                .iter()
                .any(|candidate| equals_condition(value, candidate)),
            "$exists" => value.is_some() == truthy(operand),
            other => return Err(unknown_operator(other)),
        };

        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(operator: &str, condition: &'a Bson) -> AppResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(AppError::DatabaseError(format!("{} must be an array", operator)));
    };

    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Ok(clause),
            _ => Err(AppError::DatabaseError(format!("{} argument's entries must be objects", operator))),
        })
        .collect()
}

fn candidates<'a>(operator: &str, operand: &'a Bson) -> AppResult<&'a Vec<Bson>> {
    match operand {
        Bson::Array(items) => Ok(items),
        _ => Err(AppError::DatabaseError(format!("{} needs an array", operator))),
    }
}

fn unknown_operator(operator: &str) -> AppError {
    AppError::DatabaseError(format!("unknown operator: {}", operator))
}

fn is_operator_document(document: &Document) -> bool {
    document.keys().next().is_some_and(|key| key.starts_with('$'))
}

fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        other => as_f64(other).is_none_or(|n| n != 0.0),
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// 배열 필드는 원소 중 하나라도 일치하면 일치로 봅니다. 없는 필드는 `null` 과 일치합니다.
fn equals_condition(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(actual) => values_equal(actual, expected),
    }
}

fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::Binary(_)) => 5,
        Some(Bson::ObjectId(_)) => 6,
        Some(Bson::Boolean(_)) => 7,
        Some(Bson::DateTime(_)) => 8,
        Some(_) => 9,
    }
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let by_type = type_rank(a).cmp(&type_rank(b));
    if by_type != Ordering::Equal {
        return by_type;
    }

    let (Some(a), Some(b)) = (a, b) else {
        return Ordering::Equal;
    };

    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        _ => Ordering::Equal,
    }
}

/// 범위 비교는 같은 타입 계열끼리만 성립합니다.
fn compare_operand(value: Option<&Bson>, operand: &Bson) -> Option<Ordering> {
    let value = value?;
    if type_rank(Some(value)) != type_rank(Some(operand)) {
        return None;
    }
    Some(compare_values(Some(value), Some(operand)))
}

fn sort_documents(documents: &mut [Document], sort: &Document) {
    documents.sort_by(|a, b| {
        for (field, direction) in sort {
            let ordering = compare_values(lookup(a, field), lookup(b, field));
            let ordering = if as_f64(direction).is_some_and(|d| d < 0.0) {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn project(document: Document, projection: &Document) -> Document {
    let include_id = projection.get("_id").is_none_or(truthy);
    let inclusive = projection
        .iter()
        .any(|(key, value)| key != "_id" && truthy(value));

    if inclusive {
        let mut projected = Document::new();
        if include_id {
            if let Some(id) = document.get("_id") {
                projected.insert("_id", id.clone());
            }
        }
        for (key, value) in projection {
            if key != "_id" && truthy(value) {
                if let Some(field) = document.get(key) {
                    projected.insert(key.clone(), field.clone());
                }
            }
        }
        projected
    } else {
        let mut projected = document;
        for key in projection.keys() {
            if key != "_id" {
                projected.remove(key);
            }
        }
        if !include_id {
            projected.remove("_id");
        }
        projected
    }
}

// 업데이트

fn apply_update(document: &mut Document, update: &Document) -> AppResult<()> {
    if update.is_empty() {
        return Err(AppError::DatabaseError("Update document must not be empty".to_string()));
    }

    for (operator, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(AppError::DatabaseError(format!(
                "Modifiers operate on fields but we found another type instead: {}",
                operator
            )));
        };

        match operator.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(document, path, value.clone())?;
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    unset_path(document, path);
                }
            }
            "$inc" => {
                for (path, amount) in fields {
                    let next = increment(lookup(document, path), amount)?;
                    set_path(document, path, next)?;
                }
            }
            "$push" => {
                for (path, value) in fields {
                    let next = match lookup(document, path) {
                        None => Bson::Array(vec![value.clone()]),
                        Some(Bson::Array(items)) => {
                            let mut items = items.clone();
                            items.push(value.clone());
                            Bson::Array(items)
                        }
                        Some(_) => {
                            return Err(AppError::DatabaseError(format!(
                                "The field '{}' must be an array",
                                path
                            )));
                        }
                    };
                    set_path(document, path, next)?;
                }
            }
            other if other.starts_with('$') => return Err(unknown_operator(other)),
            _ => {
                return Err(AppError::DatabaseError(
                    "Update document requires atomic operators".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> AppResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(AppError::DatabaseError(format!(
                    "Cannot create field '{}' in a non-document value",
                    rest
                ))),
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}

fn increment(current: Option<&Bson>, amount: &Bson) -> AppResult<Bson> {
    let overflow = || AppError::DatabaseError("integer overflow in $inc".to_string());
    let non_numeric = || AppError::DatabaseError("Cannot apply $inc to a value of non-numeric type".to_string());

    match (current, amount) {
        (None, amount) if as_f64(amount).is_some() => Ok(amount.clone()),
        (Some(Bson::Int32(c)), Bson::Int32(a)) => Ok(c
            .checked_add(*a)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(*c as i64 + *a as i64))),
        (Some(Bson::Int32(c)), Bson::Int64(a)) => {
            (*c as i64).checked_add(*a).map(Bson::Int64).ok_or_else(overflow)
        }
        (Some(Bson::Int64(c)), Bson::Int32(a)) => {
            c.checked_add(*a as i64).map(Bson::Int64).ok_or_else(overflow)
        }
        (Some(Bson::Int64(c)), Bson::Int64(a)) => c.checked_add(*a).map(Bson::Int64).ok_or_else(overflow),
        (Some(current), amount) => match (as_f64(current), as_f64(amount)) {
            (Some(c), Some(a)) => Ok(Bson::Double(c + a)),
            _ => Err(non_numeric()),
        },
        (None, _) => Err(non_numeric()),
    }
}

// 집계

fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> AppResult<Vec<Document>> {
    for stage in pipeline {
        let (name, spec) = match stage.iter().next() {
            Some(entry) if stage.len() == 1 => entry,
            _ => {
                return Err(AppError::DatabaseError(
                    "A pipeline stage specification object must contain exactly one field".to_string(),
                ));
            }
        };

        documents = match (name.as_str(), spec) {
            ("$match", Bson::Document(filter)) => filter_documents(&documents, filter)?,
            ("$sort", Bson::Document(sort)) => {
                sort_documents(&mut documents, sort);
                documents
            }
            ("$skip", value) => {
                let skip = stage_count(name, value)?;
                documents.into_iter().skip(skip).collect()
            }
            ("$limit", value) => {
                let limit = stage_count(name, value)?;
                documents.into_iter().take(limit).collect()
            }
            ("$sample", Bson::Document(options)) => {
                let size = stage_count(name, options.get("size").unwrap_or(&Bson::Null))?;
                documents.shuffle(&mut rand::thread_rng());
                documents.truncate(size);
                documents
            }
            ("$count", Bson::String(field)) => {
                if documents.is_empty() {
                    Vec::new()
                } else {
                    let count = i32::try_from(documents.len())
                        .map(Bson::Int32)
                        .unwrap_or(Bson::Int64(documents.len() as i64));
                    let mut counted = Document::new();
                    counted.insert(field.clone(), count);
                    vec![counted]
                }
            }
            ("$project", Bson::Document(projection)) => documents
                .into_iter()
                .map(|document| project(document, projection))
                .collect(),
            (other, _) => {
                return Err(AppError::DatabaseError(format!(
                    "Unrecognized pipeline stage name: '{}'",
                    other
                )));
            }
        };
    }
    Ok(documents)
}

fn stage_count(stage: &str, value: &Bson) -> AppResult<usize> {
    match value {
        Bson::Int32(n) if *n >= 0 => Ok(*n as usize),
        Bson::Int64(n) if *n >= 0 => Ok(*n as usize),
        Bson::Double(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        other => Err(AppError::DatabaseError(format!(
            "invalid argument to {} stage: {}",
            stage, other
        ))),
    }
}
