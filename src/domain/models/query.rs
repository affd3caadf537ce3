//! 쿼리/정렬/업데이트 명세
//!
//! 리포지토리는 이 타입들의 내용을 해석하지 않고 저장소로 그대로 전달합니다.
//! 필터와 업데이트는 MongoDB 쿼리 언어(`doc!` 매크로) 그대로 작성합니다.
//!
//! ```rust,ignore
//! use mongodb::bson::doc;
//! use mongo_repo_core::domain::models::{Query, Sort, Update};
//!
//! let query = Query::matching(doc! { "team": "red", "score": { "$gte": 10 } })
//!     .with_sort(Sort::desc("score"))
//!     .limit(20);
//!
//! let update = Update::new().set("active", false).inc("version", 1);
//! ```

use mongodb::bson::{doc, Bson, Document};

use crate::domain::models::page::PageRequest;

/// 정렬 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// MongoDB 정렬 문서에서 사용하는 값 (`1` / `-1`)
    pub fn as_i32(&self) -> i32 {
        match self {
            Direction::Asc => 1,
            Direction::Desc => -1,
        }
    }
}

/// 필드 정렬 명세
///
/// 필드 순서가 유지되며, 먼저 추가된 필드가 우선 정렬 키가 됩니다.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sort {
    orders: Vec<(String, Direction)>,
}

impl Sort {
    pub fn by(field: impl Into<String>, direction: Direction) -> Self {
        Self { orders: vec![(field.into(), direction)] }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::by(field, Direction::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::by(field, Direction::Desc)
    }

    /// 정렬 조건이 없는 Sort
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// 다음 정렬 키를 추가합니다.
    pub fn and(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.orders.push((field.into(), direction));
        self
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn orders(&self) -> &[(String, Direction)] {
        &self.orders
    }

    /// `{ field: 1 | -1, ... }` 형태의 정렬 문서로 변환합니다.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        for (field, direction) in &self.orders {
            document.insert(field.clone(), direction.as_i32());
        }
        document
    }
}

/// 필터/정렬/페이지네이션/프로젝션 명세
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// 필터 문서. 비어 있으면 전체 문서와 일치
    pub filter: Document,
    /// 정렬 문서
    pub sort: Option<Document>,
    /// 건너뛸 문서 수
    pub skip: Option<u64>,
    /// 최대 반환 문서 수
    pub limit: Option<i64>,
    /// 프로젝션 문서
    pub projection: Option<Document>,
}

impl Query {
    /// 전체 문서와 일치하는 빈 쿼리
    pub fn new() -> Self {
        Self::default()
    }

    /// 주어진 필터 문서로 쿼리를 생성합니다.
    pub fn matching(filter: Document) -> Self {
        Self { filter, ..Self::default() }
    }

    /// `_id` 일치 쿼리
    pub fn by_id(id: impl Into<Bson>) -> Self {
        Self::matching(doc! { "_id": id.into() })
    }

    /// 정렬 조건을 덧붙입니다. 정렬 조건이 없는 Sort 는 무시됩니다.
    pub fn with_sort(mut self, sort: Sort) -> Self {
        if sort.is_sorted() {
            let mut merged = self.sort.take().unwrap_or_default();
            merged.extend(sort.to_document());
            self.sort = Some(merged);
        }
        self
    }

    /// 페이지 요청에 맞춰 skip/limit/정렬을 설정합니다.
    pub fn with_page(mut self, page: &PageRequest) -> Self {
        self.skip = Some(page.offset());
        self.limit = Some(i64::try_from(page.size).unwrap_or(i64::MAX));
        match &page.sort {
            Some(sort) => self.with_sort(sort.clone()),
            None => self,
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn project(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// 업데이트 연산자 명세 (`$set`, `$unset`, `$inc`, `$push` ...)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    document: Document,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이미 구성된 업데이트 연산자 문서를 감쌉니다.
    pub fn from_document(document: Document) -> Self {
        Self { document }
    }

    pub fn set(self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.operator("$set", key, value.into())
    }

    pub fn unset(self, key: impl Into<String>) -> Self {
        self.operator("$unset", key, Bson::String(String::new()))
    }

    pub fn inc(self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.operator("$inc", key, value.into())
    }

    pub fn push(self, key: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.operator("$push", key, value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    pub fn as_document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    fn operator(mut self, operator: &str, key: impl Into<String>, value: Bson) -> Self {
        if !self.document.contains_key(operator) {
            self.document.insert(operator, Document::new());
        }
        if let Ok(fields) = self.document.get_document_mut(operator) {
            fields.insert(key.into(), value);
        }
        self
    }
}
