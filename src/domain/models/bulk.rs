//! 대량 쓰기 연산과 결과
//!
//! 리포지토리는 대량 쓰기를 항상 unordered 모드로 제출합니다. 한 연산이
//! 실패해도 나머지 연산은 계속 시도되며, 개별 연산 간 원자성은 없습니다.

use std::fmt;

use mongodb::bson::Document;

use crate::core::errors::{AppError, DUPLICATE_KEY_CODE};

/// 대량 쓰기에 포함되는 단일 연산
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// 새 문서 삽입
    Insert(Document),
    /// 필터와 일치하는 첫 문서 업데이트
    UpdateOne { filter: Document, update: Document },
    /// 필터와 일치하는 모든 문서 업데이트
    UpdateMany { filter: Document, update: Document },
    /// 필터와 일치하는 첫 문서 삭제
    DeleteOne { filter: Document },
    /// 필터와 일치하는 모든 문서 삭제
    DeleteMany { filter: Document },
}

/// 대량 쓰기 결과 요약
///
/// 저장소가 보고한 개수를 그대로 전달합니다. 업데이트 연산에서
/// 일치하는 문서가 없어도 실패가 아니라 `matched_count == 0` 입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkWriteResult {
    pub inserted_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    pub upserted_count: u64,
}

impl BulkWriteResult {
    /// 연산이 하나도 없었던 경우의 결과
    pub fn empty() -> Self {
        Self::default()
    }

    /// 다른 결과의 개수를 합산합니다.
    pub fn merge(mut self, other: BulkWriteResult) -> Self {
        self.inserted_count += other.inserted_count;
        self.matched_count += other.matched_count;
        self.modified_count += other.modified_count;
        self.deleted_count += other.deleted_count;
        self.upserted_count += other.upserted_count;
        self
    }
}

impl From<mongodb::results::SummaryBulkWriteResult> for BulkWriteResult {
    fn from(result: mongodb::results::SummaryBulkWriteResult) -> Self {
        Self {
            inserted_count: result.inserted_count.max(0) as u64,
            matched_count: result.matched_count.max(0) as u64,
            modified_count: result.modified_count.max(0) as u64,
            deleted_count: result.deleted_count.max(0) as u64,
            upserted_count: result.upserted_count.max(0) as u64,
        }
    }
}

/// 대량 쓰기에서 실패한 개별 연산
///
/// `index` 는 제출한 연산 목록에서의 위치입니다. write concern 실패처럼
/// 특정 연산에 속하지 않는 실패는 `None` 입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkWriteFailure {
    pub index: Option<usize>,
    pub code: Option<i32>,
    pub message: String,
}

impl BulkWriteFailure {
    /// `index` 번째 연산의 에러를 실패 항목으로 변환합니다. 키 충돌은 코드 11000 입니다.
    pub fn at(index: usize, error: AppError) -> Self {
        match error {
            AppError::DuplicateKey(message) => Self {
                index: Some(index),
                code: Some(DUPLICATE_KEY_CODE),
                message,
            },
            other => Self { index: Some(index), code: None, message: other.to_string() },
        }
    }
}

impl fmt::Display for BulkWriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(index) = self.index {
            write!(f, "#{} ", index)?;
        }
        match self.code {
            Some(code) => write!(f, "(code {}) {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<mongodb::error::PartialBulkWriteResult> for BulkWriteResult {
    fn from(result: mongodb::error::PartialBulkWriteResult) -> Self {
        use mongodb::error::PartialBulkWriteResult;

        match result {
            PartialBulkWriteResult::Summary(summary) => summary.into(),
            PartialBulkWriteResult::Verbose(verbose) => verbose.summary.into(),
        }
    }
}
