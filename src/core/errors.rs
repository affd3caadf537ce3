//! # Repository Error Handling
//!
//! 리포지토리 계층 전체에서 사용하는 통합 에러 타입입니다.
//! `thiserror`로 `Error` trait을 구현하며, 저장소(MongoDB) 에러는
//! 재시도나 변환 없이 메시지를 보존한 채 호출자에게 그대로 전달됩니다.
//!
//! ## 에러 분류
//!
//! | 상황 | 표현 |
//! |------|------|
//! | 문서 없음 | `Ok(None)` / `Ok(false)` (에러 아님) |
//! | 잘못된 ID 형식 | 저장소 호출 없이 not-found 로 단락 (에러 아님) |
//! | 지원하지 않는 연산 | `AppError::UnsupportedOperation` |
//! | 저장소 실패 | `AppError::DatabaseError` |
//! | 고유 키 충돌 | `AppError::DuplicateKey` |
//! | 대량 쓰기 일부 실패 | `AppError::BulkWriteError` (부분 결과 포함) |
//! | 엔티티 ⇄ BSON 매핑 실패 | `AppError::MappingError` |
//! | 잘못된 호출 인자 | `AppError::ValidationError` |
//!
//! JSON 변환 실패는 에러가 아니라 `None` 으로 표현됩니다
//! ([`JsonConverter`](crate::services::converter::JsonConverter) 참고).
//!
//! ## 사용 패턴
//!
//! ```rust,ignore
//! use mongo_repo_core::core::errors::{AppError, AppResult};
//!
//! match repo.write_in_bulk(players).await {
//!     Ok(result) => info!("inserted {}", result.inserted_count),
//!     Err(AppError::BulkWriteError { result, failures }) => {
//!         warn!("inserted {} with {} failures", result.inserted_count, failures.len());
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```

use thiserror::Error;

use crate::domain::models::bulk::{BulkWriteFailure, BulkWriteResult};

/// 리포지토리 전역 에러 타입
///
/// 저장소 계층과 매핑 계층에서 발생할 수 있는 모든 에러를 포괄합니다.
#[derive(Error, Debug)]
pub enum AppError {
    /// 데이터베이스 관련 에러
    ///
    /// 연결 실패, 쿼리 오류, 서버 측 검증 거부 등 저장소가 보고한 실패입니다.
    /// 드라이버 메시지를 그대로 담으며 재시도하지 않습니다.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// 고유 키 충돌 에러
    ///
    /// `insert` 가 이미 존재하는 `_id`(또는 유니크 인덱스 키)와 충돌할 때 발생합니다.
    /// 기존 문서는 변경되지 않습니다.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// 엔티티와 BSON 문서 간 변환 실패
    #[error("Mapping error: {0}")]
    MappingError(String),

    /// 선언되어 있지만 구현되지 않은 연산
    ///
    /// 일시적인 오류가 아닌 영구적인 기능 부재이므로 재시도해서는 안 됩니다.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// 입력값 검증 에러
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// unordered 대량 쓰기에서 일부 연산이 실패
    ///
    /// 나머지 연산은 이미 적용되었으며, 그 개수는 `result` 에 담깁니다.
    /// `_id` 충돌도 이 변형의 `failures` 에 코드 11000 으로 보고됩니다.
    #[error("Bulk write failed: {} operation(s) failed", .failures.len())]
    BulkWriteError {
        result: BulkWriteResult,
        failures: Vec<BulkWriteFailure>,
    },

    /// 내부 에러
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// 지원하지 않는 연산 에러를 생성합니다.
    pub fn unsupported(operation: &str) -> Self {
        AppError::UnsupportedOperation(format!("{} is not implemented", operation))
    }

    /// 영구적인 기능 부재 에러인지 확인합니다.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, AppError::UnsupportedOperation(_))
    }

    /// 단건 충돌이거나, 대량 쓰기 실패 중 하나라도 키 충돌인지 확인합니다.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            AppError::DuplicateKey(_) => true,
            AppError::BulkWriteError { failures, .. } => failures
                .iter()
                .any(|failure| failure.code == Some(DUPLICATE_KEY_CODE)),
            _ => false,
        }
    }
}

/// MongoDB 드라이버 에러 변환
///
/// 서버 코드 11000(duplicate key)은 [`AppError::DuplicateKey`] 로,
/// `Client::bulk_write` 실패는 부분 결과를 보존해 [`AppError::BulkWriteError`] 로,
/// 그 외는 모두 [`AppError::DatabaseError`] 로 변환합니다.
impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match *e.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref write_error))
                if write_error.code == DUPLICATE_KEY_CODE =>
            {
                AppError::DuplicateKey(write_error.message.clone())
            }
            ErrorKind::BulkWrite(ref bulk_error) => bulk_write_error(bulk_error),
            _ => AppError::DatabaseError(e.to_string()),
        }
    }
}

fn bulk_write_error(bulk_error: &mongodb::error::BulkWriteError) -> AppError {
    let mut write_errors: Vec<_> = bulk_error.write_errors.iter().collect();
    write_errors.sort_by_key(|(index, _)| **index);

    let mut failures: Vec<BulkWriteFailure> = write_errors
        .into_iter()
        .map(|(index, write_error)| BulkWriteFailure {
            index: Some(*index),
            code: Some(write_error.code),
            message: write_error.message.clone(),
        })
        .collect();
    failures.extend(bulk_error.write_concern_errors.iter().map(|concern| BulkWriteFailure {
        index: None,
        code: Some(concern.code),
        message: concern.message.clone(),
    }));

    AppError::BulkWriteError {
        result: bulk_error
            .partial_result
            .clone()
            .map(BulkWriteResult::from)
            .unwrap_or_default(),
        failures,
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        AppError::MappingError(e.to_string())
    }
}

impl From<mongodb::bson::de::Error> for AppError {
    fn from(e: mongodb::bson::de::Error) -> Self {
        AppError::MappingError(e.to_string())
    }
}

/// MongoDB duplicate key 서버 에러 코드
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// 편의성을 위한 Result 타입 별칭
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_error_message() {
        let error = AppError::unsupported("find_all_by_id");

        assert!(error.is_unsupported());
        assert_eq!(
            error.to_string(),
            "Unsupported operation: find_all_by_id is not implemented"
        );
    }

    #[test]
    fn test_database_error_is_not_unsupported() {
        let error = AppError::DatabaseError("connection refused".to_string());

        assert!(!error.is_unsupported());
        assert_eq!(error.to_string(), "Database error: connection refused");
    }

    #[test]
    fn test_bson_mapping_error_conversion() {
        let result: Result<i32, _> =
            mongodb::bson::from_document(mongodb::bson::doc! { "not": "a number" });
        let error: AppError = result.unwrap_err().into();

        assert!(matches!(error, AppError::MappingError(_)));
    }

    #[test]
    fn test_bulk_write_error_reports_duplicates() {
        let error = AppError::BulkWriteError {
            result: BulkWriteResult { inserted_count: 2, ..Default::default() },
            failures: vec![BulkWriteFailure {
                index: Some(0),
                code: Some(DUPLICATE_KEY_CODE),
                message: "E11000 duplicate key error".to_string(),
            }],
        };

        assert!(error.is_duplicate_key());
        assert_eq!(error.to_string(), "Bulk write failed: 1 operation(s) failed");
        assert!(!AppError::DatabaseError("timeout".to_string()).is_duplicate_key());
    }

    #[test]
    fn test_driver_bulk_write_error_keeps_partial_result() {
        use mongodb::bson::doc;
        use mongodb::error::{BulkWriteError, Error, ErrorKind, PartialBulkWriteResult, WriteError};
        use mongodb::results::SummaryBulkWriteResult;

        let duplicate: WriteError = mongodb::bson::from_document(doc! {
            "code": DUPLICATE_KEY_CODE,
            "errmsg": "E11000 duplicate key error collection: game.players",
        })
        .unwrap();
        let mut summary = SummaryBulkWriteResult::default();
        summary.inserted_count = 2;
        let mut bulk_error = BulkWriteError::default();
        bulk_error.write_errors.insert(0, duplicate);
        bulk_error.partial_result = Some(PartialBulkWriteResult::Summary(summary));

        let error: AppError = Error::from(ErrorKind::BulkWrite(bulk_error)).into();

        assert!(error.is_duplicate_key());
        match error {
            AppError::BulkWriteError { result, failures } => {
                assert_eq!(result.inserted_count, 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].index, Some(0));
                assert_eq!(failures[0].code, Some(DUPLICATE_KEY_CODE));
            }
            other => panic!("Expected BulkWriteError, got {:?}", other),
        }
    }
}
