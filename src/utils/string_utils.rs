//! # 문자열 유틸리티
//!
//! 문자열 처리와 관련된 공통 유틸리티 함수들입니다.

use crate::core::errors::AppError;

/// 필수 문자열 필드 검증 및 정리
///
/// 빈 문자열이나 공백만 있는 경우 ValidationError를 반환하고,
/// 유효한 문자열인 경우 앞뒤 공백을 제거한 문자열을 반환합니다.
///
/// # 예제
/// ```rust,ignore
/// use mongo_repo_core::utils::string_utils::validate_required_string;
///
/// assert_eq!(validate_required_string("  players  ", "collection").unwrap(), "players");
/// assert!(validate_required_string("   ", "collection").is_err());
/// ```
pub fn validate_required_string(value: &str, field_name: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            format!("{}은(는) 필수입니다", field_name)
        ));
    }
    Ok(trimmed.to_string())
}

/// 문자열을 최대 `max_chars` 문자까지 잘라 반환합니다
///
/// 바이트가 아닌 문자(char) 단위로 자르므로 멀티바이트 문자 중간에서
/// 잘리지 않습니다. 로그에 외부 입력을 남길 때 길이를 제한하는 용도입니다.
///
/// # 예제
/// ```rust,ignore
/// use mongo_repo_core::utils::string_utils::truncate_chars;
///
/// assert_eq!(truncate_chars("hello", 3), "hel");
/// assert_eq!(truncate_chars("안녕하세요", 2), "안녕");
/// assert_eq!(truncate_chars("hi", 10), "hi");
/// ```
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &value[..byte_index],
        None => value,
    }
}
