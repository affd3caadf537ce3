//! 로깅 초기화 유틸리티
//!
//! 라이브러리 자체는 `log` 퍼사드 매크로만 사용합니다. 이 모듈은
//! 애플리케이션이나 테스트에서 `env_logger` 백엔드를 연결할 때 사용합니다.

use env_logger::Env;

/// 기본 로그 필터
pub const DEFAULT_LOG_FILTER: &str = "info,mongodb=warn";

/// 로깅 시스템을 초기화합니다
///
/// 환경변수 `RUST_LOG` 를 기반으로 로깅 레벨을 설정하며, 없으면
/// [`DEFAULT_LOG_FILTER`] 를 사용합니다. 이미 초기화된 경우 조용히 무시합니다.
///
/// ```bash
/// # 리포지토리 연산 로그까지 보기
/// RUST_LOG=mongo_repo_core=debug cargo run
/// ```
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .try_init();
}

/// 테스트용 `env_logger` 로거
///
/// 테스트 하네스가 출력을 캡처할 수 있도록 `is_test(true)` 로 설정합니다.
pub fn test_logger() -> env_logger::Logger {
    env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .build()
}

/// [`test_logger`] 를 전역 로거로 설치합니다. 이미 설치된 로거가 있으면 무시합니다.
pub fn init_test_logging() {
    let logger = test_logger();
    let max_level = logger.filter();
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}


#[cfg(test)]
mod tests {
    use super::capture::capture_logs;
    use log::Level;

    #[test]
    fn test_capture_logs_collects_current_thread_only() {
        let logs = capture_logs(|| {
            log::warn!("bulk write on players partially applied");
            std::thread::spawn(|| log::warn!("from another thread"))
                .join()
                .unwrap();
        });

        assert_eq!(
            logs,
            vec![(Level::Warn, "bulk write on players partially applied".to_string())]
        );
    }
}
