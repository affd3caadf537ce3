/// 예제(probe) 기반 쿼리 명세
///
/// 리포지토리 인터페이스에 선언된 예제 기반 연산들의 인자 타입입니다.
/// 해당 연산들은 현재 모두 `UnsupportedOperation` 을 반환합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Example<S> {
    probe: S,
}

impl<S> Example<S> {
    pub fn of(probe: S) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> &S {
        &self.probe
    }

    pub fn into_probe(self) -> S {
        self.probe
    }
}
