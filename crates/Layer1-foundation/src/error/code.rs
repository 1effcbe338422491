//! 메시지 코드 - 실패 원인별 고정 숫자 코드

/// 잘못된 extension
pub const INVALID_EXT: i64 = 1512220908;
/// 잘못된 item key
pub const INVALID_KEY: i64 = 1512220910;
/// 직렬화/역직렬화 실패
pub const FAIL_SERIALIZE: i64 = 1512220911;
/// 잘못된 extension 메서드
pub const INVALID_METHOD: i64 = 1512220912;
/// 삭제 실패
pub const FAIL_DELETE: i64 = 1512220913;
/// 디렉토리 생성 실패
pub const FAIL_MKDIR: i64 = 1512220914;
/// 파일 쓰기 실패
pub const FAIL_WRITEFILE: i64 = 1512220915;
/// driver ping 실패 (fallback 전환)
pub const FAIL_DRIVER: i64 = 1512220916;
/// 암호화/복호화 실패
pub const FAIL_ENCRYPT: i64 = 1512220917;
/// 파일 읽기 실패
pub const FAIL_READFILE: i64 = 1512220918;
/// 캐시 우회
pub const BYPASS: i64 = 1512220919;
/// 잘못된 인자
pub const INVALID_ARGUMENT: i64 = 1512220920;
/// 잘못된 설정
pub const INVALID_CONFIG: i64 = 1512220921;
