//! Request Context - 요청 단위 파라미터
//!
//! 호출자가 pool에 명시적으로 넣어 주는 문자열 맵입니다.
//! bypass extension이 여기서 트리거 키를 찾습니다.

use std::collections::HashMap;

/// 요청 파라미터 맵
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 파라미터 추가 (builder)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.params.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// 키가 있고 값이 비어 있지 않으며 "0"/"false"가 아닌지
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.get(key) {
            Some(value) => !matches!(value.trim(), "" | "0" | "false"),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
