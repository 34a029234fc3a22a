use std::collections::BTreeMap;

use serde_json::Value;

/// 요청 파라미터. 키는 항상 사전순으로 정렬되어 있어 서명 메시지가 결정적이다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `k1=v1&k2=v2` 형태의 쿼리 문자열 (키 사전순, RFC 3986 퍼센트 인코딩)
    pub fn to_query(&self) -> String {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            encode_pair(key, value, &mut pairs);
        }
        pairs.join("&")
    }

    /// POST/DELETE 본문용 JSON
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone().into_iter().collect()).to_string()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// 중첩 값은 `key[0]=..`, `key[sub]=..` 로 펼친다.
fn encode_pair(key: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                encode_pair(&format!("{}[{}]", key, i), item, out);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                encode_pair(&format!("{}[{}]", key, sub), item, out);
            }
        }
        scalar => out.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(&scalar_to_string(scalar))
        )),
    }
}

pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
