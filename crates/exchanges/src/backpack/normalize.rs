//! 응답 JSON 정규화
//!
//! 거래소는 숫자 필드를 문자열로 내려준다. 숫자로 해석되는 문자열 leaf 는 모두 숫자로 바꾼다.
//! - 빈 배열, 숫자가 아닌 문자열은 그대로 둔다.
//! - 빈 문자열도 그대로 둔다.
//! - bool, null 은 건드리지 않는다.
//! - 정수 문자열은 i64/u64 범위 안이면 정수로, 아니면 f64 로 바꾼다.

use serde_json::{Number, Value};

pub fn normalize(value: Value) -> Value {
    match value {
        Value::String(s) => match coerce_number(&s) {
            Some(number) => Value::Number(number),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        other => other,
    }
}

fn coerce_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Some(Number::from(u));
    }

    // "inf", "NaN" 같은 값은 f64 로 파싱되지만 숫자로 취급하지 않는다
    let looks_numeric = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !looks_numeric {
        return None;
    }

    trimmed.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_strings_become_numbers() {
        let body = json!({"price": "1.5", "status": "Filled", "empty": []});
        let normalized = normalize(body);

        assert_eq!(normalized["price"].as_f64(), Some(1.5));
        assert!(normalized["price"].is_number());
        assert_eq!(normalized["status"], json!("Filled"));
        assert_eq!(normalized["empty"], json!([]));
    }

    #[test]
    fn test_nested_and_integer_values() {
        let body = json!({
            "id": "112233445566778899",
            "fills": [{"quantity": "3", "price": "-0.25"}],
            "USDC": {"available": "100", "locked": "0"}
        });
        let normalized = normalize(body);

        assert_eq!(normalized["id"].as_u64(), Some(112233445566778899));
        assert_eq!(normalized["fills"][0]["quantity"].as_i64(), Some(3));
        assert_eq!(normalized["fills"][0]["price"].as_f64(), Some(-0.25));
        assert_eq!(normalized["USDC"]["available"].as_i64(), Some(100));
    }

    #[test]
    fn test_edge_cases_pass_through() {
        let body = json!({
            "blank": "",
            "word": "NaN",
            "inf": "inf",
            "flag": true,
            "nothing": null,
            "symbol": "SOL_USDC",
            "hex": "0x10"
        });
        assert_eq!(normalize(body.clone()), body);
    }
}
