//! 宽松 JSON 文本处理
//!
//! schema 与模板源文件可能带有 `//` 和 `/* */` 注释；模型输出可能把 JSON
//! 对象包裹在说明文字或代码块中。

use serde_json::Value;

use crate::error::LlmError;

/// 移除 `//` 与 `/* */` 注释，字符串字面量保持不变
///
/// `"` 和 `'` 都作为字符串定界符，字符串内反斜杠转义下一个字符。
/// 未闭合的块注释会吞掉剩余输入。
pub fn strip_json_comments(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    let mut delimiter: Option<char> = None;
    let mut escaped = false;

    while i < chars.len() {
        let ch = chars[i];

        if let Some(delim) = delimiter {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == delim {
                delimiter = None;
            }
            i += 1;
            continue;
        }

        if ch == '"' || ch == '\'' {
            delimiter = Some(ch);
            out.push(ch);
            i += 1;
            continue;
        }

        if ch == '/' && i + 1 < chars.len() {
            match chars[i + 1] {
                '/' => {
                    i += 2;
                    while i < chars.len() && chars[i] != '\n' && chars[i] != '\r' {
                        i += 1;
                    }
                    continue;
                }
                '*' => {
                    i += 2;
                    while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                        i += 1;
                    }
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }

        out.push(ch);
        i += 1;
    }

    out
}

/// 从第一个 `{` 到最后一个 `}` 的片段
pub fn outermost_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

/// 将模型输出解析为 JSON，失败时改用最外层 `{...}` 片段重试
pub fn parse_model_json(content: &str) -> Result<Value, LlmError> {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return Ok(value);
    }
    outermost_object(content)
        .and_then(|span| serde_json::from_str::<Value>(span).ok())
        .ok_or_else(|| LlmError::malformed(content))
}

/// 将类型不定的条目列表展平为去空白的非空字符串
///
/// 对象取 `text`、`message`、`detail` 中第一个字符串字段；单个字符串按行拆分。
pub fn coerce_string_list(value: Option<&Value>) -> Vec<String> {
    let push = |out: &mut Vec<String>, text: &str| {
        let text = text.trim();
        if !text.is_empty() {
            out.push(text.to_string());
        }
    };

    let mut result = Vec::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(text) => push(&mut result, text),
                    Value::Object(map) => {
                        if let Some(text) = ["text", "message", "detail"]
                            .iter()
                            .find_map(|key| map.get(*key).and_then(Value::as_str))
                        {
                            push(&mut result, text);
                        }
                    }
                    other => push(&mut result, &other.to_string()),
                }
            }
        }
        Some(Value::String(text)) => {
            for line in text.lines() {
                push(&mut result, line);
            }
        }
        Some(other) => push(&mut result, &other.to_string()),
    }
    result
}
