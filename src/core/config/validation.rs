use serde_json::{Map, Value};

use crate::core::errors::RagError;

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(paths) = expect_optional_object(root, "paths")? {
        validate_non_empty_string_field(paths, "paths.content_dir", "content_dir")?;
        validate_non_empty_string_field(paths, "paths.index_file", "index_file")?;
        validate_non_empty_string_field(paths, "paths.metadata_file", "metadata_file")?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_non_empty_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 2048)?;
        validate_u64_field(embedding, "embedding.concurrency", "concurrency", 1, 32)?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(chat) = expect_optional_object(root, "chat")? {
        validate_non_empty_string_field(chat, "chat.base_url", "base_url")?;
        validate_non_empty_string_field(chat, "chat.model", "model")?;
        validate_f64_field(chat, "chat.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(chat, "chat.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(query) = expect_optional_object(root, "query")? {
        validate_u64_field(query, "query.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(query, "query.max_top_k", "max_top_k", 1, 1_000)?;
    }

    if let Some(openai) = expect_optional_object(root, "openai")? {
        validate_optional_string_field(openai, "openai.api_key", "api_key")?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(RagError::Config(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Config(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_complete_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "paths": { "content_dir": "scraped_results" },
            "embedding": { "model": "text-embedding-3-small", "batch_size": 100, "concurrency": 4 },
            "chat": { "model": "gpt-4", "temperature": 0.7 },
            "query": { "top_k": 5 },
            "server": { "port": 8080, "cors_allowed_origins": ["http://localhost:3000"] }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_mistyped_values() {
        let bad = [
            json!({ "embedding": { "batch_size": 5000 } }),
            json!({ "embedding": { "model": "" } }),
            json!({ "chat": { "temperature": "warm" } }),
            json!({ "query": "top" }),
            json!({ "server": { "cors_allowed_origins": [1] } }),
            json!([]),
        ];

        for config in bad {
            let err = validate_config(&config).unwrap_err();
            assert!(matches!(err, RagError::Config(_)), "{config}");
        }
    }
}
