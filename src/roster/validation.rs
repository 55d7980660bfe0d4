use super::RowError;

pub fn required_text(row: u64, column: &str, value: &str) -> Result<String, RowError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RowError::new(row, format!("empty '{column}'")));
    }
    Ok(value.to_string())
}

pub fn count(row: u64, column: &str, value: &str) -> Result<i64, RowError> {
    optional_count(row, column, value)?
        .ok_or_else(|| RowError::new(row, format!("empty '{column}'")))
}

pub fn count_or_zero(row: u64, column: &str, value: &str) -> Result<i64, RowError> {
    Ok(optional_count(row, column, value)?.unwrap_or(0))
}

pub fn optional_count(row: u64, column: &str, value: &str) -> Result<Option<i64>, RowError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = value.parse::<i64>().map_err(|e| {
        RowError::new(row, format!("invalid integer '{value}' in '{column}': {e}"))
    })?;
    if parsed < 0 {
        return Err(RowError::new(
            row,
            format!("'{column}' must not be negative (got {parsed})"),
        ));
    }
    Ok(Some(parsed))
}
