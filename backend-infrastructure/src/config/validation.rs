use anyhow::{anyhow, Result};
use reqwest::Url;

pub fn validate_backend_url(value: &str) -> Result<()> {
    let url = Url::parse(value.trim()).map_err(|err| anyhow!("invalid backend_url: {}", err))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("backend_url must use http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(anyhow!("backend_url must be a base url"));
    }
    Ok(())
}

pub fn validate_host(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{} must not be empty", field));
    }
    if trimmed.contains(char::is_whitespace) || trimmed.contains('/') {
        return Err(anyhow!("{} must be a bare host name or address", field));
    }
    Ok(())
}
