use anyhow::{bail, Context, Result};
use reqwest::Url;

const DEFAULT_URL: &str = "http://127.0.0.1:25566/health";

fn main() -> Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let url = Url::parse(&url).with_context(|| format!("Invalid URL {url}"))?;

    let response = reqwest::blocking::get(url.clone())
        .with_context(|| format!("Request to {url} failed"))?;
    if !response.status().is_success() {
        bail!("Health check failed with status {}", response.status())
    }

    Ok(())
}
