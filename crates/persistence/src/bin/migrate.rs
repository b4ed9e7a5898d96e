#![deny(warnings)]

use persistence::{default_sqlite_url, is_memory_url, PresetStore, SqlitePresetStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    if !is_memory_url(&url) {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"));
        if let Some(parent) = path.and_then(|p| std::path::Path::new(p).parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    let store = SqlitePresetStore::connect(&url).await?;
    let presets = store.list().await?;
    println!("Preset DB migrated at {} ({} presets)", url, presets.len());
    Ok(())
}
