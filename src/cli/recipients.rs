use anyhow::Result;

use crate::core::{AppConfig, Services};

pub async fn run(config: &AppConfig) -> Result<()> {
    let services = Services::from_config(config)?;
    let recipients = services.directory.list_all().await?;
    println!(
        "📱 {} recipient(s) will receive notifications",
        recipients.len()
    );
    Ok(())
}
