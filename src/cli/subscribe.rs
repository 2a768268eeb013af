use anyhow::Result;

use crate::core::{AppConfig, Services};
use crate::notify::recipient_prefix;

pub async fn run(config: &AppConfig, token: &str, topic: Option<&str>) -> Result<()> {
    let services = Services::from_config(config)?;
    let topic = topic.unwrap_or(&config.default_topic);

    let outcome = services.registrar.subscribe(token, topic).await?;
    println!(
        "✅ {} subscribed to topic '{}'",
        recipient_prefix(token.trim()),
        outcome.topic
    );

    Ok(())
}
