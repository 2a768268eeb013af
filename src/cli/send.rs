use std::sync::Arc;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::core::{AppConfig, Services};
use crate::notify::{DeliveryTarget, DispatchEvent, DispatchReport, DispatchStatus, Message};

const CONFIRM_ANSWERS: [&str; 4] = ["o", "oui", "y", "yes"];

fn prompt(rl: &mut DefaultEditor, label: &str) -> Result<String> {
    match rl.readline(label) {
        Ok(line) => Ok(line.trim().to_string()),
        // Treat an aborted prompt as an empty answer
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}

fn target_from_args(topic: Option<String>, token: Option<String>) -> DeliveryTarget {
    match (topic, token) {
        (Some(name), _) => DeliveryTarget::Topic { name },
        (None, Some(token)) => DeliveryTarget::SingleRecipient { token },
        (None, None) => DeliveryTarget::AllRecipients,
    }
}

/// What the operator confirms before anything is sent. A broadcast shows
/// how many recipients it will reach.
fn summary(message: &Message, target: &DeliveryTarget, total: usize) -> String {
    let destination = match target {
        DeliveryTarget::AllRecipients => format!("{} recipient(s)", total),
        other => other.to_string(),
    };
    format!(
        "  Title   : {}\n  Message : {}\n  Send to : {}",
        message.title(),
        message.body(),
        destination
    )
}

fn print_event(event: &DispatchEvent) {
    match event {
        DispatchEvent::Resolved { total } => println!("Sending to {} address(es)", total),
        DispatchEvent::Failed(failure) => {
            let status = failure
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| String::from("no response"));
            println!(
                "  ⚠️ Failed {} [{}]: {}",
                failure.recipient, status, failure.detail
            );
        }
        DispatchEvent::Progress { completed, total } => {
            println!("Sending... {}/{}", completed, total)
        }
    }
}

fn print_report(report: &DispatchReport) {
    match report.status() {
        DispatchStatus::NoRecipients => {
            println!("⚠️ No recipient has accepted notifications yet.");
        }
        _ => {
            println!();
            println!(
                "✅ Done: {} sent, {} failed",
                report.succeeded, report.failed
            );
            if report.attempted == 1
                && let Some(id) = &report.last_message_id
            {
                println!("   Message id: {}", id);
            }
            if report.failed > report.failures.len() {
                println!(
                    "   ({} failure(s) not shown)",
                    report.failed - report.failures.len()
                );
            }
        }
    }
}

pub async fn run(
    config: &AppConfig,
    title: Option<String>,
    body: Option<String>,
    topic: Option<String>,
    token: Option<String>,
    yes: bool,
) -> Result<()> {
    // Fail on a missing or broken key before asking anything
    let services = Services::from_config(config)?;
    let target = target_from_args(topic, token);

    println!("╔════════════════════════════════════════╗");
    println!("║          Push notifications            ║");
    println!("╚════════════════════════════════════════╝");
    println!();

    // Know who will receive it before asking for anything
    let addresses = services.dispatcher.resolve(&target).await?;
    if target == DeliveryTarget::AllRecipients {
        println!("📱 {} recipient(s) on record", addresses.len());
        if addresses.is_empty() {
            println!("⚠️ No recipient has accepted notifications yet.");
            return Ok(());
        }
        println!();
    }

    let needs_prompt = title.is_none() || body.is_none() || !yes;
    let mut rl = if needs_prompt {
        Some(DefaultEditor::new()?)
    } else {
        None
    };

    let title = match (title, rl.as_mut()) {
        (Some(title), _) => title,
        (None, Some(rl)) => prompt(rl, "Title: ")?,
        (None, None) => String::new(),
    };
    let body = match (body, rl.as_mut()) {
        (Some(body), _) => body,
        (None, Some(rl)) => prompt(rl, "Message: ")?,
        (None, None) => String::new(),
    };
    let message = Message::new(&title, &body);
    message.validate()?;

    println!();
    println!("{}", summary(&message, &target, addresses.len()));
    println!();

    if let Some(rl) = rl.as_mut()
        && !yes
    {
        let answer = prompt(rl, "Send? (y/N): ")?.to_lowercase();
        if !CONFIRM_ANSWERS.contains(&answer.as_str()) {
            println!("Cancelled.");
            return Ok(());
        }
    }

    // Dispatch runs on its own task and reports back over the channel
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::clone(&services.dispatcher);
    let handle = tokio::spawn(async move {
        dispatcher
            .deliver(&message, &target, addresses, Some(&tx))
            .await
    });

    while let Some(event) = rx.recv().await {
        print_event(&event);
    }
    let report = handle.await??;
    print_report(&report);

    Ok(())
}
