use anyhow::Result;
use shared::{
    domain::{phase_for_step, TOTAL_STEPS},
    protocol::Notification,
};
use visualizer_core::{
    catalog::{describe_step, CatalogRevision},
    narration::narration_for_step,
    overview::ProtocolOverview,
};

/// Prints one notification, either as a JSON line or as terminal text.
pub fn print_notification(notification: &Notification, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(notification)?);
        return Ok(());
    }

    match notification {
        Notification::Narration { text } => println!("\n{text}"),
        Notification::TransitionStarted { event, .. } => {
            let label = event
                .payload_label
                .as_deref()
                .map(|l| format!(" \"{l}\""))
                .unwrap_or_default();
            println!(
                "  {} {} -> {}{label}",
                event.kind, event.origin, event.destination
            );
        }
        Notification::StageChanged { stage, narration } => {
            println!("    [{stage}] {narration}");
        }
        Notification::PhaseChanged { phase } => println!("== {} ==", phase.caption()),
        Notification::SpeedChanged { speed } => println!("  speed {speed:.2}x"),
        Notification::Rejected(err) => eprintln!("rejected: {}", err.message),
        Notification::TransitionFinished { .. }
        | Notification::StepChanged { .. }
        | Notification::Snapshot(_) => {}
    }
    Ok(())
}

pub fn print_catalog(revision: CatalogRevision, json: bool) -> Result<()> {
    if !json {
        println!(
            "{:>4}  {:<8} {:<17} {:<15} {:<20} narration",
            "step", "kind", "direction", "label", "phase"
        );
    }

    for step in 0..TOTAL_STEPS {
        let descriptor = describe_step(step, revision)?;
        let narration = narration_for_step(Some(step))?;
        let phase = phase_for_step(step);

        if json {
            let line = serde_json::json!({
                "step": step,
                "packet": descriptor,
                "phase": phase,
                "narration": narration,
            });
            println!("{line}");
            continue;
        }

        let (kind, direction, label) = match &descriptor {
            Some(d) => (
                d.kind.to_string(),
                format!("{} -> {}", d.origin, d.destination),
                d.payload_label.clone().unwrap_or_default(),
            ),
            None => ("-".to_string(), "-".to_string(), String::new()),
        };
        println!(
            "{:>4}  {kind:<8} {direction:<17} {label:<15} {:<20} {narration}",
            step + 1,
            phase.caption()
        );
    }
    Ok(())
}

pub fn print_overview(overview: &ProtocolOverview, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(overview)?);
        return Ok(());
    }

    println!("{}\n", overview.summary);
    for process in &overview.processes {
        println!("  {}: {}", process.name, process.description);
    }

    println!("\nLayers");
    for layer in &overview.layers {
        println!(
            "  {:<24} {:<16} {} {}",
            format!("{} Layer", layer.name),
            layer.header,
            layer.color,
            layer.role
        );
    }

    println!("\nPacket types");
    for entry in &overview.packet_kinds {
        let marker = if entry.active { '>' } else { ' ' };
        println!(
            "{marker} {:<8} {} {}",
            entry.kind.name(),
            entry.color,
            entry.description
        );
    }
    Ok(())
}
