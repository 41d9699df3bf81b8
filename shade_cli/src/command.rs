//! `shade command`: translate and send one cover command.

use std::sync::Arc;

use serde_json::json;
use shade_core::error::{RangeError, ShadeError};
use shade_core::mocks::InMemoryShadow;
use shade_core::{CoverCommand, DeviceSession, encode_command};
use shade_hardware::SimulatedTransport;
use shade_traits::ManualClock;

use crate::cli::Action;

fn cover_command(action: Action, percent: Option<u8>) -> eyre::Result<CoverCommand> {
    Ok(match action {
        Action::Open => CoverCommand::Open,
        Action::Close => CoverCommand::Close,
        Action::Stop => CoverCommand::Stop,
        Action::Goto => CoverCommand::GoToLiftPercentage(
            percent.ok_or_else(|| eyre::eyre!("goto requires --percent"))?,
        ),
    })
}

pub fn run_command(
    cfg: &shade_config::Config,
    action: Action,
    percent: Option<u8>,
    current: Option<u8>,
    json: bool,
) -> eyre::Result<()> {
    let cmd = cover_command(action, percent)?;
    let shadow = match current {
        Some(p) => {
            RangeError::check("current_lift_percentage", i64::from(p), 0, 100)
                .map_err(ShadeError::from)?;
            Arc::new(InMemoryShadow::with_lift(p))
        }
        None => Arc::new(InMemoryShadow::new()),
    };

    let clock = ManualClock::new();
    let mut session = DeviceSession::builder()
        .with_config(cfg)
        .with_clock(clock.clone())
        .with_transport(SimulatedTransport::from_env(clock))
        .with_shadow(shadow.clone())
        .build()?;

    let t = session.handle_command(cmd)?;
    let frame = hex::encode(encode_command(0, &t.command, t.dp_type)?);
    tracing::info!(%cmd, dp = t.command.dp, value = t.command.value, "command delivered");

    if json {
        println!(
            "{}",
            json!({
                "command": cmd.to_string(),
                "dp": t.command.dp,
                "value": t.command.value,
                "wants_reply": t.command.wants_reply,
                "frame": frame,
                "prediction": t.prediction,
                "lift_writes": shadow.lift_writes(),
            })
        );
    } else {
        println!(
            "{cmd}: dp {} <- {} (frame {frame})",
            t.command.dp, t.command.value
        );
        match t.prediction {
            Some(p) => println!("predicted lift: {p}%"),
            None => println!("predicted lift: none"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goto_needs_a_percent() {
        assert!(cover_command(Action::Goto, None).is_err());
        assert_eq!(
            cover_command(Action::Goto, Some(30)).unwrap(),
            CoverCommand::GoToLiftPercentage(30)
        );
        assert_eq!(cover_command(Action::Stop, Some(30)).unwrap(), CoverCommand::Stop);
    }
}
