//! Refresh - re-read every recorded resource and update the state file

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use crmkit::Client;
use declarative::Drift;
use rayon::prelude::*;
use serde_json::Value;

use crate::Context;
use crate::progress;
use crate::resource::ProviderError;
use crate::state::State;
use crate::ui;

/// Live state of one recorded resource
type Reading = (String, std::result::Result<Drift<Value>, ProviderError>);

/// Counts of what a refresh found
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub current: usize,
    pub replaced: usize,
    pub gone: usize,
    pub failed: usize,
}

pub fn run(ctx: &Context, jobs: usize) -> Result<()> {
    let mut state = super::load_state(ctx)?;
    if state.is_empty() {
        ui::info("Nothing recorded in the state file");
        return Ok(());
    }
    let client = super::client(ctx)?;

    if !ctx.quiet {
        ui::header("crmform refresh");
        ui::kv("State", &ctx.state.display().to_string());
        ui::kv("Resources", &state.resources.len().to_string());
    }

    let pb = progress::bar(state.resources.len() as u64, "Reading");
    let readings = read_all(&client, &state, jobs, || pb.inc(1))?;
    pb.finish_and_clear();

    let summary = record(&mut state, readings);
    state.save(&ctx.state)?;

    println!();
    println!(
        "  {} {} current, {} replaced, {} gone",
        "✓".green(),
        summary.current,
        summary.replaced,
        summary.gone
    );
    if summary.failed > 0 {
        bail!("{} resources could not be read", summary.failed);
    }
    Ok(())
}

/// Read every recorded resource on a pool of `jobs` threads
///
/// Results come back in state order.
pub fn read_all(
    client: &Client,
    state: &State,
    jobs: usize,
    on_done: impl Fn() + Sync,
) -> Result<Vec<Reading>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create refresh thread pool")?;

    Ok(pool.install(|| {
        state
            .resources
            .par_iter()
            .map(|r| {
                let drift = r.kind.refresh(client, &r.inputs, &r.output);
                on_done();
                (r.name.clone(), drift)
            })
            .collect()
    }))
}

/// Fold readings into the state, reporting drift as it goes
pub fn record(state: &mut State, readings: Vec<Reading>) -> RefreshSummary {
    let mut summary = RefreshSummary::default();

    for (name, reading) in readings {
        match reading {
            Ok(Drift::Current(live)) => {
                log::debug!("{name} is current");
                state.set_output(&name, live);
                summary.current += 1;
            }
            Ok(Drift::Replaced(live)) => {
                ui::warn(&format!("{name} was replaced outside crmform; recording the new object"));
                state.set_output(&name, live);
                summary.replaced += 1;
            }
            Ok(Drift::Gone) => {
                ui::warn(&format!("{name} no longer exists; the next apply will create it"));
                state.remove(&name);
                summary.gone += 1;
            }
            Err(e) => {
                ui::error(&format!("{name}: {e}"));
                ui::dim(e.advice());
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Kind;
    use crate::resource::testing::client;
    use crmkit::Error;
    use declarative::NoNotes;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn applied(client: &Client) -> State {
        let mut state = State::default();
        for (name, kind, inputs) in [
            (
                "hook",
                Kind::Webhook,
                json!({"target_url": "https://hooks.example.com/a", "subscriptions": [{"event_type": "record.created"}]}),
            ),
            (
                "other-hook",
                Kind::Webhook,
                json!({"target_url": "https://hooks.example.com/b", "subscriptions": [{"event_type": "note.created"}]}),
            ),
        ] {
            let inputs = kind.validate(&inputs).unwrap();
            let output = kind
                .reconcile(client, &inputs, None, &mut NoNotes)
                .unwrap()
                .into_output();
            state.upsert(name, kind, inputs, output);
        }
        state
    }

    #[test]
    fn test_read_all_keeps_state_order() {
        let (client, mock) = client();
        let state = applied(&client);
        mock.reset_calls();
        let done = AtomicUsize::new(0);

        let readings = read_all(&client, &state, 4, || {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let names: Vec<_> = readings.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["hook", "other-hook"]);
        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(mock.calls("get_webhook"), 2);
    }

    #[test]
    fn test_gone_resources_leave_state() {
        let (client, _) = client();
        let mut state = applied(&client);
        let hook_id = state.get("hook").unwrap().output["webhook_id"].clone();
        let id = hook_id.as_str().unwrap().to_string();
        client.call("delete_webhook", |api| api.delete_webhook(&id)).unwrap();

        let readings = read_all(&client, &state, 2, || {}).unwrap();
        let summary = record(&mut state, readings);

        assert_eq!(
            summary,
            RefreshSummary {
                current: 1,
                gone: 1,
                ..Default::default()
            }
        );
        assert!(state.get("hook").is_none());
        assert!(state.get("other-hook").is_some());
    }

    #[test]
    fn test_failed_reads_keep_recorded_output() {
        let (client, mock) = client();
        let mut state = applied(&client);
        let before = state.clone();
        mock.fail_times(
            "get_webhook",
            Error::Authentication {
                message: "token revoked".into(),
            },
            2,
        );

        let readings = read_all(&client, &state, 1, || {}).unwrap();
        let summary = record(&mut state, readings);

        assert_eq!(summary.failed, 2);
        assert_eq!(state.resources, before.resources);
    }
}
