//! Timer-paced encounter driver.
//!
//! Each spawned encounter gets its own task that advances the state machine one
//! round per tick and streams a [`TurnReport`] to the caller. The task stops when
//! the fight reaches a terminal state or the handle cancels it (which flees).
//! Pattern follows the message dispatch scheduler: a spawned loop plus a small
//! handle type.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::encounter::{Encounter, TurnReport};
use super::rng::RandomSource;
use crate::errors::GameError;

pub struct EncounterHandle {
    cancel: Option<oneshot::Sender<()>>,
    join: JoinHandle<Encounter>,
}

impl EncounterHandle {
    /// Ask the encounter to flee at the next opportunity. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the encounter to end and take back its final state.
    pub async fn finish(self) -> Result<Encounter, GameError> {
        let EncounterHandle { cancel, join } = self;
        let result = join.await;
        // Held until the task is done so the task does not see a dropped sender.
        drop(cancel);
        result.map_err(|e| GameError::Internal(format!("encounter task failed: {}", e)))
    }
}

/// Drive `encounter` (already begun) every `interval` until it ends.
pub fn spawn_encounter<R>(
    mut encounter: Encounter,
    interval: Duration,
    mut rng: R,
) -> (EncounterHandle, mpsc::UnboundedReceiver<TurnReport>)
where
    R: RandomSource + Send + 'static,
{
    let (report_tx, report_rx) = mpsc::unbounded_channel();
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
    let period = interval.max(Duration::from_millis(1));

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick of a tokio interval fires immediately; consume it so
        // round one lands one full interval after start.
        ticker.tick().await;
        while !encounter.is_finished() {
            tokio::select! {
                _ = &mut cancel_rx => {
                    log::info!("encounter for {} cancelled on turn {}", encounter.player().name, encounter.turn());
                    encounter.flee();
                    break;
                }
                _ = ticker.tick() => {
                    match encounter.advance(&mut rng) {
                        Some(report) => {
                            let _ = report_tx.send(report);
                        }
                        // Never begun; nothing will ever advance it.
                        None => break,
                    }
                }
            }
        }
        log::debug!(
            "encounter loop finished: player={} state={:?} turns={}",
            encounter.player().name,
            encounter.state(),
            encounter.turn()
        );
        encounter
    });

    (
        EncounterHandle {
            cancel: Some(cancel_tx),
            join,
        },
        report_rx,
    )
}
