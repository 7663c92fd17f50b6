// Periodic simulation task driving an emulator bank

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::bank::EmulatorBank;
use crate::config::MIN_PERIOD;

/// Handle to a running tick task
pub struct TickerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Stop ticking and wait for the task to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            debug!("Ticker task ended abnormally: {}", e);
        }
    }
}

/// Tick every axis in `bank` once per `period`
///
/// Each tick advances the model by exactly `period`, independent of
/// scheduling jitter. Request handling never waits on this task beyond
/// the per-axis lock held during a single step. Periods below
/// `MIN_PERIOD` are raised to it.
pub fn spawn_ticker(bank: EmulatorBank, period: Duration) -> TickerHandle {
    let period = period.max(MIN_PERIOD);
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let dt = period.as_secs_f64();

    let task = tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Simulation ticker started: {}ms period, units {:?}",
            period.as_millis(),
            bank.units()
        );

        loop {
            tokio::select! {
                _ = tick.tick() => bank.tick_all(dt),
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Simulation ticker stopped");
    });

    TickerHandle { shutdown, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::registers::{encode_f32, Register};

    #[tokio::test(start_paused = true)]
    async fn test_ticker_drives_motion() {
        let bank = EmulatorBank::new(&[1]);
        {
            let axis = bank.axis(1).unwrap();
            let mut axis = axis.lock();
            axis.write_registers(Register::TargetPosition.address(), &encode_f32(1.0)).unwrap();
            axis.write_registers(Register::TargetVelocity.address(), &encode_f32(1.0)).unwrap();
            axis.write_registers(Register::StartRequest.address(), &[1]).unwrap();
        }

        let ticker = spawn_ticker(bank.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(1_550)).await;
        ticker.shutdown().await;

        let axis = bank.axis(1).unwrap();
        let axis = axis.lock();
        assert_eq!(axis.state().actual_position, 1.0);
        assert!(!axis.state().moving);
        let ticks = axis.ticks();
        assert!((15..=17).contains(&ticks), "ran {ticks} ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let bank = EmulatorBank::new(&[1]);
        let ticker = spawn_ticker(bank.clone(), Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(10)).await;
        ticker.shutdown().await;

        let ticks = bank.axis(1).unwrap().lock().ticks();
        assert!((10..=12).contains(&ticks), "ran {ticks} ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticking() {
        let bank = EmulatorBank::new(&[1]);
        let ticker = spawn_ticker(bank.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(350)).await;
        ticker.shutdown().await;

        let before = bank.axis(1).unwrap().lock().ticks();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(bank.axis(1).unwrap().lock().ticks(), before);
        assert!(before >= 3);
    }
}
