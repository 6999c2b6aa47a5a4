use super::wheel::{self, FrameSource, WheelTimeline};
use async_trait::async_trait;
use relay_core::{CheckInConfig, CheckInStatus, Error, Result, SpinResponse, SpinResult};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Backend surface the check-in engine talks to.
#[async_trait]
pub trait CheckInApi: Send + Sync {
    async fn fetch_config(&self) -> Result<CheckInConfig>;
    async fn fetch_status(&self) -> Result<CheckInStatus>;
    async fn spin(&self) -> Result<SpinResponse>;
}

#[async_trait]
impl CheckInApi for relay_networking::ConsoleClient {
    async fn fetch_config(&self) -> Result<CheckInConfig> {
        self.get_check_in_config().await
    }

    async fn fetch_status(&self) -> Result<CheckInStatus> {
        self.get_check_in_status().await
    }

    async fn spin(&self) -> Result<SpinResponse> {
        self.spin().await
    }
}

/// Where the spin lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinPhase {
    /// Eligible to spin.
    Idle,
    /// Request in flight or wheel animating; further spins are ignored.
    Spinning,
    /// Wheel landed and the result is revealed.
    Settled,
    /// Today's check-in is already claimed.
    AlreadyDone,
}

/// What a call to [`CheckInEngine::spin`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinOutcome {
    /// Request succeeded; the result is buffered behind the animation.
    Started,
    /// Guard rejected the attempt; no request was made.
    Ignored,
    /// Server reported today already claimed; benign, no result to animate.
    AlreadyDone,
}

/// Drives one day's check-in: joins the server's spin decision with the
/// deterministic wheel animation.
///
/// The server decides the outcome the moment [`spin`](Self::spin) returns,
/// but the result stays buffered until the wheel finishes its travel in
/// [`settle`](Self::settle). Wheel rotation accumulates across spins within
/// the engine's lifetime and is never normalized.
pub struct CheckInEngine<C: CheckInApi> {
    api: C,
    phase: SpinPhase,
    config: Option<CheckInConfig>,
    status: Option<CheckInStatus>,
    rotation: f64,
    pending: Option<PendingSpin>,
    result: Option<SpinResult>,
    refresh_tx: Option<mpsc::UnboundedSender<()>>,
}

struct PendingSpin {
    result: SpinResult,
    timeline: WheelTimeline,
}

impl<C: CheckInApi> CheckInEngine<C> {
    pub fn new(api: C) -> Self {
        Self {
            api,
            phase: SpinPhase::Idle,
            config: None,
            status: None,
            rotation: 0.0,
            pending: None,
            result: None,
            refresh_tx: None,
        }
    }

    /// Wire a channel that gets a ping after every successful spin, so the
    /// owning context can refresh the cached profile and credit history.
    pub fn with_refresh_notifier(mut self, tx: mpsc::UnboundedSender<()>) -> Self {
        self.refresh_tx = Some(tx);
        self
    }

    /// Fetch wheel config and today's status concurrently.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<()> {
        let (config, status) = tokio::join!(self.api.fetch_config(), self.api.fetch_status());
        let config = config?;
        let status = status?;

        self.phase = if status.checked_in_today {
            SpinPhase::AlreadyDone
        } else {
            SpinPhase::Idle
        };
        debug!(
            segments = config.reward_options.len(),
            checked_in = status.checked_in_today,
            "Check-in state loaded"
        );
        self.config = Some(config);
        self.status = Some(status);
        Ok(())
    }

    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    pub fn config(&self) -> Option<&CheckInConfig> {
        self.config.as_ref()
    }

    pub fn status(&self) -> Option<&CheckInStatus> {
        self.status.as_ref()
    }

    /// Accumulated wheel rotation in degrees.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// The revealed result of the last settled spin.
    pub fn result(&self) -> Option<&SpinResult> {
        self.result.as_ref()
    }

    /// Attempt today's spin.
    ///
    /// A no-op unless the engine is idle: repeated triggers while a spin is
    /// in flight, animating, or after today's claim issue no request. The
    /// server reporting the day already claimed is not an error; it flips
    /// the phase to [`SpinPhase::AlreadyDone`]. Any other failure returns
    /// the engine to idle so the user can retry.
    #[instrument(skip(self))]
    pub async fn spin(&mut self) -> Result<SpinOutcome> {
        if self.phase != SpinPhase::Idle {
            debug!(phase = ?self.phase, "Spin ignored");
            return Ok(SpinOutcome::Ignored);
        }
        let segments = self
            .config
            .as_ref()
            .map(|c| c.reward_options.len())
            .unwrap_or(0);
        if segments == 0 {
            debug!("Spin ignored: no reward options loaded");
            return Ok(SpinOutcome::Ignored);
        }

        self.phase = SpinPhase::Spinning;
        self.result = None;

        match self.api.spin().await {
            Ok(resp) => {
                let timeline = match WheelTimeline::new(self.rotation, segments, resp.reward.wheel_index)
                {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("Server returned unusable wheel index: {}", e);
                        self.phase = SpinPhase::Idle;
                        return Err(e);
                    }
                };
                self.apply_spin(&resp);
                self.pending = Some(PendingSpin {
                    result: resp.reward,
                    timeline,
                });
                if let Some(tx) = &self.refresh_tx {
                    let _ = tx.send(());
                }
                Ok(SpinOutcome::Started)
            }
            Err(Error::AlreadyCheckedIn) => {
                debug!("Server reports today already claimed");
                self.phase = SpinPhase::AlreadyDone;
                if let Some(status) = self.status.as_mut() {
                    status.checked_in_today = true;
                }
                Ok(SpinOutcome::AlreadyDone)
            }
            Err(e) => {
                self.phase = SpinPhase::Idle;
                Err(e)
            }
        }
    }

    /// Fold the server's response into the cached status immediately; the
    /// reveal of the reward itself waits for the animation.
    fn apply_spin(&mut self, resp: &SpinResponse) {
        let status = self.status.get_or_insert_with(CheckInStatus::default);
        status.checked_in_today = true;
        status.today_reward = Some(resp.reward.final_credits);
        status.streak = resp.streak;
        status.credits = resp.credits;
        status.recent_logs = resp.recent_logs.clone();
    }

    /// Run the buffered spin's animation to completion against `frames`.
    ///
    /// Returns the revealed result once the wheel lands, or `None` if there
    /// is nothing buffered or the frame source stops early. An interrupted
    /// animation keeps the result buffered; a later call with a fresh source
    /// resumes from the same timeline.
    pub async fn settle<F: FrameSource>(
        &mut self,
        frames: &mut F,
        mut on_frame: impl FnMut(f64) + Send,
    ) -> Option<SpinResult> {
        let timeline = self.pending.as_ref()?.timeline.clone();

        let mut last = self.rotation;
        let landed = wheel::run(&timeline, frames, |r| {
            last = r;
            on_frame(r);
        })
        .await;
        self.rotation = last;

        match landed {
            Some(final_rotation) => {
                self.rotation = final_rotation;
                let pending = self.pending.take()?;
                self.phase = SpinPhase::Settled;
                self.result = Some(pending.result.clone());
                Some(pending.result)
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::wheel::ManualFrames;
    use relay_core::RewardOption;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockApi {
        spin_calls: AtomicUsize,
        spin_responses: Mutex<Vec<Result<SpinResponse>>>,
        status: CheckInStatus,
        config: CheckInConfig,
    }

    impl MockApi {
        fn new(options: Vec<RewardOption>) -> Self {
            Self {
                spin_calls: AtomicUsize::new(0),
                spin_responses: Mutex::new(Vec::new()),
                status: CheckInStatus::default(),
                config: CheckInConfig {
                    reward_options: options,
                    ..CheckInConfig::default()
                },
            }
        }

        fn push_spin(self, result: Result<SpinResponse>) -> Self {
            self.spin_responses.lock().unwrap().push(result);
            self
        }

        fn calls(&self) -> usize {
            self.spin_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CheckInApi for MockApi {
        async fn fetch_config(&self) -> Result<CheckInConfig> {
            Ok(self.config.clone())
        }

        async fn fetch_status(&self) -> Result<CheckInStatus> {
            Ok(self.status.clone())
        }

        async fn spin(&self) -> Result<SpinResponse> {
            self.spin_calls.fetch_add(1, Ordering::SeqCst);
            self.spin_responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(Error::ApiError("no scripted response".into())))
        }
    }

    fn two_options() -> Vec<RewardOption> {
        vec![
            RewardOption {
                id: 1,
                label: "10".into(),
                credits: 10,
                color: None,
                probability_weight: 70,
            },
            RewardOption {
                id: 2,
                label: "50".into(),
                credits: 50,
                color: Some("#f59e0b".into()),
                probability_weight: 30,
            },
        ]
    }

    fn winning_response() -> SpinResponse {
        SpinResponse {
            reward: SpinResult {
                wheel_index: 1,
                label: "50".into(),
                base_credits: 50,
                multiplier_percent: 85,
                final_credits: 43,
                color: Some("#f59e0b".into()),
            },
            streak: 4,
            credits: 143,
            recent_logs: Vec::new(),
        }
    }

    async fn loaded_engine(api: MockApi) -> CheckInEngine<MockApi> {
        let mut engine = CheckInEngine::new(api);
        engine.load().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn double_trigger_issues_one_request() {
        let api = MockApi::new(two_options()).push_spin(Ok(winning_response()));
        let mut engine = loaded_engine(api).await;

        assert_eq!(engine.spin().await.unwrap(), SpinOutcome::Started);
        assert_eq!(engine.phase(), SpinPhase::Spinning);
        assert_eq!(engine.spin().await.unwrap(), SpinOutcome::Ignored);
        assert_eq!(engine.api.calls(), 1);
    }

    #[tokio::test]
    async fn no_request_when_already_checked_in_today() {
        let mut api = MockApi::new(two_options());
        api.status.checked_in_today = true;
        let mut engine = loaded_engine(api).await;

        assert_eq!(engine.phase(), SpinPhase::AlreadyDone);
        assert_eq!(engine.spin().await.unwrap(), SpinOutcome::Ignored);
        assert_eq!(engine.api.calls(), 0);
    }

    #[tokio::test]
    async fn server_already_claimed_is_benign() {
        let api = MockApi::new(two_options()).push_spin(Err(Error::AlreadyCheckedIn));
        let mut engine = loaded_engine(api).await;

        assert_eq!(engine.spin().await.unwrap(), SpinOutcome::AlreadyDone);
        assert_eq!(engine.phase(), SpinPhase::AlreadyDone);
        assert!(engine.status().unwrap().checked_in_today);
    }

    #[tokio::test]
    async fn failed_spin_returns_to_idle_and_can_retry() {
        let api = MockApi::new(two_options())
            .push_spin(Ok(winning_response()))
            .push_spin(Err(Error::NetworkError("connection reset".into())));
        let mut engine = loaded_engine(api).await;

        assert!(engine.spin().await.is_err());
        assert_eq!(engine.phase(), SpinPhase::Idle);

        assert_eq!(engine.spin().await.unwrap(), SpinOutcome::Started);
        assert_eq!(engine.api.calls(), 2);
    }

    #[tokio::test]
    async fn result_hidden_until_wheel_lands() {
        let api = MockApi::new(two_options()).push_spin(Ok(winning_response()));
        let mut engine = loaded_engine(api).await;
        engine.spin().await.unwrap();

        // Frames stop short of the 4s duration: no reveal.
        let mut early = ManualFrames::from_millis([0, 1000, 2000]);
        assert!(engine.settle(&mut early, |_| {}).await.is_none());
        assert_eq!(engine.phase(), SpinPhase::Spinning);
        assert!(engine.result().is_none());

        // Resume with frames that reach the end.
        let mut rest = ManualFrames::from_millis([3000, 4000]);
        let result = engine.settle(&mut rest, |_| {}).await.unwrap();
        assert_eq!(result.label, "50");
        assert_eq!(engine.phase(), SpinPhase::Settled);
        assert_eq!(engine.result().unwrap().final_credits, 43);
    }

    #[tokio::test]
    async fn status_updates_before_reveal() {
        let api = MockApi::new(two_options()).push_spin(Ok(winning_response()));
        let mut engine = loaded_engine(api).await;
        engine.spin().await.unwrap();

        let status = engine.status().unwrap();
        assert!(status.checked_in_today);
        assert_eq!(status.today_reward, Some(43));
        assert_eq!(status.streak, 4);
        assert_eq!(status.credits, 143);
        assert!(engine.result().is_none());
    }

    #[tokio::test]
    async fn wheel_lands_on_winning_segment() {
        let api = MockApi::new(two_options()).push_spin(Ok(winning_response()));
        let mut engine = loaded_engine(api).await;
        engine.spin().await.unwrap();

        let mut frames = ManualFrames::from_millis([0, 1000, 2000, 3000, 4000]);
        engine.settle(&mut frames, |_| {}).await.unwrap();

        // Two segments, index 1: center sits at 360 - 180 - 90 = 90 degrees.
        let landed = engine.rotation().rem_euclid(360.0);
        assert!((landed - 90.0).abs() < 1e-9, "landed at {}", landed);
        assert!(engine.rotation() >= 5.0 * 360.0);
    }

    #[tokio::test]
    async fn second_spin_accumulates_rotation() {
        let api = MockApi::new(two_options())
            .push_spin(Ok(winning_response()))
            .push_spin(Ok(winning_response()));
        let mut engine = loaded_engine(api).await;

        engine.spin().await.unwrap();
        let mut frames = ManualFrames::from_millis([4000]);
        engine.settle(&mut frames, |_| {}).await.unwrap();
        let first = engine.rotation();

        // New day within the same session.
        engine.phase = SpinPhase::Idle;
        engine.spin().await.unwrap();
        let mut frames = ManualFrames::from_millis([4000]);
        engine.settle(&mut frames, |_| {}).await.unwrap();

        assert!(engine.rotation() > first);
        assert!((engine.rotation().rem_euclid(360.0) - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn successful_spin_pings_refresh_channel() {
        let api = MockApi::new(two_options()).push_spin(Ok(winning_response()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = CheckInEngine::new(api).with_refresh_notifier(tx);
        engine.load().await.unwrap();

        engine.spin().await.unwrap();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
