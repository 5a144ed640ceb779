//! 尾沿去抖
//!
//! 剪贴板在一次复制里可能连续触发多次变化通知。每次 `notify` 都把截止时间
//! 推后 `delay`，只有安静 `delay` 之后回调才在后台线程执行一次。
//! 同一时刻最多只有一个尾沿线程，它睡到截止时间后再检查一次，被推后就继续等。

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(100);

type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Debug, Default)]
struct DebounceState {
    deadline: Option<Instant>,
    tail_worker_running: bool,
}

/// 尾沿线程醒来后的决定
#[derive(Debug, PartialEq, Eq)]
enum TailDecision {
    Fire,
    Wait(Duration),
    Exit,
}

fn decide_tail_action(deadline: Option<Instant>, now: Instant) -> TailDecision {
    match deadline {
        None => TailDecision::Exit,
        Some(deadline) if deadline > now => TailDecision::Wait(deadline - now),
        Some(_) => TailDecision::Fire,
    }
}

fn lock_state(state: &Mutex<DebounceState>) -> MutexGuard<'_, DebounceState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("去抖状态锁中毒，继续使用恢复数据");
            poisoned.into_inner()
        }
    }
}

#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    state: Arc<Mutex<DebounceState>>,
    callback: Callback,
}

impl Debouncer {
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            delay,
            state: Arc::new(Mutex::new(DebounceState::default())),
            callback: Arc::new(callback),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 记录一次变化，重新计时
    pub fn notify(&self) {
        let start_worker = {
            let mut state = lock_state(&self.state);
            state.deadline = Some(Instant::now() + self.delay);
            let start = !state.tail_worker_running;
            state.tail_worker_running = true;
            start
        };
        if start_worker {
            self.spawn_tail_worker();
        } else {
            log::trace!("去抖：截止时间已推后 {}ms", self.delay.as_millis());
        }
    }

    /// 取消尚未触发的回调
    pub fn cancel(&self) {
        lock_state(&self.state).deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        lock_state(&self.state).deadline.is_some()
    }

    fn spawn_tail_worker(&self) {
        let state = Arc::clone(&self.state);
        let callback = Arc::clone(&self.callback);
        let mut wait_for = self.delay;

        thread::spawn(move || loop {
            thread::sleep(wait_for);

            let decision = {
                let mut state = lock_state(&state);
                let decision = decide_tail_action(state.deadline, Instant::now());
                if !matches!(decision, TailDecision::Wait(_)) {
                    state.deadline = None;
                    state.tail_worker_running = false;
                }
                decision
            };

            match decision {
                TailDecision::Wait(remaining) => wait_for = remaining,
                TailDecision::Fire => {
                    callback();
                    break;
                }
                TailDecision::Exit => break,
            }
        });
    }
}
