#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// 无运动，窗口进入预缓冲
    Idle,
    /// 连续成功次数尚未达到确认门槛
    Probing { successes: u32 },
    /// 已确认运动，实时输出
    Active,
    /// 检测失败但仍在后缓冲宽限期内
    Draining { no_motion_ticks: u32 },
}

impl MotionState {
    pub fn new() -> Self {
        MotionState::Idle
    }

    pub fn has_motion(&self) -> bool {
        matches!(self, MotionState::Active | MotionState::Draining { .. })
    }

    pub fn consecutive_successes(&self) -> u32 {
        match self {
            MotionState::Probing { successes } => *successes,
            _ => 0,
        }
    }

    pub fn no_motion_ticks(&self) -> u32 {
        match self {
            MotionState::Draining { no_motion_ticks } => *no_motion_ticks,
            _ => 0,
        }
    }

    pub fn transition(&self, motion: bool, config: &HysteresisConfig) -> (MotionState, WindowAction) {
        match self {
            MotionState::Idle | MotionState::Probing { .. } => {
                if motion {
                    let successes = self.consecutive_successes() + 1;
                    if successes >= config.minimum_motion {
                        (MotionState::Active, WindowAction::Confirm)
                    } else {
                        (MotionState::Probing { successes }, WindowAction::Cache)
                    }
                } else if matches!(self, MotionState::Probing { .. }) {
                    (MotionState::Idle, WindowAction::Abandon)
                } else {
                    (MotionState::Idle, WindowAction::Cache)
                }
            }

            MotionState::Active | MotionState::Draining { .. } => {
                if motion {
                    (MotionState::Active, WindowAction::Emit)
                } else {
                    // 先计数再比较
                    let ticks = self.no_motion_ticks() + 1;
                    if config.within_postbuffer(ticks) {
                        (
                            MotionState::Draining {
                                no_motion_ticks: ticks,
                            },
                            WindowAction::Emit,
                        )
                    } else {
                        (MotionState::Idle, WindowAction::Stop)
                    }
                }
            }
        }
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::new()
    }
}

/// 对当前窗口要做的事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    /// 放入预缓冲
    Cache,
    /// 未确认的探测失败：放入预缓冲，触发帧保留
    Abandon,
    /// 发出 motion_start，回放预缓冲和当前窗口
    Confirm,
    /// 直接输出当前窗口
    Emit,
    /// 发出 motion_stop，当前窗口放入预缓冲
    Stop,
}

#[derive(Debug, Clone)]
pub struct HysteresisConfig {
    pub minimum_motion: u32,
    pub interval_ms: u64,
    pub postbuffer_ms: u64,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            minimum_motion: 2,
            interval_ms: 1000,
            postbuffer_ms: 4000,
        }
    }
}

impl HysteresisConfig {
    pub fn within_postbuffer(&self, no_motion_ticks: u32) -> bool {
        (no_motion_ticks as u64).saturating_mul(self.interval_ms) <= self.postbuffer_ms
    }

    /// 宽限期内还能继续输出的失败窗口数
    pub fn grace_windows(&self) -> u64 {
        self.postbuffer_ms / self.interval_ms.max(1)
    }
}

pub struct HysteresisMachine {
    state: MotionState,
    config: HysteresisConfig,
    window_counter: u64,
}

impl HysteresisMachine {
    pub fn new() -> Self {
        Self::with_config(HysteresisConfig::default())
    }

    pub fn with_config(config: HysteresisConfig) -> Self {
        Self {
            state: MotionState::Idle,
            config,
            window_counter: 0,
        }
    }

    pub fn on_window(&mut self, motion: bool) -> WindowAction {
        self.window_counter += 1;

        let (new_state, action) = self.state.transition(motion, &self.config);
        self.state = new_state;

        action
    }

    pub fn current_state(&self) -> &MotionState {
        &self.state
    }

    pub fn has_motion(&self) -> bool {
        self.state.has_motion()
    }

    pub fn config(&self) -> &HysteresisConfig {
        &self.config
    }

    pub fn window_count(&self) -> u64 {
        self.window_counter
    }

    pub fn reset(&mut self) {
        self.state = MotionState::new();
        self.window_counter = 0;
    }
}

impl Default for HysteresisMachine {
    fn default() -> Self {
        Self::new()
    }
}
