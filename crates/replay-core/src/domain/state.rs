//! State - ReplayLoop の状態
//!
//! # 状態遷移
//! - running: staging にまだ行がある（fetch が空でない限り自己遷移）
//! - done: fetch が初めて空を返した（終端）

/// LoopState は ReplayLoop の状態を表現
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Done,
}

impl LoopState {
    /// Next state after a fetch that returned `fetched` rows.
    ///
    /// Done is terminal: nothing moves it back to Running.
    pub fn after_fetch(self, fetched: usize) -> Self {
        match self {
            LoopState::Done => LoopState::Done,
            LoopState::Running if fetched == 0 => LoopState::Done,
            LoopState::Running => LoopState::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Done)
    }
}
