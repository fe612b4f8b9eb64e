//! Input sources behind the keyboard seam

use super::RawInput;

/// Supplies key state once per sampling tick
pub trait InputSource: Send {
    fn sample(&mut self) -> RawInput;
}

/// Never presses anything
#[derive(Debug, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn sample(&mut self) -> RawInput {
        RawInput::default()
    }
}

/// Replays a fixed script, then idles (or loops)
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: std::collections::VecDeque<RawInput>,
    replay: Vec<RawInput>,
    looping: bool,
}

#[cfg(test)]
impl ScriptedInput {
    pub fn new(script: Vec<RawInput>) -> Self {
        Self {
            script: script.iter().copied().collect(),
            replay: script,
            looping: false,
        }
    }

    /// Start over from the top once the script runs out
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Hold `input` for `ticks` samples
    pub fn hold(mut self, input: RawInput, ticks: usize) -> Self {
        for _ in 0..ticks {
            self.script.push_back(input);
            self.replay.push(input);
        }
        self
    }
}

#[cfg(test)]
impl InputSource for ScriptedInput {
    fn sample(&mut self) -> RawInput {
        if self.script.is_empty() && self.looping {
            self.script.extend(self.replay.iter().copied());
        }
        self.script.pop_front().unwrap_or_default()
    }
}
