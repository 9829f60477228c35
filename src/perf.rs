use core::fmt::Write;
use std::time::{Duration, Instant};

use heapless::String;

/// The timed parts of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Step,
    Sync,
    Render,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Step => "step",
            Phase::Sync => "sync",
            Phase::Render => "render",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Per-phase timings of the latest frame plus a short HUD text.
#[derive(Debug)]
pub struct FrameStats {
    frame_count: u64,
    phases: [Duration; 3],
    text: String<128>,
    frame_start: Instant,
    last_checkpoint: Instant,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_count: 0,
            phases: [Duration::ZERO; 3],
            text: String::new(),
            frame_start: now,
            last_checkpoint: now,
        }
    }

    pub fn start_of_frame(&mut self) {
        self.frame_count += 1;
        self.phases = [Duration::ZERO; 3];
        let now = Instant::now();
        self.frame_start = now;
        self.last_checkpoint = now;
    }

    /// Attribute the time since the previous checkpoint to `phase`.
    pub fn measure(&mut self, phase: Phase) {
        let now = Instant::now();
        self.phases[phase.slot()] += now.saturating_duration_since(self.last_checkpoint);
        self.last_checkpoint = now;
    }

    /// Restart the checkpoint clock without attributing the elapsed time.
    pub fn discard(&mut self) {
        self.last_checkpoint = Instant::now();
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn phase(&self, phase: Phase) -> Duration {
        self.phases[phase.slot()]
    }

    pub fn frame_time(&self) -> Duration {
        self.last_checkpoint.saturating_duration_since(self.frame_start)
    }

    /// Format the HUD text for the frame just measured.
    pub fn finish_frame(&mut self, spheres: usize) {
        self.text.clear();
        let total_us = self.frame_time().as_micros() as u64;
        let fps = if total_us > 0 { 1_000_000 / total_us } else { 0 };

        // A full buffer truncates the HUD, which is fine.
        let _ = write!(self.text, "spheres: {}\n", spheres);
        for phase in [Phase::Step, Phase::Sync, Phase::Render] {
            let _ = write!(self.text, "{}: {}us\n", phase.label(), self.phase(phase).as_micros());
        }
        let _ = write!(self.text, "fps: {}", fps);
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_stats_creation() {
        let stats = FrameStats::default();
        assert_eq!(stats.text(), "");
        assert_eq!(stats.frame_count(), 0);
    }

    #[test]
    fn test_start_of_frame_counts_and_resets() {
        let mut stats = FrameStats::new();
        stats.start_of_frame();
        sleep(Duration::from_micros(200));
        stats.measure(Phase::Step);
        assert!(stats.phase(Phase::Step) >= Duration::from_micros(200));

        stats.start_of_frame();
        assert_eq!(stats.frame_count(), 2);
        assert_eq!(stats.phase(Phase::Step), Duration::ZERO);
    }

    #[test]
    fn test_discard_skips_time() {
        let mut stats = FrameStats::new();
        stats.start_of_frame();
        sleep(Duration::from_millis(2));
        stats.discard();
        stats.measure(Phase::Sync);
        assert!(stats.phase(Phase::Sync) < Duration::from_millis(2));
        assert!(stats.frame_time() >= Duration::from_millis(2));
    }

    #[test]
    fn test_finish_frame_text() {
        let mut stats = FrameStats::new();
        stats.start_of_frame();
        stats.measure(Phase::Step);
        stats.measure(Phase::Sync);
        stats.measure(Phase::Render);
        stats.finish_frame(7);

        let text = stats.text();
        assert!(text.starts_with("spheres: 7\n"));
        assert!(text.contains("step: "));
        assert!(text.contains("render: "));
        assert!(text.contains("fps: "));
    }
}
