//! Frame-driven animation state machines.
//!
//! Both machines advance exactly once per rendered frame: the orchestrator
//! calls `tick()` only while `is_animating()` holds, so the counters can never
//! run past their terminal bounds. Neither machine knows about wall-clock
//! time; the host's frame pacing is the clock.

/// Sharpest mip/LOD bias the blur shaders accept. At or below this value the
/// shaders sample directly instead of running the Gaussian kernel.
pub const MIN_LOD: f32 = -3.0;
/// Blurriest LOD. The kernel step grows as `exp2(lod)`, so each LOD unit
/// doubles the effective blur radius.
pub const MAX_LOD: f32 = 3.0;
/// Frame budget for a full sharp <-> blurred transition.
pub const LOD_ANIMATION_FRAMES: i32 = 30;
/// Strongest contrast tint ever applied to punched-through rectangles.
pub const MAX_CONTRAST_MIX: f32 = 0.5;

const LOD_INCREMENT: f32 = (MAX_LOD - MIN_LOD) / LOD_ANIMATION_FRAMES as f32;
const CONTRAST_MIX_INCREMENT: f32 = MAX_CONTRAST_MIX / LOD_ANIMATION_FRAMES as f32;

/// Frame budget for a contrast-color transition.
pub const CONTRAST_COLOR_FRAMES: i32 = 60;

/// Level-of-detail animation for the blur cascade, with a coupled contrast-mix
/// scalar that moves in the opposite direction over the same frame budget:
/// a fully sharp base layer gets the strongest rectangle tint, a fully blurred
/// one gets none.
///
/// `frame == -1` is the fully-sharp terminal state, `frame ==
/// LOD_ANIMATION_FRAMES` the fully-blurred one; anything in between means a
/// transition is in flight.
#[derive(Debug, Clone, Copy)]
pub struct BlurAnimation {
    lod: f32,
    contrast_mix: f32,
    frame: i32,
    enabled: bool,
}

impl BlurAnimation {
    pub fn new() -> Self {
        Self {
            lod: MIN_LOD,
            contrast_mix: MAX_CONTRAST_MIX,
            frame: -1,
            enabled: false,
        }
    }

    pub fn lod(&self) -> f32 {
        self.lod
    }

    pub fn contrast_mix(&self) -> f32 {
        self.contrast_mix
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_animating(&self) -> bool {
        self.frame > -1 && self.frame < LOD_ANIMATION_FRAMES
    }

    /// Requests the blurred or sharp state. Animated requests leave a terminal
    /// state by one frame so the per-frame `tick` takes over; snapped requests
    /// jump straight to the opposite terminal. Calling mid-animation only
    /// flips the direction: the next ticks walk the LOD back the way it came.
    pub fn set_enabled(&mut self, enabled: bool, animated: bool) {
        self.enabled = enabled;
        if enabled && self.frame == -1 {
            if animated {
                self.frame = 0;
            } else {
                self.frame = LOD_ANIMATION_FRAMES;
                self.lod = MAX_LOD;
                self.contrast_mix = 0.0;
            }
        } else if !enabled && self.frame == LOD_ANIMATION_FRAMES {
            if animated {
                self.frame = LOD_ANIMATION_FRAMES - 1;
            } else {
                self.frame = -1;
                self.lod = MIN_LOD;
                self.contrast_mix = MAX_CONTRAST_MIX;
            }
        }
    }

    /// Advances one animation frame. Callers must check `is_animating` first.
    pub fn tick(&mut self) {
        debug_assert!(self.is_animating());
        if self.enabled {
            self.lod = (self.lod + LOD_INCREMENT).min(MAX_LOD);
            self.contrast_mix = (self.contrast_mix - CONTRAST_MIX_INCREMENT).max(0.0);
            self.frame += 1;
        } else {
            self.lod = (self.lod - LOD_INCREMENT).max(MIN_LOD);
            self.contrast_mix = (self.contrast_mix + CONTRAST_MIX_INCREMENT).min(MAX_CONTRAST_MIX);
            self.frame -= 1;
        }
    }
}

impl Default for BlurAnimation {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear interpolation of the contrasting tint color toward a target over
/// [`CONTRAST_COLOR_FRAMES`] frames.
///
/// The very first assignment snaps `current = target` with no animation.
/// Later assignments redirect the trajectory mid-flight: the counter restarts
/// at zero while `current` keeps whatever value it had reached, and the
/// remaining-fraction step guarantees exact convergence on the final tick.
#[derive(Debug, Clone, Copy)]
pub struct ContrastColorAnimation {
    track: Option<ColorTrack>,
    frame: i32,
}

#[derive(Debug, Clone, Copy)]
struct ColorTrack {
    current: [f32; 3],
    target: [f32; 3],
}

impl ContrastColorAnimation {
    pub fn new() -> Self {
        Self {
            track: None,
            frame: CONTRAST_COLOR_FRAMES,
        }
    }

    /// The color to feed the tint uniform this frame, or `None` if no color
    /// has ever been assigned.
    pub fn current(&self) -> Option<[f32; 3]> {
        self.track.map(|track| track.current)
    }

    pub fn is_animating(&self) -> bool {
        self.track.is_some() && self.frame < CONTRAST_COLOR_FRAMES
    }

    pub fn set_target(&mut self, color: [f32; 3]) {
        match self.track.as_mut() {
            None => {
                self.track = Some(ColorTrack {
                    current: color,
                    target: color,
                });
                self.frame = CONTRAST_COLOR_FRAMES;
            }
            Some(track) => {
                track.target = color;
                self.frame = 0;
            }
        }
    }

    /// Advances one animation frame. Callers must check `is_animating` first.
    pub fn tick(&mut self) {
        debug_assert!(self.is_animating());
        let Some(track) = self.track.as_mut() else {
            return;
        };
        if self.frame + 1 >= CONTRAST_COLOR_FRAMES {
            // Final tick: assign outright so float rounding cannot leave the
            // color short of the target.
            track.current = track.target;
        } else {
            let fraction = (self.frame + 1) as f32 / CONTRAST_COLOR_FRAMES as f32;
            for (current, target) in track.current.iter_mut().zip(track.target.iter()) {
                *current += (target - *current) * fraction;
            }
        }
        self.frame += 1;
    }
}

impl Default for ContrastColorAnimation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lod_is_monotonic_and_bounded_while_blurring_in() {
        let mut blur = BlurAnimation::new();
        blur.set_enabled(true, true);
        let mut last = blur.lod();
        while blur.is_animating() {
            blur.tick();
            assert!(blur.lod() >= last);
            assert!(blur.lod() <= MAX_LOD);
            last = blur.lod();
        }
        assert!((blur.lod() - MAX_LOD).abs() < 1e-5);
    }

    #[test]
    fn lod_is_monotonic_and_bounded_while_blurring_out() {
        let mut blur = BlurAnimation::new();
        blur.set_enabled(true, false);
        blur.set_enabled(false, true);
        let mut last = blur.lod();
        while blur.is_animating() {
            blur.tick();
            assert!(blur.lod() <= last);
            assert!(blur.lod() >= MIN_LOD);
            last = blur.lod();
        }
        assert!((blur.lod() - MIN_LOD).abs() < 1e-5);
    }

    #[test]
    fn snap_enable_is_idempotent_in_terminal_state() {
        let mut blur = BlurAnimation::new();
        blur.set_enabled(true, false);
        assert!(!blur.is_animating());
        let lod = blur.lod();
        blur.set_enabled(true, false);
        assert_eq!(blur.lod(), lod);
        assert_eq!(blur.lod(), MAX_LOD);
        assert!(!blur.is_animating());
    }

    #[test]
    fn animated_enable_converges_after_frame_budget() {
        let mut blur = BlurAnimation::new();
        blur.set_enabled(true, true);
        for _ in 0..LOD_ANIMATION_FRAMES - 1 {
            assert!(blur.is_animating());
            blur.tick();
        }
        assert!(blur.is_animating());
        blur.tick();
        assert!(!blur.is_animating());
        assert!(MAX_LOD - blur.lod() < (MAX_LOD - MIN_LOD) / LOD_ANIMATION_FRAMES as f32 + 1e-5);
    }

    #[test]
    fn contrast_mix_counter_animates_against_the_lod() {
        let mut blur = BlurAnimation::new();
        assert_eq!(blur.contrast_mix(), MAX_CONTRAST_MIX);
        blur.set_enabled(true, true);
        while blur.is_animating() {
            blur.tick();
        }
        assert!(blur.contrast_mix().abs() < 1e-5);
        blur.set_enabled(false, true);
        while blur.is_animating() {
            blur.tick();
        }
        assert!((blur.contrast_mix() - MAX_CONTRAST_MIX).abs() < 1e-5);
    }

    #[test]
    fn mid_flight_reversal_walks_the_lod_back() {
        let mut blur = BlurAnimation::new();
        blur.set_enabled(true, true);
        for _ in 0..5 {
            blur.tick();
        }
        let reached = blur.lod();
        blur.set_enabled(false, true);
        blur.tick();
        assert!(blur.lod() < reached);
        while blur.is_animating() {
            blur.tick();
        }
        assert!((blur.lod() - MIN_LOD).abs() < 1e-5);
    }

    #[test]
    fn first_color_assignment_snaps_without_animating() {
        let mut contrast = ContrastColorAnimation::new();
        assert_eq!(contrast.current(), None);
        contrast.set_target([0.2, 0.4, 0.6]);
        assert_eq!(contrast.current(), Some([0.2, 0.4, 0.6]));
        assert!(!contrast.is_animating());
    }

    #[test]
    fn retriggered_color_continues_from_current_and_converges_exactly() {
        let mut contrast = ContrastColorAnimation::new();
        contrast.set_target([0.0, 0.0, 0.0]);
        contrast.set_target([1.0, 0.0, 0.0]);
        for _ in 0..5 {
            contrast.tick();
        }
        let reached = contrast.current().unwrap();
        assert!(reached[0] > 0.0 && reached[0] < 1.0);

        contrast.set_target([0.0, 0.0, 1.0]);
        assert!(contrast.is_animating());
        assert_eq!(contrast.current(), Some(reached));
        for _ in 0..CONTRAST_COLOR_FRAMES {
            contrast.tick();
        }
        assert!(!contrast.is_animating());
        assert_eq!(contrast.current(), Some([0.0, 0.0, 1.0]));
    }
}
