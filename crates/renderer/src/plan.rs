//! Pure per-frame pass planning.
//!
//! `plan_frame` turns the animation snapshot plus the host's rectangle list
//! into an ordered list of [`FrameStep`]s, without touching the GPU. The
//! executor in `gpu::state` encodes the steps verbatim, so everything about
//! pass selection, ordering, the stencil subset rule, and scissor arithmetic
//! is testable without a device.

use crate::animation::MAX_LOD;
use crate::DrawnRect;

/// Fixed tier table of the seven-target blur cascade for a `width` x `height`
/// surface, in pass order: half, half, quarter, quarter, half, half, full.
pub(crate) fn cascade_tiers(width: u32, height: u32) -> [(u32, u32); 7] {
    [
        (width / 2, height / 2),
        (width / 2, height / 2),
        (width / 4, height / 4),
        (width / 4, height / 4),
        (width / 2, height / 2),
        (width / 2, height / 2),
        (width, height),
    ]
}

/// Immutable view of both animation machines taken after this frame's ticks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameSnapshot {
    pub lod: f32,
    pub enabled: bool,
    pub animating: bool,
    pub contrast_mix: f32,
    pub contrast_color: Option<[f32; 3]>,
}

/// Scissor rectangle in framebuffer pixels with a bottom-left origin (the
/// convention of the incoming rect coordinates). The executor converts to the
/// backend's top-left origin when recording the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    /// Y offset with a top-left origin, for backends that count from the top.
    pub fn top_origin_y(&self, surface_height: u32) -> u32 {
        surface_height.saturating_sub(self.y + self.height)
    }
}

/// One drawing step of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FrameStep {
    /// Single sharp draw of the input texture across the full viewport,
    /// corner radius zero, no stencil interaction.
    Passthrough,
    /// The seven-target separable blur cascade, finishing on the visible
    /// surface. `masked` restricts the final pass to stencil == 1 and is the
    /// only mode that ever carries a non-zero contrast mix.
    Cascade {
        lod: f32,
        contrast_mix: f32,
        contrast_color: [f32; 3],
        masked: bool,
    },
    /// Sharp rounded-rectangle draw of the input texture, scissored to the
    /// rectangle and marking stencil == 1 underneath it.
    RectCarve {
        rect: DrawnRect,
        scissor: ScissorRect,
    },
}

/// Plans the complete pass sequence for one frame.
///
/// Base layer first (blurred cascade while blur is enabled or mid-animation,
/// plain passthrough otherwise), then the rectangle overlay: every carved
/// rectangle is stencilled and a single masked cascade at [`MAX_LOD`]
/// re-composites on top. When the base layer is already fully blurred only the
/// first `secondary_rect_count` rectangles are carved; the rest stay at the
/// base blur instead of being re-emphasized.
pub(crate) fn plan_frame(
    snapshot: &FrameSnapshot,
    rects: &[DrawnRect],
    secondary_rect_count: usize,
    surface: (u32, u32),
) -> Vec<FrameStep> {
    let mut steps = Vec::with_capacity(rects.len() + 2);

    if snapshot.enabled || snapshot.animating {
        steps.push(FrameStep::Cascade {
            lod: snapshot.lod,
            contrast_mix: 0.0,
            contrast_color: [0.0; 3],
            masked: false,
        });
    } else {
        steps.push(FrameStep::Passthrough);
    }

    let steady_blurred = snapshot.enabled && !snapshot.animating;
    let carved = if steady_blurred {
        &rects[..secondary_rect_count.min(rects.len())]
    } else {
        rects
    };

    let mut any_carved = false;
    for rect in carved {
        let Some(scissor) = scissor_for(rect, surface) else {
            continue;
        };
        any_carved = true;
        steps.push(FrameStep::RectCarve {
            rect: *rect,
            scissor,
        });
    }

    if any_carved {
        steps.push(FrameStep::Cascade {
            lod: MAX_LOD,
            contrast_mix: snapshot
                .contrast_color
                .map_or(0.0, |_| snapshot.contrast_mix),
            contrast_color: snapshot.contrast_color.unwrap_or([0.0; 3]),
            masked: true,
        });
    }

    steps
}

/// Maps a rectangle given as (left, top, width, height) in surface pixels to
/// a bottom-left-origin scissor rect clamped to the surface, or `None` when
/// nothing of it is on screen.
fn scissor_for(rect: &DrawnRect, surface: (u32, u32)) -> Option<ScissorRect> {
    let (surface_w, surface_h) = (surface.0 as f32, surface.1 as f32);
    let left = rect.left.max(0.0);
    let right = (rect.left + rect.width).min(surface_w);
    let top = rect.top.max(0.0);
    let bottom = (rect.top + rect.height).min(surface_h);
    if right <= left || bottom <= top {
        return None;
    }
    Some(ScissorRect {
        x: left as u32,
        y: (surface_h - bottom) as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{MAX_CONTRAST_MIX, MIN_LOD};

    fn sharp_snapshot() -> FrameSnapshot {
        FrameSnapshot {
            lod: MIN_LOD,
            enabled: false,
            animating: false,
            contrast_mix: MAX_CONTRAST_MIX,
            contrast_color: Some([1.0, 0.5, 0.0]),
        }
    }

    fn blurred_snapshot() -> FrameSnapshot {
        FrameSnapshot {
            lod: MAX_LOD,
            enabled: true,
            animating: false,
            contrast_mix: 0.0,
            contrast_color: Some([1.0, 0.5, 0.0]),
        }
    }

    fn rect(left: f32, top: f32, width: f32, height: f32) -> DrawnRect {
        DrawnRect {
            left,
            top,
            width,
            height,
            corner_radius: 10.0,
        }
    }

    #[test]
    fn cascade_tiers_match_the_fixed_table() {
        assert_eq!(
            cascade_tiers(1920, 1080),
            [
                (960, 540),
                (960, 540),
                (480, 270),
                (480, 270),
                (960, 540),
                (960, 540),
                (1920, 1080),
            ]
        );
    }

    #[test]
    fn disabled_blur_without_rects_is_a_single_passthrough() {
        let steps = plan_frame(&sharp_snapshot(), &[], 0, (1000, 800));
        assert_eq!(steps, vec![FrameStep::Passthrough]);
    }

    #[test]
    fn rect_overlay_scissors_with_a_bottom_left_origin() {
        let steps = plan_frame(&sharp_snapshot(), &[rect(100.0, 50.0, 200.0, 80.0)], 0, (1000, 800));
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], FrameStep::Passthrough);
        match steps[1] {
            FrameStep::RectCarve { scissor, .. } => {
                assert_eq!(
                    scissor,
                    ScissorRect {
                        x: 100,
                        y: 670,
                        width: 200,
                        height: 80,
                    }
                );
                assert_eq!(scissor.top_origin_y(800), 50);
            }
            ref other => panic!("expected a rect carve, got {other:?}"),
        }
        match steps[2] {
            FrameStep::Cascade {
                lod,
                contrast_mix,
                masked,
                ..
            } => {
                assert_eq!(lod, MAX_LOD);
                assert_eq!(contrast_mix, MAX_CONTRAST_MIX);
                assert!(masked);
            }
            ref other => panic!("expected a masked cascade, got {other:?}"),
        }
    }

    #[test]
    fn steady_blur_carves_only_the_secondary_rects() {
        let rects = [
            rect(0.0, 0.0, 50.0, 50.0),
            rect(100.0, 0.0, 50.0, 50.0),
            rect(200.0, 0.0, 50.0, 50.0),
        ];
        let steps = plan_frame(&blurred_snapshot(), &rects, 1, (1000, 800));
        let carves = steps
            .iter()
            .filter(|step| matches!(step, FrameStep::RectCarve { .. }))
            .count();
        assert_eq!(carves, 1);
        assert!(matches!(
            steps[0],
            FrameStep::Cascade { masked: false, .. }
        ));
        assert!(matches!(
            steps.last(),
            Some(FrameStep::Cascade { masked: true, .. })
        ));
    }

    #[test]
    fn animating_blur_carves_every_rect() {
        let snapshot = FrameSnapshot {
            lod: 0.0,
            enabled: true,
            animating: true,
            contrast_mix: MAX_CONTRAST_MIX / 2.0,
            contrast_color: Some([0.0, 1.0, 0.0]),
        };
        let rects = [rect(0.0, 0.0, 50.0, 50.0), rect(100.0, 0.0, 50.0, 50.0)];
        let steps = plan_frame(&snapshot, &rects, 1, (1000, 800));
        let carves = steps
            .iter()
            .filter(|step| matches!(step, FrameStep::RectCarve { .. }))
            .count();
        assert_eq!(carves, 2);
    }

    #[test]
    fn unset_contrast_color_disables_the_tint() {
        let snapshot = FrameSnapshot {
            contrast_color: None,
            ..sharp_snapshot()
        };
        let steps = plan_frame(&snapshot, &[rect(10.0, 10.0, 20.0, 20.0)], 0, (100, 100));
        match steps.last() {
            Some(FrameStep::Cascade { contrast_mix, .. }) => assert_eq!(*contrast_mix, 0.0),
            other => panic!("expected a masked cascade, got {other:?}"),
        }
    }

    #[test]
    fn offscreen_rects_are_dropped_and_partials_clamped() {
        let steps = plan_frame(
            &sharp_snapshot(),
            &[rect(-500.0, 0.0, 100.0, 100.0), rect(950.0, 750.0, 200.0, 200.0)],
            0,
            (1000, 800),
        );
        let scissors: Vec<_> = steps
            .iter()
            .filter_map(|step| match step {
                FrameStep::RectCarve { scissor, .. } => Some(*scissor),
                _ => None,
            })
            .collect();
        assert_eq!(
            scissors,
            vec![ScissorRect {
                x: 950,
                y: 0,
                width: 50,
                height: 50,
            }]
        );
    }
}
