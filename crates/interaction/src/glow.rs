use scene::{HotspotIndex, SceneGraph};

/// Differences below this are treated as settled.
pub const GLOW_EPSILON: f32 = 1.0e-3;

/// Moves every record's glow a fixed fraction toward its target and pushes
/// the result to the scene. Returns the number of records updated; zero
/// means nothing was animating and the scene was not touched.
pub fn step_glow(index: &mut HotspotIndex, scene: &mut dyn SceneGraph, ease: f32) -> usize {
    let animating = index
        .records()
        .iter()
        .any(|r| (r.target_glow - r.current_glow).abs() > GLOW_EPSILON);
    if !animating {
        return 0;
    }

    let ease = ease.clamp(0.0, 1.0);
    let mut updated = 0;
    for record in index.records_mut() {
        let delta = record.target_glow - record.current_glow;
        if delta.abs() <= GLOW_EPSILON {
            continue;
        }
        let next = record.current_glow + delta * ease;
        record.current_glow = if (record.target_glow - next).abs() <= GLOW_EPSILON {
            record.target_glow
        } else {
            next
        };
        scene.set_glow(record.node, record.current_glow);
        updated += 1;
    }
    updated
}
