use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir.scale(t)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    /// Index of the candidate that was hit.
    pub index: usize,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
        }
    }
}

/// Deterministic nearest-hit picking over a candidate set.
///
/// Ordering contract:
/// - The closest hit along the (normalized) ray wins.
/// - If multiple candidates are hit at the same distance, the lower index wins.
///
/// Candidates without bounds are never hit.
pub fn pick_nearest<I>(ray: Ray, candidates: I, opts: PickOptions) -> Option<PickHit>
where
    I: IntoIterator<Item = (usize, Option<Aabb3>)>,
{
    let dir = ray.dir.normalized()?;
    let origin = ray.origin.to_array();
    let dir_a = dir.to_array();

    let mut best: Option<(f64, usize)> = None;
    for (index, bounds) in candidates {
        let Some(bounds) = bounds else {
            continue;
        };
        if bounds.is_empty() {
            continue;
        }
        let Some(t) = ray_aabb_hit_t(origin, dir_a, &bounds, 0.0, opts.max_distance) else {
            continue;
        };
        best = match best {
            None => Some((t, index)),
            Some((bt, bi)) => {
                let ord = stable_total_cmp_f64(t, bt).then_with(|| index.cmp(&bi));
                if ord.is_lt() { Some((t, index)) } else { Some((bt, bi)) }
            }
        };
    }

    let (t, index) = best?;
    Some(PickHit {
        index,
        distance: t,
        point: Ray::new(ray.origin, dir).at(t),
    })
}

fn ray_aabb_hit_t(
    origin: [f64; 3],
    dir: [f64; 3],
    bounds: &Aabb3,
    mut t_min: f64,
    mut t_max: f64,
) -> Option<f64> {
    // Slabs intersection; returns entry distance.
    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let (min, max) = (bounds.min[axis], bounds.max[axis]);

        if d.abs() < 1e-12 {
            if o < min || o > max {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min - o) * inv;
        let mut t2 = (max - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_max < t_min {
            return None;
        }
    }

    Some(t_min.max(0.0))
}
