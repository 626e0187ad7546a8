use derive_more::Deref;
use derive_more::DerefMut;
use derive_more::From;
use derive_more::Into;
use glam::DVec3;

use crate::extent::Extent;

/// The box size of the simulation. Periodic boundary conditions apply
/// beyond this box, meaning that the positions of particles outside
/// of this box are wrapped back into it and all pair distances are
/// minimum-image distances.
#[derive(From, Into, Deref, DerefMut, Debug, Clone)]
pub struct SimulationBox(Extent);

fn periodic_wrap_component(v: f64, min: f64, max: f64) -> f64 {
    (v - min).rem_euclid(max - min) + min
}

fn minimize_component(v: f64, length: f64) -> f64 {
    if v < 0.0 {
        if v.abs() < (v + length).abs() {
            v
        } else {
            v + length
        }
    } else if v.abs() < (v - length).abs() {
        v
    } else {
        v - length
    }
}

impl SimulationBox {
    pub fn new(extent: Extent) -> Self {
        Self(extent)
    }

    pub fn cube_from_side_length(side_length: f64) -> Self {
        Self(Extent::cube_from_side_length(side_length))
    }

    pub fn periodic_wrap(&self, mut pos: DVec3) -> DVec3 {
        pos.x = periodic_wrap_component(pos.x, self.min.x, self.max.x);
        pos.y = periodic_wrap_component(pos.y, self.min.y, self.max.y);
        pos.z = periodic_wrap_component(pos.z, self.min.z, self.max.z);
        pos
    }

    pub fn periodic_distance_vec(&self, p1: &DVec3, p2: &DVec3) -> DVec3 {
        let mut dist = *p1 - *p2;
        let side_lengths = self.side_lengths();
        dist.x = minimize_component(dist.x, side_lengths.x);
        dist.y = minimize_component(dist.y, side_lengths.y);
        dist.z = minimize_component(dist.z, side_lengths.z);
        dist
    }

    pub fn periodic_distance(&self, p1: &DVec3, p2: &DVec3) -> f64 {
        self.periodic_distance_vec(p1, p2).length()
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::SimulationBox;
    use crate::extent::Extent;
    use crate::test_utils::assert_float_is_close;
    use crate::test_utils::assert_vec_is_close;

    #[test]
    fn periodic_wrap() {
        let check_wrap = |box_: &SimulationBox, (x, y, z), (x_wrapped, y_wrapped, z_wrapped)| {
            let v = box_.periodic_wrap(DVec3::new(x, y, z));
            assert_vec_is_close(v, DVec3::new(x_wrapped, y_wrapped, z_wrapped));
        };
        let box_: SimulationBox =
            Extent::new(DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 2.0, 3.0)).into();
        check_wrap(&box_, (0.5, 0.5, 0.5), (0.5, 0.5, 0.5));
        check_wrap(&box_, (1.5, 0.5, 0.5), (0.5, 0.5, 0.5));
        check_wrap(&box_, (0.5, 2.5, 0.5), (0.5, 0.5, 0.5));
        check_wrap(&box_, (0.5, 0.5, 3.5), (0.5, 0.5, 0.5));
        check_wrap(&box_, (1.5, 2.5, 3.5), (0.5, 0.5, 0.5));
        check_wrap(&box_, (-0.5, -0.5, -0.5), (0.5, 1.5, 2.5));
        let box_: SimulationBox =
            Extent::new(DVec3::new(-1.0, -1.0, -1.0), DVec3::new(1.0, 2.0, 3.0)).into();
        check_wrap(&box_, (0.5, 0.5, 0.5), (0.5, 0.5, 0.5));
        check_wrap(&box_, (-0.5, -0.5, -0.5), (-0.5, -0.5, -0.5));
        check_wrap(&box_, (-1.5, 0.5, 0.5), (0.5, 0.5, 0.5));
        check_wrap(&box_, (-1.5, -0.5, -0.5), (0.5, -0.5, -0.5));
    }

    #[test]
    fn periodic_distance() {
        let check_dist = |box_: &SimulationBox, (x1, y1, z1), (x2, y2, z2), distance| {
            let v1 = DVec3::new(x1, y1, z1);
            let v2 = DVec3::new(x2, y2, z2);
            assert_float_is_close(box_.periodic_distance(&v1, &v2), distance);
        };
        let box_: SimulationBox =
            Extent::new(DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 2.0, 3.0)).into();
        check_dist(&box_, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0), 0.0);
        check_dist(&box_, (0.1, 0.0, 0.0), (0.1, 0.0, 0.0), 0.0);
        check_dist(&box_, (-0.1, 0.0, 0.0), (0.1, 0.0, 0.0), 0.2);
        check_dist(&box_, (0.0, -0.1, 0.0), (0.0, 0.1, 0.0), 0.2);
        check_dist(&box_, (0.0, 0.0, -0.1), (0.0, 0.0, 0.1), 0.2);
        check_dist(&box_, (0.0, 0.0, 0.0), (0.5, 0.0, 0.0), 0.5);
        check_dist(&box_, (0.2, 0.0, 0.0), (0.7, 0.0, 0.0), 0.5);
        let box_: SimulationBox =
            Extent::new(DVec3::new(-1.0, -1.0, -1.0), DVec3::new(1.0, 2.0, 3.0)).into();
        check_dist(&box_, (-1.1, 0.0, 0.0), (-0.9, 0.0, 0.0), 0.2);
        check_dist(&box_, (0.0, 2.1, 0.0), (0.0, 1.9, 0.0), 0.2);
        check_dist(&box_, (0.0, 0.0, 3.1), (0.0, 0.0, 2.9), 0.2);
    }

    #[test]
    fn periodic_distance_is_symmetric() {
        let box_: SimulationBox =
            Extent::new(DVec3::new(-1.0, -1.0, -1.0), DVec3::new(1.0, 2.0, 3.0)).into();
        let positions: Vec<_> = (0..5)
            .flat_map(|i| {
                (0..5).map(move |j| {
                    DVec3::new(
                        -1.0 + 0.4 * i as f64,
                        -1.0 + 0.6 * j as f64,
                        -1.0 + 0.3 * (i + j) as f64,
                    )
                })
            })
            .collect();
        for p1 in positions.iter() {
            for p2 in positions.iter() {
                let d1 = box_.periodic_distance_vec(p1, p2);
                let d2 = box_.periodic_distance_vec(p2, p1);
                assert_vec_is_close(d1, -d2);
            }
        }
    }
}
