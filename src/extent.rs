use glam::DVec3;

/// An axis aligned box, used both for tree nodes and for the
/// per-rank domain envelopes.
#[derive(Default, Clone, PartialEq)]
pub struct Extent {
    pub min: DVec3,
    pub max: DVec3,
}

impl Extent {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        debug_assert!(min.x <= max.x);
        debug_assert!(min.y <= max.y);
        debug_assert!(min.z <= max.z);
        Self { min, max }
    }

    pub fn cube_from_side_length(side_length: f64) -> Self {
        Self::new(DVec3::ZERO, DVec3::splat(side_length))
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn side_lengths(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn max_side_length(&self) -> f64 {
        let side_lengths = self.side_lengths();
        side_lengths.x.max(side_lengths.y).max(side_lengths.z)
    }

    pub fn from_positions<'a>(positions: impl Iterator<Item = &'a DVec3>) -> Option<Self> {
        let mut min: Option<DVec3> = None;
        let mut max: Option<DVec3> = None;
        for pos in positions {
            min = Some(min.map_or(*pos, |min| min.min(*pos)));
            max = Some(max.map_or(*pos, |max| max.max(*pos)));
        }
        Some(Self::new(min?, max?))
    }

    /// Return an extent with slightly increased size
    /// but the same center
    pub fn pad(self) -> Self {
        const PADDING_FRACTION: f64 = 0.01;
        let center = self.center();
        let dist_to_min = self.min - center;
        let dist_to_max = self.max - center;
        Self {
            min: center + dist_to_min * (1.0 + PADDING_FRACTION),
            max: center + dist_to_max * (1.0 + PADDING_FRACTION),
        }
    }

    pub fn contains(&self, pos: &DVec3) -> bool {
        self.min.x <= pos.x
            && pos.x <= self.max.x
            && self.min.y <= pos.y
            && pos.y <= self.max.y
            && self.min.z <= pos.z
            && pos.z <= self.max.z
    }

    pub fn get_octant_index(&self, pos: &DVec3) -> usize {
        debug_assert!(self.contains(pos));
        let center = self.center();
        (pos.x >= center.x) as usize
            | (((pos.y >= center.y) as usize) << 1)
            | (((pos.z >= center.z) as usize) << 2)
    }

    pub fn get_octants(&self) -> [Self; 8] {
        let center = self.center();
        let octant = |index: usize| {
            let select = |bit: usize, min: f64, center: f64, max: f64| {
                if index >> bit & 1 == 0 {
                    (min, center)
                } else {
                    (center, max)
                }
            };
            let (min_x, max_x) = select(0, self.min.x, center.x, self.max.x);
            let (min_y, max_y) = select(1, self.min.y, center.y, self.max.y);
            let (min_z, max_z) = select(2, self.min.z, center.z, self.max.z);
            Self::new(
                DVec3::new(min_x, min_y, min_z),
                DVec3::new(max_x, max_y, max_z),
            )
        };
        [
            octant(0),
            octant(1),
            octant(2),
            octant(3),
            octant(4),
            octant(5),
            octant(6),
            octant(7),
        ]
    }
}

impl std::fmt::Debug for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Extent({:.3?} {:.3?})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::Extent;

    #[test]
    fn extent_from_positions() {
        let positions = &[
            DVec3::new(1.0, 0.0, 0.5),
            DVec3::new(-1.0, 0.0, -0.5),
            DVec3::new(0.0, -2.0, 0.0),
            DVec3::new(0.0, 2.0, 0.0),
        ];
        let extent = Extent::from_positions(positions.iter()).unwrap();
        assert_eq!(extent.min, DVec3::new(-1.0, -2.0, -0.5));
        assert_eq!(extent.max, DVec3::new(1.0, 2.0, 0.5));
    }

    #[test]
    fn extent_from_positions_is_none_with_zero_positions() {
        assert!(Extent::from_positions([].iter()).is_none());
    }

    #[test]
    fn octants_are_consistent_with_octant_index() {
        let extent = Extent::new(DVec3::new(-1.0, -2.0, 0.0), DVec3::new(1.0, 2.0, 4.0));
        let octants = extent.get_octants();
        for (index, octant) in octants.iter().enumerate() {
            assert_eq!(extent.get_octant_index(&octant.center()), index);
            assert!(extent.contains(&octant.center()));
        }
    }

    #[test]
    #[should_panic]
    fn invalid_extent() {
        Extent::new(DVec3::new(1.0, 0.0, 0.0), DVec3::new(-1.0, 1.0, 1.0));
    }
}
