use glam::DVec3;

use super::LeafData;
use super::LeafDataType;
use super::Node;
use super::NodeData;
use super::Octree;
use super::NUM_SUBDIVISIONS;
use crate::simulation_box::SimulationBox;

fn relative_bounding_box_overlap(dist: DVec3, total_size: DVec3) -> bool {
    dist.x.abs() <= total_size.x && dist.y.abs() <= total_size.y && dist.z.abs() <= total_size.z
}

/// Returns whether the two bounding boxes given by
/// the center coordinates pos1 and pos2 and the side lengths
/// size1 and size2 overlap in a periodic box
pub(crate) fn bounding_boxes_overlap_periodic(
    box_: &SimulationBox,
    pos1: &DVec3,
    size1: &DVec3,
    pos2: &DVec3,
    size2: &DVec3,
) -> bool {
    let dist = box_.periodic_distance_vec(pos1, pos2);
    let total_size = *size1 + *size2;
    relative_bounding_box_overlap(dist, total_size)
}

impl<N, L: LeafDataType> Octree<N, L> {
    /// All leaves within `radius` of `pos` under the periodic box
    /// metric.
    pub fn iter_particles_in_radius<'a>(
        &'a self,
        box_: &'a SimulationBox,
        pos: DVec3,
        radius: f64,
    ) -> impl Iterator<Item = &'a L> + 'a {
        TreeIter::new(self, RadiusSearch { box_, pos, radius })
    }
}

impl Octree<NodeData, LeafData> {
    /// All leaves j with d(pos, x_j) < max(radius, hsml_j). This is
    /// the symmetric search of the gradient walk: a pair is found
    /// when it lies in either particle's kernel.
    pub fn iter_particles_in_kernel_union<'a>(
        &'a self,
        box_: &'a SimulationBox,
        pos: DVec3,
        radius: f64,
    ) -> impl Iterator<Item = &'a LeafData> + 'a {
        TreeIter::new(self, SymmetricRadiusSearch { box_, pos, radius })
    }
}

struct StackItem<'a, N, L> {
    tree: &'a Octree<N, L>,
    pos_in_parent: usize,
    should_be_visited: bool,
}

impl<'a, N, L> Clone for StackItem<'a, N, L> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            pos_in_parent: self.pos_in_parent,
            should_be_visited: self.should_be_visited,
        }
    }
}

pub struct TreeIter<'a, N, L, C> {
    stack: Vec<StackItem<'a, N, L>>,
    current_leaf_pos: usize,
    criterion: C,
}

impl<'a, N, L, C: SearchCriterion<N, L>> TreeIter<'a, N, L, C> {
    fn new(tree: &'a Octree<N, L>, criterion: C) -> Self {
        let mut iter = Self {
            criterion,
            stack: vec![],
            current_leaf_pos: 0,
        };
        let initial_stack_item = iter.get_stack_item_for_new_tree(tree, 0);
        iter.stack.push(initial_stack_item);
        iter
    }

    fn get_stack_item_for_new_tree(
        &self,
        tree: &'a Octree<N, L>,
        pos_in_parent: usize,
    ) -> StackItem<'a, N, L> {
        let should_be_visited = self.criterion.should_visit_node(tree);
        StackItem {
            pos_in_parent,
            tree,
            should_be_visited,
        }
    }

    fn goto_next_node(&mut self) -> Option<()> {
        let last = self.stack.last()?.clone();
        if last.should_be_visited {
            match &last.tree.node {
                Node::Tree(children) => {
                    // Remember that we visited this node, then go deeper.
                    self.stack.last_mut().unwrap().should_be_visited = false;
                    self.stack
                        .push(self.get_stack_item_for_new_tree(&children[0], 0));
                    return Some(());
                }
                Node::Leaf(_) => {}
            }
        }
        // If we encountered a leaf or a previously visited tree:
        // go to the next child on this level, or up one level.
        let last = self.stack.pop().unwrap();
        let next_pos_in_parent = last.pos_in_parent + 1;
        let parent = self.stack.last()?;
        if next_pos_in_parent < NUM_SUBDIVISIONS {
            self.stack.push(self.get_stack_item_for_new_tree(
                &parent.tree.node.unwrap_tree()[next_pos_in_parent],
                next_pos_in_parent,
            ));
        }
        Some(())
    }

    fn get_current_node_if_it_should_be_visited(&self) -> Option<&'a Node<N, L>> {
        let last = self.stack.last()?;
        Some(&last.tree.node).filter(|_| last.should_be_visited)
    }
}

impl<'a, N, L, C: SearchCriterion<N, L>> Iterator for TreeIter<'a, N, L, C> {
    type Item = &'a L;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(Node::Leaf(leaf)) = self.get_current_node_if_it_should_be_visited() {
                let particle = leaf.get(self.current_leaf_pos);
                if let Some(particle) = particle {
                    self.current_leaf_pos += 1;
                    if self.criterion.should_include_leaf(particle) {
                        return Some(particle);
                    } else {
                        continue;
                    }
                } else {
                    self.current_leaf_pos = 0;
                }
            }
            self.goto_next_node()?;
        }
    }
}

pub trait SearchCriterion<N, L> {
    fn should_visit_node(&self, tree: &Octree<N, L>) -> bool;
    fn should_include_leaf(&self, leaf: &L) -> bool;
}

struct RadiusSearch<'a> {
    box_: &'a SimulationBox,
    pos: DVec3,
    radius: f64,
}

impl<'a, N, L: LeafDataType> SearchCriterion<N, L> for RadiusSearch<'a> {
    fn should_visit_node(&self, tree: &Octree<N, L>) -> bool {
        bounding_boxes_overlap_periodic(
            self.box_,
            &tree.extent.center(),
            &tree.extent.side_lengths(),
            &self.pos,
            &DVec3::splat(self.radius),
        )
    }

    fn should_include_leaf(&self, leaf: &L) -> bool {
        self.box_.periodic_distance(&self.pos, leaf.pos()) < self.radius
    }
}

struct SymmetricRadiusSearch<'a> {
    box_: &'a SimulationBox,
    pos: DVec3,
    radius: f64,
}

impl<'a> SearchCriterion<NodeData, LeafData> for SymmetricRadiusSearch<'a> {
    fn should_visit_node(&self, tree: &Octree<NodeData, LeafData>) -> bool {
        bounding_boxes_overlap_periodic(
            self.box_,
            &tree.extent.center(),
            &tree.extent.side_lengths(),
            &self.pos,
            &DVec3::splat(self.radius.max(tree.data.max_hsml)),
        )
    }

    fn should_include_leaf(&self, leaf: &LeafData) -> bool {
        let distance = self.box_.periodic_distance(&self.pos, &leaf.pos);
        distance < self.radius || distance < leaf.hsml
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use glam::DVec3;

    use crate::extent::Extent;
    use crate::simulation_box::SimulationBox;
    use crate::tree::LeafData;
    use crate::tree::NeighborTree;
    use crate::tree::TreeConfig;
    use crate::test_utils::particle_lattice;

    fn direct_neighbour_search<'a>(
        particles: &'a [LeafData],
        box_: &SimulationBox,
        pos: &DVec3,
        radius: f64,
    ) -> HashSet<usize> {
        particles
            .iter()
            .filter(|particle| box_.periodic_distance(&particle.pos, pos) < radius)
            .map(|particle| particle.index)
            .collect()
    }

    fn get_test_leaves() -> Vec<LeafData> {
        particle_lattice(6, 12.0, 1.0)
            .into_iter()
            .enumerate()
            .map(|(index, particle)| LeafData {
                index,
                pos: particle.position,
                hsml: 0.5 * (1 + index % 6) as f64,
            })
            .collect()
    }

    #[test]
    fn radius_search_agrees_with_direct_search() {
        let radius = 2.5;
        let particles = get_test_leaves();
        let extent = Extent::from_positions(particles.iter().map(|leaf| &leaf.pos)).unwrap();
        let tree = NeighborTree::new(&TreeConfig::default(), particles.clone(), &extent);
        // We don't want this to periodically wrap, so make the simulation box large.
        let box_ = SimulationBox::cube_from_side_length(extent.max_side_length() * 10.0);
        for particle in particles.iter() {
            let tree_neighbours: HashSet<_> = tree
                .iter_particles_in_radius(&box_, particle.pos, radius)
                .map(|leaf| leaf.index)
                .collect();
            let direct_neighbours =
                direct_neighbour_search(&particles, &box_, &particle.pos, radius);
            assert_eq!(tree_neighbours, direct_neighbours);
        }
    }

    #[test]
    fn radius_search_wraps_around_the_periodic_box() {
        let particles = vec![
            LeafData {
                index: 0,
                pos: DVec3::new(0.05, 0.5, 0.5),
                hsml: 0.1,
            },
            LeafData {
                index: 1,
                pos: DVec3::new(0.95, 0.5, 0.5),
                hsml: 0.1,
            },
        ];
        let extent = Extent::cube_from_side_length(1.0);
        let tree = NeighborTree::new(&TreeConfig::default(), particles, &extent);
        let box_ = SimulationBox::cube_from_side_length(1.0);
        let found: Vec<_> = tree
            .iter_particles_in_radius(&box_, DVec3::new(0.05, 0.5, 0.5), 0.2)
            .map(|leaf| leaf.index)
            .collect();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn symmetric_search_agrees_with_direct_search() {
        let radius = 2.5;
        let particles = get_test_leaves();
        let extent = Extent::from_positions(particles.iter().map(|leaf| &leaf.pos)).unwrap();
        let tree = NeighborTree::new(&TreeConfig::default(), particles.clone(), &extent);
        let box_ = SimulationBox::cube_from_side_length(extent.max_side_length() * 10.0);
        for particle in particles.iter() {
            let tree_neighbours: HashSet<_> = tree
                .iter_particles_in_kernel_union(&box_, particle.pos, radius)
                .map(|leaf| leaf.index)
                .collect();
            let direct_neighbours: HashSet<_> = particles
                .iter()
                .filter(|other| {
                    let distance = box_.periodic_distance(&other.pos, &particle.pos);
                    distance < radius || distance < other.hsml
                })
                .map(|other| other.index)
                .collect();
            assert_eq!(tree_neighbours, direct_neighbours);
        }
    }
}
