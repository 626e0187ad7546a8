use serde::Deserialize;

/// Construction parameters of the neighbour search tree.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    #[serde(default = "default_min_depth")]
    pub min_depth: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_num_particles_per_leaf")]
    pub max_num_particles_per_leaf: usize,
}

fn default_min_depth() -> usize {
    0
}

fn default_max_depth() -> usize {
    20
}

fn default_max_num_particles_per_leaf() -> usize {
    30
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            min_depth: default_min_depth(),
            max_depth: default_max_depth(),
            max_num_particles_per_leaf: default_max_num_particles_per_leaf(),
        }
    }
}
