use serde::Deserialize;

use crate::tree::TreeConfig;

/// Parameters for the density and gradient passes.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HydroParameters {
    /// The kernel-weighted number of neighbours the adaptive
    /// smoothing length iteration aims for.
    pub des_num_ngb: f64,
    /// Allowed deviation from `des_num_ngb` before a particle counts
    /// as converged.
    pub max_num_ngb_deviation: f64,
    /// The minimum allowed smoothing length.
    pub min_gas_hsml: f64,
    /// The maximum allowed smoothing length. Particles that cannot
    /// collect enough neighbours stop growing here.
    #[serde(default = "default_max_gas_hsml")]
    pub max_gas_hsml: f64,
    /// Hard ceiling on the number of smoothing length iterations.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Byte budget of the export staging buffer, in mebibytes.
    #[serde(default = "default_buffer_size_mib")]
    pub buffer_size_mib: usize,
    /// Overshoot tolerance of the slope limiter.
    #[serde(default)]
    pub limiter_tolerance: f64,
    /// Parameters of the tree used for the neighbour search.
    #[serde(default)]
    pub tree: TreeConfig,
}

fn default_max_gas_hsml() -> f64 {
    f64::INFINITY
}

fn default_max_iter() -> usize {
    150
}

fn default_buffer_size_mib() -> usize {
    100
}

impl HydroParameters {
    pub fn from_yaml(contents: &str) -> Self {
        let parameters: Self =
            serde_yaml::from_str(contents).unwrap_or_else(|err| panic!("{}", err));
        parameters.validate();
        parameters
    }

    /// Entry precondition check. All violations are fatal.
    pub fn validate(&self) {
        if !(self.des_num_ngb > 0.0) || !(self.max_num_ngb_deviation > 0.0) {
            panic!(
                "invalid neighbour parameters: des_num_ngb = {}, max_num_ngb_deviation = {}",
                self.des_num_ngb, self.max_num_ngb_deviation
            );
        }
        if self.des_num_ngb <= self.max_num_ngb_deviation {
            panic!(
                "neighbour tolerance {} must be below the neighbour target {}",
                self.max_num_ngb_deviation, self.des_num_ngb
            );
        }
        if self.min_gas_hsml < 0.0 || self.max_gas_hsml <= self.min_gas_hsml {
            panic!(
                "invalid smoothing length bounds: [{}, {}]",
                self.min_gas_hsml, self.max_gas_hsml
            );
        }
        if self.max_iter == 0 || self.buffer_size_mib == 0 {
            panic!(
                "max_iter = {} and buffer_size_mib = {} must both be positive",
                self.max_iter, self.buffer_size_mib
            );
        }
        if self.limiter_tolerance < 0.0 {
            panic!("limiter_tolerance = {} must not be negative", self.limiter_tolerance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HydroParameters;

    #[test]
    fn parameters_from_yaml_with_defaults() {
        let parameters = HydroParameters::from_yaml(
            "
des_num_ngb: 48.0
max_num_ngb_deviation: 2.0
min_gas_hsml: 0.01
",
        );
        assert_eq!(parameters.des_num_ngb, 48.0);
        assert_eq!(parameters.max_iter, 150);
        assert_eq!(parameters.buffer_size_mib, 100);
        assert_eq!(parameters.limiter_tolerance, 0.0);
        assert!(parameters.max_gas_hsml.is_infinite());
    }

    #[test]
    #[should_panic]
    fn tolerance_above_target_is_rejected() {
        HydroParameters::from_yaml(
            "
des_num_ngb: 2.0
max_num_ngb_deviation: 3.0
min_gas_hsml: 0.01
",
        );
    }

    #[test]
    #[should_panic]
    fn unknown_fields_are_rejected() {
        HydroParameters::from_yaml(
            "
des_num_ngb: 48.0
max_num_ngb_deviation: 2.0
min_gas_hsml: 0.01
num_smoothing_neighbours: 3
",
        );
    }
}
