//! Build networks from `dn_config` definitions.

use dn_config::{NetworkSpec, VariableKindSpec};

use crate::model::builder::DEFAULT_NORMALIZATION_TOLERANCE;
use crate::model::{ModelError, Network, NetworkBuilder};

impl Network {
    /// Feed a network definition through [`NetworkBuilder`].
    ///
    /// Variables may appear in any order in the definition: all of them are
    /// declared first, then edges are added, then tables are set, so every
    /// builder error surfaces exactly as it would when building by hand.
    pub fn from_spec(spec: &NetworkSpec) -> Result<Network, ModelError> {
        Self::from_spec_with_tolerance(spec, DEFAULT_NORMALIZATION_TOLERANCE)
    }

    pub fn from_spec_with_tolerance(
        spec: &NetworkSpec,
        normalization_tolerance: f64,
    ) -> Result<Network, ModelError> {
        let mut builder =
            NetworkBuilder::new().with_normalization_tolerance(normalization_tolerance);
        if let Some(name) = &spec.name {
            builder = builder.with_name(name);
        }

        const NO_PARENTS: &[&str] = &[];
        for var in &spec.variables {
            match var.kind {
                VariableKindSpec::Chance => {
                    builder.add_variable(&var.name, &var.states, NO_PARENTS)?;
                }
                VariableKindSpec::Decision => {
                    builder.add_decision(&var.name, &var.states)?;
                }
                VariableKindSpec::Utility => {
                    builder.add_utility(&var.name, NO_PARENTS)?;
                }
            }
        }

        for var in &spec.variables {
            for parent in &var.parents {
                builder.add_edge(parent, &var.name)?;
            }
        }

        for var in &spec.variables {
            match var.kind {
                VariableKindSpec::Chance => builder.set_cpt(&var.name, &var.table)?,
                VariableKindSpec::Utility => builder.set_utility(&var.name, &var.table)?,
                VariableKindSpec::Decision => {}
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dn_config::{get_preset, PresetName, VariableSpec};

    #[test]
    fn presets_build() {
        for preset in PresetName::ALL {
            let net = Network::from_spec(&get_preset(*preset)).unwrap();
            assert!(!net.is_empty());
        }
    }

    #[test]
    fn declaration_order_is_free() {
        let spec = NetworkSpec::new(
            "reversed",
            vec![
                VariableSpec::chance("B", &["f", "t"], &["A"], vec![0.9, 0.1, 0.3, 0.7]),
                VariableSpec::chance("A", &["f", "t"], &[], vec![0.5, 0.5]),
            ],
        );
        let net = Network::from_spec(&spec).unwrap();
        let a = net.id_of("A").unwrap();
        assert_eq!(net.topological_order()[0], a);
    }

    #[test]
    fn cycle_in_definition_is_rejected() {
        let spec = NetworkSpec::new(
            "loop",
            vec![
                VariableSpec::chance("A", &["f", "t"], &["B"], vec![0.5; 4]),
                VariableSpec::chance("B", &["f", "t"], &["A"], vec![0.5; 4]),
            ],
        );
        assert!(matches!(
            Network::from_spec(&spec),
            Err(ModelError::CyclicGraph { .. })
        ));
    }

    #[test]
    fn bad_row_surfaces_normalization_error() {
        let spec = NetworkSpec::new(
            "bad",
            vec![VariableSpec::chance("A", &["f", "t"], &[], vec![0.5, 0.6])],
        );
        assert!(matches!(
            Network::from_spec(&spec),
            Err(ModelError::Normalization { .. })
        ));
    }
}
