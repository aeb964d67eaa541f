//! Network construction through the builder and from definition files.

use dn_config::{NetworkSpec, VariableSpec};
use dn_core::model::{ModelError, Network, NetworkBuilder, VariableKind};
use std::io::Write;

const TF: &[&str] = &["False", "True"];
const NONE: &[&str] = &[];

#[test]
fn duplicate_names_are_rejected() {
    let mut b = NetworkBuilder::new();
    b.add_variable("A", TF, NONE).unwrap();
    let err = b.add_decision("A", &["x", "y"]).unwrap_err();
    assert_eq!(err, ModelError::DuplicateVariable { name: "A".into() });
}

#[test]
fn closing_a_cycle_is_rejected() {
    let mut b = NetworkBuilder::new();
    b.add_variable("A", TF, NONE).unwrap();
    b.add_variable("B", TF, &["A"]).unwrap();
    b.add_variable("C", TF, &["B"]).unwrap();

    let err = b.add_edge("C", "A").unwrap_err();
    assert_eq!(
        err,
        ModelError::CyclicGraph {
            parent: "C".into(),
            child: "A".into()
        }
    );
    let err = b.add_edge("B", "B").unwrap_err();
    assert!(matches!(err, ModelError::CyclicGraph { .. }));

    // The rejected edges left the graph untouched.
    b.add_edge("A", "C").unwrap();
    b.set_cpt("A", &[0.5, 0.5]).unwrap();
    b.set_cpt("B", &[0.9, 0.1, 0.2, 0.8]).unwrap();
    b.set_cpt("C", &[0.5, 0.5, 0.4, 0.6, 0.3, 0.7, 0.2, 0.8]).unwrap();
    let net = b.build().unwrap();
    assert_eq!(net.edges().len(), 3);
}

#[test]
fn unknown_parents_are_rejected() {
    let mut b = NetworkBuilder::new();
    let err = b.add_variable("B", TF, &["A"]).unwrap_err();
    assert_eq!(err, ModelError::UnknownVariable { name: "A".into() });
}

#[test]
fn domains_need_two_distinct_states() {
    let mut b = NetworkBuilder::new();
    assert!(matches!(
        b.add_variable("A", &["only"], NONE),
        Err(ModelError::InvalidDomain { .. })
    ));
    assert!(matches!(
        b.add_variable("A", &["x", "x"], NONE),
        Err(ModelError::InvalidDomain { .. })
    ));
}

#[test]
fn cpt_shape_and_rows_are_checked() {
    let mut b = NetworkBuilder::new();
    b.add_variable("Rain", TF, NONE).unwrap();
    b.add_variable("Wet", TF, &["Rain"]).unwrap();

    let err = b.set_cpt("Wet", &[0.5, 0.5]).unwrap_err();
    assert_eq!(
        err,
        ModelError::Shape {
            variable: "Wet".into(),
            expected: 4,
            actual: 2
        }
    );

    let err = b.set_cpt("Wet", &[0.9, 0.1, 0.3, 0.3]).unwrap_err();
    match err {
        ModelError::Normalization { variable, row, sum } => {
            assert_eq!(variable, "Wet");
            assert_eq!(row, "Rain=True");
            assert!((sum - 0.6).abs() < 1e-12);
        }
        other => panic!("expected normalization error, got {other:?}"),
    }

    let err = b.set_cpt("Rain", &[1.2, -0.2]).unwrap_err();
    assert!(matches!(err, ModelError::NegativeProbability { .. }));

    let err = b.set_cpt("Rain", &[f64::NAN, 1.0]).unwrap_err();
    assert!(matches!(err, ModelError::NonFinite { .. }));

    // Within tolerance is accepted.
    b.set_cpt("Rain", &[0.8, 0.2 + 1e-9]).unwrap();
}

#[test]
fn tables_go_on_the_right_kind() {
    let mut b = NetworkBuilder::new();
    b.add_variable("Fraud", TF, NONE).unwrap();
    b.add_decision("Action", &["Allow", "Block"]).unwrap();
    b.add_utility("Cost", &["Action", "Fraud"]).unwrap();

    assert!(matches!(
        b.set_cpt("Action", &[0.5, 0.5]),
        Err(ModelError::WrongKind { .. })
    ));
    assert!(matches!(
        b.set_utility("Fraud", &[0.0, 1.0]),
        Err(ModelError::WrongKind { .. })
    ));
    assert!(matches!(
        b.add_variable("Late", TF, &["Cost"]),
        Err(ModelError::InvalidParent { .. })
    ));

    // Utilities are unconstrained reals.
    b.set_utility("Cost", &[0.0, -1000.0, -10.0, -10.0]).unwrap();
}

#[test]
fn build_requires_every_table() {
    let mut b = NetworkBuilder::new();
    b.add_variable("A", TF, NONE).unwrap();
    b.add_variable("B", TF, NONE).unwrap();
    b.set_cpt("A", &[0.5, 0.5]).unwrap();
    b.set_cpt("B", &[0.5, 0.5]).unwrap();
    // A new edge invalidates B's table.
    b.add_edge("A", "B").unwrap();
    let err = b.build().unwrap_err();
    assert_eq!(err, ModelError::MissingCpt { variable: "B".into() });

    let mut b = NetworkBuilder::new();
    b.add_variable("A", TF, NONE).unwrap();
    b.add_utility("U", &["A"]).unwrap();
    b.set_cpt("A", &[0.5, 0.5]).unwrap();
    let err = b.build().unwrap_err();
    assert_eq!(err, ModelError::MissingUtility { variable: "U".into() });
}

#[test]
fn topological_order_is_deterministic() {
    let build = || {
        let mut b = NetworkBuilder::new();
        b.add_variable("Trav", TF, NONE).unwrap();
        b.add_variable("OC", TF, NONE).unwrap();
        b.add_variable("Fraud", TF, &["Trav"]).unwrap();
        b.add_variable("IP", TF, &["OC", "Fraud"]).unwrap();
        b.set_cpt("Trav", &[0.95, 0.05]).unwrap();
        b.set_cpt("OC", &[0.3, 0.7]).unwrap();
        b.set_cpt("Fraud", &[0.996, 0.004, 0.99, 0.01]).unwrap();
        b.set_cpt("IP", &[0.999, 0.001, 0.989, 0.011, 0.99, 0.01, 0.98, 0.02])
            .unwrap();
        b.build().unwrap()
    };
    let a = build();
    let b = build();
    assert_eq!(a.topological_order(), b.topological_order());

    let names: Vec<&str> = a
        .topological_order()
        .iter()
        .map(|id| a.variable(*id).name())
        .collect();
    assert_eq!(names, ["Trav", "OC", "Fraud", "IP"]);
    for (parent, child) in a.edges() {
        assert!(a.topological_position(parent) < a.topological_position(child));
    }
}

#[test]
fn structure_queries() {
    let spec = dn_config::get_preset(dn_config::PresetName::Fraud);
    let net = Network::from_spec(&spec).unwrap();

    let fraud = net.id_of("Fraud").unwrap();
    let cost = net.id_of("Cost").unwrap();
    let action = net.id_of("Action").unwrap();
    let trav = net.id_of("Trav").unwrap();

    assert!(net.has_path(action, cost));
    assert!(net.has_path(trav, cost));
    assert!(!net.has_path(cost, trav));
    assert!(net.ancestors([fraud]).contains(&trav));
    assert_eq!(net.lookup("Action").unwrap().kind(), VariableKind::Decision);

    let summary = net.summary();
    assert_eq!(summary.decisions, 1);
    assert_eq!(summary.utilities, 1);
    assert!(summary
        .edges
        .contains(&("Fraud".to_string(), "Cost".to_string())));
    assert!(summary.to_string().contains("Trav -> Fraud"));
}

#[test]
fn from_spec_surfaces_builder_errors() {
    let spec = NetworkSpec::new(
        "loop",
        vec![
            VariableSpec::chance("A", TF, &["B"], vec![0.5, 0.5, 0.5, 0.5]),
            VariableSpec::chance("B", TF, &["A"], vec![0.5, 0.5, 0.5, 0.5]),
        ],
    );
    let err = Network::from_spec(&spec).unwrap_err();
    assert!(matches!(err, ModelError::CyclicGraph { .. }));
}

#[test]
fn loads_json_definition() {
    let json = r#"{
        "schema_version": "1.0.0",
        "name": "rain",
        "variables": [
            { "name": "Wet", "states": ["no", "yes"], "parents": ["Rain"],
              "table": [0.9, 0.1, 0.1, 0.9] },
            { "name": "Rain", "kind": "chance", "states": ["no", "yes"], "table": [0.8, 0.2] }
        ]
    }"#;
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let (spec, provenance) = NetworkSpec::from_file(file.path()).unwrap();
    assert!(provenance.sha256.is_some());
    let net = Network::from_spec(&spec).unwrap();
    assert_eq!(net.name(), Some("rain"));
    assert_eq!(net.len(), 2);
}

#[test]
fn loads_toml_definition() {
    let toml = r#"
name = "choice"

[[variables]]
name = "Fraud"
states = ["False", "True"]
table = [0.98, 0.02]

[[variables]]
name = "Action"
kind = "decision"
states = ["Allow", "Block"]

[[variables]]
name = "Cost"
kind = "utility"
parents = ["Action", "Fraud"]
table = [0.0, -1000.0, -10.0, -10.0]
"#;
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml.as_bytes()).unwrap();

    let (spec, _) = NetworkSpec::from_file(file.path()).unwrap();
    let net = Network::from_spec(&spec).unwrap();
    assert_eq!(net.lookup("Cost").unwrap().kind(), VariableKind::Utility);
}
