//! Built-in network presets.
//!
//! - Fraud: the five-node transaction fraud network (travel, computer
//!   ownership, fraud, foreign purchase, internet purchase) with an
//!   allow/block decision and its cost table
//! - FraudChain: the reduced three-node travel/fraud/foreign-purchase chain
//!   used as the reference scenario for posterior monotonicity

use crate::network::{NetworkSpec, VariableSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Loss when fraud goes through unblocked.
pub const COST_FRAUD: f64 = -1000.0;
/// Friction cost of blocking any transaction.
pub const COST_BLOCK: f64 = -10.0;
/// Cost of allowing a legitimate transaction.
pub const COST_OK: f64 = 0.0;

/// Available presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    /// Five-node fraud detection network with decision and utility.
    Fraud,
    /// Three-node travel → fraud → foreign-purchase chain.
    FraudChain,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[PresetName::Fraud, PresetName::FraudChain];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Fraud => "fraud",
            PresetName::FraudChain => "fraud_chain",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fraud" | "fraud_detection" => Some(PresetName::Fraud),
            "fraud_chain" | "chain" => Some(PresetName::FraudChain),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Fraud => {
                "Travel/ownership/fraud/foreign-purchase/internet-purchase network with allow/block decision"
            }
            PresetName::FraudChain => "Travel → fraud → foreign purchase chain with allow/block decision",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| format!("unknown preset: {}", s))
    }
}

/// Preset listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct PresetInfo {
    pub name: PresetName,
    pub description: &'static str,
    pub variables: usize,
}

/// List all presets.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|name| PresetInfo {
            name: *name,
            description: name.description(),
            variables: get_preset(*name).variables.len(),
        })
        .collect()
}

/// Build the network definition for a preset.
pub fn get_preset(name: PresetName) -> NetworkSpec {
    match name {
        PresetName::Fraud => fraud(),
        PresetName::FraudChain => fraud_chain(),
    }
}

const BOOL: &[&str] = &["False", "True"];

fn decision_and_cost() -> [VariableSpec; 2] {
    [
        VariableSpec::decision("Action", &["Allow", "Block"])
            .with_description("Whether to let the transaction through"),
        VariableSpec::utility(
            "Cost",
            &["Action", "Fraud"],
            // Allow: (Fraud=False, Fraud=True), Block: (Fraud=False, Fraud=True)
            vec![COST_OK, COST_FRAUD, COST_BLOCK, COST_BLOCK],
        )
        .with_description("Financial outcome of the chosen action"),
    ]
}

fn fraud() -> NetworkSpec {
    let mut variables = vec![
        VariableSpec::chance("Trav", BOOL, &[], vec![0.95, 0.05])
            .with_description("Customer is travelling abroad"),
        VariableSpec::chance("OC", BOOL, &[], vec![0.30, 0.70])
            .with_description("Customer owns a computer"),
        VariableSpec::chance("Fraud", BOOL, &["Trav"], vec![0.996, 0.004, 0.99, 0.01])
            .with_description("Transaction is fraudulent"),
        VariableSpec::chance(
            "FP",
            BOOL,
            &["Trav", "Fraud"],
            vec![
                0.99, 0.01, // Trav=F, Fraud=F
                0.90, 0.10, // Trav=F, Fraud=T
                0.10, 0.90, // Trav=T, Fraud=F
                0.10, 0.90, // Trav=T, Fraud=T
            ],
        )
        .with_description("Foreign purchase"),
        VariableSpec::chance(
            "IP",
            BOOL,
            &["OC", "Fraud"],
            vec![
                0.999, 0.001, // OC=F, Fraud=F
                0.989, 0.011, // OC=F, Fraud=T
                0.99, 0.01, // OC=T, Fraud=F
                0.98, 0.02, // OC=T, Fraud=T
            ],
        )
        .with_description("Internet purchase"),
    ];
    variables.extend(decision_and_cost());
    let mut spec = NetworkSpec::new("fraud", variables);
    spec.description = Some(PresetName::Fraud.description().to_string());
    spec
}

fn fraud_chain() -> NetworkSpec {
    let mut variables = vec![
        VariableSpec::chance("Trav", BOOL, &[], vec![0.9, 0.1]),
        VariableSpec::chance("Fraud", BOOL, &["Trav"], vec![0.995, 0.005, 0.95, 0.05]),
        VariableSpec::chance(
            "FP",
            BOOL,
            &["Trav", "Fraud"],
            vec![0.99, 0.01, 0.90, 0.10, 0.10, 0.90, 0.10, 0.90],
        ),
    ];
    variables.extend(decision_and_cost());
    let mut spec = NetworkSpec::new("fraud_chain", variables);
    spec.description = Some(PresetName::FraudChain.description().to_string());
    spec
}
