//! Declared option tables for every wrapped algorithm.
//!
//! Table order is emission order. Keep it in the order the engine documents
//! its flags; MultilayerPerceptron in particular expects `-C` before `-I`.

use log::warn;
use serde_json::Value as JsonValue;

use super::{translate_for, ConfigObject, OptionSpec, Output, Translation};
use crate::config::OptionPolicy;
use crate::error::{OptionError, Result};

use super::Domain::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    Classifier,
    Clusterer,
    Filter,
}

impl AlgorithmKind {
    pub fn label(&self) -> &'static str {
        match self {
            AlgorithmKind::Classifier => "classifier",
            AlgorithmKind::Clusterer => "clusterer",
            AlgorithmKind::Filter => "filter",
        }
    }
}

/// `key = value` is only valid when `needs` is emitted too.
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    pub key: &'static str,
    pub value: &'static str,
    pub needs: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct AlgorithmSpec {
    /// Short name used by callers, e.g. `J48`.
    pub name: &'static str,
    /// Class the engine instantiates.
    pub engine_class: &'static str,
    pub kind: AlgorithmKind,
    /// Extra results this algorithm can return on request.
    pub outputs: &'static [Output],
    /// Per-instance labels are returned whether or not they were asked for.
    pub labels_always: bool,
    pub requires: &'static [Requirement],
    pub options: &'static [OptionSpec],
}

impl AlgorithmSpec {
    pub fn translate(&self, options: &ConfigObject, policy: OptionPolicy) -> Result<Translation> {
        let mut translation = translate_for(options, self.options, self.outputs, policy)?;
        translation.predict_labels |= self.labels_always;
        for requirement in self.requires {
            self.enforce(requirement, &mut translation.flags, policy)?;
        }
        Ok(translation)
    }

    fn flag_of(&self, key: &str) -> Option<String> {
        self.options.iter().find(|s| s.key == key).map(OptionSpec::flag_token)
    }

    fn enforce(&self, requirement: &Requirement, flags: &mut Vec<String>, policy: OptionPolicy) -> Result<()> {
        let (Some(flag), Some(needed)) = (self.flag_of(requirement.key), self.flag_of(requirement.needs)) else {
            return Ok(());
        };
        let Some(at) = flags
            .windows(2)
            .position(|w| w[0] == flag && w[1] == requirement.value)
        else {
            return Ok(());
        };
        if flags.contains(&needed) {
            return Ok(());
        }

        match policy {
            OptionPolicy::Strict => Err(OptionError::OutOfDomain {
                key: requirement.key.to_string(),
                value: JsonValue::from(requirement.value).to_string(),
                expected: format!("'{}' to be set as well", requirement.needs),
            }
            .into()),
            OptionPolicy::Lenient => {
                warn!(
                    "dropping option '{}' = {}: '{}' is not set",
                    requirement.key, requirement.value, requirement.needs
                );
                flags.drain(at..at + 2);
                Ok(())
            }
        }
    }
}

fn svm_kernel(name: &str) -> String {
    format!("weka.classifiers.functions.supportVector.{name}")
}

fn distance_function(name: &str) -> String {
    format!("weka.core.{name}")
}

const DISTANCE_FUNCTIONS: &[&str] = &[
    "ChebyshevDistance",
    "EuclideanDistance",
    "ManhattanDistance",
    "MinkowskiDistance",
    "NormalizableDistance",
];

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

/// C4.5 decision tree.
pub const J48: AlgorithmSpec = AlgorithmSpec {
    name: "J48",
    engine_class: "weka.classifiers.trees.J48",
    kind: AlgorithmKind::Classifier,
    outputs: &[],
    labels_always: false,
    requires: &[],
    options: &[
        OptionSpec::presence("unpruned", 'U'),
        OptionSpec::valued("pruningConfidence", 'C', UnitInterval),
        OptionSpec::valued("minInstances", 'M', IntRange(0, i64::MAX)),
        OptionSpec::presence("reducedError", 'R'),
        OptionSpec::valued("numFolds", 'N', PositiveInt),
        OptionSpec::presence("binarySplits", 'B'),
        OptionSpec::presence("noRaising", 'S'),
        OptionSpec::presence("noCleanup", 'L'),
        OptionSpec::presence("probaSmoothing", 'A'),
        OptionSpec::valued("seed", 'Q', Integer),
    ],
};

/// Citation k-nearest-neighbours.
pub const CITATION_KNN: AlgorithmSpec = AlgorithmSpec {
    name: "KNN",
    engine_class: "weka.classifiers.mi.CitationKNN",
    kind: AlgorithmKind::Classifier,
    outputs: &[Output::Distances],
    labels_always: false,
    requires: &[],
    options: &[
        OptionSpec::valued("numReferences", 'R', PositiveInt),
        OptionSpec::valued("numCiters", 'C', PositiveInt),
        OptionSpec::valued("hausdorffRank", 'H', PositiveInt),
    ],
};

pub const MULTILAYER_PERCEPTRON: AlgorithmSpec = AlgorithmSpec {
    name: "MLP",
    engine_class: "weka.classifiers.functions.MultilayerPerceptron",
    kind: AlgorithmKind::Classifier,
    outputs: &[],
    labels_always: false,
    requires: &[],
    options: &[
        OptionSpec::valued("learningRate", 'L', UnitInterval),
        OptionSpec::valued("momentum", 'M', UnitInterval),
        OptionSpec::valued("numEpochs", 'N', PositiveInt),
        OptionSpec::valued("validationSetSize", 'V', Percent),
        OptionSpec::valued("seed", 'S', IntRange(0, i64::MAX)),
        OptionSpec::valued("errorThreshold", 'E', PositiveInt),
        OptionSpec::presence("gui", 'G'),
        OptionSpec::presence("autocreation", 'A'),
        OptionSpec::presence("nominalToBinary", 'B'),
        OptionSpec::valued("hidden", 'H', Layers),
        OptionSpec::presence("noNumericNormalization", 'C'),
        OptionSpec::presence("noAttributeNormalization", 'I'),
        OptionSpec::presence("noReset", 'R'),
        OptionSpec::presence("decay", 'D'),
    ],
};

/// Naive Bayes tree.
pub const NB_TREE: AlgorithmSpec = AlgorithmSpec {
    name: "NBTree",
    engine_class: "weka.classifiers.trees.NBTree",
    kind: AlgorithmKind::Classifier,
    outputs: &[],
    labels_always: false,
    requires: &[],
    options: &[OptionSpec::presence("debug", 'D')],
};

/// Support vector machine trained by sequential minimal optimisation.
pub const SMO: AlgorithmSpec = AlgorithmSpec {
    name: "SVM",
    engine_class: "weka.classifiers.functions.SMO",
    kind: AlgorithmKind::Classifier,
    outputs: &[],
    labels_always: false,
    requires: &[],
    options: &[
        OptionSpec::presence("debug", 'D'),
        OptionSpec::valued("complexity", 'C', NonNegative),
        // 0 = normalize, 1 = standardize, 2 = neither
        OptionSpec::valued("normalize", 'N', IntRange(0, 2)),
        OptionSpec::valued("tolerance", 'L', NonNegative),
        OptionSpec::valued("roundOff", 'P', NonNegative),
        OptionSpec::presence("fit", 'M'),
        OptionSpec::valued("validationFolds", 'V', IntRange(-1, i64::MAX)),
        OptionSpec::valued("seed", 'W', Integer),
        OptionSpec::valued(
            "kernel",
            'K',
            OneOf(&[
                "PolyKernel",
                "Puk",
                "RBFKernel",
                "StringKernel",
                "RegSMO",
                "NormalizedPolyKernel",
            ]),
        )
        .with_formatter(svm_kernel),
    ],
};

/// Fuzzy-system classifier evolved by a co-evolutionary genetic algorithm.
pub const JFUGE: AlgorithmSpec = AlgorithmSpec {
    name: "JFuge",
    engine_class: "JFuge",
    kind: AlgorithmKind::Classifier,
    outputs: &[Output::FuzzySystem],
    labels_always: false,
    requires: &[Requirement {
        key: "selectionAlgorithm",
        value: "tournament",
        needs: "tournamentSize",
    }],
    options: &[
        OptionSpec::valued("mutationRate", 'M', UnitInterval),
        OptionSpec::valued("crossoverRate", 'C', UnitInterval),
        OptionSpec::valued("selectionRate", 'S', UnitInterval),
        OptionSpec::valued("numGenerations", 'G', PositiveInt),
        OptionSpec::valued("selectionAlgorithm", 'A', OneOf(&["roulette", "tournament", "random"])),
        OptionSpec::valued("elitismRate", 'E', UnitInterval),
        OptionSpec::valued("tournamentSize", 'T', PositiveInt),
        OptionSpec::valued("populationSize", 'P', PositiveInt),
        OptionSpec::valued("errorAlgorithm", 'R', OneOf(&["rmse", "mse", "rrse", "rae"])),
        OptionSpec::valued("classificationWeight", 'W', UnitInterval),
        OptionSpec::valued("errorWeight", 'X', UnitInterval),
        OptionSpec::valued("ruleNumberWeight", 'Y', UnitInterval),
        OptionSpec::valued("varPerRuleNumberWeight", 'Z', UnitInterval),
        OptionSpec::valued("ruleNumber", 'N', PositiveInt),
    ],
};

// ---------------------------------------------------------------------------
// Clusterers and filters
// ---------------------------------------------------------------------------

pub const HIERARCHICAL_CLUSTERER: AlgorithmSpec = AlgorithmSpec {
    name: "HierarchicalClusterer",
    engine_class: "weka.clusterers.HierarchicalClusterer",
    kind: AlgorithmKind::Clusterer,
    outputs: &[],
    labels_always: false,
    requires: &[],
    options: &[
        OptionSpec::valued("numClusters", 'N', PositiveInt),
        OptionSpec::valued(
            "linkType",
            'L',
            OneOf(&[
                "SINGLE",
                "COMPLETE",
                "AVERAGE",
                "MEAN",
                "CENTROID",
                "WARD",
                "ADJCOMLPETE",
                "NEIGHBOR_JOINING",
            ]),
        ),
        OptionSpec::valued("distanceFunction", 'A', OneOf(DISTANCE_FUNCTIONS))
            .with_formatter(distance_function),
        OptionSpec::presence("print", 'P'),
        OptionSpec::presence("debug", 'D'),
        OptionSpec::presence("branchLength", 'B'),
    ],
};

pub const SIMPLE_K_MEANS: AlgorithmSpec = AlgorithmSpec {
    name: "KMeans",
    engine_class: "weka.clusterers.SimpleKMeans",
    kind: AlgorithmKind::Clusterer,
    outputs: &[Output::Centroids, Output::FrequencyCounts, Output::ClusterSizes],
    labels_always: true,
    requires: &[],
    options: &[
        OptionSpec::valued("numClusters", 'N', PositiveInt),
        OptionSpec::presence("stdDeviation", 'V'),
        OptionSpec::presence("missing", 'M'),
        OptionSpec::valued("seed", 'S', Integer),
        OptionSpec::valued("distanceFunction", 'A', OneOf(DISTANCE_FUNCTIONS))
            .with_formatter(distance_function),
        OptionSpec::valued("maxIter", 'I', PositiveInt),
        OptionSpec::presence("order", 'O'),
    ],
};

/// Principal components analysis filter.
pub const PCA: AlgorithmSpec = AlgorithmSpec {
    name: "PCA",
    engine_class: "weka.filters.unsupervised.attribute.PrincipalComponents",
    kind: AlgorithmKind::Filter,
    outputs: &[],
    labels_always: false,
    requires: &[],
    options: &[
        OptionSpec::presence("dontNormalize", 'D'),
        OptionSpec::valued("retain", 'R', UnitInterval),
        // -1 keeps everything
        OptionSpec::valued("maxAttributes", 'A', IntRange(-1, i64::MAX)),
        OptionSpec::valued("maxRetain", 'M', IntRange(-1, i64::MAX)),
    ],
};

pub const ALL: &[AlgorithmSpec] = &[
    J48,
    CITATION_KNN,
    MULTILAYER_PERCEPTRON,
    NB_TREE,
    SMO,
    JFUGE,
    HIERARCHICAL_CLUSTERER,
    SIMPLE_K_MEANS,
    PCA,
];

/// Case-insensitive lookup by short name.
pub fn by_name(name: &str) -> Option<&'static AlgorithmSpec> {
    ALL.iter().find(|a| a.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, OptionError};
    use serde_json::json;
    use std::collections::HashSet;

    fn flags(spec: &AlgorithmSpec, options: serde_json::Value) -> Vec<String> {
        let options = options.as_object().cloned().unwrap();
        spec.translate(&options, OptionPolicy::Strict).unwrap().flags
    }

    #[test]
    fn j48_unpruned_with_min_instances() {
        assert_eq!(flags(&J48, json!({"unpruned": true, "minInstances": 3})), vec!["-U", "-M", "3"]);
        assert!(flags(&J48, json!({"unpruned": false})).is_empty());
    }

    #[test]
    fn j48_order_ignores_key_order() {
        let a = flags(&J48, json!({"seed": 7, "binarySplits": true, "pruningConfidence": 0.1}));
        let b = flags(&J48, json!({"pruningConfidence": 0.1, "binarySplits": true, "seed": 7}));
        assert_eq!(a, vec!["-C", "0.1", "-B", "-Q", "7"]);
        assert_eq!(a, b);
    }

    #[test]
    fn mlp_normalisation_flags_keep_documented_order() {
        let got = flags(
            &MULTILAYER_PERCEPTRON,
            json!({"noAttributeNormalization": true, "noNumericNormalization": true, "hidden": [4, 2]}),
        );
        assert_eq!(got, vec!["-H", "4,2", "-C", "-I"]);
    }

    #[test]
    fn formatters_qualify_class_names() {
        assert_eq!(flags(&SMO, json!({"kernel": "RBFKernel"})), vec![
            "-K",
            "weka.classifiers.functions.supportVector.RBFKernel"
        ]);
        assert_eq!(
            flags(&SIMPLE_K_MEANS, json!({"numClusters": 3, "distanceFunction": "ManhattanDistance"})),
            vec!["-N", "3", "-A", "weka.core.ManhattanDistance"]
        );
    }

    #[test]
    fn rates_outside_unit_interval_fail() {
        let options = json!({"mutationRate": 1.2}).as_object().cloned().unwrap();
        let err = JFUGE.translate(&options, OptionPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            Error::Option(OptionError::OutOfDomain { ref key, .. }) if key == "mutationRate"
        ));
    }

    #[test]
    fn non_numeric_seed_is_rejected_or_dropped() {
        let options = json!({"seed": "abc", "unpruned": 1}).as_object().cloned().unwrap();
        assert!(J48.translate(&options, OptionPolicy::Strict).is_err());
        let t = J48.translate(&options, OptionPolicy::Lenient).unwrap();
        assert_eq!(t.flags, vec!["-U"]);
    }

    #[test]
    fn tournament_selection_needs_a_tournament_size() {
        let options = json!({"selectionAlgorithm": "tournament", "populationSize": 20})
            .as_object()
            .cloned()
            .unwrap();
        let err = JFUGE.translate(&options, OptionPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            Error::Option(OptionError::OutOfDomain { ref key, .. }) if key == "selectionAlgorithm"
        ));

        let lenient = JFUGE.translate(&options, OptionPolicy::Lenient).unwrap();
        assert_eq!(lenient.flags, vec!["-P", "20"]);

        assert_eq!(
            flags(&JFUGE, json!({"selectionAlgorithm": "tournament", "tournamentSize": 4})),
            vec!["-A", "tournament", "-T", "4"]
        );
        assert_eq!(flags(&JFUGE, json!({"selectionAlgorithm": "roulette"})), vec!["-A", "roulette"]);
    }

    #[test]
    fn result_requests_follow_the_algorithm() {
        let options = json!({"getCentroids": true, "distance": true, "system": 1})
            .as_object()
            .cloned()
            .unwrap();

        let kmeans = SIMPLE_K_MEANS.translate(&options, OptionPolicy::Strict).unwrap();
        assert_eq!(kmeans.outputs, vec![Output::Centroids]);
        assert!(kmeans.predict_labels);

        let knn = CITATION_KNN.translate(&options, OptionPolicy::Strict).unwrap();
        assert_eq!(knn.outputs, vec![Output::Distances]);
        assert!(!knn.predict_labels);

        let jfuge = JFUGE.translate(&options, OptionPolicy::Strict).unwrap();
        assert_eq!(jfuge.outputs, vec![Output::FuzzySystem]);
        assert!(jfuge.flags.is_empty());
    }

    #[test]
    fn flag_letters_are_unique_per_algorithm() {
        for algorithm in ALL {
            let mut seen = HashSet::new();
            for spec in algorithm.options {
                assert!(seen.insert(spec.flag), "{} repeats -{}", algorithm.name, spec.flag);
            }
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(by_name("kmeans").map(|a| a.kind), Some(AlgorithmKind::Clusterer));
        assert_eq!(by_name("pca").map(|a| a.engine_class), Some(PCA.engine_class));
        assert!(by_name("RandomForest").is_none());
    }
}
