use log::{debug, info};
use serde::Serialize;

use crate::config::FacadeConfig;
use crate::data::loader::{load, DataSource, FileLoader, LoadRequest};
use crate::data::model::{ClassSetup, Dataset};
use crate::error::{EngineError, OptionError, Result};
use crate::options::algorithms::{AlgorithmKind, AlgorithmSpec};
use crate::options::{ConfigObject, Output, Translation};

// ---------------------------------------------------------------------------
// Engine boundary
// ---------------------------------------------------------------------------

/// The external machine-learning engine. Training and inference are opaque
/// blocking calls; nothing here assumes a model may be used concurrently.
pub trait Engine: FileLoader {
    type Model;

    fn create_classifier(
        &self,
        algorithm: &AlgorithmSpec,
        flags: &[String],
        train: &Dataset,
    ) -> anyhow::Result<Self::Model>;

    fn create_clusterer(
        &self,
        algorithm: &AlgorithmSpec,
        flags: &[String],
        train: &Dataset,
    ) -> anyhow::Result<Self::Model>;

    /// Class (or cluster) membership probabilities for one instance.
    fn distribution_for_instance(
        &self,
        model: &mut Self::Model,
        data: &Dataset,
        row: usize,
    ) -> anyhow::Result<Vec<f64>>;

    /// Most likely class, as the engine's class value.
    fn classify_instance(&self, model: &mut Self::Model, data: &Dataset, row: usize) -> anyhow::Result<f64>;

    fn cluster_instance(&self, model: &mut Self::Model, data: &Dataset, row: usize) -> anyhow::Result<usize>;

    fn set_options(&self, model: &mut Self::Model, flags: &[String]) -> anyhow::Result<bool>;

    fn use_filter(&self, algorithm: &AlgorithmSpec, flags: &[String], data: &Dataset) -> anyhow::Result<Dataset>;

    /// Distance between two instances of `data` under the model's metric.
    fn distance(&self, _model: &mut Self::Model, _data: &Dataset, _a: usize, _b: usize) -> anyhow::Result<f64> {
        unsupported("distance")
    }

    fn cluster_centroids(&self, _model: &mut Self::Model) -> anyhow::Result<Dataset> {
        unsupported("cluster centroids")
    }

    /// Per cluster, per attribute, per value counts.
    fn cluster_frequency_counts(&self, _model: &mut Self::Model) -> anyhow::Result<Vec<Vec<Vec<f64>>>> {
        unsupported("cluster frequency counts")
    }

    fn cluster_sizes(&self, _model: &mut Self::Model) -> anyhow::Result<Vec<f64>> {
        unsupported("cluster sizes")
    }

    /// Textual form of the evolved fuzzy system.
    fn fuzzy_system(&self, _model: &mut Self::Model) -> anyhow::Result<String> {
        unsupported("a fuzzy system")
    }
}

fn unsupported<T>(what: &str) -> anyhow::Result<T> {
    Err(anyhow::anyhow!("engine does not provide {what}"))
}

/// A trained model. Every call takes `&mut self`, so calls against one
/// handle are serialized.
pub struct ModelHandle<'e, E: Engine> {
    engine: &'e E,
    algorithm: AlgorithmSpec,
    config: &'e FacadeConfig,
    model: E::Model,
}

impl<'e, E: Engine> ModelHandle<'e, E> {
    pub fn algorithm(&self) -> &AlgorithmSpec {
        &self.algorithm
    }

    pub fn distribution_for_instance(&mut self, data: &Dataset, row: usize) -> Result<Vec<f64>> {
        self.engine
            .distribution_for_instance(&mut self.model, data, row)
            .map_err(|e| EngineError::new("distribution_for_instance", e).into())
    }

    pub fn classify_instance(&mut self, data: &Dataset, row: usize) -> Result<f64> {
        self.engine
            .classify_instance(&mut self.model, data, row)
            .map_err(|e| EngineError::new("classify_instance", e).into())
    }

    pub fn cluster_instance(&mut self, data: &Dataset, row: usize) -> Result<usize> {
        self.engine
            .cluster_instance(&mut self.model, data, row)
            .map_err(|e| EngineError::new("cluster_instance", e).into())
    }

    /// Row-major `n x n` distances between every pair of instances.
    pub fn distances(&mut self, data: &Dataset) -> Result<Vec<Vec<f64>>> {
        let n = data.len();
        let mut matrix = Vec::with_capacity(n);
        for a in 0..n {
            let mut row = Vec::with_capacity(n);
            for b in 0..n {
                let d = self
                    .engine
                    .distance(&mut self.model, data, a, b)
                    .map_err(|e| EngineError::new("distance", e))?;
                row.push(d);
            }
            matrix.push(row);
        }
        Ok(matrix)
    }

    pub fn cluster_centroids(&mut self) -> Result<Dataset> {
        self.engine
            .cluster_centroids(&mut self.model)
            .map_err(|e| EngineError::new("cluster_centroids", e).into())
    }

    pub fn cluster_frequency_counts(&mut self) -> Result<Vec<Vec<Vec<f64>>>> {
        self.engine
            .cluster_frequency_counts(&mut self.model)
            .map_err(|e| EngineError::new("cluster_frequency_counts", e).into())
    }

    pub fn cluster_sizes(&mut self) -> Result<Vec<f64>> {
        self.engine
            .cluster_sizes(&mut self.model)
            .map_err(|e| EngineError::new("cluster_sizes", e).into())
    }

    pub fn fuzzy_system(&mut self) -> Result<String> {
        self.engine
            .fuzzy_system(&mut self.model)
            .map_err(|e| EngineError::new("fuzzy_system", e).into())
    }

    /// Re-translate `options` against this model's table and apply the
    /// flags. Returns the engine's acceptance flag.
    pub fn set_options(&mut self, options: &ConfigObject) -> Result<bool> {
        let translation = self.algorithm.translate(options, self.config.option_policy)?;
        self.engine
            .set_options(&mut self.model, &translation.flags)
            .map_err(|e| EngineError::new("set_options", e).into())
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationReport {
    pub distribution_for_instance: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classify_instance: Option<Vec<f64>>,
    /// Percentage of test instances whose most probable class is their own.
    /// `None` for an empty test set.
    pub classification_rate: Option<f64>,
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringReport {
    pub distribution_for_instance: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_instance: Option<Vec<usize>>,
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centroids: Option<Dataset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_counts: Option<Vec<Vec<Vec<f64>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_sizes: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterReport {
    pub filtered_data: Dataset,
    pub classes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// Runs the translate → load → train → query pipeline against one engine.
pub struct Facade<E> {
    engine: E,
    config: FacadeConfig,
}

impl<E: Engine> Facade<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, FacadeConfig::default())
    }

    pub fn with_config(engine: E, config: FacadeConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    /// Translate `options` for `algorithm` under the configured policy.
    pub fn translate(&self, algorithm: &AlgorithmSpec, options: &ConfigObject) -> Result<Translation> {
        algorithm.translate(options, self.config.option_policy)
    }

    /// Load one source with the schema settings carried by `translation`.
    pub fn load(&self, source: &DataSource, translation: &Translation, is_classification_data: bool) -> Result<Dataset> {
        let class = ClassSetup::from_options(is_classification_data, translation.class_index)?;
        let request = LoadRequest {
            name: Some(
                translation
                    .dataset_name
                    .as_deref()
                    .unwrap_or(self.config.default_dataset_name.as_str()),
            ),
            overrides: translation.overrides.as_deref(),
            class,
        };
        load(source, &request, &self.engine)
    }

    /// Load a train/test pair and check the test set fits the training schema.
    fn load_pair(
        &self,
        train: &DataSource,
        test: &DataSource,
        translation: &Translation,
        is_classification_data: bool,
    ) -> Result<(Dataset, Dataset)> {
        let train_data = self.load(train, translation, is_classification_data)?;
        let test_data = self.load(test, translation, is_classification_data)?;
        train_data.check_compatible(&test_data)?;
        Ok((train_data, test_data))
    }

    /// Translate, load and train, returning the model and its training set.
    pub fn train(
        &self,
        algorithm: &AlgorithmSpec,
        train: &DataSource,
        options: &ConfigObject,
    ) -> Result<(ModelHandle<'_, E>, Dataset)> {
        let translation = self.translate(algorithm, options)?;
        let is_classification = match algorithm.kind {
            AlgorithmKind::Classifier => true,
            AlgorithmKind::Clusterer => false,
            AlgorithmKind::Filter => return Err(wrong_kind(algorithm, AlgorithmKind::Classifier)),
        };
        let data = self.load(train, &translation, is_classification)?;
        let model = self.fit(algorithm, &translation, &data)?;
        Ok((model, data))
    }

    fn fit(&self, algorithm: &AlgorithmSpec, translation: &Translation, data: &Dataset) -> Result<ModelHandle<'_, E>> {
        info!(
            "training {} on '{}' ({} instances) with flags {:?}",
            algorithm.name,
            data.name(),
            data.len(),
            translation.flags
        );
        let model = match algorithm.kind {
            AlgorithmKind::Classifier => self
                .engine
                .create_classifier(algorithm, &translation.flags, data)
                .map_err(|e| EngineError::new("create_classifier", e))?,
            AlgorithmKind::Clusterer => self
                .engine
                .create_clusterer(algorithm, &translation.flags, data)
                .map_err(|e| EngineError::new("create_clusterer", e))?,
            AlgorithmKind::Filter => return Err(wrong_kind(algorithm, AlgorithmKind::Classifier)),
        };
        Ok(ModelHandle {
            engine: &self.engine,
            algorithm: *algorithm,
            config: &self.config,
            model,
        })
    }

    /// Train a classifier on `train` and score every instance of `test`.
    pub fn classify(
        &self,
        algorithm: &AlgorithmSpec,
        train: &DataSource,
        test: &DataSource,
        options: &ConfigObject,
    ) -> Result<ClassificationReport> {
        expect_kind(algorithm, AlgorithmKind::Classifier)?;
        let translation = self.translate(algorithm, options)?;
        let (train_data, test_data) = self.load_pair(train, test, &translation, true)?;
        let mut model = self.fit(algorithm, &translation, &train_data)?;

        let distribution_for_instance = (0..test_data.len())
            .map(|row| model.distribution_for_instance(&test_data, row))
            .collect::<Result<Vec<_>>>()?;
        let distance = if translation.wants(Output::Distances) {
            Some(model.distances(&test_data)?)
        } else {
            None
        };
        let system = if translation.wants(Output::FuzzySystem) {
            Some(model.fuzzy_system()?)
        } else {
            None
        };
        let classify_instance = if translation.predict_labels {
            Some(
                (0..test_data.len())
                    .map(|row| model.classify_instance(&test_data, row))
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        let classification_rate = classification_rate(&test_data, &distribution_for_instance);
        debug!("{} classification rate: {classification_rate:?}", algorithm.name);

        Ok(ClassificationReport {
            distribution_for_instance,
            classify_instance,
            classification_rate,
            classes: class_labels(&train_data),
            distance,
            system,
        })
    }

    /// Train a clusterer on `train` and assign every instance of `test`.
    pub fn cluster(
        &self,
        algorithm: &AlgorithmSpec,
        train: &DataSource,
        test: &DataSource,
        options: &ConfigObject,
    ) -> Result<ClusteringReport> {
        expect_kind(algorithm, AlgorithmKind::Clusterer)?;
        let translation = self.translate(algorithm, options)?;
        let (train_data, test_data) = self.load_pair(train, test, &translation, false)?;
        let mut model = self.fit(algorithm, &translation, &train_data)?;

        let distribution_for_instance = (0..test_data.len())
            .map(|row| model.distribution_for_instance(&test_data, row))
            .collect::<Result<Vec<_>>>()?;
        let cluster_instance = if translation.predict_labels {
            Some(
                (0..test_data.len())
                    .map(|row| model.cluster_instance(&test_data, row))
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        let centroids = if translation.wants(Output::Centroids) {
            Some(model.cluster_centroids()?)
        } else {
            None
        };
        let frequency_counts = if translation.wants(Output::FrequencyCounts) {
            Some(model.cluster_frequency_counts()?)
        } else {
            None
        };
        let cluster_sizes = if translation.wants(Output::ClusterSizes) {
            Some(model.cluster_sizes()?)
        } else {
            None
        };

        Ok(ClusteringReport {
            distribution_for_instance,
            cluster_instance,
            classes: train_data.attribute_names(),
            centroids,
            frequency_counts,
            cluster_sizes,
        })
    }

    /// Run a filter over `data`.
    pub fn filter(&self, algorithm: &AlgorithmSpec, data: &DataSource, options: &ConfigObject) -> Result<FilterReport> {
        expect_kind(algorithm, AlgorithmKind::Filter)?;
        let translation = self.translate(algorithm, options)?;
        let input = self.load(data, &translation, false)?;
        info!("filtering '{}' with {} {:?}", input.name(), algorithm.name, translation.flags);

        let filtered_data = self
            .engine
            .use_filter(algorithm, &translation.flags, &input)
            .map_err(|e| EngineError::new("use_filter", e))?;
        Ok(FilterReport {
            filtered_data,
            classes: input.attribute_names(),
        })
    }
}

fn expect_kind(algorithm: &AlgorithmSpec, expected: AlgorithmKind) -> Result<()> {
    if algorithm.kind == expected {
        Ok(())
    } else {
        Err(wrong_kind(algorithm, expected))
    }
}

fn wrong_kind(algorithm: &AlgorithmSpec, expected: AlgorithmKind) -> crate::error::Error {
    OptionError::WrongAlgorithmKind {
        algorithm: algorithm.name,
        expected: expected.label(),
        actual: algorithm.kind.label(),
    }
    .into()
}

/// Percentage of instances whose arg-max class equals their class value.
/// Ties go to the lowest index; a missing class value counts as a miss.
pub fn classification_rate(test: &Dataset, distributions: &[Vec<f64>]) -> Option<f64> {
    if test.is_empty() {
        return None;
    }
    let hits = distributions
        .iter()
        .enumerate()
        .filter(|(row, dist)| test.class_value(*row) == Some(arg_max(dist)))
        .count();
    Some(hits as f64 * 100.0 / test.len() as f64)
}

fn arg_max(values: &[f64]) -> usize {
    let mut best = 0;
    let mut max = 0.0;
    for (i, &v) in values.iter().enumerate() {
        if v > max {
            max = v;
            best = i;
        }
    }
    best
}

/// Nominal values of the class attribute, or attribute names when the class
/// is not nominal.
fn class_labels(data: &Dataset) -> Vec<String> {
    data.class_attribute()
        .and_then(|a| a.values())
        .map(<[String]>::to_vec)
        .unwrap_or_else(|| data.attribute_names())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::builder::build;
    use crate::data::model::{Attribute, AttributeType, Cell};

    fn labelled(classes: &[&str]) -> Dataset {
        let attrs = vec![
            Attribute::numeric(0),
            Attribute {
                index: 1,
                name: "class".into(),
                ty: AttributeType::Nominal(vec!["a".into(), "b".into()]),
            },
        ];
        let rows: Vec<Vec<Cell>> = classes
            .iter()
            .map(|c| vec![Cell::from(1), Cell::from(*c)])
            .collect();
        build(None, attrs, &rows, ClassSetup::EngineDefault).unwrap()
    }

    #[test]
    fn rate_counts_arg_max_hits() {
        let test = labelled(&["a", "b", "b", ""]);
        let dists = vec![
            vec![0.9, 0.1],
            vec![0.2, 0.8],
            vec![0.5, 0.5],
            vec![0.0, 1.0],
        ];
        // third is a tie (resolves to "a"), fourth has a missing class
        assert_eq!(classification_rate(&test, &dists), Some(50.0));
    }

    #[test]
    fn rate_is_undefined_for_empty_test_set() {
        assert_eq!(classification_rate(&labelled(&[]), &[]), None);
    }

    #[test]
    fn class_labels_prefer_nominal_values() {
        assert_eq!(class_labels(&labelled(&["a"])), vec!["a", "b"]);
    }
}
