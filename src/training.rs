//! Training pipeline: load both classes, build their eigenface bases, fit the
//! two transitions and assemble a [`FaceSwapModel`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::ClassFaces;
use crate::decomposition::Eigenfaces;
use crate::error::{Error, Result};
use crate::linear_model::{TransitionDiagnostics, TransitionLearner};
use crate::model::{FaceSwapModel, Gender};
use crate::normalizer::FaceNormalizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Eigenfaces kept per class.
    pub max_eigenfaces: usize,
    /// Images read per class directory.
    pub max_faces: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_eigenfaces: 40,
            max_faces: 200,
        }
    }
}

impl TrainingConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_eigenfaces == 0 {
            return Err(Error::InvalidConfig("max_eigenfaces must be positive".to_string()));
        }
        if self.max_faces < self.max_eigenfaces {
            return Err(Error::InvalidConfig(format!(
                "max_faces ({}) must be at least max_eigenfaces ({})",
                self.max_faces, self.max_eigenfaces
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    pub gender: Gender,
    pub usable: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub male: ClassSummary,
    pub female: ClassSummary,
    pub male_to_female: TransitionDiagnostics,
    pub female_to_male: TransitionDiagnostics,
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: FaceSwapModel,
    pub summary: TrainingSummary,
}

pub struct Trainer {
    config: TrainingConfig,
    learner: TransitionLearner,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            learner: TransitionLearner::new(),
        }
    }

    pub fn with_learner(mut self, learner: TransitionLearner) -> Self {
        self.learner = learner;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains from `<dataset_root>/Male` and `<dataset_root>/Female`.
    pub fn train<N>(&self, dataset_root: impl AsRef<Path>, normalizer: &N) -> Result<TrainedModel>
    where
        N: FaceNormalizer + Sync + ?Sized,
    {
        self.config.validate()?;
        let root = dataset_root.as_ref();
        info!("Training from '{}'", root.display());

        let male = ClassFaces::load(root, Gender::Male, self.config.max_faces, normalizer)?;
        let female = ClassFaces::load(root, Gender::Female, self.config.max_faces, normalizer)?;

        self.fit(&male, &female)
    }

    /// Trains from face matrices already in memory.
    pub fn fit(&self, male: &ClassFaces, female: &ClassFaces) -> Result<TrainedModel> {
        self.config.validate()?;

        for (class, expected) in [(male, Gender::Male), (female, Gender::Female)] {
            if class.gender != expected {
                return Err(Error::InvalidConfig(format!(
                    "expected {} faces, got {} faces",
                    expected, class.gender
                )));
            }
            if class.n_faces() < self.config.max_eigenfaces {
                return Err(Error::InsufficientData {
                    class: class.gender.to_string(),
                    found: class.n_faces(),
                    required: self.config.max_eigenfaces,
                });
            }
        }

        if male.face_shape != female.face_shape {
            return Err(Error::dimension(format!(
                "male faces are {:?} but female faces are {:?}",
                male.face_shape, female.face_shape
            )));
        }

        let eigenfaces = Eigenfaces::new(self.config.max_eigenfaces);
        let male_basis = eigenfaces.fit(&male.faces)?;
        let female_basis = eigenfaces.fit(&female.faces)?;
        info!(
            "Eigenfaces: male {:?}, female {:?}",
            male_basis.components().shape(),
            female_basis.components().shape()
        );

        // Each direction is fitted on faces of the class it maps into.
        let male_to_female = self.learner.fit(&male_basis, &female_basis, &female.faces)?;
        let female_to_male = self.learner.fit(&female_basis, &male_basis, &male.faces)?;

        for (name, fit) in [("male->female", &male_to_female), ("female->male", &female_to_male)] {
            info!(
                "{}: rank {}, residual {:.6}",
                name,
                fit.diagnostics.rank,
                fit.diagnostics.total_residual()
            );
        }

        let model = FaceSwapModel::new(
            male_basis,
            female_basis,
            male_to_female.transition,
            female_to_male.transition,
            male.face_shape,
        )?;

        Ok(TrainedModel {
            model,
            summary: TrainingSummary {
                male: ClassSummary {
                    gender: Gender::Male,
                    usable: male.n_faces(),
                    skipped: male.skipped,
                },
                female: ClassSummary {
                    gender: Gender::Female,
                    usable: female.n_faces(),
                    skipped: female.skipped,
                },
                male_to_female: male_to_female.diagnostics,
                female_to_male: female_to_male.diagnostics,
            },
        })
    }
}

/// Trains a model from a dataset directory with the given configuration and
/// normalizer.
pub fn train<N>(dataset_root: impl AsRef<Path>, config: &TrainingConfig, normalizer: &N) -> Result<TrainedModel>
where
    N: FaceNormalizer + Sync + ?Sized,
{
    Trainer::new(config.clone()).train(dataset_root, normalizer)
}
