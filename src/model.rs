use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decomposition::EigenfaceBasis;
use crate::error::{Error, Result};
use crate::linear_model::TransitionMatrix;

/// The two face classes. Their names double as dataset subfolder names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn dir_name(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub fn opposite(self) -> Gender {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Trained eigenface bases of both classes and the transitions between them.
///
/// Read-only after construction; share it by reference across threads for
/// inference.
///
/// # Usage
///
/// ```ignore
/// let model = FaceSwapModel::load("faces.model")?;
/// let altered = Transformer::new(&model).swap(Gender::Male, &face)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSwapModel {
    male_basis: EigenfaceBasis,
    female_basis: EigenfaceBasis,
    /// `e_female x e_male`.
    male_to_female: TransitionMatrix,
    /// `e_male x e_female`.
    female_to_male: TransitionMatrix,
    /// `(height, width)` of the normalized faces.
    face_shape: (usize, usize),
}

impl FaceSwapModel {
    pub fn new(
        male_basis: EigenfaceBasis,
        female_basis: EigenfaceBasis,
        male_to_female: TransitionMatrix,
        female_to_male: TransitionMatrix,
        face_shape: (usize, usize),
    ) -> Result<Self> {
        let model = Self {
            male_basis,
            female_basis,
            male_to_female,
            female_to_male,
            face_shape,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let width = self.face_shape.0.checked_mul(self.face_shape.1).ok_or_else(|| {
            Error::dimension(format!("face shape {:?} is too large", self.face_shape))
        })?;

        for gender in Gender::ALL {
            let basis = self.basis(gender);
            if basis.width() != width {
                return Err(Error::dimension(format!(
                    "{} basis width {} doesn't match face shape {:?}",
                    gender,
                    basis.width(),
                    self.face_shape
                )));
            }
            if basis.n_components() == 0 {
                return Err(Error::dimension(format!("{} basis is empty", gender)));
            }

            let transition = self.transition(gender);
            let target = self.basis(gender.opposite());
            if transition.source_dim() != basis.n_components()
                || transition.target_dim() != target.n_components()
            {
                return Err(Error::dimension(format!(
                    "{} -> {} transition is {}x{}, expected {}x{}",
                    gender,
                    gender.opposite(),
                    transition.target_dim(),
                    transition.source_dim(),
                    target.n_components(),
                    basis.n_components()
                )));
            }
        }

        Ok(())
    }

    pub fn basis(&self, gender: Gender) -> &EigenfaceBasis {
        match gender {
            Gender::Male => &self.male_basis,
            Gender::Female => &self.female_basis,
        }
    }

    /// Transition out of `from` into the opposite class.
    pub fn transition(&self, from: Gender) -> &TransitionMatrix {
        match from {
            Gender::Male => &self.male_to_female,
            Gender::Female => &self.female_to_male,
        }
    }

    pub fn face_shape(&self) -> (usize, usize) {
        self.face_shape
    }

    /// Length of the face vectors the model accepts.
    pub fn width(&self) -> usize {
        self.face_shape.0.saturating_mul(self.face_shape.1)
    }

    /// Load a model from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let model: Self = bincode::deserialize(&bytes)?;
        model.validate()?;
        Ok(model)
    }

    /// Save the model to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = bincode::serialize(self)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}
