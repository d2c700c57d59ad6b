use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::Gender;
use crate::normalizer::FaceNormalizer;
use crate::{Matrix, Vector};

/// Face matrix of one class: one normalized face per row.
#[derive(Clone, Debug)]
pub struct ClassFaces {
    pub gender: Gender,
    pub faces: Matrix,
    /// `(height, width)` of each face before flattening.
    pub face_shape: (usize, usize),
    /// Image files that produced the rows, in row order. Empty for in-memory data.
    pub sources: Vec<PathBuf>,
    /// Images left out because they could not be decoded or had no face.
    pub skipped: usize,
}

enum Outcome {
    Face(Vector),
    NotFound,
    Undecodable(image::ImageError),
}

impl ClassFaces {
    pub fn from_matrix(gender: Gender, faces: Matrix, face_shape: (usize, usize)) -> Result<Self> {
        if faces.ncols() != face_shape.0 * face_shape.1 {
            return Err(Error::dimension(format!(
                "{} faces have {} columns, expected {} for shape {:?}",
                gender,
                faces.ncols(),
                face_shape.0 * face_shape.1,
                face_shape
            )));
        }

        Ok(Self {
            gender,
            faces,
            face_shape,
            sources: Vec::new(),
            skipped: 0,
        })
    }

    /// Loads up to `max_faces` images from `<root>/<Gender>` and normalizes
    /// them in parallel. Images without a usable face are skipped.
    pub fn load<N>(root: &Path, gender: Gender, max_faces: usize, normalizer: &N) -> Result<Self>
    where
        N: FaceNormalizer + Sync + ?Sized,
    {
        let dir = root.join(gender.dir_name());
        let paths = list_images(&dir, max_faces)?;
        let face_shape = normalizer.face_shape();
        let width = face_shape.0 * face_shape.1;

        info!("Loading up to {} {} faces from '{}'", max_faces, gender, dir.display());

        let outcomes: Vec<(PathBuf, Outcome)> = paths
            .into_par_iter()
            .map(|path| {
                let outcome = normalize_file(&path, normalizer);
                (path, outcome)
            })
            .collect();

        let mut data = Vec::with_capacity(outcomes.len() * width);
        let mut sources = Vec::with_capacity(outcomes.len());
        let mut skipped = 0;

        for (path, outcome) in outcomes {
            match outcome {
                Outcome::Face(face) => {
                    if face.len() != width {
                        return Err(Error::dimension(format!(
                            "normalizer produced {} values for '{}', expected {}",
                            face.len(),
                            path.display(),
                            width
                        )));
                    }
                    debug!("Loaded {}", path.display());
                    data.extend(face.iter().copied());
                    sources.push(path);
                }
                Outcome::NotFound => {
                    debug!("No face found in {}, skipping", path.display());
                    skipped += 1;
                }
                Outcome::Undecodable(err) => {
                    warn!("Cannot decode {}: {}, skipping", path.display(), err);
                    skipped += 1;
                }
            }
        }

        if sources.is_empty() {
            return Err(Error::InsufficientData {
                class: gender.to_string(),
                found: 0,
                required: 1,
            });
        }

        let faces = Matrix::from_shape_vec((sources.len(), width), data)
            .map_err(|e| Error::dimension(e.to_string()))?;

        info!("{}: {} usable faces, {} skipped", gender, sources.len(), skipped);

        Ok(Self {
            gender,
            faces,
            face_shape,
            sources,
            skipped,
        })
    }

    pub fn n_faces(&self) -> usize {
        self.faces.nrows()
    }

    pub fn width(&self) -> usize {
        self.faces.ncols()
    }
}

/// Regular files in `dir`, sorted by name, truncated to `max_faces`.
pub fn list_images(dir: &Path, max_faces: usize) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    paths.truncate(max_faces);
    Ok(paths)
}

fn normalize_file<N>(path: &Path, normalizer: &N) -> Outcome
where
    N: FaceNormalizer + ?Sized,
{
    match image::open(path) {
        Ok(image) => match normalizer.normalize(&image.to_luma8()) {
            Some(face) => Outcome::Face(face),
            None => Outcome::NotFound,
        },
        Err(err) => Outcome::Undecodable(err),
    }
}
