use eigenswap::metrics::{max_absolute_error, mean_squared_error};
use eigenswap::render::comparison_image;
use eigenswap::{ClassFaces, Gender, Matrix, Trainer, TrainingConfig, Transformer, Vector};
use ndarray::{s, Array2, Axis};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use tracing_subscriber::EnvFilter;

const FACE_SHAPE: (usize, usize) = (16, 16);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Eigenface Gender Swap ===\n");

    let width = FACE_SHAPE.0 * FACE_SHAPE.1;
    let mut rng = StdRng::seed_from_u64(42);

    // Both classes share a low-rank set of latent features. The female class
    // renders them through a slightly different mixing matrix plus an offset.
    let latent_dim = 6;
    let mixing: Matrix = Array2::random_using((latent_dim, width), Uniform::new(-0.3, 0.3), &mut rng);
    let shift: Matrix = Array2::random_using((latent_dim, width), Uniform::new(-0.05, 0.05), &mut rng);
    let offset: Vector = Array2::random_using((1, width), Uniform::new(-0.1, 0.1), &mut rng).row(0).to_owned();

    let n_train = 40;
    let n_test = 10;
    let latent: Matrix = Array2::random_using((n_train + n_test, latent_dim), Uniform::new(-1.0, 1.0), &mut rng);
    let noise: Matrix = Array2::random_using((n_train + n_test, width), Uniform::new(-0.01, 0.01), &mut rng);

    let male_all = latent.dot(&mixing) + &noise;
    let female_all = latent.dot(&(&mixing + &shift)) + &offset + &noise;

    println!("Faces: {} train / {} held out per class, {} pixels each", n_train, n_test, width);

    let male = ClassFaces::from_matrix(Gender::Male, male_all.slice(s![..n_train, ..]).to_owned(), FACE_SHAPE)?;
    let female = ClassFaces::from_matrix(Gender::Female, female_all.slice(s![..n_train, ..]).to_owned(), FACE_SHAPE)?;

    for &n_eigenfaces in &[4, 8, 16] {
        let config = TrainingConfig {
            max_eigenfaces: n_eigenfaces,
            max_faces: n_train,
        };
        let trained = Trainer::new(config).fit(&male, &female)?;
        let model = &trained.model;
        let transformer = Transformer::new(model);

        let captured: f64 = model.basis(Gender::Male).explained_variance_ratio().sum();
        println!("\n--- {} eigenfaces ---", n_eigenfaces);
        println!("Male variance captured:   {:.4}", captured);
        println!(
            "Male->female residual:    {:.6} (rank {})",
            trained.summary.male_to_female.total_residual(),
            trained.summary.male_to_female.rank
        );
        println!(
            "Female->male residual:    {:.6} (rank {})",
            trained.summary.female_to_male.total_residual(),
            trained.summary.female_to_male.rank
        );

        let held_out_male = male_all.slice(s![n_train.., ..]).to_owned();
        let held_out_female = female_all.slice(s![n_train.., ..]).to_owned();
        let swapped = transformer.swap_batch(Gender::Male, &held_out_male)?;

        let mut total = 0.0;
        let mut worst: f64 = 0.0;
        for (pred, truth) in swapped.axis_iter(Axis(0)).zip(held_out_female.axis_iter(Axis(0))) {
            let (pred, truth) = (pred.to_owned(), truth.to_owned());
            total += mean_squared_error(&truth, &pred)?;
            worst = worst.max(max_absolute_error(&truth, &pred)?);
        }
        println!("Held-out swap MSE:        {:.6}", total / n_test as f64);
        println!("Held-out max pixel error: {:.6}", worst);
    }

    let trained = Trainer::new(TrainingConfig {
        max_eigenfaces: 8,
        max_faces: n_train,
    })
    .fit(&male, &female)?;

    let face = male_all.row(n_train).to_owned();
    let altered = Transformer::new(&trained.model).swap(Gender::Male, &face)?;
    let original = face.into_shape_with_order(FACE_SHAPE)?;
    let altered = altered.into_shape_with_order(FACE_SHAPE)?;

    let path = std::env::temp_dir().join("eigenswap_comparison.png");
    comparison_image(&original, &altered)?.save(&path)?;
    println!("\nComparison image written to {}", path.display());

    Ok(())
}
