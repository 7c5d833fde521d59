use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use motion_estimation_rs::batch::{filter_measurements, filter_orientation, SensorStream};
use motion_estimation_rs::filters::ahrs::{normalized, quat_multiply};
use motion_estimation_rs::kinematics::{
    accel_mag_to_quaternion, chordal_distance, euler_to_quaternion, euler_to_rotation, is_rotation,
    quaternion_to_rotation, rotation_to_quaternion, MAX_CHORDAL_DISTANCE,
};
use motion_estimation_rs::types::KalmanSnapshot;
use motion_estimation_rs::{
    AhrsAlgorithm, EstimatorConfig, GaussianState, KalmanConfig, KalmanFilter, Quat, Vec3,
};
use nalgebra::DMatrix;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "estimation_demo")]
#[command(about = "Kalman and orientation filter demos on synthetic data", long_about = None)]
struct Args {
    /// Estimator configuration (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter three noisy synthetic signals
    Kalman {
        /// Number of samples over 5 seconds
        #[arg(long, default_value = "250")]
        samples: usize,

        /// Measurement noise std
        #[arg(long, default_value = "0.01")]
        noise_std: f64,

        #[arg(long, value_enum, default_value = "identity")]
        model: KalmanModel,

        #[arg(long, default_value = "7")]
        seed: u64,

        /// Write estimates and summary as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Track a synthetic constant-rate rotation with Madgwick and Mahony
    Ahrs {
        /// Simulated duration in seconds
        #[arg(long, default_value = "20.0")]
        seconds: f64,

        /// Body rotation rate [deg/s]
        #[arg(long, default_value = "30.0")]
        rate: f64,

        /// Constant gyro bias [deg/s]
        #[arg(long, default_value = "0.5")]
        gyro_bias: f64,

        /// Drop the magnetometer (IMU-only updates)
        #[arg(long)]
        no_mag: bool,

        #[arg(long, default_value = "7")]
        seed: u64,
    },

    /// Random rotation construction and chordal distance checks
    Selftest {
        #[arg(long, default_value = "1000")]
        trials: usize,

        /// Print every generated input
        #[arg(long)]
        debug: bool,

        #[arg(long, default_value = "7")]
        seed: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KalmanModel {
    /// A = H = I, Q = 0.5·I, R = 0.01·I
    Identity,
    /// Constant-acceleration model from the loaded configuration
    ConstantAcceleration,
}

#[derive(Serialize)]
struct KalmanReport {
    samples: usize,
    raw_rmse: f64,
    filtered_rmse: f64,
    final_state: KalmanSnapshot,
    truth: Vec<[f64; 3]>,
    measurements: Vec<[f64; 3]>,
    estimates: Vec<[f64; 3]>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &args.config {
        Some(path) => EstimatorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EstimatorConfig::default(),
    };

    match args.command {
        Command::Kalman {
            samples,
            noise_std,
            model,
            seed,
            output,
        } => run_kalman(&config, samples, noise_std, model, seed, output),
        Command::Ahrs {
            seconds,
            rate,
            gyro_bias,
            no_mag,
            seed,
        } => run_ahrs(&config, seconds, rate, gyro_bias, !no_mag, seed),
        Command::Selftest { trials, debug, seed } => run_selftest(trials, debug, seed),
    }
}

/// `w0·sin(w1·t)·cos(w2·t)` with random weights in [0, 2)
fn gen_signal(t: &[f64], rng: &mut StdRng) -> Vec<f64> {
    let w: [f64; 3] = [rng.gen::<f64>() * 2.0, rng.gen::<f64>() * 2.0, rng.gen::<f64>() * 2.0];
    t.iter()
        .map(|&ti| w[0] * (w[1] * ti).sin() * (w[2] * ti).cos())
        .collect()
}

fn rmse(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let diff = a - b;
    (diff.mapv(|d| d * d).sum() / diff.len().max(1) as f64).sqrt()
}

fn rows3(m: &Array2<f64>) -> Vec<[f64; 3]> {
    m.axis_iter(Axis(0)).map(|r| [r[0], r[1], r[2]]).collect()
}

fn run_kalman(
    config: &EstimatorConfig,
    samples: usize,
    noise_std: f64,
    model: KalmanModel,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    if samples == 0 {
        bail!("need at least one sample");
    }
    let dt = 5.0 / samples as f64;
    let t: Vec<f64> = (0..samples).map(|i| i as f64 * dt).collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, noise_std).context("invalid noise std")?;

    let mut truth = Array2::<f64>::zeros((samples, 3));
    for axis in 0..3 {
        for (i, v) in gen_signal(&t, &mut rng).into_iter().enumerate() {
            truth[[i, axis]] = v;
        }
    }
    let measurements = truth.mapv(|v| v + noise.sample(&mut rng));

    let (filter, initial): (KalmanFilter, GaussianState) = match model {
        KalmanModel::Identity => (
            KalmanFilter::new(
                DMatrix::identity(3, 3),
                DMatrix::identity(3, 3) * 0.5,
                DMatrix::identity(3, 3),
                DMatrix::identity(3, 3) * 0.01,
            )?,
            GaussianState::with_variance(3, 1.0),
        ),
        KalmanModel::ConstantAcceleration => {
            let kalman = KalmanConfig {
                dt,
                ..config.kalman.clone()
            };
            let filter = kalman.constant_acceleration_filter(KalmanConfig::position_measurement_matrix())?;
            let dim = filter.state_dim();
            (filter, GaussianState::with_variance(dim, 1.0))
        }
    };
    log::debug!(
        "{:?} model: {} states, {} measurements, dt = {dt:.4}",
        model,
        filter.state_dim(),
        filter.measurement_dim()
    );

    let (history, last) = filter_measurements(&filter, &initial, measurements.view())?;
    let estimates = history.slice(ndarray::s![.., 0..3]).to_owned();

    let raw_rmse = rmse(&measurements, &truth);
    let filtered_rmse = rmse(&estimates, &truth);
    println!("Kalman demo ({samples} samples, {model:?} model)");
    println!("  raw RMSE:      {raw_rmse:.5}");
    println!("  filtered RMSE: {filtered_rmse:.5}");

    if let Some(path) = output {
        let report = KalmanReport {
            samples,
            raw_rmse,
            filtered_rmse,
            final_state: last.snapshot(),
            truth: rows3(&truth),
            measurements: rows3(&measurements),
            estimates: rows3(&estimates),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("  wrote {}", path.display());
    }
    Ok(())
}

fn run_ahrs(
    config: &EstimatorConfig,
    seconds: f64,
    rate_dps: f64,
    gyro_bias_dps: f64,
    with_mag: bool,
    seed: u64,
) -> Result<()> {
    let frequency = config.ahrs.sample_frequency;
    let samples = (seconds * frequency).round() as usize;
    if samples == 0 {
        bail!("duration too short for {frequency} Hz");
    }

    let omega = Vec3::new(0.3, -0.2, 1.0).normalize() * rate_dps.to_radians();
    let bias = Vec3::repeat(gyro_bias_dps.to_radians());
    let gravity_up = Vec3::z();
    let earth_field = Vec3::new(0.4, 0.0, -0.9);

    let mut rng = StdRng::seed_from_u64(seed);
    let gyro_noise = Normal::new(0.0, 0.01).context("gyro noise")?;
    let accel_noise = Normal::new(0.0, 0.05).context("accel noise")?;
    let mag_noise = Normal::new(0.0, 0.01).context("mag noise")?;

    // Constant body rate: q(t+dt) = q(t)⊗exp(½·ω·dt)
    let angle = omega.norm() / frequency;
    let axis = omega.normalize();
    let half = angle / 2.0;
    let step = Quat::new(half.cos(), axis.x * half.sin(), axis.y * half.sin(), axis.z * half.sin());

    let mut truth = Vec::with_capacity(samples);
    let mut gyro = Array2::<f64>::zeros((samples, 3));
    let mut accel = Array2::<f64>::zeros((samples, 3));
    let mut mag = Array2::<f64>::zeros((samples, 3));
    let mut q = euler_to_quaternion(10.0, -5.0, 30.0);
    for i in 0..samples {
        let body_from_earth = quaternion_to_rotation(&q).transpose();
        let a = body_from_earth * gravity_up * 9.81;
        let m = body_from_earth * earth_field;
        for c in 0..3 {
            gyro[[i, c]] = omega[c] + bias[c] + gyro_noise.sample(&mut rng);
            accel[[i, c]] = a[c] + accel_noise.sample(&mut rng);
            mag[[i, c]] = m[c] + mag_noise.sample(&mut rng);
        }
        truth.push(quaternion_to_rotation(&q));
        q = normalized(quat_multiply(&q, &step))?;
    }

    let first_accel = Vec3::new(accel[[0, 0]], accel[[0, 1]], accel[[0, 2]]);
    let first_mag = Vec3::new(mag[[0, 0]], mag[[0, 1]], mag[[0, 2]]);
    let seed_q = accel_mag_to_quaternion(&first_accel, with_mag.then_some(&first_mag))?;
    let stream = SensorStream::new(gyro, accel, with_mag.then_some(mag))?;

    println!(
        "AHRS demo ({samples} samples at {frequency} Hz, {})",
        if with_mag { "MARG" } else { "IMU only" }
    );
    for algorithm in [AhrsAlgorithm::Madgwick, AhrsAlgorithm::Mahony] {
        let ahrs = motion_estimation_rs::AhrsConfig {
            algorithm,
            ..config.ahrs.clone()
        };
        let mut filter = ahrs.build_filter()?;
        filter.set_orientation(seed_q)?;
        let history = filter_orientation(&stream, filter.as_mut())?;

        let distances: Vec<f64> = history
            .axis_iter(Axis(0))
            .zip(&truth)
            .map(|(row, r)| {
                let est = quaternion_to_rotation(&Quat::new(row[0], row[1], row[2], row[3]));
                chordal_distance(&est, r)
            })
            .collect();
        let mean = distances.iter().sum::<f64>() / distances.len() as f64;
        let last = distances.last().copied().unwrap_or_default();

        println!("  {algorithm:?}: mean chordal {mean:.4}, final chordal {last:.4}");
        log::debug!("{algorithm:?} final state: {:?}", filter.get_state());
    }
    Ok(())
}

fn run_selftest(trials: usize, debug: bool, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let tol = 1e-9;
    let mut rotation_ok = true;
    let mut distance_ok = true;

    for _ in 0..trials {
        let angles: [f64; 3] = [
            rng.gen_range(-180.0..180.0),
            rng.gen_range(-180.0..180.0),
            rng.gen_range(-180.0..180.0),
        ];
        let r1 = euler_to_rotation(angles[0], angles[1], angles[2]);

        let raw = Quat::new(rng.gen(), rng.gen(), rng.gen(), rng.gen());
        let q = normalized(raw)?;
        let r2 = quaternion_to_rotation(&q);
        let d = chordal_distance(&r1, &r2);

        if debug {
            println!("----------------------------------------------------------------------");
            println!(" roll = {:.4}, pitch = {:.4}, yaw = {:.4}", angles[0], angles[1], angles[2]);
            println!(" det(R1) = {:.4}", r1.determinant());
            println!(" q = [{:.4}, {:.4}, {:.4}, {:.4}]", q[0], q[1], q[2], q[3]);
            println!(" det(R2) = {:.4}", r2.determinant());
            println!(" chordal distance = {d:.6}");
        }

        let round_trip = quaternion_to_rotation(&rotation_to_quaternion(&r1));
        if !is_rotation(&r1, tol) || !is_rotation(&r2, tol) || chordal_distance(&round_trip, &r1) > 1e-6 {
            rotation_ok = false;
        }
        if !(0.0..=MAX_CHORDAL_DISTANCE).contains(&d) {
            distance_ok = false;
        }
    }

    println!("Running {trials} trials...");
    println!("- Valid construction of rotation matrix ......... [{}]", verdict(rotation_ok));
    println!("- Valid distance between rotation matrices ...... [{}]", verdict(distance_ok));

    if !(rotation_ok && distance_ok) {
        bail!("rotation self-test failed");
    }
    Ok(())
}

fn verdict(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "NO"
    }
}
