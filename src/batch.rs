//! Offline processing of recorded sensor data.
//!
//! Inputs and outputs are sample-major ndarray matrices (one row per sample).
//! Independent orientation streams each get their own filter instance and
//! run on scoped worker threads; no state is shared between them.

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::config::AhrsConfig;
use crate::error::{EstimationError, Result};
use crate::filters::{GaussianState, KalmanFilter, OrientationFilter};
use crate::types::{ImuSample, StateVec, Vec3, QUAT_DIM};

/// One recorded sensor stream; every matrix is N×3
#[derive(Clone, Debug)]
pub struct SensorStream {
    gyro: Array2<f64>,
    accel: Array2<f64>,
    mag: Option<Array2<f64>>,
}

impl SensorStream {
    pub fn new(gyro: Array2<f64>, accel: Array2<f64>, mag: Option<Array2<f64>>) -> Result<Self> {
        let rows = gyro.nrows();
        check_columns("gyro stream", &gyro, rows)?;
        check_columns("accel stream", &accel, rows)?;
        if let Some(m) = &mag {
            check_columns("mag stream", m, rows)?;
        }
        Ok(Self { gyro, accel, mag })
    }

    pub fn len(&self) -> usize {
        self.gyro.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index`, or `None` past the end of the stream
    pub fn sample(&self, index: usize) -> Option<ImuSample> {
        if index >= self.len() {
            return None;
        }
        Some(ImuSample {
            gyro: row_vec3(self.gyro.row(index)),
            accel: row_vec3(self.accel.row(index)),
            mag: self.mag.as_ref().map(|m| row_vec3(m.row(index))),
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = ImuSample> + '_ {
        (0..self.len()).filter_map(move |i| self.sample(i))
    }
}

fn check_columns(context: &'static str, m: &Array2<f64>, rows: usize) -> Result<()> {
    if m.dim() != (rows, 3) {
        return Err(EstimationError::shape(context, (rows, 3), m.dim()));
    }
    Ok(())
}

fn row_vec3(row: ArrayView1<f64>) -> Vec3 {
    Vec3::new(row[0], row[1], row[2])
}

/// Run `filter` over a whole stream; returns the N×4 quaternion history
pub fn filter_orientation(
    stream: &SensorStream,
    filter: &mut dyn OrientationFilter,
) -> Result<Array2<f64>> {
    let mut history = Array2::<f64>::zeros((stream.len(), QUAT_DIM));
    for (i, sample) in stream.samples().enumerate() {
        let q = filter.update(&sample)?;
        for (slot, value) in history.row_mut(i).iter_mut().zip(q.iter()) {
            *slot = *value;
        }
    }
    Ok(history)
}

/// Filter independent streams in parallel, one filter instance per stream
pub fn filter_orientation_streams(
    streams: &[SensorStream],
    config: &AhrsConfig,
) -> Result<Vec<Array2<f64>>> {
    config.validate()?;
    log::debug!("filtering {} orientation streams", streams.len());

    let results = crossbeam::scope(|scope| {
        let handles: Vec<_> = streams
            .iter()
            .map(|stream| {
                scope.spawn(move |_| {
                    let mut filter = config.build_filter()?;
                    filter_orientation(stream, filter.as_mut())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(EstimationError::Numerical("orientation worker panicked".to_string()))
                })
            })
            .collect::<Vec<_>>()
    })
    .map_err(|_| EstimationError::Numerical("orientation worker scope panicked".to_string()))?;

    results.into_iter().collect()
}

/// Run Predict + Update for every measurement row (N×n).
///
/// Returns the N×m estimate history and the final state.
pub fn filter_measurements(
    filter: &KalmanFilter,
    initial: &GaussianState,
    measurements: ArrayView2<f64>,
) -> Result<(Array2<f64>, GaussianState)> {
    let n = filter.measurement_dim();
    if measurements.ncols() != n {
        return Err(EstimationError::shape(
            "measurement rows",
            (measurements.nrows(), n),
            measurements.dim(),
        ));
    }

    let mut history = Array2::<f64>::zeros((measurements.nrows(), filter.state_dim()));
    let mut state = initial.clone();
    for (i, row) in measurements.rows().into_iter().enumerate() {
        let z = StateVec::from_iterator(n, row.iter().copied());
        state = filter.step(&state, &z)?;
        for (slot, value) in history.row_mut(i).iter_mut().zip(state.xhat.iter()) {
            *slot = *value;
        }
    }
    Ok((history, state))
}
