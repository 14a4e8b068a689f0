//! Adaptive Dormand–Prince 5(4) integrator.
//!
//! The heat-transfer system is small (three states) but stiff around the
//! laser pulse and at evaporation onset, where the temperature derivative
//! changes by orders of magnitude within nanoseconds. An embedded explicit pair
//! with error control is enough there as long as the step is allowed to shrink;
//! we only require output at the caller's grid points, so steps are clipped to
//! land on them exactly.
//!
//! Failure modes (step-size underflow, step budget, non-finite state, a
//! state-specific validity check) return everything integrated so far.

use nalgebra::SVector;

/// Tolerances and step limits.
#[derive(Debug, Clone)]
pub struct OdeOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Upper bound on a single step (same units as `t`).
    pub max_step: f64,
    /// Total accepted + rejected step budget.
    pub max_steps: usize,
}

impl Default for OdeOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-8,
            max_step: f64::INFINITY,
            max_steps: 200_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OdeStats {
    pub accepted: usize,
    pub rejected: usize,
    pub evaluations: usize,
}

/// States at the requested output times.
#[derive(Debug, Clone)]
pub struct OdeSolution<const N: usize> {
    pub t: Vec<f64>,
    pub y: Vec<SVector<f64, N>>,
    pub stats: OdeStats,
}

#[derive(Debug, Clone)]
pub struct OdeFailure<const N: usize> {
    pub reason: String,
    /// Output points reached before the failure.
    pub partial: OdeSolution<N>,
}

// Dormand–Prince coefficients.
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;
// Error coefficients: b - b*.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Integrate `dy/dt = f(t, y)` from `grid[0]` (where `y = y0`) through every grid point.
///
/// `valid` is checked on every accepted state; returning `Some(reason)` stops the
/// integration as a failure.
pub fn integrate<const N: usize, F, V>(
    mut f: F,
    grid: &[f64],
    y0: SVector<f64, N>,
    opts: &OdeOptions,
    valid: V,
) -> Result<OdeSolution<N>, OdeFailure<N>>
where
    F: FnMut(f64, &SVector<f64, N>) -> SVector<f64, N>,
    V: Fn(&SVector<f64, N>) -> Option<String>,
{
    let mut sol = OdeSolution {
        t: Vec::with_capacity(grid.len()),
        y: Vec::with_capacity(grid.len()),
        stats: OdeStats::default(),
    };
    let Some(&t_start) = grid.first() else {
        return Ok(sol);
    };
    sol.t.push(t_start);
    sol.y.push(y0);

    let span = grid[grid.len() - 1] - t_start;
    if span <= 0.0 {
        return Ok(sol);
    }
    let h_min = span * 1e-14;

    let mut t = t_start;
    let mut y = y0;
    let mut k1 = f(t, &y);
    sol.stats.evaluations += 1;
    let mut h = initial_step(&y, &k1, opts).min(opts.max_step).min(span);

    for &t_next in &grid[1..] {
        if t_next < t {
            return Err(fail(sol, format!("time grid is not increasing at t = {t_next}")));
        }
        while t < t_next {
            if sol.stats.accepted + sol.stats.rejected >= opts.max_steps {
                return Err(fail(sol, format!("step budget of {} exhausted at t = {t}", opts.max_steps)));
            }
            if h < h_min {
                return Err(fail(sol, format!("step size underflow at t = {t}")));
            }

            let remaining = t_next - t;
            let clipped = h >= remaining;
            let step = if clipped { remaining } else { h };

            let k2 = f(t + step * (1.0 / 5.0), &(y + k1 * (step * A21)));
            let k3 = f(t + step * (3.0 / 10.0), &(y + (k1 * A31 + k2 * A32) * step));
            let k4 = f(t + step * (4.0 / 5.0), &(y + (k1 * A41 + k2 * A42 + k3 * A43) * step));
            let k5 = f(
                t + step * (8.0 / 9.0),
                &(y + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * step),
            );
            let k6 = f(
                t + step,
                &(y + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * step),
            );
            let y_new = y + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * step;
            let k7 = f(t + step, &y_new);
            sol.stats.evaluations += 6;

            let err_vec = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * step;
            let err = error_norm(&err_vec, &y, &y_new, opts);

            if !err.is_finite() || y_new.iter().any(|v| !v.is_finite()) {
                sol.stats.rejected += 1;
                h = step * MIN_FACTOR;
                continue;
            }

            if err <= 1.0 {
                sol.stats.accepted += 1;
                t = if clipped { t_next } else { t + step };
                y = y_new;
                k1 = k7;
                if let Some(reason) = valid(&y) {
                    return Err(fail(sol, format!("{reason} at t = {t}")));
                }
                let factor = if err == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                // A clipped step says nothing about how large h may grow.
                if !clipped || step * factor > h {
                    h = (step * factor).min(opts.max_step);
                }
            } else {
                sol.stats.rejected += 1;
                h = step * (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, 1.0);
            }
        }
        sol.t.push(t_next);
        sol.y.push(y);
    }

    Ok(sol)
}

fn fail<const N: usize>(partial: OdeSolution<N>, reason: String) -> OdeFailure<N> {
    OdeFailure { reason, partial }
}

fn error_norm<const N: usize>(
    err: &SVector<f64, N>,
    y: &SVector<f64, N>,
    y_new: &SVector<f64, N>,
    opts: &OdeOptions,
) -> f64 {
    let mut acc = 0.0;
    for i in 0..N {
        let sc = opts.atol + opts.rtol * y[i].abs().max(y_new[i].abs());
        let e = err[i] / sc;
        acc += e * e;
    }
    (acc / N as f64).sqrt()
}

fn initial_step<const N: usize>(y: &SVector<f64, N>, dy: &SVector<f64, N>, opts: &OdeOptions) -> f64 {
    let mut d0 = 0.0;
    let mut d1 = 0.0;
    for i in 0..N {
        let sc = opts.atol + opts.rtol * y[i].abs();
        d0 += (y[i] / sc).powi(2);
        d1 += (dy[i] / sc).powi(2);
    }
    let (d0, d1) = ((d0 / N as f64).sqrt(), (d1 / N as f64).sqrt());
    if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    }
}
